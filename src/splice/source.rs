use crate::jvm::model::{ClassPool, MethodBody, MethodKey};

/// Somewhere method bodies can be looked up
///
/// This is how source methods named by splice descriptors get resolved. Failing to find one is a
/// per-request problem, never a fatal one.
pub trait MethodSource {
    fn find_method(&self, key: &MethodKey) -> Option<&MethodBody>;
}

impl MethodSource for ClassPool {
    fn find_method(&self, key: &MethodKey) -> Option<&MethodBody> {
        self.method(key)
    }
}

impl<S: MethodSource> MethodSource for [S] {
    /// First match wins
    fn find_method(&self, key: &MethodKey) -> Option<&MethodBody> {
        self.iter().find_map(|source| source.find_method(key))
    }
}
