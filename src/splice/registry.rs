use crate::jvm::model::MethodKey;
use crate::splice::{SpliceDescriptor, SpliceKind};
use std::collections::{BTreeMap, HashSet};

/// All known splice descriptors, grouped by the class they target
///
/// This is the context object the transformation pipeline consults. It is built once from the
/// descriptors at hand and can be rebuilt in place with [`SpliceRegistry::reload`].
#[derive(Clone, Debug, Default)]
pub struct SpliceRegistry {
    by_class: BTreeMap<String, Vec<SpliceDescriptor>>,
}

/// Summary of what a registry contains
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryStatistics {
    /// Number of descriptors
    pub total: usize,

    /// Number of distinct target classes
    pub classes: usize,

    /// Number of distinct target methods
    pub injection_points: usize,

    pub by_kind: BTreeMap<SpliceKind, usize>,
}

impl SpliceRegistry {
    pub fn new(descriptors: impl IntoIterator<Item = SpliceDescriptor>) -> SpliceRegistry {
        let mut registry = SpliceRegistry::default();
        registry.reload(descriptors);
        registry
    }

    /// Throw away the current descriptors and replace them
    pub fn reload(&mut self, descriptors: impl IntoIterator<Item = SpliceDescriptor>) {
        self.by_class.clear();
        for descriptor in descriptors {
            self.by_class
                .entry(descriptor.target.class.to_string())
                .or_insert_with(Vec::new)
                .push(descriptor);
        }

        let stats = self.statistics();
        log::debug!(
            "Registry holds {} splices across {} classes ({} target methods)",
            stats.total,
            stats.classes,
            stats.injection_points
        );
        for (kind, count) in &stats.by_kind {
            log::debug!("  {}: {}", kind, count);
        }
    }

    /// Descriptors targeting a class (given by binary name or dotted Java name)
    pub fn for_class(&self, class_name: &str) -> &[SpliceDescriptor] {
        self.by_class
            .get(&class_name.replace('.', "/"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.by_class.contains_key(&class_name.replace('.', "/"))
    }

    /// Binary names of every targeted class
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.by_class.keys().map(String::as_str)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &SpliceDescriptor> {
        self.by_class.values().flatten()
    }

    pub fn statistics(&self) -> RegistryStatistics {
        let mut stats = RegistryStatistics {
            classes: self.by_class.len(),
            ..RegistryStatistics::default()
        };
        let mut points: HashSet<&MethodKey> = HashSet::new();
        for descriptor in self.descriptors() {
            stats.total += 1;
            points.insert(&descriptor.target);
            *stats.by_kind.entry(descriptor.kind).or_insert(0) += 1;
        }
        stats.injection_points = points.len();
        stats
    }
}
