/// Elements with a width in local variable slots
///
/// On the JVM, `long` and `double` values take up two consecutive local variable slots while
/// everything else takes up one.
pub trait Width {
    fn width(&self) -> usize;
}

impl<T: Width> Width for [T] {
    fn width(&self) -> usize {
        self.iter().map(Width::width).sum()
    }
}

impl<T: Width> Width for Vec<T> {
    fn width(&self) -> usize {
        self.as_slice().width()
    }
}
