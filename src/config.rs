/// Construction options shared by [`AvlMap`](crate::AvlMap) and
/// [`IntervalTree`](crate::IntervalTree).
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Node slots to reserve up front. `0` grows the arena on demand.
    pub initial_capacity: usize,
}

impl Config {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}
