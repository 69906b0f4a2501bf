/// Limits on completion.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RewriteOptions {
    /// The number of completion rounds that may add rules.
    pub max_iterations: usize,
    /// The longest left hand side completion may produce.
    pub max_depth: usize,
}

impl RewriteOptions {
    pub const DEFAULT_MAX_ITERATIONS: usize = 4000;
    pub const DEFAULT_MAX_DEPTH: usize = 10;

    pub fn new() -> RewriteOptions {
        RewriteOptions {
            max_iterations: RewriteOptions::DEFAULT_MAX_ITERATIONS,
            max_depth: RewriteOptions::DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> RewriteOptions {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> RewriteOptions {
        self.max_depth = max_depth;
        self
    }
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions::new()
    }
}
