/// Maximum number of pending frames before evaluation is aborted.
///
/// Frames live on the heap, so this bounds memory rather than the Rust stack.
pub const MAX_FRAME_DEPTH: usize = 100_000;

/// Evaluation limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    pub max_depth: usize,
    /// Optional step budget; `None` means unbounded.
    pub max_steps: Option<u64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_FRAME_DEPTH,
            max_steps: None,
        }
    }
}

impl EvalConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}
