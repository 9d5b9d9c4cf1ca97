//! Per-step metrics for one family run.

/// Timing and work counters collected during a single family step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default)]
pub struct StepMetrics {
    /// Sub-step passes executed.
    pub passes: u64,
    /// Kernel invocations across all passes.
    pub invocations: u64,
    /// Size of the focus set at the start of the step.
    pub focus_len: usize,
    /// Wall-clock time for the entire step.
    pub total_us: u64,
    /// Per-functor execution time summed over passes: `(name, microseconds)`.
    pub functor_us: Vec<(String, u64)>,
}
