/// Configuration for the [`Machine`](crate::machine::Machine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Maximum number of transitions before a run is abandoned (`None` = unbounded)
    pub max_steps: Option<u64>,
    /// Emit a `trace` event for every transition
    pub trace_steps: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            trace_steps: false,
        }
    }
}

impl MachineConfig {
    #[must_use]
    pub fn with_max_steps(mut self, limit: u64) -> Self {
        self.max_steps = Some(limit);
        self
    }

    #[must_use]
    pub fn with_trace_steps(mut self, enabled: bool) -> Self {
        self.trace_steps = enabled;
        self
    }
}
