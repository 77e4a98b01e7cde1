use serde::{Deserialize, Serialize};

/// Configuration for the pending-terms accumulator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccumulatorConfig {
    /// Flush when accumulated doclist bytes exceed this
    pub max_pending_bytes: usize,
    /// Initial hash slot count
    pub initial_slots: usize,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            // 1MB
            max_pending_bytes: 1024 * 1024,
            initial_slots: 1024,
        }
    }
}
