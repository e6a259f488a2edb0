//! Simulation configuration

use crate::DEFAULT_MAILBOX_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every operation of an [`Orchestrator`](crate::Orchestrator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Directory holding `keygen-*.json` and `sig-*.json` files
    pub output_dir: PathBuf,
    /// Capacity of each mailbox and outbound queue
    pub mailbox_capacity: usize,
    /// Deadline for one operation in seconds (`None` waits forever)
    pub operation_timeout_secs: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            operation_timeout_secs: Some(300),
        }
    }
}

impl SimulationConfig {
    /// Store results under a custom directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set mailbox capacity
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    /// Set the operation deadline (`None` disables it)
    pub fn with_operation_timeout(mut self, secs: Option<u64>) -> Self {
        self.operation_timeout_secs = secs;
        self
    }

    /// Operation deadline as a duration
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}
