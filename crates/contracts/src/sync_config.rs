//! Synchronizer configuration contract shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// StreamSynchronizer configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SyncConfig {
    /// Evict the oldest pulse samples once the pulse queue grows past
    /// this depth. `None` keeps every pulse sample until it is paired.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub pulse_high_water_mark: Option<usize>,
}
