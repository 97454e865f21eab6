//! Run-level configuration metadata.

use serde::{Deserialize, Serialize};

use crate::keys::KEY_UNSET;

/// Configuration metadata written into each container's header.
///
/// Passed explicitly to `EventWriter::open`; there is no process-global
/// state. Readers expose the stored values read-only. The alias is
/// truncated to the header's fixed 16-byte text field when serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    /// Configuration key, `0xFFFFFFFF` when unset.
    pub config_key: u32,
    /// Short human-readable configuration alias.
    pub alias: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            config_key: KEY_UNSET,
            alias: String::new(),
        }
    }
}

impl RunConfig {
    pub fn new(config_key: u32, alias: impl Into<String>) -> Self {
        Self {
            config_key,
            alias: alias.into(),
        }
    }
}
