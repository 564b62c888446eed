//! Cloud namespace configuration.

use serde::{Deserialize, Serialize};

/// Settings for the per-user directory/file namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Prefix under which every owner's physical tree lives.
    #[serde(default = "default_root_prefix")]
    pub root_prefix: String,
    /// Maximum length, in characters, of a node's virtual path.
    #[serde(default = "default_max_virtual_path")]
    pub max_virtual_path_length: usize,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            root_prefix: default_root_prefix(),
            max_virtual_path_length: default_max_virtual_path(),
        }
    }
}

fn default_root_prefix() -> String {
    "cloud/user".to_string()
}

fn default_max_virtual_path() -> usize {
    256
}
