//! Network server configuration
//!
//! The configuration carries the network identifier and the DevAddr
//! prefixes to register before serving traffic:
//!
//! ```toml
//! net_id = 0x000013
//!
//! [[prefixes]]
//! prefix = "26000000/7"
//! usages = ["otaa", "local"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::DevAddrPrefix;

/// One prefix registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// Prefix in `addr/length` notation
    pub prefix: DevAddrPrefix,
    /// Usages the prefix serves
    #[serde(default)]
    pub usages: Vec<String>,
}

/// Network server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkServerConfig {
    /// Network identifier (low 24 bits used)
    pub net_id: u32,
    /// Prefixes available for DevAddr allocation
    #[serde(default)]
    pub prefixes: Vec<PrefixConfig>,
}

impl NetworkServerConfig {
    /// Parse a TOML configuration
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }
}
