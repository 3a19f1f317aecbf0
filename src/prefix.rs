//! DevAddr prefix registry and address allocation
//!
//! The DevAddr space of a network is split into prefixes, each tagged with
//! the usages it serves (`otaa`, a tenant name, ...). Activation picks a
//! prefix whose tags cover the device's constraints and draws a random
//! address inside it.

use std::collections::HashMap;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{DevAddr, DevAddrPrefix, NetID};

/// Shortest prefix that still pins the network identifier
pub const MIN_PREFIX_LENGTH: u8 = 7;

/// Configured DevAddr prefixes of one network server
pub struct PrefixRegistry {
    net_id: NetID,
    prefixes: RwLock<HashMap<DevAddrPrefix, Vec<String>>>,
}

impl PrefixRegistry {
    /// Create an empty registry for `net_id`
    pub fn new(net_id: NetID) -> Self {
        Self {
            net_id,
            prefixes: RwLock::new(HashMap::new()),
        }
    }

    /// Network identifier prefixes are checked against
    pub fn net_id(&self) -> NetID {
        self.net_id
    }

    /// Register `prefix` for `usages`, replacing earlier usages of the same prefix
    ///
    /// Usages form a set; a tag listed twice is kept once.
    pub fn register(&self, prefix: DevAddrPrefix, mut usages: Vec<String>) -> Result<()> {
        if prefix.length < MIN_PREFIX_LENGTH {
            return Err(Error::invalid_argument("Prefix", "invalid length"));
        }
        if prefix.dev_addr.nwk_id() != self.net_id.nwk_id() {
            return Err(Error::invalid_argument("Prefix", "invalid netID"));
        }
        usages.sort_unstable();
        usages.dedup();
        info!(%prefix, ?usages, "Registered DevAddr prefix");
        self.prefixes.write().insert(prefix, usages);
        Ok(())
    }

    /// Prefixes whose usages cover every required usage
    ///
    /// Every entry of `required` must find an offered usage. Offered usages
    /// are unique, so a required usage listed twice is matched by the same tag.
    pub fn prefixes_for<T: AsRef<str>>(&self, required: &[T]) -> Vec<DevAddrPrefix> {
        self.prefixes
            .read()
            .iter()
            .filter(|(_, offered)| {
                let matches: usize = required
                    .iter()
                    .map(|r| offered.iter().filter(|o| o.as_str() == r.as_ref()).count())
                    .sum();
                matches == required.len()
            })
            .map(|(prefix, _)| *prefix)
            .collect()
    }

    /// Number of registered prefixes
    pub fn len(&self) -> usize {
        self.prefixes.read().len()
    }

    /// Whether no prefix is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw a random DevAddr under a prefix matching `constraints`
    pub fn allocate<T: AsRef<str>>(&self, constraints: &[T]) -> Result<DevAddr> {
        // Fresh generator per call, never shared between requests
        let mut rng = StdRng::from_entropy();

        let mut bytes = [0u8; 4];
        rng.fill_bytes(&mut bytes);

        let prefixes = self.prefixes_for(constraints);
        let prefix = prefixes.choose(&mut rng).copied().ok_or_else(|| {
            let constraints: Vec<&str> = constraints.iter().map(AsRef::as_ref).collect();
            Error::NotFound(format!("DevAddr prefix with constraints {constraints:?}"))
        })?;

        let dev_addr = DevAddr::new(bytes).with_prefix(prefix);
        debug!(%dev_addr, %prefix, candidates = prefixes.len(), "Allocated DevAddr");
        Ok(dev_addr)
    }
}
