use std::collections::{HashMap, HashSet};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use super::DeviceStore;
use crate::device::{Device, DeviceField, DeviceKey};
use crate::error::{Error, Result};
use crate::types::{AESKey, DevAddr, EUI64};

#[derive(Default)]
struct Inner {
    devices: HashMap<DeviceKey, Device>,
    by_address: HashMap<DevAddr, HashSet<DeviceKey>>,
}

impl Inner {
    fn index(&mut self, key: DeviceKey, old: Option<DevAddr>, new: DevAddr) {
        if let Some(old) = old.filter(|old| *old != new) {
            if let Some(keys) = self.by_address.get_mut(&old) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.by_address.remove(&old);
                }
            }
        }
        self.by_address.entry(new).or_default().insert(key);
    }
}

/// Device store held in process memory
///
/// Keeps a DevAddr index next to the records. Each call runs under a single
/// write lock, so partial updates never interleave.
#[derive(Default)]
pub struct MemoryDeviceStore {
    inner: RwLock<Inner>,
}

impl MemoryDeviceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored devices
    pub fn len(&self) -> usize {
        self.inner.read().devices.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeviceStore for MemoryDeviceStore {
    fn get_with_address(&self, dev_addr: DevAddr) -> Result<Vec<Device>> {
        let inner = self.inner.read();
        let devices = inner
            .by_address
            .get(&dev_addr)
            .into_iter()
            .flatten()
            .filter_map(|key| inner.devices.get(key).cloned())
            .collect();
        Ok(devices)
    }

    fn get(&self, app_eui: EUI64, dev_eui: EUI64) -> Result<Device> {
        let key = DeviceKey { app_eui, dev_eui };
        self.inner
            .read()
            .devices
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Device {app_eui}/{dev_eui}")))
    }

    fn set(&self, device: &Device, fields: &[DeviceField]) -> Result<()> {
        let key = device.key();
        let mut inner = self.inner.write();

        if fields.is_empty() {
            let old = inner.devices.insert(key, device.clone()).map(|d| d.dev_addr);
            inner.index(key, old, device.dev_addr);
            return Ok(());
        }

        let stored = inner
            .devices
            .get_mut(&key)
            .ok_or_else(|| Error::NotFound(format!("Device {}/{}", key.app_eui, key.dev_eui)))?;
        let old = stored.dev_addr;
        for field in fields {
            field.apply(device, stored);
        }
        let new = stored.dev_addr;
        inner.index(key, Some(old), new);

        debug!(
            dev_eui = %key.dev_eui,
            fields = ?fields.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "Updated device"
        );
        Ok(())
    }

    fn activate(
        &self,
        app_eui: EUI64,
        dev_eui: EUI64,
        dev_addr: DevAddr,
        nwk_skey: AESKey,
    ) -> Result<()> {
        let key = DeviceKey { app_eui, dev_eui };
        let mut inner = self.inner.write();

        let device = inner
            .devices
            .entry(key)
            .or_insert_with(|| Device::new(app_eui, dev_eui, "", ""));
        let old = device.dev_addr;
        device.dev_addr = dev_addr;
        device.nwk_skey = nwk_skey;
        device.fcnt_up = 0;
        device.fcnt_down = 0;
        device.last_seen = Some(Utc::now());
        inner.index(key, Some(old), dev_addr);
        Ok(())
    }
}
