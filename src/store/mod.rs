//! Device directory
//!
//! The network server does not persist anything itself. Every read and
//! write of a [`Device`] goes through a [`DeviceStore`]. Implementations
//! must apply each call atomically per device, so a reader never sees a
//! half-written record.
//!
//! Writes are absolute: [`DeviceStore::set`] stores the given field values
//! and does not compare them with what is stored. Assigning a downlink
//! counter is a `get` followed by a `set` of `FCntDown`, so two downlinks
//! for the same device handled at the same time may get the same counter.
//! Callers that need unique counters handle downlinks of one device one at
//! a time.

use std::sync::Arc;

use crate::device::{Device, DeviceField};
use crate::error::Result;
use crate::types::{AESKey, DevAddr, EUI64};

/// In-memory device store
pub mod memory;

pub use memory::MemoryDeviceStore;

/// Device directory operations used by the network server
pub trait DeviceStore: Send + Sync {
    /// All devices currently bound to `dev_addr`
    fn get_with_address(&self, dev_addr: DevAddr) -> Result<Vec<Device>>;

    /// Device by identity, `Error::NotFound` if absent
    fn get(&self, app_eui: EUI64, dev_eui: EUI64) -> Result<Device>;

    /// Write the listed fields of `device`, leaving the others untouched
    ///
    /// An empty field list writes the whole record.
    fn set(&self, device: &Device, fields: &[DeviceField]) -> Result<()>;

    /// Create or replace the session of a device
    ///
    /// Binds the device to `dev_addr` with `nwk_skey` and resets both frame
    /// counters.
    fn activate(
        &self,
        app_eui: EUI64,
        dev_eui: EUI64,
        dev_addr: DevAddr,
        nwk_skey: AESKey,
    ) -> Result<()>;
}

impl<S: DeviceStore + ?Sized> DeviceStore for Arc<S> {
    fn get_with_address(&self, dev_addr: DevAddr) -> Result<Vec<Device>> {
        (**self).get_with_address(dev_addr)
    }

    fn get(&self, app_eui: EUI64, dev_eui: EUI64) -> Result<Device> {
        (**self).get(app_eui, dev_eui)
    }

    fn set(&self, device: &Device, fields: &[DeviceField]) -> Result<()> {
        (**self).set(device, fields)
    }

    fn activate(
        &self,
        app_eui: EUI64,
        dev_eui: EUI64,
        dev_addr: DevAddr,
        nwk_skey: AESKey,
    ) -> Result<()> {
        (**self).activate(app_eui, dev_eui, dev_addr, nwk_skey)
    }
}
