//! Device session records
//!
//! A [`Device`] is the MAC-layer view of one end device: its current
//! address, network session key and frame counters. Records are owned by a
//! [`DeviceStore`](crate::store::DeviceStore); handlers work on a copy and
//! write back only the fields they touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AESKey, DevAddr, EUI64};

/// Per-device behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceOptions {
    /// Device sends 32-bit frame counters (only 16 bits on the wire)
    pub uses_32bit_fcnt: bool,
    /// Skip the frame counter check (insecure)
    pub disable_fcnt_check: bool,
    /// Comma separated prefix usages required at activation
    pub activation_constraints: String,
}

impl DeviceOptions {
    /// Split the activation constraints; an empty string yields none
    pub fn activation_constraints(&self) -> Vec<String> {
        if self.activation_constraints.is_empty() {
            return Vec::new();
        }
        self.activation_constraints
            .split(',')
            .map(str::to_owned)
            .collect()
    }
}

/// Device session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Application EUI
    pub app_eui: EUI64,
    /// Device EUI
    pub dev_eui: EUI64,
    /// Application the device belongs to
    pub app_id: String,
    /// Device ID within the application
    pub dev_id: String,
    /// Current device address
    pub dev_addr: DevAddr,
    /// Network session key
    pub nwk_skey: AESKey,
    /// Last accepted uplink frame counter
    pub fcnt_up: u32,
    /// Next downlink frame counter
    pub fcnt_down: u32,
    /// Behaviour switches
    pub options: DeviceOptions,
    /// Time of the last uplink or activation
    pub last_seen: Option<DateTime<Utc>>,
}

impl Device {
    /// Create a device without a session
    pub fn new(app_eui: EUI64, dev_eui: EUI64, app_id: &str, dev_id: &str) -> Self {
        Self {
            app_eui,
            dev_eui,
            app_id: app_id.to_owned(),
            dev_id: dev_id.to_owned(),
            dev_addr: DevAddr::default(),
            nwk_skey: AESKey::default(),
            fcnt_up: 0,
            fcnt_down: 0,
            options: DeviceOptions::default(),
            last_seen: None,
        }
    }

    /// Store key of this device
    pub fn key(&self) -> DeviceKey {
        DeviceKey {
            app_eui: self.app_eui,
            dev_eui: self.dev_eui,
        }
    }
}

/// Device identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceKey {
    /// Application EUI
    pub app_eui: EUI64,
    /// Device EUI
    pub dev_eui: EUI64,
}

/// Field of a [`Device`] that can be written on its own
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceField {
    AppID,
    DevID,
    DevAddr,
    NwkSKey,
    FCntUp,
    FCntDown,
    Options,
    LastSeen,
}

impl DeviceField {
    /// Storage name of the field
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceField::AppID => "app_id",
            DeviceField::DevID => "dev_id",
            DeviceField::DevAddr => "dev_addr",
            DeviceField::NwkSKey => "nwk_s_key",
            DeviceField::FCntUp => "f_cnt_up",
            DeviceField::FCntDown => "f_cnt_down",
            DeviceField::Options => "options",
            DeviceField::LastSeen => "last_seen",
        }
    }

    /// Copy this field from `src` into `dst`
    pub fn apply(self, src: &Device, dst: &mut Device) {
        match self {
            DeviceField::AppID => dst.app_id.clone_from(&src.app_id),
            DeviceField::DevID => dst.dev_id.clone_from(&src.dev_id),
            DeviceField::DevAddr => dst.dev_addr = src.dev_addr,
            DeviceField::NwkSKey => dst.nwk_skey = src.nwk_skey,
            DeviceField::FCntUp => dst.fcnt_up = src.fcnt_up,
            DeviceField::FCntDown => dst.fcnt_down = src.fcnt_down,
            DeviceField::Options => dst.options.clone_from(&src.options),
            DeviceField::LastSeen => dst.last_seen = src.last_seen,
        }
    }
}
