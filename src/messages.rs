//! Messages exchanged with the broker and the handler
//!
//! Identity fields that a well-formed message always carries are still
//! optional here. Handlers reject messages that lack them with
//! `Error::InvalidArgument`.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::types::{AESKey, DevAddr, EUI64};

/// Lookup of the devices that may have sent an uplink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicesRequest {
    pub dev_addr: Option<DevAddr>,
    /// Frame counter of the uplink
    pub fcnt: u32,
}

/// Devices matching a [`DevicesRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub results: Vec<DeviceInfo>,
}

/// What the broker needs to know about a candidate device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub app_eui: EUI64,
    pub app_id: String,
    pub dev_eui: EUI64,
    pub dev_id: String,
    pub nwk_skey: AESKey,
    pub fcnt_up: u32,
    pub uses_32bit_fcnt: bool,
    pub disable_fcnt_check: bool,
}

impl From<&Device> for DeviceInfo {
    fn from(device: &Device) -> Self {
        Self {
            app_eui: device.app_eui,
            app_id: device.app_id.clone(),
            dev_eui: device.dev_eui,
            dev_id: device.dev_id.clone(),
            nwk_skey: device.nwk_skey,
            fcnt_up: device.fcnt_up,
            uses_32bit_fcnt: device.options.uses_32bit_fcnt,
            disable_fcnt_check: device.options.disable_fcnt_check,
        }
    }
}

/// LoRaWAN part of the activation metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LorawanActivationMetadata {
    pub app_eui: Option<EUI64>,
    pub dev_eui: Option<EUI64>,
    /// Assigned while preparing the activation
    pub dev_addr: Option<DevAddr>,
    /// Derived by the handler once the join is accepted
    pub nwk_skey: Option<AESKey>,
    pub rx1_dr_offset: u32,
    pub rx2_dr: u32,
    pub rx_delay: u32,
    /// Extra channel frequencies in Hz; only sent when there are exactly five
    pub cf_list: Vec<u32>,
}

/// Activation metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationMetadata {
    pub lorawan: Option<LorawanActivationMetadata>,
}

/// Deduplicated join request, forwarded by the broker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceActivationRequest {
    /// Raw join request
    pub payload: Vec<u8>,
    pub app_eui: Option<EUI64>,
    pub dev_eui: Option<EUI64>,
    pub app_id: String,
    pub dev_id: String,
    pub activation_metadata: Option<ActivationMetadata>,
    /// Join accept template; its payload is filled in by the network server
    pub response_template: Option<DownlinkMessage>,
}

/// Accepted activation, returned by the handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceActivationResponse {
    pub payload: Vec<u8>,
    pub activation_metadata: Option<ActivationMetadata>,
}

/// LoRaWAN uplink metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LorawanMetadata {
    /// Full 32-bit frame counter, when the broker reconstructed it
    pub fcnt: u32,
    pub data_rate: String,
    pub coding_rate: String,
}

/// Protocol specific uplink metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    pub lorawan: Option<LorawanMetadata>,
}

/// Deduplicated uplink, forwarded by the broker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UplinkMessage {
    pub payload: Vec<u8>,
    pub app_eui: Option<EUI64>,
    pub dev_eui: Option<EUI64>,
    pub app_id: String,
    pub dev_id: String,
    pub protocol_metadata: Option<ProtocolMetadata>,
    /// Downlink to fill in when the device has a receive window open
    pub response_template: Option<DownlinkMessage>,
}

/// LoRaWAN transmission settings of a downlink
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LorawanTxConfiguration {
    /// Full 32-bit downlink frame counter
    pub fcnt: u32,
    pub data_rate: String,
    pub coding_rate: String,
}

/// Protocol specific transmission settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTxConfiguration {
    pub lorawan: Option<LorawanTxConfiguration>,
}

/// Downlink option selected by the broker
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownlinkOption {
    pub identifier: String,
    pub gateway_id: String,
    pub protocol_config: Option<ProtocolTxConfiguration>,
}

/// Downlink on its way to a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownlinkMessage {
    pub payload: Vec<u8>,
    pub app_eui: Option<EUI64>,
    pub dev_eui: Option<EUI64>,
    pub app_id: String,
    pub dev_id: String,
    pub downlink_option: Option<DownlinkOption>,
}

impl DownlinkMessage {
    /// LoRaWAN transmission settings, if every level is present
    pub fn lorawan_tx_config_mut(&mut self) -> Option<&mut LorawanTxConfiguration> {
        self.downlink_option
            .as_mut()?
            .protocol_config
            .as_mut()?
            .lorawan
            .as_mut()
    }
}
