//! LoRaWAN network server
//!
//! [`NetworkServer`] owns the prefix registry and a device store, and
//! handles the five requests that reach the network server:
//! - device lookup by address for uplink deduplication
//! - OTAA join in two phases (prepare, then activate)
//! - uplink frame counter tracking
//! - downlink frame counter assignment and signing
//!
//! Every request is handled on its own; the only shared state is the
//! prefix registry and whatever the store keeps.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::NetworkServerConfig;
use crate::device::DeviceField;
use crate::error::{Error, Result};
use crate::fcnt;
use crate::lorawan::{
    CFList, DLSettings, DataPayload, FCtrl, JoinAcceptPayload, MType, MacPayload, PhyPayload,
    FHDR, MHDR,
};
use crate::lorawan::phy::FrameError;
use crate::messages::{
    DeviceActivationRequest, DeviceActivationResponse, DeviceInfo, DevicesRequest,
    DevicesResponse, DownlinkMessage, UplinkMessage,
};
use crate::prefix::PrefixRegistry;
use crate::store::DeviceStore;
use crate::types::{DevAddrPrefix, NetID, EUI64};

/// Usage every prefix used for over-the-air activation must offer
pub const OTAA_USAGE: &str = "otaa";

/// LoRaWAN network server
pub struct NetworkServer<S> {
    devices: S,
    prefixes: PrefixRegistry,
}

impl<S: DeviceStore> NetworkServer<S> {
    /// Create a network server without prefixes
    pub fn new(devices: S, net_id: u32) -> Self {
        Self {
            devices,
            prefixes: PrefixRegistry::new(NetID::from_u32(net_id)),
        }
    }

    /// Create a network server and register the configured prefixes
    pub fn from_config(devices: S, config: &NetworkServerConfig) -> Result<Self> {
        let server = Self::new(devices, config.net_id);
        for prefix in &config.prefixes {
            server.use_prefix(prefix.prefix, prefix.usages.clone())?;
        }
        info!(
            net_id = %server.net_id(),
            prefixes = server.prefixes.len(),
            "Network server configured"
        );
        Ok(server)
    }

    /// Network identifier
    pub fn net_id(&self) -> NetID {
        self.prefixes.net_id()
    }

    /// Make `prefix` available for the given usages
    pub fn use_prefix(&self, prefix: DevAddrPrefix, usages: Vec<String>) -> Result<()> {
        self.prefixes.register(prefix, usages)
    }

    /// Prefixes offering every required usage
    pub fn prefixes_for<T: AsRef<str>>(&self, required: &[T]) -> Vec<DevAddrPrefix> {
        self.prefixes.prefixes_for(required)
    }

    /// Devices at an address whose frame counter allows the uplink
    pub fn handle_get_devices(&self, req: DevicesRequest) -> Result<DevicesResponse> {
        let dev_addr = req
            .dev_addr
            .ok_or_else(|| Error::invalid_argument("DevicesRequest", "missing DevAddr"))?;
        let devices = self.devices.get_with_address(dev_addr)?;

        let results: Vec<DeviceInfo> = devices
            .iter()
            .filter(|device| fcnt::is_candidate(device, req.fcnt))
            .map(DeviceInfo::from)
            .collect();
        debug!(
            %dev_addr,
            fcnt = req.fcnt,
            total = devices.len(),
            matching = results.len(),
            "Looked up devices"
        );
        Ok(DevicesResponse { results })
    }

    /// Assign a DevAddr and build the join accept for a join request
    ///
    /// Nothing is stored; the session only exists once the handler confirms
    /// it through [`handle_activate`](Self::handle_activate).
    pub fn handle_prepare_activation(
        &self,
        mut activation: DeviceActivationRequest,
    ) -> Result<DeviceActivationRequest> {
        let (Some(app_eui), Some(dev_eui)) = (activation.app_eui, activation.dev_eui) else {
            return Err(Error::invalid_argument(
                "Activation",
                "missing AppEUI or DevEUI",
            ));
        };
        let device = self.devices.get(app_eui, dev_eui)?;
        activation.app_id.clone_from(&device.app_id);
        activation.dev_id.clone_from(&device.dev_id);

        // Get activation constraints (for DevAddr prefix selection)
        let mut constraints = device.options.activation_constraints();
        constraints.push(OTAA_USAGE.to_owned());

        let lorawan_meta = activation
            .activation_metadata
            .as_mut()
            .and_then(|meta| meta.lorawan.as_mut())
            .ok_or_else(|| Error::invalid_argument("Activation", "missing LoRaWAN metadata"))?;
        let template = activation
            .response_template
            .as_mut()
            .ok_or_else(|| Error::invalid_argument("Activation", "missing response template"))?;

        let dev_addr = self.prefixes.allocate(&constraints)?;
        lorawan_meta.dev_addr = Some(dev_addr);

        let join_accept = JoinAcceptPayload {
            app_nonce: [0; 3],
            net_id: self.net_id(),
            dev_addr,
            dl_settings: DLSettings {
                rx2_data_rate: narrow("RX2DataRate", lorawan_meta.rx2_dr)?,
                rx1_dr_offset: narrow("RX1DROffset", lorawan_meta.rx1_dr_offset)?,
            },
            rx_delay: narrow("RXDelay", lorawan_meta.rx_delay)?,
            cf_list: CFList::from_slice(&lorawan_meta.cf_list),
        };
        let phy = PhyPayload::new(
            MHDR::new(MType::JoinAccept),
            MacPayload::JoinAccept(join_accept),
        );
        template.payload = phy.to_bytes()?;

        debug!(%app_eui, %dev_eui, %dev_addr, ?constraints, "Prepared activation");
        Ok(activation)
    }

    /// Commit the session of an accepted join
    pub fn handle_activate(
        &self,
        activation: DeviceActivationResponse,
    ) -> Result<DeviceActivationResponse> {
        let meta = activation
            .activation_metadata
            .as_ref()
            .ok_or_else(|| Error::invalid_argument("Activation", "missing ActivationMetadata"))?;
        let lorawan = meta.lorawan.as_ref().ok_or_else(|| {
            Error::invalid_argument("Activation", "missing LoRaWAN ActivationMetadata")
        })?;
        let (Some(app_eui), Some(dev_eui), Some(dev_addr), Some(nwk_skey)) = (
            lorawan.app_eui,
            lorawan.dev_eui,
            lorawan.dev_addr,
            lorawan.nwk_skey,
        ) else {
            return Err(Error::invalid_argument(
                "Activation",
                "missing AppEUI, DevEUI, DevAddr or NwkSKey",
            ));
        };

        self.devices.activate(app_eui, dev_eui, dev_addr, nwk_skey)?;
        info!(%app_eui, %dev_eui, %dev_addr, "Activated device");
        Ok(activation)
    }

    /// Record an uplink and fill in the downlink template, if any
    pub fn handle_uplink(&self, mut message: UplinkMessage) -> Result<UplinkMessage> {
        let (app_eui, dev_eui) = identity("Uplink", message.app_eui, message.dev_eui)?;
        let mut device = self.devices.get(app_eui, dev_eui)?;

        let phy = decode("Uplink", &message.payload)?;
        let mac_payload = match &phy.mac_payload {
            MacPayload::Data(payload) => payload,
            MacPayload::JoinRequest(_) | MacPayload::JoinAccept(_) => {
                return Err(Error::invalid_argument(
                    "Uplink",
                    "does not contain a MAC payload",
                ))
            }
        };

        // The frame header only carries the 16 LSB, prefer the broker's full counter
        device.fcnt_up = match message
            .protocol_metadata
            .as_ref()
            .and_then(|meta| meta.lorawan.as_ref())
        {
            Some(lorawan) => lorawan.fcnt,
            None => mac_payload.fhdr.f_cnt,
        };
        device.last_seen = Some(Utc::now());
        self.devices
            .set(&device, &[DeviceField::FCntUp, DeviceField::LastSeen])?;
        debug!(%app_eui, %dev_eui, fcnt_up = device.fcnt_up, "Handled uplink");

        let Some(template) = message.response_template.as_mut() else {
            return Ok(message);
        };
        template.app_eui = message.app_eui;
        template.dev_eui = message.dev_eui;
        template.app_id.clone_from(&message.app_id);
        template.dev_id.clone_from(&message.dev_id);

        if let Some(lorawan) = template.lorawan_tx_config_mut() {
            lorawan.fcnt = device.fcnt_down;
        }

        let downlink = PhyPayload::new(
            MHDR::new(MType::UnconfirmedDataDown),
            MacPayload::Data(DataPayload::new(FHDR {
                dev_addr: mac_payload.fhdr.dev_addr,
                f_ctrl: FCtrl {
                    ack: phy.mhdr.mtype == MType::ConfirmedDataUp,
                    ..FCtrl::default()
                },
                f_cnt: device.fcnt_down,
                f_opts: Default::default(),
            })),
        );
        template.payload = downlink.to_bytes()?;

        Ok(message)
    }

    /// Assign the next downlink counter to a downlink and sign it
    ///
    /// The counter is consumed as soon as the downlink is signed, also for
    /// confirmed downlinks that may never be acknowledged.
    pub fn handle_downlink(&self, mut message: DownlinkMessage) -> Result<DownlinkMessage> {
        let (app_eui, dev_eui) = identity("Downlink", message.app_eui, message.dev_eui)?;
        let mut device = self.devices.get(app_eui, dev_eui)?;

        if device.app_id != message.app_id || device.dev_id != message.dev_id {
            warn!(
                %app_eui,
                %dev_eui,
                app_id = %message.app_id,
                dev_id = %message.dev_id,
                "Downlink identity mismatch"
            );
            return Err(Error::invalid_argument(
                "Downlink",
                "AppID and DevID do not match AppEUI and DevEUI",
            ));
        }

        let mut phy = decode("Downlink", &message.payload)?;
        let mac_payload = match &mut phy.mac_payload {
            MacPayload::Data(payload) => payload,
            MacPayload::JoinRequest(_) | MacPayload::JoinAccept(_) => {
                return Err(Error::invalid_argument(
                    "Downlink",
                    "does not contain a MAC payload",
                ))
            }
        };

        mac_payload.fhdr.dev_addr = device.dev_addr;

        // FIRST set and THEN increment FCntDown
        let fcnt_down = device.fcnt_down;
        mac_payload.fhdr.f_cnt = fcnt_down;
        device.fcnt_down = fcnt_down.wrapping_add(1);
        self.devices.set(&device, &[DeviceField::FCntDown])?;

        phy.set_mic(&device.nwk_skey)?;
        message.payload = phy.to_bytes()?;

        debug!(%app_eui, %dev_eui, fcnt_down, "Signed downlink");
        Ok(message)
    }
}

fn identity(
    field: &'static str,
    app_eui: Option<EUI64>,
    dev_eui: Option<EUI64>,
) -> Result<(EUI64, EUI64)> {
    match (app_eui, dev_eui) {
        (Some(app_eui), Some(dev_eui)) => Ok((app_eui, dev_eui)),
        _ => Err(Error::invalid_argument(field, "missing AppEUI or DevEUI")),
    }
}

fn decode(field: &'static str, payload: &[u8]) -> Result<PhyPayload> {
    PhyPayload::from_bytes(payload).map_err(|e| {
        warn!(error = %e, "Could not decode {}", field.to_lowercase());
        Error::invalid_argument(field, format!("could not decode payload: {e}"))
    })
}

fn narrow(field: &'static str, value: u32) -> Result<u8, FrameError> {
    u8::try_from(value).map_err(|_| FrameError::FieldOutOfRange { field, value })
}
