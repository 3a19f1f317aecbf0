//! LoRaWAN frame codec
//!
//! This module contains the PHY payload encoding used by the network server:
//! - MAC header and frame header
//! - Join request and join accept payloads
//! - PHY payload framing and MIC signing

/// Join payloads
pub mod join;

/// MAC header, frame header and data payloads
pub mod mac;

/// PHY payload framing
pub mod phy;

pub use join::{CFList, DLSettings, JoinAcceptPayload, JoinRequestPayload};
pub use mac::{DataPayload, FCtrl, MType, Major, FHDR, MHDR};
pub use phy::{FrameError, MacPayload, PhyPayload, MAX_PHY_PAYLOAD_SIZE};
