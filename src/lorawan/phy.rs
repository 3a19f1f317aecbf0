use thiserror::Error;

use super::join::{JoinAcceptPayload, JoinRequestPayload};
use super::mac::{DataPayload, MType, MHDR};
use crate::crypto::{self, Direction, MIC_SIZE};
use crate::types::AESKey;

/// Frame codec error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Not enough bytes for the field being read
    #[error("frame too short: need {needed} bytes, got {actual}")]
    TooShort {
        /// Bytes required
        needed: usize,
        /// Bytes available
        actual: usize,
    },
    /// Fixed-size payload with the wrong length
    #[error("invalid payload length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Bytes the payload must have
        expected: usize,
        /// Bytes received
        actual: usize,
    },
    /// Frame above the largest PHY payload size
    #[error("frame too long: at most {max} bytes, got {actual}")]
    TooLong {
        /// Largest allowed frame
        max: usize,
        /// Frame size
        actual: usize,
    },
    /// FOpts longer than 15 bytes
    #[error("invalid FOpts length {0}")]
    InvalidFOptsLength(usize),
    /// CFList that is not 16 bytes
    #[error("invalid CFList length {0}")]
    InvalidCfList(usize),
    /// Value does not fit in its wire field
    #[error("{field} out of range: {value}")]
    FieldOutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: u32,
    },
    /// FRMPayload present without an FPort
    #[error("FRMPayload requires an FPort")]
    MissingFPort,
    /// Major version other than LoRaWAN R1
    #[error("unsupported major version {0}")]
    UnsupportedMajor(u8),
    /// Message type this codec does not handle
    #[error("unsupported message type {0:?}")]
    Unsupported(MType),
    /// Header message type disagrees with the payload variant
    #[error("message type {0:?} does not match payload")]
    PayloadMismatch(MType),
    /// Operation only valid on data frames
    #[error("not a data payload")]
    NotDataPayload,
}

/// Largest PHY payload, MHDR and MIC included
pub const MAX_PHY_PAYLOAD_SIZE: usize = 255;

/// MAC payload variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacPayload {
    /// Join request (device to network)
    JoinRequest(JoinRequestPayload),
    /// Join accept (network to device)
    JoinAccept(JoinAcceptPayload),
    /// Confirmed or unconfirmed data, either direction
    Data(DataPayload),
}

/// PHY payload: MHDR, MAC payload and MIC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhyPayload {
    /// MAC header
    pub mhdr: MHDR,
    /// MAC payload
    pub mac_payload: MacPayload,
    /// Message Integrity Code
    pub mic: [u8; MIC_SIZE],
}

impl PhyPayload {
    /// Create a frame with a zero MIC
    pub fn new(mhdr: MHDR, mac_payload: MacPayload) -> Self {
        Self {
            mhdr,
            mac_payload,
            mic: [0; MIC_SIZE],
        }
    }

    /// Data payload, if this is a data frame
    pub fn data_payload(&self) -> Option<&DataPayload> {
        match &self.mac_payload {
            MacPayload::Data(payload) => Some(payload),
            MacPayload::JoinRequest(_) | MacPayload::JoinAccept(_) => None,
        }
    }

    /// Serialize MHDR, MAC payload and MIC
    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        let mut buffer = self.mic_input()?;
        buffer.extend_from_slice(&self.mic);
        Ok(buffer)
    }

    /// Parse a frame; the payload variant follows the MHDR message type
    pub fn from_bytes(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() > MAX_PHY_PAYLOAD_SIZE {
            return Err(FrameError::TooLong {
                max: MAX_PHY_PAYLOAD_SIZE,
                actual: data.len(),
            });
        }
        if data.len() < 1 + MIC_SIZE {
            return Err(FrameError::TooShort {
                needed: 1 + MIC_SIZE,
                actual: data.len(),
            });
        }
        let mhdr = MHDR::from_byte(data[0])?;
        let body = &data[1..data.len() - MIC_SIZE];
        let mut mic = [0u8; MIC_SIZE];
        mic.copy_from_slice(&data[data.len() - MIC_SIZE..]);

        let mac_payload = match mhdr.mtype {
            MType::JoinRequest => MacPayload::JoinRequest(JoinRequestPayload::parse(body)?),
            MType::JoinAccept => MacPayload::JoinAccept(JoinAcceptPayload::parse(body)?),
            MType::UnconfirmedDataUp
            | MType::UnconfirmedDataDown
            | MType::ConfirmedDataUp
            | MType::ConfirmedDataDown => MacPayload::Data(DataPayload::parse(body)?),
            MType::RejoinRequest | MType::Proprietary => {
                return Err(FrameError::Unsupported(mhdr.mtype))
            }
        };

        Ok(Self {
            mhdr,
            mac_payload,
            mic,
        })
    }

    /// Compute and store the MIC of a data frame
    ///
    /// The MIC covers the full 32-bit counter held in the frame header, so
    /// the counter must be set before signing.
    pub fn set_mic(&mut self, key: &AESKey) -> Result<(), FrameError> {
        self.mic = self.calculate_mic(key)?;
        Ok(())
    }

    /// Check the MIC of a data frame
    pub fn validate_mic(&self, key: &AESKey) -> Result<bool, FrameError> {
        Ok(self.calculate_mic(key)? == self.mic)
    }

    fn calculate_mic(&self, key: &AESKey) -> Result<[u8; MIC_SIZE], FrameError> {
        let payload = self.data_payload().ok_or(FrameError::NotDataPayload)?;
        let dir = if self.mhdr.mtype.is_uplink() {
            Direction::Up
        } else {
            Direction::Down
        };
        let data = self.mic_input()?;
        Ok(crypto::compute_mic(
            key,
            &data,
            payload.fhdr.dev_addr,
            payload.fhdr.f_cnt,
            dir,
        ))
    }

    fn mic_input(&self) -> Result<Vec<u8>, FrameError> {
        let mut buffer = vec![self.mhdr.to_byte()];
        match (&self.mac_payload, self.mhdr.mtype) {
            (MacPayload::JoinRequest(payload), MType::JoinRequest) => {
                payload.serialize(&mut buffer)
            }
            (MacPayload::JoinAccept(payload), MType::JoinAccept) => {
                payload.serialize(&mut buffer)?
            }
            (
                MacPayload::Data(payload),
                MType::UnconfirmedDataUp
                | MType::UnconfirmedDataDown
                | MType::ConfirmedDataUp
                | MType::ConfirmedDataDown,
            ) => payload.serialize(&mut buffer)?,
            (_, mtype) => return Err(FrameError::PayloadMismatch(mtype)),
        }
        // The MIC block only has one byte for the message length
        if buffer.len() + MIC_SIZE > MAX_PHY_PAYLOAD_SIZE {
            return Err(FrameError::TooLong {
                max: MAX_PHY_PAYLOAD_SIZE,
                actual: buffer.len() + MIC_SIZE,
            });
        }
        Ok(buffer)
    }
}
