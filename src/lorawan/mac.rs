use heapless::Vec as FOpts;

use super::phy::FrameError;
use crate::types::DevAddr;

/// Frame header length without FOpts
pub const FHDR_MIN_SIZE: usize = 7;

/// Maximum FOpts length
pub const MAX_FOPTS_SIZE: usize = 15;

/// MAC header types
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MType {
    JoinRequest = 0x00,
    JoinAccept = 0x20,
    UnconfirmedDataUp = 0x40,
    UnconfirmedDataDown = 0x60,
    ConfirmedDataUp = 0x80,
    ConfirmedDataDown = 0xA0,
    RejoinRequest = 0xC0,
    Proprietary = 0xE0,
}

impl MType {
    /// Extract the message type from an MHDR byte
    pub fn from_mhdr(byte: u8) -> Self {
        match byte & 0xE0 {
            0x00 => MType::JoinRequest,
            0x20 => MType::JoinAccept,
            0x40 => MType::UnconfirmedDataUp,
            0x60 => MType::UnconfirmedDataDown,
            0x80 => MType::ConfirmedDataUp,
            0xA0 => MType::ConfirmedDataDown,
            0xC0 => MType::RejoinRequest,
            _ => MType::Proprietary,
        }
    }

    /// Whether frames of this type travel device to network
    pub fn is_uplink(self) -> bool {
        matches!(
            self,
            MType::JoinRequest
                | MType::UnconfirmedDataUp
                | MType::ConfirmedDataUp
                | MType::RejoinRequest
        )
    }
}

/// LoRaWAN major version
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Major {
    LoRaWANR1 = 0x00,
}

/// MAC header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MHDR {
    /// Message type
    pub mtype: MType,
    /// Major version
    pub major: Major,
}

impl MHDR {
    /// LoRaWAN R1 header of the given type
    pub fn new(mtype: MType) -> Self {
        Self {
            mtype,
            major: Major::LoRaWANR1,
        }
    }

    pub(crate) fn to_byte(self) -> u8 {
        self.mtype as u8 | self.major as u8
    }

    pub(crate) fn from_byte(byte: u8) -> Result<Self, FrameError> {
        let major = match byte & 0x03 {
            0x00 => Major::LoRaWANR1,
            other => return Err(FrameError::UnsupportedMajor(other)),
        };
        Ok(Self {
            mtype: MType::from_mhdr(byte),
            major,
        })
    }
}

/// Frame header flags
///
/// FOptsLen is not stored here; it always follows the FOpts carried by the
/// frame header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FCtrl {
    /// Adaptive data rate enabled
    pub adr: bool,
    /// ADR acknowledgement requested (uplink only)
    pub adr_ack_req: bool,
    /// Acknowledges the last confirmed frame
    pub ack: bool,
    /// More downlink data pending (downlink only)
    pub f_pending: bool,
}

impl FCtrl {
    fn to_byte(self, f_opts_len: u8) -> u8 {
        let mut byte = f_opts_len & 0x0F;
        if self.adr {
            byte |= 0x80;
        }
        if self.adr_ack_req {
            byte |= 0x40;
        }
        if self.ack {
            byte |= 0x20;
        }
        if self.f_pending {
            byte |= 0x10;
        }
        byte
    }

    fn from_byte(byte: u8) -> (Self, usize) {
        let f_ctrl = Self {
            adr: (byte & 0x80) != 0,
            adr_ack_req: (byte & 0x40) != 0,
            ack: (byte & 0x20) != 0,
            f_pending: (byte & 0x10) != 0,
        };
        (f_ctrl, usize::from(byte & 0x0F))
    }
}

/// Frame header
///
/// `f_cnt` holds the full 32-bit counter. Only the low 16 bits are written
/// to the wire, the full value is what the MIC is computed over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FHDR {
    /// Device address
    pub dev_addr: DevAddr,
    /// Frame control flags
    pub f_ctrl: FCtrl,
    /// Frame counter
    pub f_cnt: u32,
    /// Piggybacked MAC commands
    pub f_opts: FOpts<u8, MAX_FOPTS_SIZE>,
}

impl FHDR {
    pub(crate) fn serialize(&self, buffer: &mut Vec<u8>) {
        let mut dev_addr = *self.dev_addr.as_bytes();
        dev_addr.reverse();
        buffer.extend_from_slice(&dev_addr);
        buffer.push(self.f_ctrl.to_byte(self.f_opts.len() as u8));
        buffer.extend_from_slice(&(self.f_cnt as u16).to_le_bytes());
        buffer.extend_from_slice(&self.f_opts);
    }

    /// Parse a frame header, returning it with the number of bytes consumed
    pub(crate) fn parse(data: &[u8]) -> Result<(Self, usize), FrameError> {
        if data.len() < FHDR_MIN_SIZE {
            return Err(FrameError::TooShort {
                needed: FHDR_MIN_SIZE,
                actual: data.len(),
            });
        }
        let dev_addr = DevAddr::new([data[3], data[2], data[1], data[0]]);
        let (f_ctrl, f_opts_len) = FCtrl::from_byte(data[4]);
        let f_cnt = u16::from_le_bytes([data[5], data[6]]);

        let end = FHDR_MIN_SIZE + f_opts_len;
        if data.len() < end {
            return Err(FrameError::TooShort {
                needed: end,
                actual: data.len(),
            });
        }
        let f_opts = FOpts::from_slice(&data[FHDR_MIN_SIZE..end])
            .map_err(|_| FrameError::InvalidFOptsLength(f_opts_len))?;

        Ok((
            Self {
                dev_addr,
                f_ctrl,
                f_cnt: u32::from(f_cnt),
                f_opts,
            },
            end,
        ))
    }
}

/// Data frame payload
///
/// `frm_payload` is passed through untouched; it is encrypted by the
/// application layer before it reaches the network server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataPayload {
    /// Frame header
    pub fhdr: FHDR,
    /// Port, absent on empty frames
    pub f_port: Option<u8>,
    /// Application payload, still encrypted
    pub frm_payload: Vec<u8>,
}

impl DataPayload {
    /// Payload with the given header and no FPort
    pub fn new(fhdr: FHDR) -> Self {
        Self {
            fhdr,
            f_port: None,
            frm_payload: Vec::new(),
        }
    }

    pub(crate) fn serialize(&self, buffer: &mut Vec<u8>) -> Result<(), FrameError> {
        self.fhdr.serialize(buffer);
        match self.f_port {
            Some(f_port) => {
                buffer.push(f_port);
                buffer.extend_from_slice(&self.frm_payload);
            }
            None if !self.frm_payload.is_empty() => return Err(FrameError::MissingFPort),
            None => {}
        }
        Ok(())
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, FrameError> {
        let (fhdr, consumed) = FHDR::parse(data)?;
        let rest = &data[consumed..];
        let (f_port, frm_payload) = match rest.split_first() {
            Some((f_port, frm_payload)) => (Some(*f_port), frm_payload.to_vec()),
            None => (None, Vec::new()),
        };
        Ok(Self {
            fhdr,
            f_port,
            frm_payload,
        })
    }
}
