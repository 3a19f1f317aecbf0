//! Join request and join accept payloads

use super::phy::FrameError;
use crate::types::{DevAddr, NetID, EUI64};

/// Join request payload length
pub const JOIN_REQUEST_SIZE: usize = 18;

/// Join accept payload length without CFList
pub const JOIN_ACCEPT_SIZE: usize = 12;

/// CFList length
pub const CF_LIST_SIZE: usize = 16;

/// Number of frequencies carried in a CFList
pub const CF_LIST_CHANNELS: usize = 5;

/// Join request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinRequestPayload {
    /// Application EUI
    pub app_eui: EUI64,
    /// Device EUI
    pub dev_eui: EUI64,
    /// Device nonce, MSB first
    pub dev_nonce: [u8; 2],
}

impl JoinRequestPayload {
    pub(crate) fn serialize(&self, buffer: &mut Vec<u8>) {
        buffer.extend(self.app_eui.as_bytes().iter().rev());
        buffer.extend(self.dev_eui.as_bytes().iter().rev());
        buffer.extend(self.dev_nonce.iter().rev());
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < JOIN_REQUEST_SIZE {
            return Err(FrameError::TooShort {
                needed: JOIN_REQUEST_SIZE,
                actual: data.len(),
            });
        }
        if data.len() > JOIN_REQUEST_SIZE {
            return Err(FrameError::InvalidLength {
                expected: JOIN_REQUEST_SIZE,
                actual: data.len(),
            });
        }
        Ok(Self {
            app_eui: EUI64::new(reversed(&data[0..8])),
            dev_eui: EUI64::new(reversed(&data[8..16])),
            dev_nonce: reversed(&data[16..18]),
        })
    }
}

/// Downlink settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DLSettings {
    /// RX2 data rate (4 bits)
    pub rx2_data_rate: u8,
    /// RX1 data rate offset (3 bits)
    pub rx1_dr_offset: u8,
}

impl DLSettings {
    fn to_byte(self) -> Result<u8, FrameError> {
        if self.rx2_data_rate > 0x0F {
            return Err(FrameError::FieldOutOfRange {
                field: "RX2DataRate",
                value: u32::from(self.rx2_data_rate),
            });
        }
        if self.rx1_dr_offset > 0x07 {
            return Err(FrameError::FieldOutOfRange {
                field: "RX1DROffset",
                value: u32::from(self.rx1_dr_offset),
            });
        }
        Ok(self.rx1_dr_offset << 4 | self.rx2_data_rate)
    }

    fn from_byte(byte: u8) -> Self {
        Self {
            rx2_data_rate: byte & 0x0F,
            rx1_dr_offset: (byte >> 4) & 0x07,
        }
    }
}

/// Extra channel frequencies, in Hz
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CFList(pub [u32; CF_LIST_CHANNELS]);

impl CFList {
    /// Build a CFList from exactly five frequencies
    pub fn from_slice(frequencies: &[u32]) -> Option<Self> {
        <[u32; CF_LIST_CHANNELS]>::try_from(frequencies).ok().map(CFList)
    }

    /// Frequencies in Hz
    pub fn frequencies(&self) -> &[u32; CF_LIST_CHANNELS] {
        &self.0
    }

    fn serialize(&self, buffer: &mut Vec<u8>) -> Result<(), FrameError> {
        for &frequency in &self.0 {
            let value = frequency / 100;
            if value > 0x00FF_FFFF {
                return Err(FrameError::FieldOutOfRange {
                    field: "CFList",
                    value: frequency,
                });
            }
            buffer.extend_from_slice(&value.to_le_bytes()[..3]);
        }
        // RFU
        buffer.push(0);
        Ok(())
    }

    fn parse(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() != CF_LIST_SIZE {
            return Err(FrameError::InvalidCfList(data.len()));
        }
        let mut frequencies = [0u32; CF_LIST_CHANNELS];
        for (frequency, chunk) in frequencies.iter_mut().zip(data.chunks_exact(3)) {
            *frequency = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], 0]) * 100;
        }
        Ok(Self(frequencies))
    }
}

/// Join accept payload, in the clear
///
/// Encrypting the join accept with the AppKey is the application layer's
/// job, so the network server only ever produces the plaintext layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAcceptPayload {
    /// Application nonce, MSB first
    pub app_nonce: [u8; 3],
    /// Network identifier
    pub net_id: NetID,
    /// Assigned device address
    pub dev_addr: DevAddr,
    /// Downlink settings
    pub dl_settings: DLSettings,
    /// RX1 delay in seconds (4 bits)
    pub rx_delay: u8,
    /// Optional extra channels
    pub cf_list: Option<CFList>,
}

impl JoinAcceptPayload {
    pub(crate) fn serialize(&self, buffer: &mut Vec<u8>) -> Result<(), FrameError> {
        if self.rx_delay > 0x0F {
            return Err(FrameError::FieldOutOfRange {
                field: "RXDelay",
                value: u32::from(self.rx_delay),
            });
        }
        buffer.extend(self.app_nonce.iter().rev());
        buffer.extend(self.net_id.as_bytes().iter().rev());
        buffer.extend(self.dev_addr.as_bytes().iter().rev());
        buffer.push(self.dl_settings.to_byte()?);
        buffer.push(self.rx_delay);
        if let Some(cf_list) = &self.cf_list {
            cf_list.serialize(buffer)?;
        }
        Ok(())
    }

    pub(crate) fn parse(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() < JOIN_ACCEPT_SIZE {
            return Err(FrameError::TooShort {
                needed: JOIN_ACCEPT_SIZE,
                actual: data.len(),
            });
        }
        let cf_list = match data.len() - JOIN_ACCEPT_SIZE {
            0 => None,
            _ => Some(CFList::parse(&data[JOIN_ACCEPT_SIZE..])?),
        };
        Ok(Self {
            app_nonce: reversed(&data[0..3]),
            net_id: NetID::new(reversed(&data[3..6])),
            dev_addr: DevAddr::new(reversed(&data[6..10])),
            dl_settings: DLSettings::from_byte(data[10]),
            rx_delay: data[11] & 0x0F,
            cf_list,
        })
    }
}

fn reversed<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    for (dst, src) in out.iter_mut().zip(data.iter().rev()) {
        *dst = *src;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_accept_layout() {
        let payload = JoinAcceptPayload {
            app_nonce: [0x00; 3],
            net_id: NetID::from_u32(0x000013),
            dev_addr: DevAddr::new([0x26, 0x01, 0x02, 0x03]),
            dl_settings: DLSettings {
                rx2_data_rate: 3,
                rx1_dr_offset: 2,
            },
            rx_delay: 1,
            cf_list: None,
        };
        let mut buffer = Vec::new();
        payload.serialize(&mut buffer).unwrap();
        assert_eq!(
            buffer,
            [0x00, 0x00, 0x00, 0x13, 0x00, 0x00, 0x03, 0x02, 0x01, 0x26, 0x23, 0x01]
        );
        assert_eq!(JoinAcceptPayload::parse(&buffer).unwrap(), payload);
    }

    #[test]
    fn test_cf_list() {
        let frequencies = [867_100_000, 867_300_000, 867_500_000, 867_700_000, 867_900_000];
        let cf_list = CFList::from_slice(&frequencies).unwrap();
        let mut buffer = Vec::new();
        cf_list.serialize(&mut buffer).unwrap();
        assert_eq!(buffer.len(), CF_LIST_SIZE);
        // 8671000 = 0x844F18
        assert_eq!(&buffer[..3], &[0x18, 0x4F, 0x84]);
        assert_eq!(CFList::parse(&buffer).unwrap().frequencies(), &frequencies);

        assert!(CFList::from_slice(&frequencies[..4]).is_none());
        assert_eq!(CFList::parse(&buffer[..15]), Err(FrameError::InvalidCfList(15)));
    }

    #[test]
    fn test_dl_settings_range() {
        let settings = DLSettings {
            rx2_data_rate: 16,
            rx1_dr_offset: 0,
        };
        assert!(matches!(
            settings.to_byte(),
            Err(FrameError::FieldOutOfRange { field: "RX2DataRate", .. })
        ));
    }

    #[test]
    fn test_join_request_round_trip() {
        let payload = JoinRequestPayload {
            app_eui: EUI64::new([0x70, 0xB3, 0xD5, 0x7E, 0xF0, 0x00, 0x00, 0x01]),
            dev_eui: EUI64::new([0x00, 0x04, 0xA3, 0x0B, 0x00, 0x1A, 0x2B, 0x3C]),
            dev_nonce: [0x12, 0x34],
        };
        let mut buffer = Vec::new();
        payload.serialize(&mut buffer);
        assert_eq!(buffer.len(), JOIN_REQUEST_SIZE);
        assert_eq!(buffer[0], 0x01);
        assert_eq!(JoinRequestPayload::parse(&buffer).unwrap(), payload);

        assert_eq!(
            JoinRequestPayload::parse(&buffer[..17]),
            Err(FrameError::TooShort {
                needed: JOIN_REQUEST_SIZE,
                actual: 17
            })
        );
        buffer.push(0x00);
        assert_eq!(
            JoinRequestPayload::parse(&buffer),
            Err(FrameError::InvalidLength {
                expected: JOIN_REQUEST_SIZE,
                actual: 19
            })
        );
    }
}
