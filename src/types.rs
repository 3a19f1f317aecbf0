//! Identifiers, keys and address prefixes
//!
//! All multi-byte identifiers are held MSB first, the way they are written
//! by humans. The frame codec reverses them on the wire.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// EUI-64 (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EUI64([u8; 8]);

/// AES-128 key (16 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AESKey([u8; 16]);

/// Device Address (4 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DevAddr([u8; 4]);

/// Network identifier (3 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NetID([u8; 3]);

impl EUI64 {
    /// Create an EUI from its bytes
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl AESKey {
    /// Create a key from its bytes
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

// Session keys never end up in logs.
impl fmt::Debug for AESKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AESKey(..)")
    }
}

impl DevAddr {
    /// Create an address from its bytes
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Address as a big-endian integer
    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Address from a big-endian integer
    pub fn from_u32(value: u32) -> Self {
        Self(value.to_be_bytes())
    }

    /// Network identifier bits (7 MSB)
    pub fn nwk_id(&self) -> u8 {
        self.0[0] >> 1
    }

    /// Replace the leading `prefix.length` bits with those of the prefix
    pub fn with_prefix(self, prefix: DevAddrPrefix) -> Self {
        let mask = prefix_mask(prefix.length);
        Self::from_u32((self.to_u32() & !mask) | (prefix.dev_addr.to_u32() & mask))
    }

    /// Whether the leading bits of this address equal the prefix
    pub fn has_prefix(&self, prefix: DevAddrPrefix) -> bool {
        let mask = prefix_mask(prefix.length);
        self.to_u32() & mask == prefix.dev_addr.to_u32() & mask
    }
}

impl NetID {
    /// Create a network identifier from its bytes
    pub const fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Network identifier from the low 24 bits of an integer
    pub fn from_u32(net_id: u32) -> Self {
        Self([(net_id >> 16) as u8, (net_id >> 8) as u8, net_id as u8])
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// Value that prefixes of this network carry in their first 7 bits
    pub fn nwk_id(&self) -> u8 {
        self.0[2]
    }
}

macro_rules! hex_display {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode_upper(self.0))
            }
        }
    )*};
}

hex_display!(EUI64, DevAddr, NetID);

impl FromStr for DevAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 4];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::invalid_argument("DevAddr", e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl FromStr for EUI64 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::invalid_argument("EUI64", e.to_string()))?;
        Ok(Self(bytes))
    }
}

fn prefix_mask(length: u8) -> u32 {
    match length {
        0 => 0,
        l if l >= 32 => u32::MAX,
        l => u32::MAX << (32 - u32::from(l)),
    }
}

/// DevAddr prefix, written as `26000000/7`
///
/// Bits below `length` are always zero, so two prefixes covering the same
/// address range compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DevAddrPrefix {
    /// Prefix bits, left aligned
    pub dev_addr: DevAddr,
    /// Number of significant leading bits
    pub length: u8,
}

impl DevAddrPrefix {
    /// Create a prefix, clearing the bits beyond `length`
    pub fn new(dev_addr: DevAddr, length: u8) -> Self {
        let length = length.min(32);
        Self {
            dev_addr: DevAddr::from_u32(dev_addr.to_u32() & prefix_mask(length)),
            length,
        }
    }
}

impl fmt::Display for DevAddrPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dev_addr, self.length)
    }
}

impl FromStr for DevAddrPrefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, length) = s
            .split_once('/')
            .ok_or_else(|| Error::invalid_argument("Prefix", format!("missing length in {s:?}")))?;
        let length: u8 = length
            .parse()
            .map_err(|_| Error::invalid_argument("Prefix", format!("invalid length in {s:?}")))?;
        if length > 32 {
            return Err(Error::invalid_argument("Prefix", "length exceeds 32 bits"));
        }
        Ok(Self::new(addr.parse()?, length))
    }
}

impl TryFrom<String> for DevAddrPrefix {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DevAddrPrefix> for String {
    fn from(prefix: DevAddrPrefix) -> Self {
        prefix.to_string()
    }
}
