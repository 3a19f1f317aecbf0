//! LoRaWAN cryptographic operations
//!
//! Only the Message Integrity Code is computed by the network server.
//! Payload and join accept encryption belong to the application layer.

use aes::cipher::KeyInit;
use aes::Aes128;
use cmac::{Cmac, Mac};

use crate::types::{AESKey, DevAddr};

/// MIC size in bytes
pub const MIC_SIZE: usize = 4;

/// Block size for AES-128
const BLOCK_SIZE: usize = 16;

/// Direction identifiers for cryptographic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Uplink (device to network)
    Up = 0,
    /// Downlink (network to device)
    Down = 1,
}

/// Compute the Message Integrity Code of a data frame
///
/// # Arguments
/// * `key` - Network session key
/// * `data` - MHDR and MAC payload, at most 251 bytes (the codec rejects
///   larger frames before signing)
/// * `dev_addr` - Device address
/// * `fcnt` - Full 32-bit frame counter
/// * `dir` - Message direction
pub fn compute_mic(
    key: &AESKey,
    data: &[u8],
    dev_addr: DevAddr,
    fcnt: u32,
    dir: Direction,
) -> [u8; MIC_SIZE] {
    let mut b0 = [0u8; BLOCK_SIZE];
    b0[0] = 0x49; // MIC block identifier
    b0[5] = dir as u8;
    let mut addr = *dev_addr.as_bytes();
    addr.reverse();
    b0[6..10].copy_from_slice(&addr);
    b0[10..14].copy_from_slice(&fcnt.to_le_bytes());
    b0[15] = data.len() as u8;

    let mut mac = <Cmac<Aes128> as KeyInit>::new(key.as_bytes().into());
    mac.update(&b0);
    mac.update(data);
    let tag = mac.finalize().into_bytes();

    // Return first 4 bytes as MIC
    let mut mic = [0u8; MIC_SIZE];
    mic.copy_from_slice(&tag[..MIC_SIZE]);
    mic
}
