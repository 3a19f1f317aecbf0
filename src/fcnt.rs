//! Frame counter reconstruction
//!
//! Devices keep 32-bit frame counters but only the 16 least significant
//! bits travel in the frame header. The network server rebuilds the full
//! value from the last counter it accepted, assuming at most one 16-bit
//! rollover since then.

use crate::device::Device;

/// Rebuild a full frame counter from the previous full value and the 16 LSB
/// received on air
pub fn get_full(full: u32, lsb: u16) -> u32 {
    let candidate = (full & 0xFFFF_0000) | u32::from(lsb);
    if candidate < full {
        return candidate.wrapping_add(0x1_0000);
    }
    candidate
}

/// Whether `device` may have sent an uplink carrying `fcnt`
///
/// Several devices can share a DevAddr; this only rules out the ones whose
/// stored counter is ahead of the uplink. Telling the survivors apart is up
/// to the caller.
pub fn is_candidate(device: &Device, fcnt: u32) -> bool {
    if device.options.disable_fcnt_check {
        return true;
    }
    if device.fcnt_up <= fcnt {
        return true;
    }
    device.options.uses_32bit_fcnt && device.fcnt_up <= get_full(device.fcnt_up, fcnt as u16)
}
