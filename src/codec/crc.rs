//! MAVLink frame checksum
//!
//! MAVLink uses CRC-16/MCRF4XX (the X.25 variant with init 0xFFFF and no final
//! XOR) over every header byte after the start marker, then the payload, then
//! the message's CRC_EXTRA seed byte.

use crc::{Crc, CRC_16_MCRF4XX};

/// CRC-16/MCRF4XX algorithm used by MAVLink v1 and v2
const MAVLINK_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// Compute the frame checksum for `data` (header without STX, plus payload)
/// seeded with `crc_extra`.
///
/// # Example
///
/// ```
/// use gcs_link::codec::crc::frame_checksum;
///
/// let a = frame_checksum(&[0x09, 0x00, 0x01, 0x01, 0x00], 50);
/// let b = frame_checksum(&[0x09, 0x00, 0x01, 0x01, 0x00], 51);
/// assert_ne!(a, b);
/// ```
pub fn frame_checksum(data: &[u8], crc_extra: u8) -> u16 {
    let mut digest = MAVLINK_CRC.digest();
    digest.update(data);
    digest.update(&[crc_extra]);
    digest.finalize()
}
