//! MAVLink v1/v2 framing
//!
//! # Wire layout
//!
//! ```text
//! v1: STX(0xFE) LEN SEQ SYS COMP MSGID              PAYLOAD CRC_LO CRC_HI
//! v2: STX(0xFD) LEN INCOMPAT COMPAT SEQ SYS COMP MSGID[3] PAYLOAD CRC_LO CRC_HI [SIGNATURE(13)]
//! ```
//!
//! The checksum covers every byte after STX up to the end of the payload,
//! followed by the message's CRC_EXTRA seed from the dialect catalog.
//!
//! - [`decoder::FrameDecoder`]: incremental stream decoder with resync
//! - [`encoder::FrameEncoder`]: outbound frames with a per-link sequence counter

pub mod crc;
pub mod decoder;
pub mod encoder;

use thiserror::Error;

use crate::messages::{MavMessage, MessageError};

pub use decoder::{DecoderStats, FrameDecoder, Frames};
pub use encoder::FrameEncoder;

/// v1 start-of-frame marker
pub const STX_V1: u8 = 0xFE;
/// v2 start-of-frame marker
pub const STX_V2: u8 = 0xFD;

/// v1 header length including STX
pub const HEADER_LEN_V1: usize = 6;
/// v2 header length including STX
pub const HEADER_LEN_V2: usize = 10;
/// Checksum trailer length
pub const CHECKSUM_LEN: usize = 2;
/// v2 signature trailer length
pub const SIGNATURE_LEN: usize = 13;

/// v2 incompat flag: frame carries a signature
pub const INCOMPAT_FLAG_SIGNED: u8 = 0x01;

/// MAVLink protocol version of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ProtocolVersion {
    V1,
    #[default]
    V2,
}

impl ProtocolVersion {
    pub fn stx(self) -> u8 {
        match self {
            Self::V1 => STX_V1,
            Self::V2 => STX_V2,
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            Self::V1 => HEADER_LEN_V1,
            Self::V2 => HEADER_LEN_V2,
        }
    }
}

/// One decoded or encoded MAVLink frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavFrame {
    pub version: ProtocolVersion,
    pub sequence: u8,
    /// Origin system ID
    pub system_id: u8,
    /// Origin component ID
    pub component_id: u8,
    /// 8-bit in v1, 24-bit in v2
    pub message_id: u32,
    /// Always 0 for v1
    pub incompat_flags: u8,
    /// Always 0 for v1
    pub compat_flags: u8,
    /// Payload exactly as carried on the wire (possibly truncated in v2)
    pub payload: Vec<u8>,
    /// Checksum as carried on the wire
    pub checksum: u16,
    /// Present when `incompat_flags` has the signed bit set
    pub signature: Option<[u8; SIGNATURE_LEN]>,
    /// Checksum verified against the dialect CRC_EXTRA. False for message IDs
    /// outside the dialect, which cannot be verified.
    pub crc_valid: bool,
}

impl MavFrame {
    /// Total length of the serialized frame
    pub fn wire_len(&self) -> usize {
        let sig = self.signature.map_or(0, |_| SIGNATURE_LEN);
        self.version.header_len() + self.payload.len() + CHECKSUM_LEN + sig
    }

    /// Serialize the frame exactly as it is, checksum included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        self.write_header(&mut out);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.checksum.to_le_bytes());
        if let Some(sig) = &self.signature {
            out.extend_from_slice(sig);
        }
        out
    }

    fn write_header(&self, out: &mut Vec<u8>) {
        out.push(self.version.stx());
        out.push(self.payload.len() as u8);
        match self.version {
            ProtocolVersion::V1 => {
                out.extend_from_slice(&[
                    self.sequence,
                    self.system_id,
                    self.component_id,
                    self.message_id as u8,
                ]);
            }
            ProtocolVersion::V2 => {
                let id = self.message_id.to_le_bytes();
                out.extend_from_slice(&[
                    self.incompat_flags,
                    self.compat_flags,
                    self.sequence,
                    self.system_id,
                    self.component_id,
                    id[0],
                    id[1],
                    id[2],
                ]);
            }
        }
    }

    /// Decode the payload into a typed message.
    pub fn message(&self) -> Result<MavMessage, MessageError> {
        MavMessage::parse(self.version, self.message_id, &self.payload)
    }
}

/// Reason a candidate frame was rejected during decoding
///
/// Never surfaced to callers of the decoder; the decoder recovers by
/// discarding one byte and counts the rejection in its statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("checksum mismatch for message {message_id}: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch {
        message_id: u32,
        expected: u16,
        actual: u16,
    },
    #[error("unsupported incompat flags {0:#04x}")]
    UnknownIncompatFlags(u8),
    #[error("length {len} impossible for message {message_id}")]
    ImplausibleLength { message_id: u32, len: usize },
}

/// Error building an outbound frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("message {message_id} cannot be sent over MAVLink v1")]
    UnsupportedVersion { message_id: u32 },
    #[error("message {0} has no payload to send")]
    UnknownMessage(u32),
}
