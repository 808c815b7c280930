//! Outbound frame encoder
//!
//! One encoder belongs to one link. It stamps every frame with the link's
//! system/component identity and the next value of its sequence counter.

use mavlink::common;
use mavlink::Message;

use super::crc::frame_checksum;
use super::{EncodeError, MavFrame, ProtocolVersion, CHECKSUM_LEN};
use crate::messages::{MavMessage, MAX_PAYLOAD_LEN};

/// Frame encoder with a wrapping sequence counter
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    system_id: u8,
    component_id: u8,
    version: ProtocolVersion,
    sequence: u8,
}

impl FrameEncoder {
    /// Create an encoder for the given sender identity
    ///
    /// # Arguments
    ///
    /// * `system_id` - Sender system ID stamped on every frame
    /// * `component_id` - Sender component ID stamped on every frame
    /// * `version` - Outbound protocol version
    pub fn new(system_id: u8, component_id: u8, version: ProtocolVersion) -> Self {
        Self {
            system_id,
            component_id,
            version,
            sequence: 0,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Sequence number the next frame will carry
    pub fn next_sequence(&self) -> u8 {
        self.sequence
    }

    /// Encode a typed message.
    ///
    /// v2 payloads have trailing zero bytes removed (keeping at least one);
    /// v1 payloads carry the full layout. The sequence counter only advances
    /// when a frame is produced.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::UnknownMessage`] for [`MavMessage::Unhandled`], which
    ///   has no payload to send
    /// - [`EncodeError::UnsupportedVersion`] for IDs above 255 on a v1 link
    pub fn encode(&mut self, msg: &MavMessage) -> Result<MavFrame, EncodeError> {
        let message_id = msg.message_id();
        let body = msg
            .to_common()
            .ok_or(EncodeError::UnknownMessage(message_id))?;
        if self.version == ProtocolVersion::V1 && message_id > u8::MAX as u32 {
            return Err(EncodeError::UnsupportedVersion { message_id });
        }

        let mut payload = [0u8; MAX_PAYLOAD_LEN];
        let len = body.ser(self.version.into(), &mut payload);

        let mut frame = MavFrame {
            version: self.version,
            sequence: self.sequence,
            system_id: self.system_id,
            component_id: self.component_id,
            message_id,
            incompat_flags: 0,
            compat_flags: 0,
            payload: payload[..len].to_vec(),
            checksum: 0,
            signature: None,
            crc_valid: true,
        };
        let bytes = frame.to_bytes();
        let body_end = bytes.len() - CHECKSUM_LEN;
        frame.checksum = frame_checksum(
            &bytes[1..body_end],
            common::MavMessage::extra_crc(message_id),
        );

        self.sequence = self.sequence.wrapping_add(1);
        Ok(frame)
    }
}
