//! Incremental MAVLink frame decoder
//!
//! Turns an arbitrary chunking of a byte stream (UDP datagrams, TCP reads)
//! into frames. Incomplete trailing bytes stay buffered across calls to
//! [`FrameDecoder::feed`].
//!
//! # Resync
//!
//! A candidate frame is rejected when its checksum does not verify or when
//! its header is impossible for a catalog message (bad length, unknown
//! incompat flags). On rejection exactly one byte is discarded and scanning
//! resumes, so corruption costs at most the corrupted frame.
//!
//! Frames with message IDs outside the catalog cannot be verified. They are
//! emitted with `crc_valid = false` unless a verifiable frame starts inside
//! their span, in which case the bytes before that frame are garbage. An
//! unverified candidate is held back while any STX inside its span is still
//! undecided, so the frames produced never depend on how the stream was
//! chunked.

use bytes::{Buf, BytesMut};
use log::{debug, trace};

use super::crc::frame_checksum;
use super::{
    DecodeError, MavFrame, ProtocolVersion, CHECKSUM_LEN, HEADER_LEN_V1, HEADER_LEN_V2,
    INCOMPAT_FLAG_SIGNED, SIGNATURE_LEN, STX_V1, STX_V2,
};
use crate::messages::catalog;

/// Initial decode buffer capacity (bytes)
pub const DEFAULT_BUFFER_CAPACITY: usize = 2048;

/// Decoder statistics for monitoring and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames emitted with a verified checksum
    pub frames_decoded: u64,
    /// Frames emitted without checksum verification (unknown message ID).
    /// Line noise that happens to look like a header lands here too.
    pub unverified_frames: u64,
    /// Candidates rejected on checksum mismatch
    pub crc_failures: u64,
    /// Candidates rejected on an impossible header
    pub header_errors: u64,
    /// Bytes dropped while resynchronizing
    pub bytes_discarded: u64,
}

/// Outcome of examining the bytes at the head of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    /// Too few bytes buffered to decide
    NeedMore { header_complete: bool, known: bool },
    /// Not a frame
    Invalid(DecodeError),
    /// Complete frame of `len` bytes
    Valid { len: usize, verified: bool },
}

/// Result of looking for a verifiable frame inside a candidate's span
#[derive(Debug, PartialEq, Eq)]
enum Inner {
    Found(usize),
    Pending,
    None,
}

/// Stream decoder with an internal reassembly buffer
pub struct FrameDecoder {
    buf: BytesMut,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with the default buffer capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            stats: DecoderStats::default(),
        }
    }

    /// Get decoder statistics
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Reset decoder statistics
    pub fn reset_stats(&mut self) {
        self.stats = DecoderStats::default();
    }

    /// Bytes currently held waiting for the rest of a frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Drop buffered bytes and statistics
    pub fn clear(&mut self) {
        self.buf.clear();
        self.stats = DecoderStats::default();
    }

    /// Append `bytes` to the buffer and return an iterator over every frame
    /// that can now be decoded.
    ///
    /// Frames are produced lazily; bytes left over when the iterator is
    /// exhausted (or dropped early) stay buffered for the next call.
    ///
    /// # Example
    ///
    /// ```
    /// use gcs_link::codec::{FrameDecoder, FrameEncoder, ProtocolVersion};
    /// use gcs_link::messages::{MavMessage, HEARTBEAT_DATA};
    ///
    /// let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
    /// let bytes = encoder
    ///     .encode(&MavMessage::Heartbeat(HEARTBEAT_DATA::default()))
    ///     .unwrap()
    ///     .to_bytes();
    ///
    /// let mut decoder = FrameDecoder::new();
    /// assert_eq!(decoder.feed(&bytes[..4]).count(), 0);
    /// let frames: Vec<_> = decoder.feed(&bytes[4..]).collect();
    /// assert_eq!(frames.len(), 1);
    /// assert!(frames[0].crc_valid);
    /// ```
    pub fn feed(&mut self, bytes: &[u8]) -> Frames<'_> {
        self.buf.extend_from_slice(bytes);
        Frames { decoder: self }
    }

    /// Decode the next complete frame from already buffered bytes.
    pub fn next_frame(&mut self) -> Option<MavFrame> {
        loop {
            let start = self.buf.iter().position(|&b| b == STX_V1 || b == STX_V2);
            match start {
                Some(0) => {}
                Some(idx) => self.discard(idx),
                None => {
                    let len = self.buf.len();
                    self.discard(len);
                    return None;
                }
            }

            match examine(&self.buf) {
                Candidate::NeedMore {
                    header_complete: true,
                    known: false,
                } => {
                    // A verified frame inside the buffered span means the
                    // unknown candidate at the head is garbage.
                    match find_inner(&self.buf, self.buf.len()) {
                        Inner::Found(offset) => self.discard(offset),
                        Inner::Pending | Inner::None => return None,
                    }
                }
                // Known heads are judged by their own checksum
                Candidate::NeedMore { .. } => return None,
                Candidate::Invalid(err) => {
                    trace!("Rejected candidate frame: {}", err);
                    match err {
                        DecodeError::CrcMismatch { .. } => self.stats.crc_failures += 1,
                        _ => self.stats.header_errors += 1,
                    }
                    self.discard(1);
                }
                Candidate::Valid {
                    len,
                    verified: true,
                } => return Some(self.take_frame(len, true)),
                Candidate::Valid {
                    len,
                    verified: false,
                } => match find_inner(&self.buf, len) {
                    Inner::Found(offset) => self.discard(offset),
                    Inner::Pending => return None,
                    Inner::None => return Some(self.take_frame(len, false)),
                },
            }
        }
    }

    fn discard(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.buf.advance(n);
        self.stats.bytes_discarded += n as u64;
    }

    fn take_frame(&mut self, len: usize, verified: bool) -> MavFrame {
        let raw = self.buf.split_to(len);
        let frame = parse_frame(&raw, verified);

        if verified {
            self.stats.frames_decoded += 1;
        } else {
            self.stats.unverified_frames += 1;
            debug!(
                "Unverified frame: msg {} from {}:{}",
                frame.message_id, frame.system_id, frame.component_id
            );
        }
        frame
    }
}

/// Lazy iterator over frames decodable from a [`FrameDecoder`]'s buffer
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = MavFrame;

    fn next(&mut self) -> Option<MavFrame> {
        self.decoder.next_frame()
    }
}

/// Examine the candidate frame starting at `buf[0]` (which must be STX).
fn examine(buf: &[u8]) -> Candidate {
    let version = match buf.first() {
        Some(&STX_V1) => ProtocolVersion::V1,
        Some(&STX_V2) => ProtocolVersion::V2,
        _ => {
            return Candidate::NeedMore {
                header_complete: false,
                known: false,
            }
        }
    };

    let header_len = version.header_len();
    if buf.len() < header_len {
        return Candidate::NeedMore {
            header_complete: false,
            known: false,
        };
    }

    let payload_len = buf[1] as usize;
    let (message_id, signed) = match version {
        ProtocolVersion::V1 => (buf[5] as u32, false),
        ProtocolVersion::V2 => {
            let incompat = buf[2];
            if incompat & !INCOMPAT_FLAG_SIGNED != 0 {
                return Candidate::Invalid(DecodeError::UnknownIncompatFlags(incompat));
            }
            let id = u32::from_le_bytes([buf[7], buf[8], buf[9], 0]);
            (id, incompat & INCOMPAT_FLAG_SIGNED != 0)
        }
    };

    let info = catalog::lookup(message_id);
    if let Some(info) = &info {
        if !catalog::length_plausible(info, payload_len) {
            return Candidate::Invalid(DecodeError::ImplausibleLength {
                message_id,
                len: payload_len,
            });
        }
    }

    let body_end = header_len + payload_len;
    let total = body_end + CHECKSUM_LEN + if signed { SIGNATURE_LEN } else { 0 };
    if buf.len() < total {
        return Candidate::NeedMore {
            header_complete: true,
            known: info.is_some(),
        };
    }

    let Some(info) = info else {
        return Candidate::Valid {
            len: total,
            verified: false,
        };
    };

    let expected = frame_checksum(&buf[1..body_end], info.crc_extra);
    let actual = u16::from_le_bytes([buf[body_end], buf[body_end + 1]]);
    if expected != actual {
        return Candidate::Invalid(DecodeError::CrcMismatch {
            message_id,
            expected,
            actual,
        });
    }

    Candidate::Valid {
        len: total,
        verified: true,
    }
}

/// Look for a verifiable frame starting in `buf[1..end]`.
///
/// Returns `Pending` at the first STX that more bytes could still turn into a
/// verified frame: a header not yet complete, or a known message whose body
/// is still arriving. Every other candidate is settled for good.
fn find_inner(buf: &[u8], end: usize) -> Inner {
    let end = end.min(buf.len());
    for offset in 1..end {
        if buf[offset] != STX_V1 && buf[offset] != STX_V2 {
            continue;
        }
        match examine(&buf[offset..]) {
            Candidate::Valid { verified: true, .. } => return Inner::Found(offset),
            Candidate::NeedMore {
                header_complete: false,
                ..
            }
            | Candidate::NeedMore { known: true, .. } => return Inner::Pending,
            _ => {}
        }
    }
    Inner::None
}

/// Build a frame from a complete, length-checked slice.
fn parse_frame(raw: &[u8], crc_valid: bool) -> MavFrame {
    let payload_len = raw[1] as usize;
    let (version, incompat_flags, compat_flags, sequence, system_id, component_id, message_id) =
        if raw[0] == STX_V1 {
            (ProtocolVersion::V1, 0, 0, raw[2], raw[3], raw[4], raw[5] as u32)
        } else {
            (
                ProtocolVersion::V2,
                raw[2],
                raw[3],
                raw[4],
                raw[5],
                raw[6],
                u32::from_le_bytes([raw[7], raw[8], raw[9], 0]),
            )
        };

    let header_len = if version == ProtocolVersion::V1 {
        HEADER_LEN_V1
    } else {
        HEADER_LEN_V2
    };
    let body_end = header_len + payload_len;
    let checksum = u16::from_le_bytes([raw[body_end], raw[body_end + 1]]);

    let signature = (incompat_flags & INCOMPAT_FLAG_SIGNED != 0).then(|| {
        let mut sig = [0u8; SIGNATURE_LEN];
        let start = body_end + CHECKSUM_LEN;
        sig.copy_from_slice(&raw[start..start + SIGNATURE_LEN]);
        sig
    });

    MavFrame {
        version,
        sequence,
        system_id,
        component_id,
        message_id,
        incompat_flags,
        compat_flags,
        payload: raw[header_len..body_end].to_vec(),
        checksum,
        signature,
        crc_valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FrameEncoder;
    use crate::messages::{
        MavAutopilot, MavMessage, MavModeFlag, MavState, MavType, ATTITUDE_DATA,
        GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA, SYS_STATUS_DATA,
    };

    fn heartbeat_frame(encoder: &mut FrameEncoder) -> MavFrame {
        encoder
            .encode(&MavMessage::Heartbeat(HEARTBEAT_DATA {
                custom_mode: 5,
                mavtype: MavType::MAV_TYPE_QUADROTOR,
                autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
                base_mode: MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED
                    | MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED,
                system_status: MavState::MAV_STATE_ACTIVE,
                mavlink_version: 3,
            }))
            .unwrap()
    }

    fn attitude_frame(encoder: &mut FrameEncoder) -> MavFrame {
        encoder
            .encode(&MavMessage::Attitude(ATTITUDE_DATA {
                time_boot_ms: 1234,
                roll: 0.1,
                pitch: -0.2,
                yaw: 1.5,
                ..Default::default()
            }))
            .unwrap()
    }

    /// Hand-built frame for a message ID outside the catalog
    fn unknown_frame(message_id: u32, payload: &[u8]) -> Vec<u8> {
        let id = message_id.to_le_bytes();
        let mut out = vec![STX_V2, payload.len() as u8, 0, 0, 9, 1, 1, id[0], id[1], id[2]];
        out.extend_from_slice(payload);
        out.extend_from_slice(&[0xDE, 0xAD]);
        out
    }

    /// xorshift64* so noise is reproducible without an RNG crate
    struct Noise(u64);

    impl Noise {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x >> 12;
            x ^= x << 25;
            x ^= x >> 27;
            self.0 = x;
            x.wrapping_mul(0x2545_F491_4F6C_DD1D)
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }

        /// Random byte, STX one time in four
        fn byte(&mut self) -> u8 {
            match self.below(8) {
                0 => STX_V1,
                1 => STX_V2,
                _ => self.next() as u8,
            }
        }
    }

    #[test]
    fn test_single_frame_round_trip() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let frame = heartbeat_frame(&mut encoder);

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&frame.to_bytes()).collect();

        assert_eq!(decoded, vec![frame]);
        assert_eq!(decoder.stats().frames_decoded, 1);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_v1_round_trip() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V1);
        let frame = attitude_frame(&mut encoder);
        assert_eq!(frame.version, ProtocolVersion::V1);

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&frame.to_bytes()).collect();
        assert_eq!(decoded, vec![frame]);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let mut stream = heartbeat_frame(&mut encoder).to_bytes();
        stream.extend(attitude_frame(&mut encoder).to_bytes());

        let mut decoder = FrameDecoder::new();
        let mut decoded = Vec::new();
        for b in &stream {
            decoded.extend(decoder.feed(std::slice::from_ref(b)));
        }

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].message_id, 0);
        assert_eq!(decoded[1].message_id, 30);
        assert_eq!(decoder.stats().bytes_discarded, 0);
    }

    #[test]
    fn test_merged_frames_in_one_chunk() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let mut stream = Vec::new();
        for _ in 0..5 {
            stream.extend(heartbeat_frame(&mut encoder).to_bytes());
        }

        let mut decoder = FrameDecoder::new();
        let sequences: Vec<u8> = decoder.feed(&stream).map(|f| f.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_garbage_between_frames() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let frames = [
            heartbeat_frame(&mut encoder),
            attitude_frame(&mut encoder),
            heartbeat_frame(&mut encoder),
        ];

        let garbage: [&[u8]; 4] = [
            &[0x00, 0x11, 0x22],
            &[0xFD, 0xFD, 0x03],
            &[0xFE, 0x09, 0x00, 0x01],
            &[0x55],
        ];

        let mut stream = Vec::new();
        stream.extend_from_slice(garbage[0]);
        for (frame, junk) in frames.iter().zip(&garbage[1..]) {
            stream.extend(frame.to_bytes());
            stream.extend_from_slice(junk);
        }

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&stream).collect();
        assert_eq!(decoded, frames.to_vec());
    }

    #[test]
    fn test_corrupted_frame_does_not_lose_next() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let mut bad = heartbeat_frame(&mut encoder).to_bytes();
        let good = attitude_frame(&mut encoder);
        bad[12] ^= 0xFF;

        let mut stream = bad.clone();
        stream.extend(good.to_bytes());

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&stream).collect();

        assert_eq!(decoded, vec![good]);
        assert_eq!(decoder.stats().crc_failures, 1);
        assert_eq!(decoder.stats().bytes_discarded, bad.len() as u64);
    }

    #[test]
    fn test_truncated_frame_followed_by_valid_frame() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let cut = attitude_frame(&mut encoder).to_bytes();
        let good = heartbeat_frame(&mut encoder);

        let mut stream = cut[..cut.len() - 5].to_vec();
        stream.extend(good.to_bytes());

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&stream).collect();
        assert_eq!(decoded, vec![good]);
    }

    #[test]
    fn test_unknown_message_emitted_unverified() {
        let raw = unknown_frame(12_000, &[1, 2, 3, 4]);

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&raw).collect();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].message_id, 12_000);
        assert_eq!(decoded[0].payload, vec![1, 2, 3, 4]);
        assert!(!decoded[0].crc_valid);
        assert_eq!(decoded[0].to_bytes(), raw);
        assert_eq!(decoder.stats().unverified_frames, 1);
        assert_eq!(decoder.stats().frames_decoded, 0);
    }

    #[test]
    fn test_garbage_looking_like_unknown_header() {
        // Garbage that parses as a v2 header for an unknown message whose
        // declared span swallows a real frame.
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let good = heartbeat_frame(&mut encoder);
        let good_bytes = good.to_bytes();

        let mut stream = vec![STX_V2, 40, 0, 0, 0, 0, 0, 0x77, 0x77, 0x00];
        stream.extend(&good_bytes);
        stream.extend(std::iter::repeat(0u8).take(40));

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&stream).collect();
        assert_eq!(decoded, vec![good]);
        assert_eq!(decoder.stats().unverified_frames, 0);
    }

    #[test]
    fn test_partial_unknown_header_does_not_block_complete_frame() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let good = heartbeat_frame(&mut encoder);

        // Claims 200 bytes of payload that will never arrive
        let mut stream = vec![STX_V2, 200, 0, 0, 0, 0, 0, 0x77, 0x77, 0x00];
        stream.extend(good.to_bytes());

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&stream).collect();
        assert_eq!(decoded, vec![good]);
    }

    #[test]
    fn test_inner_frame_found_at_every_split() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let good = heartbeat_frame(&mut encoder);

        // Short v1 headers ending just before the real frame: ID 199 is
        // outside the catalog, ID 200 (GIMBAL_REPORT) fails its checksum.
        for id in [0xC7u8, 0xC8] {
            let mut stream = vec![STX_V1, 0x02, 0x00, 0x00, 0x00, id, 0x11, 0x22];
            stream.extend(good.to_bytes());

            for split in 0..=stream.len() {
                let mut decoder = FrameDecoder::new();
                let mut decoded: Vec<_> = decoder.feed(&stream[..split]).collect();
                decoded.extend(decoder.feed(&stream[split..]));
                assert_eq!(decoded, vec![good.clone()], "id {id:#x}, split at {split}");
            }
        }
    }

    #[test]
    fn test_find_inner_waits_on_incomplete_header() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let good = heartbeat_frame(&mut encoder).to_bytes();

        let mut buf = vec![STX_V1, 0x02, 0x00, 0x00, 0x00, 0xC7, 0x11, 0x22];
        buf.extend_from_slice(&good[..2]);
        assert_eq!(find_inner(&buf, buf.len()), Inner::Pending);

        buf.extend_from_slice(&good[2..]);
        assert_eq!(find_inner(&buf, 10), Inner::Found(8));

        assert_eq!(find_inner(&[STX_V1, 0x00, 0x11], 3), Inner::None);
    }

    #[test]
    fn test_seeded_noise_keeps_every_frame() {
        for seed in [0x9E37_79B9_7F4A_7C15u64, 0xDEAD_BEEF, 0x1234_5678_9ABC, 7] {
            let mut noise = Noise(seed);
            let mut v2 = FrameEncoder::new(1, 1, ProtocolVersion::V2);
            let mut v1 = FrameEncoder::new(2, 1, ProtocolVersion::V1);

            let mut frames = Vec::new();
            let mut stream = Vec::new();
            for i in 0..20 {
                for _ in 0..noise.below(24) {
                    stream.push(noise.byte());
                }
                let frame = match i % 3 {
                    0 => heartbeat_frame(&mut v2),
                    1 => attitude_frame(&mut v2),
                    _ => heartbeat_frame(&mut v1),
                };
                stream.extend(frame.to_bytes());
                frames.push(frame);
            }
            // Lets any header in the last gap run out its declared length
            stream.extend([0u8; 300]);

            let mut whole = FrameDecoder::new();
            let reference: Vec<_> = whole.feed(&stream).collect();
            let verified: Vec<_> = reference.iter().filter(|f| f.crc_valid).cloned().collect();
            assert_eq!(verified, frames, "seed {seed:#x}");

            for chunk in [1, 7, 37, 64, 255] {
                let mut decoder = FrameDecoder::new();
                let mut decoded = Vec::new();
                for piece in stream.chunks(chunk) {
                    decoded.extend(decoder.feed(piece));
                }
                assert_eq!(decoded, reference, "seed {seed:#x}, chunk {chunk}");
                assert_eq!(decoder.stats(), whole.stats(), "seed {seed:#x}, chunk {chunk}");
            }
        }
    }

    #[test]
    fn test_impossible_length_rejected() {
        // HEARTBEAT is never longer than 9 bytes
        let mut stream = vec![STX_V1, 10, 0, 1, 1, 0];
        stream.extend([0u8; 10 + 2]);

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(&stream).count(), 0);
        assert!(decoder.stats().header_errors >= 1);
    }

    #[test]
    fn test_unknown_incompat_flags_rejected() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let mut bytes = heartbeat_frame(&mut encoder).to_bytes();
        bytes[2] = 0x02;

        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(&bytes).count(), 0);
        assert!(decoder.stats().header_errors >= 1);
    }

    #[test]
    fn test_signed_frame_keeps_signature() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let mut frame = encoder
            .encode(&MavMessage::SysStatus(SYS_STATUS_DATA {
                voltage_battery: 12_600,
                battery_remaining: 75,
                ..Default::default()
            }))
            .unwrap();
        // The signed flag is part of the checksummed header
        frame.incompat_flags = INCOMPAT_FLAG_SIGNED;
        frame.signature = Some([0xA5; SIGNATURE_LEN]);
        let mut bytes = frame.to_bytes();
        let body_end = HEADER_LEN_V2 + frame.payload.len();
        let info = catalog::lookup(frame.message_id).unwrap();
        let checksum = frame_checksum(&bytes[1..body_end], info.crc_extra);
        bytes[body_end..body_end + 2].copy_from_slice(&checksum.to_le_bytes());
        frame.checksum = checksum;

        let mut decoder = FrameDecoder::new();
        let decoded: Vec<_> = decoder.feed(&bytes).collect();
        assert_eq!(decoded, vec![frame]);
    }

    #[test]
    fn test_frame_split_across_feeds_keeps_remainder() {
        let mut encoder = FrameEncoder::new(1, 1, ProtocolVersion::V2);
        let first = heartbeat_frame(&mut encoder);
        let second = encoder
            .encode(&MavMessage::GlobalPositionInt(GLOBAL_POSITION_INT_DATA {
                lat: 377_749_000,
                lon: -1_224_194_000,
                ..Default::default()
            }))
            .unwrap();

        let mut stream = first.to_bytes();
        stream.extend(second.to_bytes());
        let split = first.wire_len() + 3;

        let mut decoder = FrameDecoder::new();
        let a: Vec<_> = decoder.feed(&stream[..split]).collect();
        assert_eq!(a, vec![first]);
        assert_eq!(decoder.buffered(), 3);

        let b: Vec<_> = decoder.feed(&stream[split..]).collect();
        assert_eq!(b, vec![second]);
    }
}
