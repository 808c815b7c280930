//! MAVLink message set
//!
//! Payload layouts, CRC_EXTRA seeds and enums come from the `mavlink` crate's
//! common dialect. The link acts on a small subset of it: the telemetry needed
//! to display vehicle state and the requests needed to fly it. Everything
//! else decodes to [`MavMessage::Unhandled`].
//!
//! # Catalog
//!
//! [`catalog::lookup`] answers the framing questions (is an ID known, its
//! CRC_EXTRA, its longest payload) for the ardupilotmega dialect, a superset
//! of common. The frame decoder can then verify checksums of autopilot
//! messages the link never acts on.

use mavlink::error::ParserError;
use mavlink::{ardupilotmega, common};
use mavlink::{MavlinkVersion, Message};
use thiserror::Error;

use crate::codec::ProtocolVersion;

pub use mavlink::common::MavFrame as CoordinateFrame;
pub use mavlink::common::{
    MavAutopilot, MavCmd, MavMissionType, MavMode, MavModeFlag, MavParamType, MavState, MavType,
    ATTITUDE_DATA, BATTERY_STATUS_DATA, COMMAND_LONG_DATA, GLOBAL_POSITION_INT_DATA,
    GPS_RAW_INT_DATA, HEARTBEAT_DATA, HOME_POSITION_DATA, MISSION_REQUEST_LIST_DATA,
    PARAM_REQUEST_LIST_DATA, PARAM_SET_DATA, PARAM_VALUE_DATA, RC_CHANNELS_DATA, SET_MODE_DATA,
    SYS_STATUS_DATA, VFR_HUD_DATA,
};

/// Largest payload any MAVLink message can carry
pub const MAX_PAYLOAD_LEN: usize = 255;

/// Message IDs of the supported subset
pub mod ids {
    use mavlink::MessageData;

    use super::*;

    pub const HEARTBEAT: u32 = HEARTBEAT_DATA::ID;
    pub const SYS_STATUS: u32 = SYS_STATUS_DATA::ID;
    pub const SET_MODE: u32 = SET_MODE_DATA::ID;
    pub const PARAM_REQUEST_LIST: u32 = PARAM_REQUEST_LIST_DATA::ID;
    pub const PARAM_VALUE: u32 = PARAM_VALUE_DATA::ID;
    pub const PARAM_SET: u32 = PARAM_SET_DATA::ID;
    pub const GPS_RAW_INT: u32 = GPS_RAW_INT_DATA::ID;
    pub const ATTITUDE: u32 = ATTITUDE_DATA::ID;
    pub const GLOBAL_POSITION_INT: u32 = GLOBAL_POSITION_INT_DATA::ID;
    pub const MISSION_REQUEST_LIST: u32 = MISSION_REQUEST_LIST_DATA::ID;
    pub const RC_CHANNELS: u32 = RC_CHANNELS_DATA::ID;
    pub const VFR_HUD: u32 = VFR_HUD_DATA::ID;
    pub const COMMAND_LONG: u32 = COMMAND_LONG_DATA::ID;
    pub const BATTERY_STATUS: u32 = BATTERY_STATUS_DATA::ID;
    pub const HOME_POSITION: u32 = HOME_POSITION_DATA::ID;
}

impl From<ProtocolVersion> for MavlinkVersion {
    fn from(version: ProtocolVersion) -> Self {
        match version {
            ProtocolVersion::V1 => MavlinkVersion::V1,
            ProtocolVersion::V2 => MavlinkVersion::V2,
        }
    }
}

/// Framing metadata of one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageInfo {
    pub id: u32,
    pub name: &'static str,
    /// Seed byte appended to the checksum input
    pub crc_extra: u8,
    /// Payload length including extension fields
    pub max_len: usize,
}

/// Dialect lookups
pub mod catalog {
    use super::*;

    /// Framing metadata for `id`, `None` outside the ardupilotmega dialect.
    pub fn lookup(id: u32) -> Option<MessageInfo> {
        let msg = ardupilotmega::MavMessage::default_message_from_id(id).ok()?;
        let mut payload = [0u8; MAX_PAYLOAD_LEN];
        Some(MessageInfo {
            id,
            name: msg.message_name(),
            crc_extra: ardupilotmega::MavMessage::extra_crc(id),
            // v1 serialization never trims, so this is the full layout
            max_len: msg.ser(MavlinkVersion::V1, &mut payload),
        })
    }

    /// Whether some sender could put a `len` byte payload in a frame for
    /// `info`: never empty, never longer than the extended layout.
    pub fn length_plausible(info: &MessageInfo, len: usize) -> bool {
        (1..=info.max_len).contains(&len)
    }
}

/// Error decoding a payload into a typed message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Payload longer than the message can ever be
    #[error("{name} payload is {len} bytes, at most {max} allowed")]
    PayloadTooLong {
        name: &'static str,
        len: usize,
        max: usize,
    },

    /// A field holds a value its enum does not define
    #[error("{name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Closed set of messages the link understands
#[derive(Debug, Clone, PartialEq)]
pub enum MavMessage {
    Heartbeat(HEARTBEAT_DATA),
    SysStatus(SYS_STATUS_DATA),
    GpsRawInt(GPS_RAW_INT_DATA),
    Attitude(ATTITUDE_DATA),
    GlobalPositionInt(GLOBAL_POSITION_INT_DATA),
    RcChannels(RC_CHANNELS_DATA),
    VfrHud(VFR_HUD_DATA),
    BatteryStatus(BATTERY_STATUS_DATA),
    HomePosition(HOME_POSITION_DATA),
    ParamValue(PARAM_VALUE_DATA),
    CommandLong(COMMAND_LONG_DATA),
    ParamRequestList(PARAM_REQUEST_LIST_DATA),
    ParamSet(PARAM_SET_DATA),
    MissionRequestList(MISSION_REQUEST_LIST_DATA),
    SetMode(SET_MODE_DATA),
    /// Message outside the supported subset, carried by ID only
    Unhandled(u32),
}

impl From<common::MavMessage> for MavMessage {
    fn from(msg: common::MavMessage) -> Self {
        use common::MavMessage as M;

        match msg {
            M::HEARTBEAT(m) => Self::Heartbeat(m),
            M::SYS_STATUS(m) => Self::SysStatus(m),
            M::GPS_RAW_INT(m) => Self::GpsRawInt(m),
            M::ATTITUDE(m) => Self::Attitude(m),
            M::GLOBAL_POSITION_INT(m) => Self::GlobalPositionInt(m),
            M::RC_CHANNELS(m) => Self::RcChannels(m),
            M::VFR_HUD(m) => Self::VfrHud(m),
            M::BATTERY_STATUS(m) => Self::BatteryStatus(m),
            M::HOME_POSITION(m) => Self::HomePosition(m),
            M::PARAM_VALUE(m) => Self::ParamValue(m),
            M::COMMAND_LONG(m) => Self::CommandLong(m),
            M::PARAM_REQUEST_LIST(m) => Self::ParamRequestList(m),
            M::PARAM_SET(m) => Self::ParamSet(m),
            M::MISSION_REQUEST_LIST(m) => Self::MissionRequestList(m),
            M::SET_MODE(m) => Self::SetMode(m),
            other => Self::Unhandled(other.message_id()),
        }
    }
}

impl MavMessage {
    /// Decode a typed message from a frame's message ID and payload.
    ///
    /// Truncated v2 payloads are zero-extended.
    ///
    /// # Returns
    ///
    /// `Unhandled(id)` for unknown IDs and for messages the link never acts
    /// on (e.g. COMMAND_ACK, MEMINFO). Fails when the payload is longer than
    /// the message's extended length or a field holds an undefined enum
    /// value.
    pub fn parse(
        version: ProtocolVersion,
        message_id: u32,
        payload: &[u8],
    ) -> Result<Self, MessageError> {
        let Some(info) = catalog::lookup(message_id) else {
            return Ok(Self::Unhandled(message_id));
        };
        if payload.len() > info.max_len {
            return Err(MessageError::PayloadTooLong {
                name: info.name,
                len: payload.len(),
                max: info.max_len,
            });
        }

        match common::MavMessage::parse(version.into(), message_id, payload) {
            Ok(msg) => Ok(Self::from(msg)),
            // ardupilotmega-only message
            Err(ParserError::UnknownMessage { .. }) => Ok(Self::Unhandled(message_id)),
            Err(err) => Err(MessageError::Invalid {
                name: info.name,
                reason: err.to_string(),
            }),
        }
    }

    /// MAVLink message ID
    pub fn message_id(&self) -> u32 {
        match self {
            Self::Heartbeat(_) => ids::HEARTBEAT,
            Self::SysStatus(_) => ids::SYS_STATUS,
            Self::GpsRawInt(_) => ids::GPS_RAW_INT,
            Self::Attitude(_) => ids::ATTITUDE,
            Self::GlobalPositionInt(_) => ids::GLOBAL_POSITION_INT,
            Self::RcChannels(_) => ids::RC_CHANNELS,
            Self::VfrHud(_) => ids::VFR_HUD,
            Self::BatteryStatus(_) => ids::BATTERY_STATUS,
            Self::HomePosition(_) => ids::HOME_POSITION,
            Self::ParamValue(_) => ids::PARAM_VALUE,
            Self::CommandLong(_) => ids::COMMAND_LONG,
            Self::ParamRequestList(_) => ids::PARAM_REQUEST_LIST,
            Self::ParamSet(_) => ids::PARAM_SET,
            Self::MissionRequestList(_) => ids::MISSION_REQUEST_LIST,
            Self::SetMode(_) => ids::SET_MODE,
            Self::Unhandled(id) => *id,
        }
    }

    /// The dialect message for serialization, `None` for
    /// [`MavMessage::Unhandled`], which carries no body.
    pub fn to_common(&self) -> Option<common::MavMessage> {
        use common::MavMessage as M;

        let msg = match self {
            Self::Heartbeat(m) => M::HEARTBEAT(m.clone()),
            Self::SysStatus(m) => M::SYS_STATUS(m.clone()),
            Self::GpsRawInt(m) => M::GPS_RAW_INT(m.clone()),
            Self::Attitude(m) => M::ATTITUDE(m.clone()),
            Self::GlobalPositionInt(m) => M::GLOBAL_POSITION_INT(m.clone()),
            Self::RcChannels(m) => M::RC_CHANNELS(m.clone()),
            Self::VfrHud(m) => M::VFR_HUD(m.clone()),
            Self::BatteryStatus(m) => M::BATTERY_STATUS(m.clone()),
            Self::HomePosition(m) => M::HOME_POSITION(m.clone()),
            Self::ParamValue(m) => M::PARAM_VALUE(m.clone()),
            Self::CommandLong(m) => M::COMMAND_LONG(m.clone()),
            Self::ParamRequestList(m) => M::PARAM_REQUEST_LIST(m.clone()),
            Self::ParamSet(m) => M::PARAM_SET(m.clone()),
            Self::MissionRequestList(m) => M::MISSION_REQUEST_LIST(m.clone()),
            Self::SetMode(m) => M::SET_MODE(m.clone()),
            Self::Unhandled(_) => return None,
        };
        Some(msg)
    }
}
