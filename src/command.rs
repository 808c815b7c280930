//! Command encoder
//!
//! Builds outbound messages from high-level intents. The builders are pure:
//! framing and the sequence number belong to the session's
//! [`FrameEncoder`](crate::codec::FrameEncoder).
//!
//! # Target addressing
//!
//! Every targeted message is addressed to the origin of the last vehicle
//! heartbeat. Before any heartbeat has been heard the target is 0/0, which
//! autopilots treat as broadcast.

use num_traits::FromPrimitive;
use thiserror::Error;

use crate::codec::EncodeError;
use crate::messages::{
    MavAutopilot, MavCmd, MavMessage, MavMissionType, MavMode, MavModeFlag, MavParamType,
    MavState, MavType, COMMAND_LONG_DATA, HEARTBEAT_DATA, MISSION_REQUEST_LIST_DATA,
    PARAM_REQUEST_LIST_DATA, PARAM_SET_DATA, SET_MODE_DATA,
};
use crate::params::{encode_param_id, ParamIdError};
use crate::transport::TransportError;
use crate::vehicle::VehicleState;

/// Addressee of a targeted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Target {
    pub system_id: u8,
    pub component_id: u8,
}

impl Target {
    pub const BROADCAST: Target = Target {
        system_id: 0,
        component_id: 0,
    };

    pub fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
        }
    }

    /// Origin of the last heartbeat, broadcast if none was seen
    pub fn from_state(state: &VehicleState) -> Self {
        Self::new(state.system_id, state.component_id)
    }
}

/// Error returned by [`LinkSession::send_command`](crate::session::LinkSession::send_command)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("not connected")]
    NotConnected,
    #[error("invalid parameter id: {0}")]
    InvalidParamId(#[from] ParamIdError),
    #[error("message {message_id} cannot be sent over MAVLink v1")]
    UnsupportedVersion { message_id: u32 },
    #[error("encode failed: {0}")]
    Encode(EncodeError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

impl From<EncodeError> for CommandError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::UnsupportedVersion { message_id } => {
                Self::UnsupportedVersion { message_id }
            }
            other => Self::Encode(other),
        }
    }
}

/// COMMAND_LONG carrying an arbitrary MAV_CMD
///
/// # Arguments
///
/// * `target` - Addressee
/// * `command` - Command to run
/// * `params` - param1 through param7
pub fn command_long(target: Target, command: MavCmd, params: [f32; 7]) -> MavMessage {
    let [param1, param2, param3, param4, param5, param6, param7] = params;
    MavMessage::CommandLong(COMMAND_LONG_DATA {
        param1,
        param2,
        param3,
        param4,
        param5,
        param6,
        param7,
        command,
        target_system: target.system_id,
        target_component: target.component_id,
        confirmation: 0,
    })
}

/// Arm (param1 = 1) or disarm (param1 = 0)
pub fn arm_disarm(target: Target, arm: bool) -> MavMessage {
    let flag = if arm { 1.0 } else { 0.0 };
    command_long(
        target,
        MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
        [flag, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    )
}

pub fn return_to_launch(target: Target) -> MavMessage {
    command_long(target, MavCmd::MAV_CMD_NAV_RETURN_TO_LAUNCH, [0.0; 7])
}

/// Take off to `altitude_m` meters (param7)
pub fn takeoff(target: Target, altitude_m: f32) -> MavMessage {
    command_long(
        target,
        MavCmd::MAV_CMD_NAV_TAKEOFF,
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, altitude_m],
    )
}

/// Land at the current position
pub fn land(target: Target) -> MavMessage {
    command_long(target, MavCmd::MAV_CMD_NAV_LAND, [0.0; 7])
}

/// Change flight mode from a raw base and custom mode.
///
/// Base modes that name a standard MAV_MODE go out as SET_MODE, which has no
/// component field and addresses the whole system. Any other base mode (in
/// practice CUSTOM_MODE_ENABLED, as autopilots expect) goes out as
/// COMMAND_LONG(MAV_CMD_DO_SET_MODE). There a PX4 packed custom mode is split
/// into main mode (param2) and sub mode (param3).
pub fn set_mode(target: Target, base_mode: u8, custom_mode: u32) -> MavMessage {
    if let Some(base_mode) = MavMode::from_u8(base_mode) {
        return MavMessage::SetMode(SET_MODE_DATA {
            custom_mode,
            target_system: target.system_id,
            base_mode,
        });
    }

    let (main_mode, sub_mode) = if custom_mode > 0xFFFF {
        ((custom_mode >> 16) & 0xFF, custom_mode >> 24)
    } else {
        (custom_mode, 0)
    };
    command_long(
        target,
        MavCmd::MAV_CMD_DO_SET_MODE,
        [
            base_mode as f32,
            main_mode as f32,
            sub_mode as f32,
            0.0,
            0.0,
            0.0,
            0.0,
        ],
    )
}

/// PARAM_SET with a REAL32 value
///
/// # Returns
///
/// The message, or an error when `id` is empty, longer than 16 bytes or not
/// printable ASCII.
pub fn set_parameter(target: Target, id: &str, value: f32) -> Result<MavMessage, ParamIdError> {
    Ok(MavMessage::ParamSet(PARAM_SET_DATA {
        param_value: value,
        target_system: target.system_id,
        target_component: target.component_id,
        param_id: encode_param_id(id)?,
        param_type: MavParamType::MAV_PARAM_TYPE_REAL32,
    }))
}

pub fn request_parameter_list(target: Target) -> MavMessage {
    MavMessage::ParamRequestList(PARAM_REQUEST_LIST_DATA {
        target_system: target.system_id,
        target_component: target.component_id,
    })
}

/// MISSION_REQUEST_LIST for the main mission
pub fn request_mission_list(target: Target) -> MavMessage {
    MavMessage::MissionRequestList(MISSION_REQUEST_LIST_DATA {
        target_system: target.system_id,
        target_component: target.component_id,
        mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
    })
}

/// Start the loaded mission from its first item
pub fn mission_start(target: Target) -> MavMessage {
    command_long(target, MavCmd::MAV_CMD_MISSION_START, [0.0; 7])
}

/// Ground station heartbeat
pub fn gcs_heartbeat() -> MavMessage {
    MavMessage::Heartbeat(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_GCS,
        autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
        base_mode: MavModeFlag::empty(),
        system_status: MavState::MAV_STATE_ACTIVE,
        mavlink_version: 3,
    })
}

/// Outbound intent
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ArmDisarm { arm: bool },
    ReturnToLaunch,
    Takeoff { altitude_m: f32 },
    Land,
    SetMode { base_mode: u8, custom_mode: u32 },
    SetParameter { id: String, value: f32 },
    RequestParameterList,
    RequestMissionList,
    MissionStart,
    Heartbeat,
    /// Any other MAV_CMD as COMMAND_LONG
    Long { command: MavCmd, params: [f32; 7] },
}

impl Command {
    /// Build the message for this intent.
    ///
    /// # Arguments
    ///
    /// * `target` - Addressee; ignored for [`Command::Heartbeat`]
    pub fn to_message(&self, target: Target) -> Result<MavMessage, CommandError> {
        let msg = match self {
            Self::ArmDisarm { arm } => arm_disarm(target, *arm),
            Self::ReturnToLaunch => return_to_launch(target),
            Self::Takeoff { altitude_m } => takeoff(target, *altitude_m),
            Self::Land => land(target),
            Self::SetMode {
                base_mode,
                custom_mode,
            } => set_mode(target, *base_mode, *custom_mode),
            Self::SetParameter { id, value } => set_parameter(target, id, *value)?,
            Self::RequestParameterList => request_parameter_list(target),
            Self::RequestMissionList => request_mission_list(target),
            Self::MissionStart => mission_start(target),
            Self::Heartbeat => gcs_heartbeat(),
            Self::Long { command, params } => command_long(target, *command, *params),
        };
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VEHICLE: Target = Target {
        system_id: 1,
        component_id: 1,
    };

    fn unwrap_long(msg: MavMessage) -> COMMAND_LONG_DATA {
        match msg {
            MavMessage::CommandLong(cmd) => cmd,
            other => panic!("expected COMMAND_LONG, got {other:?}"),
        }
    }

    #[test]
    fn test_arm_disarm() {
        let arm = unwrap_long(arm_disarm(VEHICLE, true));
        assert_eq!(arm.command, MavCmd::MAV_CMD_COMPONENT_ARM_DISARM);
        assert_eq!(arm.param1, 1.0);
        assert_eq!(arm.target_system, 1);
        assert_eq!(arm.target_component, 1);

        let disarm = unwrap_long(arm_disarm(VEHICLE, false));
        assert_eq!(disarm.param1, 0.0);
    }

    #[test]
    fn test_takeoff_altitude_in_param7() {
        let cmd = unwrap_long(takeoff(VEHICLE, 25.0));
        assert_eq!(cmd.command, MavCmd::MAV_CMD_NAV_TAKEOFF);
        assert_eq!(cmd.param7, 25.0);
        let rest = [cmd.param1, cmd.param2, cmd.param3, cmd.param4, cmd.param5, cmd.param6];
        assert!(rest.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_nav_commands() {
        assert_eq!(
            unwrap_long(return_to_launch(VEHICLE)).command,
            MavCmd::MAV_CMD_NAV_RETURN_TO_LAUNCH
        );
        assert_eq!(unwrap_long(land(VEHICLE)).command, MavCmd::MAV_CMD_NAV_LAND);
        assert_eq!(
            unwrap_long(mission_start(VEHICLE)).command,
            MavCmd::MAV_CMD_MISSION_START
        );
    }

    #[test]
    fn test_set_mode_standard_base_mode() {
        let msg = set_mode(Target::new(3, 1), 216, 0);
        assert_eq!(
            msg,
            MavMessage::SetMode(SET_MODE_DATA {
                custom_mode: 0,
                target_system: 3,
                base_mode: MavMode::MAV_MODE_GUIDED_ARMED,
            })
        );
    }

    #[test]
    fn test_set_mode_custom_uses_do_set_mode() {
        // ArduCopter RTL
        let cmd = unwrap_long(set_mode(Target::new(3, 1), 1, 6));
        assert_eq!(cmd.command, MavCmd::MAV_CMD_DO_SET_MODE);
        assert_eq!((cmd.param1, cmd.param2, cmd.param3), (1.0, 6.0, 0.0));
        assert_eq!((cmd.target_system, cmd.target_component), (3, 1));

        // PX4 AUTO.MISSION: main mode 4, sub mode 4
        let cmd = unwrap_long(set_mode(VEHICLE, 1, (4 << 24) | (4 << 16)));
        assert_eq!((cmd.param1, cmd.param2, cmd.param3), (1.0, 4.0, 4.0));
    }

    #[test]
    fn test_set_parameter() {
        let msg = set_parameter(VEHICLE, "RTL_ALT", 1500.0).unwrap();
        let MavMessage::ParamSet(set) = msg else {
            panic!("expected PARAM_SET");
        };
        assert_eq!(&set.param_id[..7], b"RTL_ALT");
        assert!(set.param_id[7..].iter().all(|&b| b == 0));
        assert_eq!(set.param_value, 1500.0);
        assert_eq!(set.param_type, MavParamType::MAV_PARAM_TYPE_REAL32);

        assert_eq!(
            set_parameter(VEHICLE, "THIS_ID_IS_TOO_LONG", 1.0),
            Err(ParamIdError::TooLong(19))
        );
    }

    #[test]
    fn test_list_requests() {
        assert_eq!(
            request_parameter_list(VEHICLE),
            MavMessage::ParamRequestList(PARAM_REQUEST_LIST_DATA {
                target_system: 1,
                target_component: 1,
            })
        );
        assert_eq!(
            request_mission_list(VEHICLE),
            MavMessage::MissionRequestList(MISSION_REQUEST_LIST_DATA {
                target_system: 1,
                target_component: 1,
                mission_type: MavMissionType::MAV_MISSION_TYPE_MISSION,
            })
        );
    }

    #[test]
    fn test_gcs_heartbeat() {
        let MavMessage::Heartbeat(hb) = gcs_heartbeat() else {
            panic!("expected HEARTBEAT");
        };
        assert_eq!(hb.mavtype, MavType::MAV_TYPE_GCS);
        assert_eq!(hb.autopilot, MavAutopilot::MAV_AUTOPILOT_INVALID);
        assert_eq!(hb.system_status, MavState::MAV_STATE_ACTIVE);
        assert!(hb.base_mode.is_empty());
        assert_eq!(hb.mavlink_version, 3);
    }

    #[test]
    fn test_target_defaults_to_broadcast() {
        let state = VehicleState::default();
        assert_eq!(Target::from_state(&state), Target::BROADCAST);
    }

    #[test]
    fn test_command_intents() {
        let msg = Command::Takeoff { altitude_m: 10.0 }
            .to_message(VEHICLE)
            .unwrap();
        assert_eq!(unwrap_long(msg).param7, 10.0);

        let err = Command::SetParameter {
            id: String::new(),
            value: 0.0,
        }
        .to_message(VEHICLE);
        assert_eq!(err, Err(CommandError::InvalidParamId(ParamIdError::Empty)));

        let long = Command::Long {
            command: MavCmd::MAV_CMD_DO_SET_MODE,
            params: [1.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        }
        .to_message(VEHICLE)
        .unwrap();
        assert_eq!(unwrap_long(long).command, MavCmd::MAV_CMD_DO_SET_MODE);
    }

    #[test]
    fn test_encode_error_mapping() {
        let err = CommandError::from(EncodeError::UnsupportedVersion { message_id: 300 });
        assert_eq!(err, CommandError::UnsupportedVersion { message_id: 300 });
        let err = CommandError::from(EncodeError::UnknownMessage(9999));
        assert_eq!(err, CommandError::Encode(EncodeError::UnknownMessage(9999)));
    }
}
