//! Message dispatch
//!
//! Each handler touches only the fields its message carries. Handlers run on
//! a private copy of the state (see [`super::VehicleStore`]), so a rejected
//! message leaves the published snapshot untouched.

use thiserror::Error;
use tokio::time::Instant;

use super::mode::flight_mode_name;
use super::{Autopilot, GeoPoint, GpsFixType, VehicleKind, VehicleState};
use crate::messages::{
    MavAutopilot, MavMessage, MavModeFlag, MavType, MessageError, ATTITUDE_DATA,
    BATTERY_STATUS_DATA, GLOBAL_POSITION_INT_DATA, GPS_RAW_INT_DATA, HEARTBEAT_DATA,
    HOME_POSITION_DATA, RC_CHANNELS_DATA, SYS_STATUS_DATA, VFR_HUD_DATA,
};
use crate::params::ParamIdError;

/// Failure handling a single message
///
/// Logged by the receive loop, which then moves on to the next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("undecodable payload: {0}")]
    Decode(#[from] MessageError),

    #[error("{message}.{field} is not a finite number")]
    NonFinite {
        message: &'static str,
        field: &'static str,
    },

    #[error("malformed parameter id: {0}")]
    ParamId(#[from] ParamIdError),
}

/// Sender of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub system_id: u8,
    pub component_id: u8,
}

/// Apply one message to `state`.
///
/// # Returns
///
/// - `Ok(true)` - the state changed and should be published
/// - `Ok(false)` - the message carries nothing for the vehicle state
///   (outbound types, parameters, unknown IDs, non-vehicle heartbeats)
/// - `Err(_)` - the message was rejected; `state` may be partially written
///   and must be discarded
pub fn apply(
    state: &mut VehicleState,
    origin: Origin,
    msg: &MavMessage,
    now: Instant,
) -> Result<bool, DispatchError> {
    match msg {
        MavMessage::Heartbeat(m) => Ok(heartbeat(state, origin, m, now)),
        MavMessage::SysStatus(m) => {
            sys_status(state, m);
            Ok(true)
        }
        MavMessage::GpsRawInt(m) => {
            gps_raw_int(state, m);
            Ok(true)
        }
        MavMessage::Attitude(m) => attitude(state, m).map(|_| true),
        MavMessage::GlobalPositionInt(m) => {
            global_position_int(state, m);
            Ok(true)
        }
        MavMessage::RcChannels(m) => {
            rc_channels(state, m);
            Ok(true)
        }
        MavMessage::VfrHud(m) => vfr_hud(state, m).map(|_| true),
        MavMessage::BatteryStatus(m) => Ok(battery_status(state, m)),
        MavMessage::HomePosition(m) => {
            home_position(state, m);
            Ok(true)
        }
        MavMessage::ParamValue(_)
        | MavMessage::CommandLong(_)
        | MavMessage::ParamRequestList(_)
        | MavMessage::ParamSet(_)
        | MavMessage::MissionRequestList(_)
        | MavMessage::SetMode(_)
        | MavMessage::Unhandled(_) => Ok(false),
    }
}

fn finite(message: &'static str, field: &'static str, value: f32) -> Result<f32, DispatchError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DispatchError::NonFinite { message, field })
    }
}

fn heartbeat(state: &mut VehicleState, origin: Origin, hb: &HEARTBEAT_DATA, now: Instant) -> bool {
    // Other ground stations and peripherals (gimbals, cameras) heartbeat too
    if hb.mavtype == MavType::MAV_TYPE_GCS || hb.autopilot == MavAutopilot::MAV_AUTOPILOT_INVALID {
        return false;
    }

    let autopilot = Autopilot::from(hb.autopilot as u8);
    let kind = VehicleKind::from(hb.mavtype as u8);

    state.connected = true;
    state.armed = hb.base_mode.contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
    state.autopilot = autopilot;
    state.vehicle_kind = kind;
    state.flight_mode = flight_mode_name(autopilot, kind, hb.custom_mode);
    state.system_status = hb.system_status as u8;
    state.system_id = origin.system_id;
    state.component_id = origin.component_id;
    state.last_heartbeat = Some(now);
    true
}

fn sys_status(state: &mut VehicleState, m: &SYS_STATUS_DATA) {
    if m.voltage_battery != u16::MAX {
        state.battery_voltage = m.voltage_battery as f32 / 1000.0;
    }
    state.battery_current = (m.current_battery >= 0).then(|| m.current_battery as f32 / 100.0);
    state.battery_remaining = remaining_fraction(m.battery_remaining);
}

fn remaining_fraction(percent: i8) -> Option<f32> {
    (percent >= 0).then(|| percent.min(100) as f32 / 100.0)
}

fn gps_raw_int(state: &mut VehicleState, m: &GPS_RAW_INT_DATA) {
    state.gps_fix = GpsFixType::from(m.fix_type as u8);
    state.satellites = (m.satellites_visible != u8::MAX).then_some(m.satellites_visible);
}

fn attitude(state: &mut VehicleState, m: &ATTITUDE_DATA) -> Result<(), DispatchError> {
    state.roll = finite("ATTITUDE", "roll", m.roll)?.to_degrees();
    state.pitch = finite("ATTITUDE", "pitch", m.pitch)?.to_degrees();
    state.yaw = finite("ATTITUDE", "yaw", m.yaw)?.to_degrees();
    Ok(())
}

fn global_position_int(state: &mut VehicleState, m: &GLOBAL_POSITION_INT_DATA) {
    state.latitude = m.lat as f64 / 1e7;
    state.longitude = m.lon as f64 / 1e7;
    state.altitude_msl = m.alt as f32 / 1000.0;
    state.altitude_relative = m.relative_alt as f32 / 1000.0;
    if m.hdg != u16::MAX {
        state.heading = m.hdg as f32 / 100.0;
    }
}

fn rc_channels(state: &mut VehicleState, m: &RC_CHANNELS_DATA) {
    state.rc_channel_count = m.chancount;
    state.link_quality = (m.rssi != u8::MAX).then(|| (m.rssi as u16 * 100 / 254) as u8);
}

fn vfr_hud(state: &mut VehicleState, m: &VFR_HUD_DATA) -> Result<(), DispatchError> {
    state.air_speed = finite("VFR_HUD", "airspeed", m.airspeed)?;
    state.ground_speed = finite("VFR_HUD", "groundspeed", m.groundspeed)?;
    state.climb_rate = finite("VFR_HUD", "climb", m.climb)?;
    state.heading = m.heading.rem_euclid(360) as f32;
    state.throttle = m.throttle;
    Ok(())
}

/// Pack voltage in volts from per-cell millivolts, `None` when no cell
/// reports. Unused cells are `u16::MAX`, unused extension cells 0.
fn total_voltage(m: &BATTERY_STATUS_DATA) -> Option<f32> {
    let cells = m.voltages.iter().filter(|&&mv| mv != u16::MAX);
    let ext = m.voltages_ext.iter().filter(|&&mv| mv != 0);
    let (count, millivolts) = cells
        .chain(ext)
        .fold((0u32, 0u32), |(n, sum), &mv| (n + 1, sum + mv as u32));
    (count > 0).then(|| millivolts as f32 / 1000.0)
}

/// Only the primary battery (id 0) feeds the state.
fn battery_status(state: &mut VehicleState, m: &BATTERY_STATUS_DATA) -> bool {
    if m.id != 0 {
        return false;
    }
    if let Some(volts) = total_voltage(m) {
        state.battery_voltage = volts;
    }
    if m.current_battery >= 0 {
        state.battery_current = Some(m.current_battery as f32 / 100.0);
    }
    if let Some(fraction) = remaining_fraction(m.battery_remaining) {
        state.battery_remaining = Some(fraction);
    }
    true
}

fn home_position(state: &mut VehicleState, m: &HOME_POSITION_DATA) {
    state.home = Some(GeoPoint {
        latitude: m.latitude as f64 / 1e7,
        longitude: m.longitude as f64 / 1e7,
        altitude: m.altitude as f32 / 1000.0,
    });
}
