//! Vehicle state
//!
//! [`VehicleState`] is the aggregated, display-ready view of the vehicle at
//! the other end of the link. Wire units are converted on the way in:
//!
//! | Quantity            | Wire                  | State            |
//! |---------------------|-----------------------|------------------|
//! | latitude, longitude | degrees * 1e7 (i32)   | degrees (f64)    |
//! | altitudes           | millimeters           | meters           |
//! | attitude angles     | radians               | degrees          |
//! | battery voltage     | millivolts            | volts            |
//! | battery current     | centiamperes          | amperes          |
//! | battery remaining   | percent (-1 unknown)  | fraction 0..=1   |
//!
//! - [`store`]: single-writer snapshot store with change notification
//! - [`dispatch`]: applies decoded messages to a state
//! - [`mode`]: flight mode names

pub mod dispatch;
pub mod mode;
pub mod store;

use tokio::time::Instant;

pub use dispatch::{apply, DispatchError, Origin};
pub use store::VehicleStore;

/// Flight stack running on the vehicle (MAV_AUTOPILOT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Autopilot {
    #[default]
    Unknown,
    Generic,
    ArduPilot,
    Px4,
    Other(u8),
}

impl From<u8> for Autopilot {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Generic,
            3 => Self::ArduPilot,
            12 => Self::Px4,
            other => Self::Other(other),
        }
    }
}

/// Airframe family (grouped MAV_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleKind {
    #[default]
    Unknown,
    FixedWing,
    Multirotor,
    Helicopter,
    GroundRover,
    SurfaceBoat,
    Submarine,
    Vtol,
    Other(u8),
}

impl From<u8> for VehicleKind {
    fn from(mav_type: u8) -> Self {
        match mav_type {
            0 => Self::Unknown,
            1 => Self::FixedWing,
            2 | 13 | 14 | 15 | 29 => Self::Multirotor,
            3 | 4 => Self::Helicopter,
            10 => Self::GroundRover,
            11 => Self::SurfaceBoat,
            12 => Self::Submarine,
            19..=25 => Self::Vtol,
            other => Self::Other(other),
        }
    }
}

/// GPS fix quality (GPS_FIX_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GpsFixType {
    #[default]
    NoGps,
    NoFix,
    Fix2D,
    Fix3D,
    DGps,
    RtkFloat,
    RtkFixed,
    Static,
    Ppp,
}

impl From<u8> for GpsFixType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::NoFix,
            2 => Self::Fix2D,
            3 => Self::Fix3D,
            4 => Self::DGps,
            5 => Self::RtkFloat,
            6 => Self::RtkFixed,
            7 => Self::Static,
            8 => Self::Ppp,
            _ => Self::NoGps,
        }
    }
}

/// Geographic position
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters AMSL
    pub altitude: f32,
}

/// Last-known vehicle telemetry
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleState {
    /// Heartbeats are arriving
    pub connected: bool,
    pub armed: bool,
    pub flight_mode: String,
    pub autopilot: Autopilot,
    pub vehicle_kind: VehicleKind,
    /// MAV_STATE from the last heartbeat
    pub system_status: u8,

    pub gps_fix: GpsFixType,
    /// `None` when the receiver does not report it
    pub satellites: Option<u8>,

    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters AMSL
    pub altitude_msl: f32,
    /// Meters above home
    pub altitude_relative: f32,

    /// Degrees
    pub roll: f32,
    /// Degrees
    pub pitch: f32,
    /// Degrees
    pub yaw: f32,

    /// m/s
    pub ground_speed: f32,
    /// m/s
    pub air_speed: f32,
    /// m/s, positive up
    pub climb_rate: f32,
    /// Degrees, 0..360
    pub heading: f32,
    /// Percent
    pub throttle: u16,

    /// Fraction 0..=1
    pub battery_remaining: Option<f32>,
    /// Volts
    pub battery_voltage: f32,
    /// Amperes
    pub battery_current: Option<f32>,

    /// Set once HOME_POSITION arrives
    pub home: Option<GeoPoint>,

    /// RC link quality in percent, from RC_CHANNELS rssi
    pub link_quality: Option<u8>,
    pub rc_channel_count: u8,

    /// System ID of the last heartbeat origin
    pub system_id: u8,
    /// Component ID of the last heartbeat origin
    pub component_id: u8,
    pub last_heartbeat: Option<Instant>,
}

impl VehicleState {
    /// Current position as a [`GeoPoint`]
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude_msl,
        }
    }

    /// Whether a heartbeat has been seen since the last reset
    pub fn identified(&self) -> bool {
        self.last_heartbeat.is_some()
    }
}
