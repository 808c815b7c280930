//! Flight mode names
//!
//! HEARTBEAT carries the flight mode as an autopilot-specific `custom_mode`
//! number. ArduPilot numbers modes per vehicle family; PX4 packs a main mode
//! and a sub mode into the upper two bytes.

use super::{Autopilot, VehicleKind};

/// ArduCopter modes (also used by ArduPilot helicopters)
const COPTER_MODES: &[(u32, &str)] = &[
    (0, "Stabilize"),
    (1, "Acro"),
    (2, "AltHold"),
    (3, "Auto"),
    (4, "Guided"),
    (5, "Loiter"),
    (6, "RTL"),
    (7, "Circle"),
    (9, "Land"),
    (11, "Drift"),
    (13, "Sport"),
    (14, "Flip"),
    (15, "AutoTune"),
    (16, "PosHold"),
    (17, "Brake"),
    (18, "Throw"),
    (19, "Avoid_ADSB"),
    (20, "Guided_NoGPS"),
    (21, "Smart_RTL"),
    (22, "FlowHold"),
    (23, "Follow"),
    (24, "ZigZag"),
    (25, "SystemID"),
    (26, "AutoRotate"),
];

/// ArduPlane modes (including QuadPlane VTOL modes)
const PLANE_MODES: &[(u32, &str)] = &[
    (0, "Manual"),
    (1, "Circle"),
    (2, "Stabilize"),
    (3, "Training"),
    (4, "Acro"),
    (5, "FBWA"),
    (6, "FBWB"),
    (7, "Cruise"),
    (8, "AutoTune"),
    (10, "Auto"),
    (11, "RTL"),
    (12, "Loiter"),
    (13, "Takeoff"),
    (15, "Guided"),
    (17, "QStabilize"),
    (18, "QHover"),
    (19, "QLoiter"),
    (20, "QLand"),
    (21, "QRTL"),
    (22, "QAutoTune"),
    (23, "QAcro"),
    (24, "Thermal"),
];

/// ArduRover modes (also used by ArduPilot boats)
const ROVER_MODES: &[(u32, &str)] = &[
    (0, "Manual"),
    (1, "Acro"),
    (3, "Steering"),
    (4, "Hold"),
    (5, "Loiter"),
    (6, "Follow"),
    (7, "Simple"),
    (8, "Dock"),
    (10, "Auto"),
    (11, "RTL"),
    (12, "Smart_RTL"),
    (15, "Guided"),
];

fn ardupilot_table(kind: VehicleKind) -> &'static [(u32, &'static str)] {
    match kind {
        VehicleKind::FixedWing | VehicleKind::Vtol => PLANE_MODES,
        VehicleKind::GroundRover | VehicleKind::SurfaceBoat => ROVER_MODES,
        _ => COPTER_MODES,
    }
}

/// PX4 mode name from its main and sub mode
fn px4_name(main_mode: u8, sub_mode: u8) -> Option<&'static str> {
    let name = match (main_mode, sub_mode) {
        (1, _) => "Manual",
        (2, _) => "Altitude",
        (3, 1) => "Orbit",
        (3, _) => "Position",
        (4, 1) => "Ready",
        (4, 2) => "Takeoff",
        (4, 3) => "Hold",
        (4, 4) => "Mission",
        (4, 5) => "Return",
        (4, 6) => "Land",
        (4, 8) => "Follow Me",
        (4, 9) => "Precision Land",
        (4, _) => "Auto",
        (5, _) => "Acro",
        (6, _) => "Offboard",
        (7, _) => "Stabilized",
        (8, _) => "Rattitude",
        _ => return None,
    };
    Some(name)
}

/// Human-readable flight mode for a heartbeat's `custom_mode`.
///
/// Unknown numbers render as `"Mode N"`.
pub fn flight_mode_name(autopilot: Autopilot, kind: VehicleKind, custom_mode: u32) -> String {
    let known = match autopilot {
        Autopilot::ArduPilot => ardupilot_table(kind)
            .iter()
            .find(|(n, _)| *n == custom_mode)
            .map(|(_, name)| *name),
        Autopilot::Px4 => {
            let main_mode = ((custom_mode >> 16) & 0xFF) as u8;
            let sub_mode = ((custom_mode >> 24) & 0xFF) as u8;
            px4_name(main_mode, sub_mode)
        }
        _ => None,
    };
    known.map_or_else(|| format!("Mode {custom_mode}"), str::to_string)
}

/// ArduPilot `custom_mode` number for a mode name, case-insensitive.
pub fn ardupilot_mode_number(kind: VehicleKind, name: &str) -> Option<u32> {
    ardupilot_table(kind)
        .iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(name))
        .map(|(num, _)| *num)
}
