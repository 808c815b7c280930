//! Helpers shared by the socket tests: a simulated vehicle's frames and
//! bounded waits on session updates.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use gcs_link::codec::{FrameDecoder, FrameEncoder, ProtocolVersion};
use gcs_link::messages::{
    MavAutopilot, MavModeFlag, MavState, MavType, GLOBAL_POSITION_INT_DATA, HEARTBEAT_DATA,
};
use gcs_link::{LinkConfig, MavFrame, MavMessage, VehicleState};
use tokio::sync::broadcast;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(2);

/// Session config without the periodic GCS heartbeat
pub fn quiet_config() -> LinkConfig {
    LinkConfig {
        gcs_heartbeat_interval_ms: None,
        ..Default::default()
    }
}

/// Frames as sent by an ArduCopter vehicle with system ID 1
pub struct SimVehicle {
    encoder: FrameEncoder,
}

impl SimVehicle {
    pub fn new() -> Self {
        Self {
            encoder: FrameEncoder::new(1, 1, ProtocolVersion::V2),
        }
    }

    pub fn heartbeat(&mut self, armed: bool) -> Vec<u8> {
        let mut base_mode = MavModeFlag::MAV_MODE_FLAG_CUSTOM_MODE_ENABLED;
        if armed {
            base_mode |= MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED;
        }
        self.frame(MavMessage::Heartbeat(HEARTBEAT_DATA {
            custom_mode: 6,
            mavtype: MavType::MAV_TYPE_QUADROTOR,
            autopilot: MavAutopilot::MAV_AUTOPILOT_ARDUPILOTMEGA,
            base_mode,
            system_status: MavState::MAV_STATE_ACTIVE,
            mavlink_version: 3,
        }))
    }

    pub fn position(&mut self, lat: i32, lon: i32) -> Vec<u8> {
        self.frame(MavMessage::GlobalPositionInt(GLOBAL_POSITION_INT_DATA {
            lat,
            lon,
            alt: 120_500,
            relative_alt: 20_000,
            hdg: 9000,
            ..Default::default()
        }))
    }

    fn frame(&mut self, msg: MavMessage) -> Vec<u8> {
        self.encoder.encode(&msg).unwrap().to_bytes()
    }
}

/// Wait for the next published snapshot matching `pred`
pub async fn wait_for_state(
    updates: &mut broadcast::Receiver<Arc<VehicleState>>,
    pred: impl Fn(&VehicleState) -> bool,
) -> Arc<VehicleState> {
    timeout(WAIT, async {
        loop {
            let state = updates.recv().await.unwrap();
            if pred(&state) {
                return state;
            }
        }
    })
    .await
    .expect("timed out waiting for vehicle state")
}

/// Decode every complete frame in `bytes`
pub fn decode_all(bytes: &[u8]) -> Vec<MavFrame> {
    FrameDecoder::new().feed(bytes).collect()
}
