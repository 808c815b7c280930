//! Receive task
//!
//! One task per open connection. It is the only writer of the vehicle state
//! and the parameter table while it runs: it reads the transport, decodes
//! frames in arrival order, dispatches them, and on every check tick looks
//! for heartbeat loss and emits the ground station heartbeat.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use super::Shared;
use crate::codec::{FrameDecoder, MavFrame};
use crate::command::gcs_heartbeat;
use crate::config::LinkConfig;
use crate::messages::MavMessage;
use crate::transport::TransportRx;
use crate::vehicle::{apply, DispatchError, Origin, VehicleState};

/// Smallest receive buffer; one v2 frame with signature fits
const MIN_RECV_BUFFER: usize = 280;

pub(super) async fn run(
    shared: Arc<Shared>,
    config: LinkConfig,
    mut rx: Box<dyn TransportRx>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut decoder = FrameDecoder::new();
    let mut buf = vec![0u8; config.recv_buffer_size.max(MIN_RECV_BUFFER)];

    let mut check = tokio::time::interval(config.check_interval());
    check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let timeout = config.heartbeat_timeout();
    let gcs_interval = config.gcs_heartbeat_interval();
    let mut last_gcs_heartbeat: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;

            _ = cancel.changed() => {
                debug!("receive task cancelled");
                break;
            }
            // Ahead of recv so a busy link still gets its loss check
            _ = check.tick() => {
                let now = Instant::now();
                check_heartbeat(&shared, now, timeout);

                if let Some(interval) = gcs_interval {
                    let due = last_gcs_heartbeat
                        .map_or(true, |sent| now.duration_since(sent) >= interval);
                    if due {
                        last_gcs_heartbeat = Some(now);
                        let heartbeat = gcs_heartbeat();
                        let sent = tokio::select! {
                            biased;

                            _ = cancel.changed() => {
                                debug!("receive task cancelled while sending heartbeat");
                                break;
                            }
                            sent = shared.send(&heartbeat) => sent,
                        };
                        if let Err(err) = sent {
                            // A UDP server has nowhere to send until the vehicle speaks
                            debug!("GCS heartbeat not sent: {err}");
                        }
                    }
                }
            }
            result = rx.recv(&mut buf) => match result {
                Ok(n) => {
                    for frame in decoder.feed(&buf[..n]) {
                        dispatch(&shared, &frame);
                    }
                    shared.stats.lock().decoder = decoder.stats();
                }
                Err(err) => {
                    warn!("receive failed: {err}");
                    shared.fail(err.to_string()).await;
                    break;
                }
            },
        }
    }
}

/// Route one frame to the parameter table or the vehicle state.
fn dispatch(shared: &Shared, frame: &MavFrame) {
    let origin = Origin {
        system_id: frame.system_id,
        component_id: frame.component_id,
    };

    if !frame.crc_valid {
        trace!(
            "unverified message {} from {}/{}",
            frame.message_id, origin.system_id, origin.component_id
        );
        shared.stats.lock().unverified += 1;
        return;
    }

    let outcome = match frame.message() {
        Err(err) => Err(DispatchError::from(err)),
        Ok(MavMessage::Unhandled(id)) => {
            trace!("unhandled message {id} from {}/{}", origin.system_id, origin.component_id);
            shared.stats.lock().unhandled += 1;
            return;
        }
        Ok(MavMessage::ParamValue(value)) => shared
            .params
            .lock()
            .apply_param_value(&value)
            .map(|_| true)
            .map_err(DispatchError::from),
        Ok(msg) => shared
            .store
            .try_update(|state| apply(state, origin, &msg, Instant::now())),
    };

    let mut stats = shared.stats.lock();
    match outcome {
        Ok(_) => stats.frames_dispatched += 1,
        Err(err) => {
            warn!(
                "dropped message {} from {}/{}: {err}",
                frame.message_id, origin.system_id, origin.component_id
            );
            stats.dispatch_errors += 1;
        }
    }
}

/// Whether a vehicle marked connected has been silent for longer than `timeout`
pub(crate) fn heartbeat_lost(state: &VehicleState, now: Instant, timeout: Duration) -> bool {
    state.connected
        && state
            .last_heartbeat
            .is_some_and(|last| now.saturating_duration_since(last) > timeout)
}

fn check_heartbeat(shared: &Shared, now: Instant, timeout: Duration) {
    if heartbeat_lost(&shared.store.snapshot(), now, timeout) {
        warn!("no heartbeat for more than {timeout:?}, vehicle marked disconnected");
        shared.store.update(|state| state.connected = false);
    }
}
