//! Connect to a vehicle and log its link state and telemetry.
//!
//! Usage:
//!   link_monitor                       # UDP server on 14550
//!   link_monitor udp-server [PORT]
//!   link_monitor udp HOST PORT
//!   link_monitor tcp HOST PORT
//!
//! Log level follows RUST_LOG (default: info).

use std::sync::Arc;
use std::time::Duration;

use gcs_link::config::DEFAULT_PORT;
use gcs_link::{ConnectionConfig, ConnectionState, LinkConfig, LinkSession, SocketConnector};
use log::{error, info};

const SUMMARY_INTERVAL: Duration = Duration::from_secs(5);

fn port(s: &str) -> Result<u16, String> {
    s.parse().map_err(|_| format!("invalid port: {s}"))
}

fn parse_args() -> Result<ConnectionConfig, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["udp-server"] => Ok(ConnectionConfig::udp_server(DEFAULT_PORT)),
        ["udp-server", p] => Ok(ConnectionConfig::udp_server(port(p)?)),
        ["udp", host, p] => Ok(ConnectionConfig::udp_client(*host, port(p)?)),
        ["tcp", host, p] => Ok(ConnectionConfig::tcp_client(*host, port(p)?)),
        _ => Err("usage: link_monitor [udp-server [PORT] | udp HOST PORT | tcp HOST PORT]".into()),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let target = match parse_args() {
        Ok(target) => target,
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let session = LinkSession::new(Arc::new(SocketConnector), LinkConfig::default());
    let mut states = session.subscribe_state();

    if let Err(err) = session.connect(&target).await {
        error!("cannot open {target}: {err}");
        std::process::exit(1);
    }

    let mut summary = tokio::time::interval(SUMMARY_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("shutdown requested");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if let ConnectionState::Error(reason) = state {
                    error!("link failed: {reason}");
                    break;
                }
            }
            _ = summary.tick() => {
                let vehicle = session.snapshot();
                if !vehicle.identified() {
                    info!("waiting for vehicle heartbeat");
                    continue;
                }
                let stats = session.stats();
                info!(
                    "vehicle {}/{} {} {} {} | {:.6},{:.6} alt {:.1} m | batt {:.2} V {} | sats {} | rx {} frames, {} crc errors",
                    vehicle.system_id,
                    vehicle.component_id,
                    if vehicle.connected { "online" } else { "silent" },
                    if vehicle.armed { "ARMED" } else { "disarmed" },
                    vehicle.flight_mode,
                    vehicle.latitude,
                    vehicle.longitude,
                    vehicle.altitude_relative,
                    vehicle.battery_voltage,
                    vehicle
                        .battery_remaining
                        .map_or("--".to_string(), |r| format!("{:.0}%", r * 100.0)),
                    vehicle.satellites.map_or("--".to_string(), |n| n.to_string()),
                    stats.decoder.frames_decoded,
                    stats.decoder.crc_failures,
                );
            }
        }
    }

    session.disconnect().await;
}
