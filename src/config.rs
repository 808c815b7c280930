//! Link configuration
//!
//! [`ConnectionConfig`] says where the autopilot is; [`LinkConfig`] tunes how
//! the session talks to it. Both deserialize from partial documents, with
//! missing fields taking their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::ProtocolVersion;

/// Default MAVLink UDP port used by simulators and telemetry radios
pub const DEFAULT_PORT: u16 = 14550;

/// Transport family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Udp,
    Tcp,
}

/// Concrete endpoint a connection resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Bind `0.0.0.0:port` and reply to whoever sends first
    UdpServer { port: u16 },
    /// Send to a fixed `host:port`
    UdpClient { host: String, port: u16 },
    /// Stream connection to `host:port`
    TcpClient { host: String, port: u16 },
}

/// Where to reach the vehicle
///
/// Immutable once a session starts; changing it requires a reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub kind: TransportKind,
    /// Remote host (ignored for a UDP server)
    pub host: String,
    pub port: u16,
    /// Listen instead of connecting out (UDP only)
    pub server: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Udp,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            server: true,
        }
    }
}

impl ConnectionConfig {
    pub fn udp_server(port: u16) -> Self {
        Self {
            kind: TransportKind::Udp,
            port,
            server: true,
            ..Default::default()
        }
    }

    pub fn udp_client(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: TransportKind::Udp,
            host: host.into(),
            port,
            server: false,
        }
    }

    pub fn tcp_client(host: impl Into<String>, port: u16) -> Self {
        Self {
            kind: TransportKind::Tcp,
            host: host.into(),
            port,
            server: false,
        }
    }

    /// Resolve kind and listen flag into a concrete endpoint.
    ///
    /// TCP is client-only; the listen flag is ignored for it.
    pub fn endpoint(&self) -> Endpoint {
        match (self.kind, self.server) {
            (TransportKind::Udp, true) => Endpoint::UdpServer { port: self.port },
            (TransportKind::Udp, false) => Endpoint::UdpClient {
                host: self.host.clone(),
                port: self.port,
            },
            (TransportKind::Tcp, _) => Endpoint::TcpClient {
                host: self.host.clone(),
                port: self.port,
            },
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.endpoint() {
            Endpoint::UdpServer { port } => write!(f, "udp listen 0.0.0.0:{port}"),
            Endpoint::UdpClient { host, port } => write!(f, "udp {host}:{port}"),
            Endpoint::TcpClient { host, port } => write!(f, "tcp {host}:{port}"),
        }
    }
}

/// Session tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// GCS system ID stamped on outbound frames (default: 255)
    pub system_id: u8,
    /// GCS component ID stamped on outbound frames (default: 190, MAV_COMP_ID_MISSIONPLANNER)
    pub component_id: u8,
    /// Outbound protocol version (default: v2)
    pub version: ProtocolVersion,
    /// Silence after which the vehicle counts as lost (default: 5000)
    pub heartbeat_timeout_ms: u64,
    /// How often heartbeat loss is checked (default: 1000)
    pub check_interval_ms: u64,
    /// Period of the GCS heartbeat sent to the vehicle, `None` to disable
    pub gcs_heartbeat_interval_ms: Option<u64>,
    /// Snapshots buffered per state subscriber before it starts lagging
    pub subscriber_capacity: usize,
    /// Size of a single transport read
    pub recv_buffer_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            system_id: 255,
            component_id: 190,
            version: ProtocolVersion::V2,
            heartbeat_timeout_ms: 5_000,
            check_interval_ms: 1_000,
            gcs_heartbeat_interval_ms: Some(1_000),
            subscriber_capacity: 256,
            recv_buffer_size: 4096,
        }
    }
}

impl LinkConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(1))
    }

    pub fn gcs_heartbeat_interval(&self) -> Option<Duration> {
        self.gcs_heartbeat_interval_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}
