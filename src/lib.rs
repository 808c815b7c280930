//! gcs_link - MAVLink link core for ground control stations
//!
//! Connects to one vehicle over UDP or TCP, keeps an always-consistent
//! snapshot of its telemetry, and sends commands back.
//!
//! - [`transport`]: UDP server/client and TCP client byte links
//! - [`codec`]: MAVLink v1/v2 frame decoding and encoding
//! - [`messages`]: the message subset the link acts on, over the `mavlink` crate's definitions
//! - [`session`]: connection lifecycle, receive task, command sending
//! - [`vehicle`]: vehicle state, its store, and message dispatch
//! - [`command`]: outbound message builders
//! - [`params`], [`mission`]: parameter table and local mission model
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gcs_link::{Command, ConnectionConfig, LinkConfig, LinkSession, SocketConnector};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = LinkSession::new(Arc::new(SocketConnector), LinkConfig::default());
//! session.connect(&ConnectionConfig::udp_server(14550)).await?;
//!
//! let mut updates = session.subscribe();
//! while let Ok(state) = updates.recv().await {
//!     if state.connected {
//!         session.send_command(Command::ArmDisarm { arm: true }).await?;
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod command;
pub mod config;
pub mod messages;
pub mod mission;
pub mod params;
pub mod session;
pub mod transport;
pub mod vehicle;

pub use codec::{FrameDecoder, FrameEncoder, MavFrame, ProtocolVersion};
pub use command::{Command, CommandError, Target};
pub use config::{ConnectionConfig, LinkConfig, TransportKind};
pub use messages::MavMessage;
pub use mission::{Mission, MissionItem};
pub use params::{Parameter, ParameterTable};
pub use session::{ConnectionState, LinkSession, SessionStats};
pub use transport::{Connector, SocketConnector, TransportError};
pub use vehicle::{VehicleState, VehicleStore};
