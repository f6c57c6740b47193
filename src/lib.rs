//! Moto - Yaskawa Motoman Simple Message client
//!
//! Talks the binary Simple Message protocol spoken by MotoROS on Motoman
//! controllers. Each controller exposes four TCP servers, one per role:
//! motion commands, state telemetry, digital I/O and real-time streaming.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use moto::{Config, Moto};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_from_path("config/default_config.yaml")?;
//!     let robot = Moto::connect(config)?;
//!
//!     let reply = robot.motion().check_motion_ready(0, -1)?;
//!     println!("Motion ready: {}", reply.is_success());
//!
//!     if let Some(r1) = robot.control_group("R1") {
//!         println!("R1 position: {:?}", r1.position());
//!     }
//!
//!     robot.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Transport**: byte pipe to one `(host, port)`; TCP or scripted mock
//! - **Codec**: length-prefixed frames, header plus catalogued body
//! - **SimpleMessageConnection**: lifecycle state and the locked request/reply cycle
//! - **MotionConnection / IoConnection**: synchronous commands
//! - **StateConnection**: background reader fanning telemetry out to callbacks
//! - **RealTimeConnection**: start/stop of real-time mode plus state/command exchange
//! - **ControlGroup / Moto**: per-group views and the session tying it together

pub mod codec;
pub mod config;
pub mod connection;
pub mod control_group;
pub mod error;
pub mod io_connection;
pub mod json_output;
pub mod messages;
pub mod motion_connection;
pub mod realtime_connection;
pub mod robot;
pub mod state_connection;
pub mod transport;

pub use config::{Config, PortConfig, RobotConfig, StartConfig};
pub use connection::{ConnectionState, SimpleMessageConnection};
pub use control_group::{ControlGroup, ControlGroupDefinition};
pub use error::{FrameError, MotoError, Result};
pub use io_connection::{IoConnection, IoOutcome, TCP_PORT_IO};
pub use motion_connection::{JointTrajectoryPoint, MotionConnection, ALL_GROUPS, NO_SEQUENCE, TCP_PORT_MOTION};
pub use realtime_connection::{RealTimeConnection, TCP_PORT_REALTIME};
pub use robot::{Moto, SessionTransports};
pub use state_connection::{CallbackRegistry, StateConnection, TCP_PORT_STATE};
pub use transport::{TcpTransport, Transport};
