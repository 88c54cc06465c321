//! Node runtime for the palisade consensus engine.
//!
//! Wires the synchronous consensus core into a running process: TOML
//! configuration, structured logging, the outbound broadcast channel, the
//! tick driver that invokes the engine on a fixed cadence, and graceful
//! shutdown. Transport, storage backends, and the CLI live elsewhere.

pub mod broadcaster;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod shutdown;

pub use broadcaster::{ChannelBroadcaster, OutboundMessage};
pub use config::NodeConfig;
pub use driver::ConsensusDriver;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use shutdown::ShutdownController;
