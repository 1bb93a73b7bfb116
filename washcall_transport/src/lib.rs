//! Concrete transports for the WashCall client: blocking HTTP for commands,
//! a WebSocket for status updates, and an in-memory simulated server.

pub mod error;
pub mod http;
pub mod sim;
pub mod ws;

pub use error::TransportError;
pub use http::HttpBackend;
pub use sim::{SimulatedBackend, SimulatedRealtime, SimulatedServer};
pub use ws::{WsRealtime, ws_url};
