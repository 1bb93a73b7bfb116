//! Transport seams for the WashCall client.
//!
//! Everything that talks to the outside world goes through these traits. They
//! exchange raw JSON text; decoding and validation happen in `washcall_core`
//! so that every backend (HTTP, simulated, test doubles) gets the same
//! boundary checks.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Boxed error used at trait boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request/response side of the backend.
pub trait Backend {
    /// Fetch the initial machine list. Returns the raw response body.
    fn load_machines(&mut self) -> Result<String, BoxError>;

    /// Ask the backend to start `course` on `machine_id`.
    fn start_course(&mut self, machine_id: u32, course: &str) -> Result<String, BoxError>;

    /// Subscribe to (or unsubscribe from) completion notifications.
    fn toggle_notify(&mut self, machine_id: u32, subscribe: bool) -> Result<String, BoxError>;

    /// Hourly usage averages per weekday.
    fn congestion(&mut self) -> Result<String, BoxError>;

    /// Short advice on when the room is quiet.
    fn congestion_tip(&mut self) -> Result<String, BoxError>;

    /// Subscribe to (or unsubscribe from) availability alerts for a whole room.
    fn reserve_room(&mut self, room_id: u32, reserve: bool) -> Result<String, BoxError>;
}

impl<T: Backend + ?Sized> Backend for Box<T> {
    fn load_machines(&mut self) -> Result<String, BoxError> {
        (**self).load_machines()
    }

    fn start_course(&mut self, machine_id: u32, course: &str) -> Result<String, BoxError> {
        (**self).start_course(machine_id, course)
    }

    fn toggle_notify(&mut self, machine_id: u32, subscribe: bool) -> Result<String, BoxError> {
        (**self).toggle_notify(machine_id, subscribe)
    }

    fn congestion(&mut self) -> Result<String, BoxError> {
        (**self).congestion()
    }

    fn congestion_tip(&mut self) -> Result<String, BoxError> {
        (**self).congestion_tip()
    }

    fn reserve_room(&mut self, room_id: u32, reserve: bool) -> Result<String, BoxError> {
        (**self).reserve_room(room_id, reserve)
    }
}

/// What a single read from a realtime stream produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// One text frame.
    Text(String),
    /// Nothing arrived within the read timeout; the link is still up.
    Idle,
    /// The peer closed the connection cleanly.
    Closed,
}

/// Factory for duplex realtime connections.
pub trait Realtime: Send {
    fn connect(&mut self) -> Result<Box<dyn RealtimeStream>, BoxError>;
}

impl<T: Realtime + ?Sized> Realtime for Box<T> {
    fn connect(&mut self) -> Result<Box<dyn RealtimeStream>, BoxError> {
        (**self).connect()
    }
}

/// An established realtime connection.
pub trait RealtimeStream: Send {
    fn recv(&mut self) -> Result<Incoming, BoxError>;
}
