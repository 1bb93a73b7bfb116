//! Test and helper doubles for washcall_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use washcall_traits::{Backend, BoxError, Incoming, Realtime, RealtimeStream};

/// A command the scripted backend received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load,
    StartCourse { machine_id: u32, course: String },
    ToggleNotify { machine_id: u32, subscribe: bool },
    Congestion,
    CongestionTip,
    ReserveRoom { room_id: u32, reserve: bool },
}

/// Backend that answers from pre-programmed responses and records calls.
///
/// Unscripted commands succeed with an empty JSON object.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    load: Option<Result<String, String>>,
    start: VecDeque<Result<String, String>>,
    toggle: VecDeque<Result<String, String>>,
    congestion: Option<Result<String, String>>,
    tip: Option<Result<String, String>>,
    reserve: VecDeque<Result<String, String>>,
    calls: Vec<Call>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load(mut self, body: &str) -> Self {
        self.load = Some(Ok(body.to_string()));
        self
    }

    pub fn with_load_error(mut self, msg: &str) -> Self {
        self.load = Some(Err(msg.to_string()));
        self
    }

    pub fn push_start(&mut self, response: Result<&str, &str>) {
        self.start
            .push_back(response.map(str::to_string).map_err(str::to_string));
    }

    pub fn push_toggle(&mut self, response: Result<&str, &str>) {
        self.toggle
            .push_back(response.map(str::to_string).map_err(str::to_string));
    }

    pub fn with_congestion(mut self, body: &str) -> Self {
        self.congestion = Some(Ok(body.to_string()));
        self
    }

    pub fn with_tip(mut self, response: Result<&str, &str>) -> Self {
        self.tip = Some(response.map(str::to_string).map_err(str::to_string));
        self
    }

    pub fn push_reserve(&mut self, response: Result<&str, &str>) {
        self.reserve
            .push_back(response.map(str::to_string).map_err(str::to_string));
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}

fn answer(slot: Option<Result<String, String>>) -> Result<String, BoxError> {
    match slot {
        Some(Ok(body)) => Ok(body),
        Some(Err(msg)) => Err(msg.into()),
        None => Ok("{}".to_string()),
    }
}

impl Backend for ScriptedBackend {
    fn load_machines(&mut self) -> Result<String, BoxError> {
        self.calls.push(Call::Load);
        answer(self.load.clone())
    }

    fn start_course(&mut self, machine_id: u32, course: &str) -> Result<String, BoxError> {
        self.calls.push(Call::StartCourse {
            machine_id,
            course: course.to_string(),
        });
        answer(self.start.pop_front())
    }

    fn toggle_notify(&mut self, machine_id: u32, subscribe: bool) -> Result<String, BoxError> {
        self.calls.push(Call::ToggleNotify {
            machine_id,
            subscribe,
        });
        answer(self.toggle.pop_front())
    }

    fn congestion(&mut self) -> Result<String, BoxError> {
        self.calls.push(Call::Congestion);
        answer(self.congestion.clone())
    }

    fn congestion_tip(&mut self) -> Result<String, BoxError> {
        self.calls.push(Call::CongestionTip);
        answer(self.tip.clone())
    }

    fn reserve_room(&mut self, room_id: u32, reserve: bool) -> Result<String, BoxError> {
        self.calls.push(Call::ReserveRoom { room_id, reserve });
        answer(self.reserve.pop_front())
    }
}

/// One scripted connection: the frames it yields, then how it ends.
#[derive(Debug, Clone)]
pub struct ScriptedConnection {
    pub frames: Vec<String>,
    /// `Some(msg)` ends with a read error, `None` with a clean close.
    pub error: Option<String>,
}

/// Realtime double that hands out scripted connections in order and refuses
/// to connect once the script is exhausted.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRealtime {
    connections: Arc<Mutex<VecDeque<ScriptedConnection>>>,
    attempts: Arc<Mutex<usize>>,
}

impl ScriptedRealtime {
    pub fn new(connections: Vec<ScriptedConnection>) -> Self {
        Self {
            connections: Arc::new(Mutex::new(connections.into())),
            attempts: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.lock().map(|g| *g).unwrap_or(0)
    }
}

struct ScriptedStream {
    frames: VecDeque<String>,
    error: Option<String>,
}

impl RealtimeStream for ScriptedStream {
    fn recv(&mut self) -> Result<Incoming, BoxError> {
        if let Some(f) = self.frames.pop_front() {
            return Ok(Incoming::Text(f));
        }
        match self.error.take() {
            Some(msg) => Err(msg.into()),
            None => Ok(Incoming::Closed),
        }
    }
}

impl Realtime for ScriptedRealtime {
    fn connect(&mut self) -> Result<Box<dyn RealtimeStream>, BoxError> {
        if let Ok(mut n) = self.attempts.lock() {
            *n += 1;
        }
        let next = self
            .connections
            .lock()
            .map_err(|_| "script poisoned")?
            .pop_front();
        match next {
            Some(c) => Ok(Box::new(ScriptedStream {
                frames: c.frames.into(),
                error: c.error,
            })),
            None => {
                // Slow down a supervisor spinning on a real clock.
                std::thread::sleep(Duration::from_millis(1));
                Err("connection refused".into())
            }
        }
    }
}
