//! In-memory stand-in for the laundry server.
//!
//! `SimulatedServer` holds the machine table; the backend and realtime
//! handles it hands out share that table, so a course started through the
//! backend shows up on the realtime stream. One tick is one simulated minute.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::json;
use washcall_traits::{Backend, BoxError, Incoming, Realtime, RealtimeStream};

use crate::error::TransportError;

/// Course length for every simulated start, in minutes.
pub const COURSE_MINUTES: u32 = 40;
/// Washers spin for the final minutes of a course.
pub const SPIN_MINUTES: u32 = 5;
/// The only room the simulation knows.
pub const ROOM_ID: u32 = 1;

const CONGESTION_TIP: &str = "현재는 비교적 여유로운 시간대입니다. 세탁을 시작하기 좋습니다.";

/// Average machines in use per hour, as the stats endpoint reports it.
const CONGESTION: [(&str, [u8; 24]); 7] = [
    ("월", [0, 0, 0, 0, 0, 1, 1, 2, 3, 5, 4, 3, 2, 1, 3, 4, 5, 5, 4, 3, 2, 1, 0, 0]),
    ("화", [1, 0, 1, 0, 0, 1, 2, 2, 4, 5, 3, 2, 1, 1, 2, 3, 4, 4, 3, 2, 1, 1, 0, 0]),
    ("수", [0, 0, 0, 0, 1, 1, 2, 3, 3, 4, 4, 3, 2, 1, 2, 3, 4, 5, 5, 3, 2, 1, 1, 0]),
    ("목", [0, 0, 0, 1, 1, 1, 2, 2, 3, 4, 3, 2, 1, 1, 2, 3, 4, 4, 3, 2, 1, 0, 0, 0]),
    ("금", [1, 1, 0, 0, 0, 1, 2, 3, 4, 4, 3, 3, 2, 2, 3, 4, 5, 5, 5, 4, 3, 2, 1, 1]),
    ("토", [1, 1, 1, 2, 2, 3, 4, 5, 5, 5, 4, 3, 3, 2, 2, 3, 3, 4, 4, 3, 2, 1, 1, 1]),
    ("일", [2, 2, 1, 1, 1, 2, 3, 4, 5, 5, 5, 4, 3, 3, 4, 5, 5, 5, 5, 4, 3, 2, 1, 1]),
];

#[derive(Debug, Clone, Serialize)]
struct SimMachine {
    machine_id: u32,
    machine_name: String,
    room_name: String,
    machine_type: &'static str,
    status: &'static str,
    timer: Option<u32>,
    elapsed_time_minutes: u32,
    isusing: u8,
}

impl SimMachine {
    fn operating(&self) -> bool {
        matches!(self.status, "WASHING" | "SPINNING" | "DRYING")
    }

    fn timer_record(&self) -> serde_json::Value {
        json!({
            "machine_id": self.machine_id,
            "status": self.status,
            "timer": self.timer,
            "elapsed_time_minutes": self.elapsed_time_minutes,
        })
    }

    fn status_frame(&self, kind: &str) -> String {
        json!({
            "type": kind,
            "machine_id": self.machine_id,
            "machine_type": self.machine_type,
            "status": self.status,
            "timer": self.timer,
            "elapsed_time_minutes": self.elapsed_time_minutes,
            "isusing": self.isusing,
        })
        .to_string()
    }
}

fn seed() -> Vec<SimMachine> {
    let room = "기숙사 세탁실".to_string();
    vec![
        SimMachine {
            machine_id: 1,
            machine_name: "세탁기 1번".to_string(),
            room_name: room.clone(),
            machine_type: "washer",
            status: "OFF",
            timer: None,
            elapsed_time_minutes: 0,
            isusing: 0,
        },
        SimMachine {
            machine_id: 2,
            machine_name: "세탁기 2번".to_string(),
            room_name: room.clone(),
            machine_type: "washer",
            status: "WASHING",
            timer: Some(20),
            elapsed_time_minutes: 10,
            isusing: 1,
        },
        SimMachine {
            machine_id: 3,
            machine_name: "건조기 1번".to_string(),
            room_name: room,
            machine_type: "dryer",
            status: "DRYING",
            timer: Some(30),
            elapsed_time_minutes: 15,
            isusing: 0,
        },
    ]
}

#[derive(Debug, Default)]
struct SimState {
    machines: Vec<SimMachine>,
    /// Realtime frames not yet read, one queue per connected stream.
    outboxes: Vec<Arc<Mutex<VecDeque<String>>>>,
    reserved_rooms: BTreeSet<u32>,
}

impl SimState {
    fn broadcast(&mut self, frame: &str) {
        self.outboxes.retain(|o| Arc::strong_count(o) > 1);
        for outbox in &self.outboxes {
            if let Ok(mut q) = outbox.lock() {
                q.push_back(frame.to_string());
            }
        }
    }

    fn machine_mut(&mut self, machine_id: u32) -> Result<&mut SimMachine, TransportError> {
        self.machines
            .iter_mut()
            .find(|m| m.machine_id == machine_id)
            .ok_or_else(|| TransportError::Status {
                code: 404,
                detail: format!("machine {machine_id} not found"),
            })
    }

    /// Advance every running machine by one minute.
    fn tick(&mut self) {
        let mut frames = Vec::new();
        for m in self.machines.iter_mut().filter(|m| m.operating()) {
            let remaining = m.timer.unwrap_or(0).saturating_sub(1);
            m.elapsed_time_minutes += 1;
            if remaining == 0 {
                let kind = if m.isusing == 1 { "notify" } else { "room_status" };
                m.status = "FINISHED";
                m.timer = None;
                m.isusing = 0;
                frames.push(m.status_frame(kind));
                continue;
            }
            m.timer = Some(remaining);
            if m.status == "WASHING" && remaining <= SPIN_MINUTES {
                m.status = "SPINNING";
                frames.push(m.status_frame("room_status"));
            }
        }
        let running: Vec<_> = self
            .machines
            .iter()
            .filter(|m| m.operating())
            .map(SimMachine::timer_record)
            .collect();
        if !running.is_empty() {
            frames.push(json!({ "type": "timer_sync", "machines": running }).to_string());
        }
        for f in &frames {
            self.broadcast(f);
        }
    }
}

/// Shared simulated server.
#[derive(Debug, Clone)]
pub struct SimulatedServer {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedServer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedServer {
    /// A server seeded with the stock dormitory laundry room.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                machines: seed(),
                ..SimState::default()
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>, TransportError> {
        self.state
            .lock()
            .map_err(|_| TransportError::Network("simulated server state poisoned".to_string()))
    }

    pub fn backend(&self) -> SimulatedBackend {
        SimulatedBackend {
            server: self.clone(),
        }
    }

    /// Realtime handle whose streams advance the clock by one minute every `tick`.
    pub fn realtime(&self, tick: Duration) -> SimulatedRealtime {
        SimulatedRealtime {
            server: self.clone(),
            tick,
        }
    }

    /// Advance server time by one minute and queue the resulting frames.
    pub fn tick(&self) -> Result<(), TransportError> {
        self.lock()?.tick();
        Ok(())
    }
}

pub struct SimulatedBackend {
    server: SimulatedServer,
}

impl Backend for SimulatedBackend {
    fn load_machines(&mut self) -> Result<String, BoxError> {
        let state = self.server.lock()?;
        Ok(json!({ "machine_list": state.machines }).to_string())
    }

    fn start_course(&mut self, machine_id: u32, course: &str) -> Result<String, BoxError> {
        let mut state = self.server.lock()?;
        let m = state.machine_mut(machine_id)?;
        if m.operating() {
            return Err(Box::new(TransportError::Status {
                code: 409,
                detail: "machine is already in use".to_string(),
            }));
        }
        m.status = if m.machine_type == "dryer" { "DRYING" } else { "WASHING" };
        m.timer = Some(COURSE_MINUTES);
        m.elapsed_time_minutes = 0;
        m.isusing = 1;
        tracing::info!(machine_id, course, "simulated course started");
        let reply = json!({
            "message": "course started",
            "machine_type": m.machine_type,
            "status": m.status,
            "timer": m.timer,
            "elapsed_time_minutes": 0,
        });
        let frame = m.status_frame("room_status");
        state.broadcast(&frame);
        Ok(reply.to_string())
    }

    fn toggle_notify(&mut self, machine_id: u32, subscribe: bool) -> Result<String, BoxError> {
        let mut state = self.server.lock()?;
        let m = state.machine_mut(machine_id)?;
        m.isusing = u8::from(subscribe);
        Ok(json!({ "machine_id": machine_id, "isusing": m.isusing }).to_string())
    }

    fn congestion(&mut self) -> Result<String, BoxError> {
        let table: serde_json::Map<String, serde_json::Value> = CONGESTION
            .iter()
            .map(|(day, hours)| ((*day).to_string(), json!(hours)))
            .collect();
        Ok(serde_json::Value::Object(table).to_string())
    }

    fn congestion_tip(&mut self) -> Result<String, BoxError> {
        Ok(json!({ "tip": CONGESTION_TIP }).to_string())
    }

    fn reserve_room(&mut self, room_id: u32, reserve: bool) -> Result<String, BoxError> {
        if room_id != ROOM_ID {
            return Err(Box::new(TransportError::Status {
                code: 404,
                detail: format!("room {room_id} not found"),
            }));
        }
        let mut state = self.server.lock()?;
        if reserve {
            state.reserved_rooms.insert(room_id);
        } else {
            state.reserved_rooms.remove(&room_id);
        }
        tracing::info!(room_id, reserve, "simulated room reservation");
        Ok(json!({ "room_id": room_id, "isreserved": u8::from(reserve) }).to_string())
    }
}

pub struct SimulatedRealtime {
    server: SimulatedServer,
    tick: Duration,
}

impl Realtime for SimulatedRealtime {
    fn connect(&mut self) -> Result<Box<dyn RealtimeStream>, BoxError> {
        let outbox = Arc::new(Mutex::new(VecDeque::new()));
        self.server.lock()?.outboxes.push(outbox.clone());
        Ok(Box::new(SimulatedStream {
            server: self.server.clone(),
            outbox,
            tick: self.tick,
        }))
    }
}

struct SimulatedStream {
    server: SimulatedServer,
    outbox: Arc<Mutex<VecDeque<String>>>,
    tick: Duration,
}

impl SimulatedStream {
    fn pop(&self) -> Option<String> {
        self.outbox.lock().ok().and_then(|mut q| q.pop_front())
    }
}

impl RealtimeStream for SimulatedStream {
    fn recv(&mut self) -> Result<Incoming, BoxError> {
        if let Some(frame) = self.pop() {
            return Ok(Incoming::Text(frame));
        }
        if !self.tick.is_zero() {
            std::thread::sleep(self.tick);
        }
        self.server.tick()?;
        Ok(self.pop().map_or(Incoming::Idle, Incoming::Text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn washer_spins_then_finishes() {
        let server = SimulatedServer::new();
        let mut backend = server.backend();
        backend.start_course(1, "표준").unwrap();
        for _ in 0..(COURSE_MINUTES - SPIN_MINUTES) {
            server.tick().unwrap();
        }
        {
            let state = server.lock().unwrap();
            let m = &state.machines[0];
            assert_eq!(m.status, "SPINNING");
            assert_eq!(m.timer, Some(SPIN_MINUTES));
        }
        for _ in 0..SPIN_MINUTES {
            server.tick().unwrap();
        }
        let state = server.lock().unwrap();
        let m = &state.machines[0];
        assert_eq!(m.status, "FINISHED");
        assert_eq!(m.timer, None);
        assert_eq!(m.isusing, 0);
        assert_eq!(m.elapsed_time_minutes, COURSE_MINUTES);
    }

    #[test]
    fn dryers_never_spin() {
        let server = SimulatedServer::new();
        for _ in 0..29 {
            server.tick().unwrap();
        }
        let state = server.lock().unwrap();
        assert_eq!(state.machines[2].status, "DRYING");
        assert_eq!(state.machines[2].timer, Some(1));
    }
}
