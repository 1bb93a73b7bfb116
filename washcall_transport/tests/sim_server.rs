use std::time::Duration;

use serde_json::Value;
use washcall_traits::{Backend, Incoming, Realtime};
use washcall_transport::{SimulatedServer, TransportError};

fn frame_type(incoming: &Incoming) -> Option<String> {
    match incoming {
        Incoming::Text(t) => serde_json::from_str::<Value>(t)
            .ok()
            .and_then(|v| v.get("type").and_then(Value::as_str).map(str::to_owned)),
        _ => None,
    }
}

#[test]
fn load_returns_seeded_room() {
    let server = SimulatedServer::new();
    let body = server.backend().load_machines().unwrap();
    let v: Value = serde_json::from_str(&body).unwrap();
    let list = v["machine_list"].as_array().unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0]["machine_name"], "세탁기 1번");
    assert_eq!(list[0]["timer"], Value::Null);
    assert_eq!(list[1]["isusing"], 1);
    assert_eq!(list[2]["machine_type"], "dryer");
}

#[test]
fn start_is_broadcast_to_connected_streams() {
    let server = SimulatedServer::new();
    let mut rt = server.realtime(Duration::ZERO);
    let mut stream = rt.connect().unwrap();
    let body = server.backend().start_course(1, "표준").unwrap();
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["status"], "WASHING");
    assert_eq!(v["timer"], 40);

    let first = stream.recv().unwrap();
    assert_eq!(frame_type(&first).as_deref(), Some("room_status"));
    // Next read ticks the server and yields a timer_sync.
    let second = stream.recv().unwrap();
    assert_eq!(frame_type(&second).as_deref(), Some("timer_sync"));
}

#[test]
fn busy_and_unknown_machines_are_rejected() {
    let server = SimulatedServer::new();
    let mut backend = server.backend();
    let err = backend.start_course(2, "쾌속").unwrap_err();
    match err.downcast_ref::<TransportError>() {
        Some(TransportError::Status { code, .. }) => assert_eq!(*code, 409),
        other => panic!("unexpected {other:?}"),
    }
    let err = backend.toggle_notify(42, true).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TransportError>(),
        Some(TransportError::Status { code: 404, .. })
    ));
}

#[test]
fn subscribed_machine_finishing_sends_notify() {
    let server = SimulatedServer::new();
    let mut rt = server.realtime(Duration::ZERO);
    let mut stream = rt.connect().unwrap();
    // Machine 2 is subscribed with 20 minutes left.
    let mut kinds = Vec::new();
    for _ in 0..60 {
        if let Some(k) = frame_type(&stream.recv().unwrap()) {
            kinds.push(k);
        }
        if kinds.iter().any(|k| k == "notify") {
            break;
        }
    }
    assert!(kinds.iter().any(|k| k == "notify"), "frames: {kinds:?}");
    let body = server.backend().load_machines().unwrap();
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["machine_list"][1]["status"], "FINISHED");
    assert_eq!(v["machine_list"][1]["isusing"], 0);
}

#[test]
fn toggle_echoes_flag() {
    let server = SimulatedServer::new();
    let body = server.backend().toggle_notify(3, true).unwrap();
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["isusing"], 1);
}

#[test]
fn congestion_covers_the_week() {
    let body = SimulatedServer::new().backend().congestion().unwrap();
    let v: Value = serde_json::from_str(&body).unwrap();
    let days = v.as_object().unwrap();
    assert_eq!(days.len(), 7);
    for day in ["월", "화", "수", "목", "금", "토", "일"] {
        assert_eq!(days[day].as_array().unwrap().len(), 24, "{day}");
    }
    assert_eq!(v["토"][9], 5);
}

#[test]
fn tip_is_never_blank() {
    let body = SimulatedServer::new().backend().congestion_tip().unwrap();
    let v: Value = serde_json::from_str(&body).unwrap();
    assert!(!v["tip"].as_str().unwrap().trim().is_empty());
}

#[test]
fn only_the_simulated_room_can_be_reserved() {
    let server = SimulatedServer::new();
    let mut backend = server.backend();
    let body = backend.reserve_room(1, true).unwrap();
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["room_id"], 1);
    assert_eq!(v["isreserved"], 1);
    let body = backend.reserve_room(1, false).unwrap();
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["isreserved"], 0);

    let err = backend.reserve_room(9, true).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TransportError>(),
        Some(TransportError::Status { code: 404, .. })
    ));
}
