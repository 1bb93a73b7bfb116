//! Boundary decoding of backend payloads.
//!
//! Raw JSON from the transport is validated here and turned into
//! [`PartialMachineUpdate`]s before anything reaches the merger. Records are
//! decoded one at a time so a malformed entry inside a batch is skipped and
//! logged without affecting its neighbours. Within a record, a field with an
//! unusable value is treated as absent; only a missing `machine_id` loses the
//! record.
//!
//! Wire field names follow the backend (`machine_id`, `timer`,
//! `elapsed_time_minutes`, `isusing`); camelCase and descriptive aliases are
//! accepted as well. When several spellings are present the canonical one
//! wins.

use serde_json::{Map, Value};

use crate::error::{ClientError, Result};
use crate::model::{MachineId, MachineStatus, MachineType, PartialMachineUpdate};

const MACHINE_ID: &[&str] = &["machine_id", "machineId"];
const MACHINE_TYPE: &[&str] = &["machine_type", "machineType"];
const MACHINE_NAME: &[&str] = &["machine_name", "machineName"];
const ROOM_NAME: &[&str] = &["room_name", "roomName"];
const STATUS: &[&str] = &["status"];
const TIMER: &[&str] = &["timer", "remaining_minutes", "remainingMinutes"];
const ELAPSED: &[&str] = &["elapsed_time_minutes", "elapsed_minutes", "elapsedMinutes"];
const SUBSCRIBED: &[&str] = &["isusing", "is_subscribed", "isSubscribed", "subscribed"];
const RESERVED: &[&str] = &["isreserved", "is_reserved", "isReserved", "reserved"];

/// A decoded realtime message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeMessage {
    /// Single-machine update (`status` / `room_status`).
    Status(PartialMachineUpdate),
    /// Single-machine update that should also be surfaced to the user.
    Notify(PartialMachineUpdate),
    /// Periodic batch of timers. `skipped` counts records that failed to decode.
    TimerSync {
        updates: Vec<PartialMachineUpdate>,
        skipped: usize,
    },
}

/// Decoded initial load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineList {
    pub updates: Vec<PartialMachineUpdate>,
    pub skipped: usize,
}

/// First non-null value among `keys`, in order.
fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// Minutes arrive as integers, occasionally as floats or numeric strings.
/// Negative or non-numeric values are treated as unknown.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn minutes(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.floor() as u64))
            .and_then(|m| u32::try_from(m).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Flags arrive as `true/false`, `1/0`, `1.0` or their string forms.
fn flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n
            .as_i64()
            .map(|i| i != 0)
            .or_else(|| n.as_f64().map(|f| f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn text(v: &Value) -> Option<&str> {
    v.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Field reader for one record. Unusable values are logged and dropped.
struct Record<'a> {
    obj: &'a Map<String, Value>,
    machine_id: MachineId,
}

impl<'a> Record<'a> {
    fn field<T>(&self, keys: &[&'static str], parse: impl Fn(&'a Value) -> Option<T>) -> Option<T> {
        let raw = pick(self.obj, keys)?;
        let parsed = parse(raw);
        if parsed.is_none() {
            tracing::warn!(
                machine_id = self.machine_id,
                field = keys[0],
                value = %raw,
                "ignoring unusable field value"
            );
        }
        parsed
    }

    fn enum_field<T>(&self, keys: &[&'static str]) -> Option<T>
    where
        T: std::str::FromStr<Err = ClientError>,
    {
        self.field(keys, text)
            .and_then(|s| parse_or_warn(self.machine_id, s))
    }

    fn minutes(&self, keys: &[&'static str]) -> Option<u32> {
        self.field(keys, minutes)
    }

    fn flag(&self, keys: &[&'static str]) -> Option<bool> {
        self.field(keys, flag)
    }

    fn name(&self, keys: &[&'static str]) -> Option<String> {
        pick(self.obj, keys).and_then(text).map(str::to_string)
    }
}

/// Unrecognized enum values are treated as absent, never stored.
fn parse_or_warn<T>(machine_id: MachineId, raw: &str) -> Option<T>
where
    T: std::str::FromStr<Err = ClientError>,
{
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(machine_id, error = %e, "ignoring unrecognized value");
            None
        }
    }
}

fn machine_id(obj: &Map<String, Value>) -> Result<MachineId> {
    let raw = pick(obj, MACHINE_ID)
        .ok_or_else(|| ClientError::Decode("record has no `machine_id`".to_string()))?;
    raw.as_u64()
        .and_then(|n| MachineId::try_from(n).ok())
        .ok_or_else(|| ClientError::Decode(format!("invalid machine_id {raw}")))
}

fn decode_record(value: Value) -> Result<PartialMachineUpdate> {
    let Value::Object(obj) = value else {
        return Err(ClientError::Decode("record is not an object".to_string()));
    };
    let rec = Record {
        machine_id: machine_id(&obj)?,
        obj: &obj,
    };
    let mut update = PartialMachineUpdate::new(rec.machine_id);
    update.machine_type = rec.enum_field::<MachineType>(MACHINE_TYPE);
    update.status = rec.enum_field::<MachineStatus>(STATUS);
    update.remaining_minutes = rec.minutes(TIMER);
    update.elapsed_minutes = rec.minutes(ELAPSED);
    update.is_subscribed = rec.flag(SUBSCRIBED);
    update.name = rec.name(MACHINE_NAME);
    update.room = rec.name(ROOM_NAME);
    Ok(update)
}

/// Decode a list of records, isolating failures per record.
fn decode_records(records: Vec<Value>, context: &'static str) -> (Vec<PartialMachineUpdate>, usize) {
    let mut updates = Vec::with_capacity(records.len());
    let mut skipped = 0usize;
    for (idx, rec) in records.into_iter().enumerate() {
        match decode_record(rec) {
            Ok(u) => updates.push(u),
            Err(e) => {
                skipped += 1;
                tracing::warn!(context, index = idx, error = %e, "skipping malformed record");
            }
        }
    }
    (updates, skipped)
}

fn parse_json(body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Decode the initial load body: `{"machine_list": [...]}` or a bare array.
pub fn decode_machine_list(body: &str) -> Result<MachineList> {
    let records = match parse_json(body)? {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("machine_list") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ClientError::Decode(
                    "load response has no `machine_list` array".to_string(),
                ));
            }
        },
        _ => {
            return Err(ClientError::Decode(
                "load response is neither an object nor an array".to_string(),
            ));
        }
    };
    let (updates, skipped) = decode_records(records, "load");
    Ok(MachineList { updates, skipped })
}

/// Decode one realtime frame.
pub fn decode_message(text: &str) -> Result<RealtimeMessage> {
    let mut value = parse_json(text)?;
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ClientError::Decode("message has no `type`".to_string()))?;

    match kind.as_str() {
        "status" | "room_status" => decode_record(value).map(RealtimeMessage::Status),
        "notify" => decode_record(value).map(RealtimeMessage::Notify),
        "timer_sync" => {
            let records = match value.get_mut("machines").map(Value::take) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(ClientError::Decode(
                        "timer_sync has no `machines` array".to_string(),
                    ));
                }
            };
            let (updates, skipped) = decode_records(records, "timer_sync");
            Ok(RealtimeMessage::TimerSync { updates, skipped })
        }
        other => Err(ClientError::Decode(format!("unknown message type {other:?}"))),
    }
}

/// Parse a command response body into an object. Anything else (empty body,
/// plain message string) confirms without carrying state.
fn response_object(context: &'static str, body: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => obj,
        Ok(_) => Map::new(),
        Err(e) => {
            tracing::debug!(context, error = %e, "response carries no state");
            Map::new()
        }
    }
}

/// Decode the confirmation of a course start.
///
/// The backend sometimes answers with only a message; an empty or
/// non-object body confirms without changing anything.
pub fn decode_course_started(machine_id: MachineId, body: &str) -> PartialMachineUpdate {
    let obj = response_object("start_course", body);
    let rec = Record {
        obj: &obj,
        machine_id,
    };
    let mut update = PartialMachineUpdate::new(machine_id);
    update.status = rec.enum_field::<MachineStatus>(STATUS);
    update.machine_type = rec.enum_field::<MachineType>(MACHINE_TYPE);
    update.remaining_minutes = rec.minutes(TIMER);
    update.elapsed_minutes = rec.minutes(ELAPSED);
    update.name = rec.name(MACHINE_NAME);
    update.room = rec.name(ROOM_NAME);
    update
}

/// Decode the confirmation of a notify toggle. When the backend does not
/// echo the flag, the requested value stands.
pub fn decode_notify_toggled(
    machine_id: MachineId,
    requested: bool,
    body: &str,
) -> PartialMachineUpdate {
    let obj = response_object("notify_me", body);
    let confirmed = Record {
        obj: &obj,
        machine_id,
    }
    .flag(SUBSCRIBED)
    .unwrap_or(requested);
    if confirmed != requested {
        tracing::info!(machine_id, requested, confirmed, "backend overrode notify toggle");
    }
    PartialMachineUpdate::new(machine_id).subscribed(confirmed)
}

/// Decode the confirmation of a room reservation; the requested value stands
/// unless the backend echoes a different one.
pub fn decode_room_reserved(room_id: u32, requested: bool, body: &str) -> bool {
    let obj = response_object("reserve", body);
    let confirmed = pick(&obj, RESERVED).and_then(flag).unwrap_or(requested);
    if confirmed != requested {
        tracing::info!(room_id, requested, confirmed, "backend overrode room reservation");
    }
    confirmed
}

/// Decode the congestion tip: `{"tip": ...}` or `{"message": ...}`. A body
/// without usable text means there is no tip right now.
pub fn decode_tip(body: &str) -> Option<String> {
    let obj = response_object("tip", body);
    pick(&obj, &["tip", "message"])
        .and_then(text)
        .map(str::to_string)
}
