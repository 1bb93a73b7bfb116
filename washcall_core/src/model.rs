//! View-model types: one `MachineState` per physical machine.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

pub type MachineId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineType {
    Washer,
    Dryer,
}

impl MachineType {
    /// Status a machine of this type enters when a course starts.
    pub fn start_status(self) -> MachineStatus {
        match self {
            MachineType::Washer => MachineStatus::Washing,
            MachineType::Dryer => MachineStatus::Drying,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            MachineType::Washer => "washer",
            MachineType::Dryer => "dryer",
        }
    }
}

impl FromStr for MachineType {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "washer" => Ok(MachineType::Washer),
            "dryer" => Ok(MachineType::Dryer),
            _ => Err(ClientError::UnrecognizedEnum {
                field: "machine_type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MachineStatus {
    Off,
    Washing,
    Spinning,
    Drying,
    Finished,
}

impl MachineStatus {
    pub const ALL: [MachineStatus; 5] = [
        MachineStatus::Off,
        MachineStatus::Washing,
        MachineStatus::Spinning,
        MachineStatus::Drying,
        MachineStatus::Finished,
    ];

    /// A course is in progress; timers are meaningful.
    #[inline]
    pub fn is_operating(self) -> bool {
        matches!(
            self,
            MachineStatus::Washing | MachineStatus::Spinning | MachineStatus::Drying
        )
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            MachineStatus::Off => "OFF",
            MachineStatus::Washing => "WASHING",
            MachineStatus::Spinning => "SPINNING",
            MachineStatus::Drying => "DRYING",
            MachineStatus::Finished => "FINISHED",
        }
    }
}

impl FromStr for MachineStatus {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OFF" => Ok(MachineStatus::Off),
            "WASHING" => Ok(MachineStatus::Washing),
            "SPINNING" => Ok(MachineStatus::Spinning),
            "DRYING" => Ok(MachineStatus::Drying),
            "FINISHED" => Ok(MachineStatus::Finished),
            _ => Err(ClientError::UnrecognizedEnum {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Last-known display state of one machine.
///
/// Only `merge::merge` constructs or changes these, so every value observed
/// through the registry satisfies the merge invariants (no timers while
/// dormant, never subscribed while finished).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineState {
    pub(crate) machine_id: MachineId,
    pub(crate) machine_type: MachineType,
    pub(crate) status: MachineStatus,
    pub(crate) remaining_minutes: Option<u32>,
    pub(crate) elapsed_minutes: Option<u32>,
    pub(crate) is_subscribed: bool,
    pub(crate) name: Option<String>,
    pub(crate) room: Option<String>,
}

impl MachineState {
    pub fn machine_id(&self) -> MachineId {
        self.machine_id
    }
    pub fn machine_type(&self) -> MachineType {
        self.machine_type
    }
    pub fn status(&self) -> MachineStatus {
        self.status
    }
    /// `None` means unknown.
    pub fn remaining_minutes(&self) -> Option<u32> {
        self.remaining_minutes
    }
    /// `None` means unknown.
    pub fn elapsed_minutes(&self) -> Option<u32> {
        self.elapsed_minutes
    }
    pub fn is_subscribed(&self) -> bool {
        self.is_subscribed
    }
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }
    pub fn is_operating(&self) -> bool {
        self.status.is_operating()
    }

    /// Course length in minutes, computed from the two timers on every call.
    pub fn total_minutes(&self) -> Option<u32> {
        match (self.elapsed_minutes, self.remaining_minutes) {
            (Some(e), Some(r)) => Some(e.saturating_add(r)),
            _ => None,
        }
    }

    /// Completed share of the course in percent (0..=100), when computable.
    pub fn progress_percent(&self) -> Option<u8> {
        let total = self.total_minutes()?;
        if total == 0 {
            return None;
        }
        let elapsed = u64::from(self.elapsed_minutes?);
        Some(((elapsed * 100) / u64::from(total)).min(100) as u8)
    }
}

/// Incoming partial update. Every field except `machine_id` is optional and
/// `None` always means "not mentioned, keep what you have".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMachineUpdate {
    pub machine_id: MachineId,
    pub machine_type: Option<MachineType>,
    pub status: Option<MachineStatus>,
    pub remaining_minutes: Option<u32>,
    pub elapsed_minutes: Option<u32>,
    pub is_subscribed: Option<bool>,
    pub name: Option<String>,
    pub room: Option<String>,
}

impl PartialMachineUpdate {
    pub fn new(machine_id: MachineId) -> Self {
        Self {
            machine_id,
            machine_type: None,
            status: None,
            remaining_minutes: None,
            elapsed_minutes: None,
            is_subscribed: None,
            name: None,
            room: None,
        }
    }

    pub fn machine_type(mut self, t: MachineType) -> Self {
        self.machine_type = Some(t);
        self
    }

    pub fn status(mut self, s: MachineStatus) -> Self {
        self.status = Some(s);
        self
    }

    pub fn remaining(mut self, minutes: u32) -> Self {
        self.remaining_minutes = Some(minutes);
        self
    }

    pub fn elapsed(mut self, minutes: u32) -> Self {
        self.elapsed_minutes = Some(minutes);
        self
    }

    pub fn subscribed(mut self, on: bool) -> Self {
        self.is_subscribed = Some(on);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// True when the update mentions nothing beyond the identifier.
    pub fn is_empty(&self) -> bool {
        self.machine_type.is_none()
            && self.status.is_none()
            && self.remaining_minutes.is_none()
            && self.elapsed_minutes.is_none()
            && self.is_subscribed.is_none()
            && self.name.is_none()
            && self.room.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive_and_rejects_free_text() {
        assert_eq!(
            " washing ".parse::<MachineStatus>().unwrap(),
            MachineStatus::Washing
        );
        assert_eq!(
            "FINISHED".parse::<MachineStatus>().unwrap(),
            MachineStatus::Finished
        );
        let err = "RINSING".parse::<MachineStatus>().unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnrecognizedEnum {
                field: "status",
                ..
            }
        ));
    }

    #[test]
    fn only_three_statuses_are_operating() {
        let operating: Vec<_> = MachineStatus::ALL
            .iter()
            .filter(|s| s.is_operating())
            .collect();
        assert_eq!(
            operating,
            vec![
                &MachineStatus::Washing,
                &MachineStatus::Spinning,
                &MachineStatus::Drying
            ]
        );
    }

    #[test]
    fn start_status_depends_on_type() {
        assert_eq!(MachineType::Washer.start_status(), MachineStatus::Washing);
        assert_eq!(MachineType::Dryer.start_status(), MachineStatus::Drying);
    }
}
