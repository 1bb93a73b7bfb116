//! Field-by-field reconciliation of partial updates.
//!
//! Three producers feed the same machine: full snapshots from the initial
//! load, status+timer broadcasts from the realtime link, and subscription or
//! status edits from local optimistic actions. None of them may regress a
//! field it does not mention, which is what makes applying them in arrival
//! order converge regardless of which one is "newer".
//!
//! Precedence, per field:
//! 1. `status`: incoming wins when present, else current, else `OFF`.
//! 2. `remaining_minutes` / `elapsed_minutes`: independently, incoming wins
//!    when present, else current. Both are cleared when the merged status is
//!    `OFF` or `FINISHED`.
//! 3. `is_subscribed`: incoming wins when present, else current, else false.
//!    A merged status of `FINISHED` forces false.
//! 4. `machine_type`: fixed at creation; later values are ignored.
//! 5. `name` / `room`: incoming wins when present, else current.

use crate::error::{ClientError, Result};
use crate::model::{MachineState, MachineStatus, PartialMachineUpdate};

/// What a merge did to the status and subscription of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status before the merge; `None` when the machine was just created.
    pub previous: Option<MachineStatus>,
    pub current: MachineStatus,
    /// The machine was (or was about to be) subscribed and completion cleared it.
    pub subscription_cleared: bool,
}

impl Transition {
    pub fn status_changed(&self) -> bool {
        self.previous != Some(self.current)
    }

    /// The machine entered `FINISHED` with this merge.
    pub fn finished_now(&self) -> bool {
        self.current == MachineStatus::Finished && self.previous != Some(MachineStatus::Finished)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub state: MachineState,
    pub transition: Transition,
}

/// Merge `incoming` into `current`, producing the next state.
///
/// Fails only when no current state exists and `incoming` lacks
/// `machine_type`; nothing else about an update can be fatal.
pub fn merge(current: Option<&MachineState>, incoming: &PartialMachineUpdate) -> Result<Merged> {
    if let Some(cur) = current {
        debug_assert_eq!(cur.machine_id, incoming.machine_id);
    }

    let machine_type = match (current, incoming.machine_type) {
        (Some(cur), _) => cur.machine_type,
        (None, Some(t)) => t,
        (None, None) => {
            return Err(ClientError::MissingField {
                machine_id: incoming.machine_id,
                field: "machine_type",
            });
        }
    };

    let previous = current.map(|c| c.status);
    let status = incoming
        .status
        .or(previous)
        .unwrap_or(MachineStatus::Off);

    let (remaining_minutes, elapsed_minutes) = if status.is_operating() {
        (
            incoming
                .remaining_minutes
                .or_else(|| current.and_then(|c| c.remaining_minutes)),
            incoming
                .elapsed_minutes
                .or_else(|| current.and_then(|c| c.elapsed_minutes)),
        )
    } else {
        (None, None)
    };

    let wanted_subscription = incoming
        .is_subscribed
        .or_else(|| current.map(|c| c.is_subscribed))
        .unwrap_or(false);
    let finished = status == MachineStatus::Finished;
    let is_subscribed = wanted_subscription && !finished;

    let name = incoming
        .name
        .clone()
        .or_else(|| current.and_then(|c| c.name.clone()));
    let room = incoming
        .room
        .clone()
        .or_else(|| current.and_then(|c| c.room.clone()));

    Ok(Merged {
        state: MachineState {
            machine_id: incoming.machine_id,
            machine_type,
            status,
            remaining_minutes,
            elapsed_minutes,
            is_subscribed,
            name,
            room,
        },
        transition: Transition {
            previous,
            current: status,
            subscription_cleared: finished && wanted_subscription,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MachineType;

    fn washer(id: u32) -> MachineState {
        merge(
            None,
            &PartialMachineUpdate::new(id).machine_type(MachineType::Washer),
        )
        .unwrap()
        .state
    }

    #[test]
    fn creation_defaults() {
        let s = washer(1);
        assert_eq!(s.status(), MachineStatus::Off);
        assert_eq!(s.remaining_minutes(), None);
        assert_eq!(s.elapsed_minutes(), None);
        assert!(!s.is_subscribed());
    }

    #[test]
    fn creation_without_type_is_missing_field() {
        let err = merge(None, &PartialMachineUpdate::new(9).status(MachineStatus::Washing))
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::MissingField {
                machine_id: 9,
                field: "machine_type"
            }
        );
    }

    #[test]
    fn type_is_fixed_after_creation() {
        let s = washer(1);
        let m = merge(
            Some(&s),
            &PartialMachineUpdate::new(1).machine_type(MachineType::Dryer),
        )
        .unwrap();
        assert_eq!(m.state.machine_type(), MachineType::Washer);
    }

    #[test]
    fn timers_merge_independently() {
        let s = washer(1);
        let s = merge(
            Some(&s),
            &PartialMachineUpdate::new(1)
                .status(MachineStatus::Washing)
                .remaining(30)
                .elapsed(5),
        )
        .unwrap()
        .state;
        let s = merge(Some(&s), &PartialMachineUpdate::new(1).remaining(20))
            .unwrap()
            .state;
        assert_eq!(s.remaining_minutes(), Some(20));
        assert_eq!(s.elapsed_minutes(), Some(5));
        assert_eq!(s.total_minutes(), Some(25));
    }

    #[test]
    fn finished_clears_timers_and_subscription() {
        let s = washer(1);
        let s = merge(
            Some(&s),
            &PartialMachineUpdate::new(1)
                .status(MachineStatus::Washing)
                .remaining(3)
                .elapsed(40)
                .subscribed(true),
        )
        .unwrap()
        .state;
        let m = merge(
            Some(&s),
            &PartialMachineUpdate::new(1)
                .status(MachineStatus::Finished)
                .remaining(0)
                .subscribed(true),
        )
        .unwrap();
        assert_eq!(m.state.remaining_minutes(), None);
        assert_eq!(m.state.elapsed_minutes(), None);
        assert!(!m.state.is_subscribed());
        assert!(m.transition.finished_now());
        assert!(m.transition.subscription_cleared);
    }

    #[test]
    fn name_survives_updates_that_omit_it() {
        let s = merge(
            None,
            &PartialMachineUpdate::new(2)
                .machine_type(MachineType::Dryer)
                .name("Dryer A")
                .room("Dorm"),
        )
        .unwrap()
        .state;
        let s = merge(Some(&s), &PartialMachineUpdate::new(2).status(MachineStatus::Drying))
            .unwrap()
            .state;
        assert_eq!(s.name(), Some("Dryer A"));
        assert_eq!(s.room(), Some("Dorm"));
    }

    #[test]
    fn transition_reports_previous_status() {
        let s = washer(3);
        let m = merge(Some(&s), &PartialMachineUpdate::new(3).status(MachineStatus::Washing))
            .unwrap();
        assert_eq!(m.transition.previous, Some(MachineStatus::Off));
        assert!(m.transition.status_changed());
        assert!(!m.transition.finished_now());
        assert!(!m.transition.subscription_cleared);
    }
}
