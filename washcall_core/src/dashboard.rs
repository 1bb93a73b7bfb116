//! Application shell: owns the registry and the backend, and is the only
//! place that mutates machine state.
//!
//! Every payload, whether loaded, broadcast, optimistic or confirming, goes
//! through [`Registry::apply`], so the merge invariants hold no matter which
//! source produced it.

use std::collections::BTreeSet;

use washcall_traits::Backend;

use crate::congestion::{self, CongestionTable};
use crate::error::{ClientError, Result};
use crate::model::{MachineId, MachineState, MachineStatus, MachineType, PartialMachineUpdate};
use crate::realtime::LinkEvent;
use crate::registry::Registry;
use crate::transport_error::map_transport_error;
use crate::wire::{self, RealtimeMessage};

/// Connection state shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// Something the outer shell should react to (re-render, alert, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Machine state changed (or was re-asserted); re-render its card.
    Updated(MachineId),
    /// A `notify` message arrived for this machine.
    Notification {
        machine_id: MachineId,
        status: MachineStatus,
    },
    /// The machine finished while the user was subscribed; the local flag is
    /// already cleared and the backend should be told.
    SubscriptionReleased(MachineId),
    Link(LinkStatus),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub dropped: usize,
}

/// Fields an optimistic edit touched, with their values before the edit.
#[derive(Debug, Clone, Copy)]
struct Optimistic {
    machine_id: MachineId,
    status: Option<(MachineStatus, MachineStatus)>,
    subscribed: Option<(bool, bool)>,
}

impl Optimistic {
    fn capture(before: &MachineState, edit: &PartialMachineUpdate) -> Self {
        Self {
            machine_id: before.machine_id(),
            status: edit.status.map(|to| (before.status(), to)),
            subscribed: edit.is_subscribed.map(|to| (before.is_subscribed(), to)),
        }
    }

    /// Update that undoes the edit for every field still holding the
    /// optimistic value. Fields changed since by the server are left alone.
    fn revert(&self, now: &MachineState) -> PartialMachineUpdate {
        let mut update = PartialMachineUpdate::new(self.machine_id);
        if let Some((before, set)) = self.status
            && now.status() == set
        {
            update.status = Some(before);
        }
        if let Some((before, set)) = self.subscribed
            && now.is_subscribed() == set
        {
            update.is_subscribed = Some(before);
        }
        update
    }
}

pub struct Dashboard<B: Backend> {
    backend: B,
    registry: Registry,
    courses: Vec<String>,
    link: LinkStatus,
    reserved_rooms: BTreeSet<u32>,
}

impl<B: Backend> Dashboard<B> {
    /// `courses` lists the course names a user may start; empty allows any.
    pub fn new(backend: B, courses: Vec<String>) -> Self {
        Self {
            backend,
            registry: Registry::new(),
            courses,
            link: LinkStatus::Connecting,
            reserved_rooms: BTreeSet::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn machine(&self, machine_id: MachineId) -> Option<&MachineState> {
        self.registry.get(machine_id)
    }

    pub fn link_status(&self) -> LinkStatus {
        self.link
    }

    /// Rooms this session asked to be alerted about.
    pub fn reserved_rooms(&self) -> impl Iterator<Item = u32> + '_ {
        self.reserved_rooms.iter().copied()
    }

    pub fn courses(&self) -> &[String] {
        &self.courses
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Fetch and merge the initial machine list.
    ///
    /// On a transport or decode failure the registry is left as it was.
    pub fn load(&mut self) -> Result<LoadReport> {
        let body = self
            .backend
            .load_machines()
            .map_err(|e| map_transport_error(e.as_ref()))?;
        let list = wire::decode_machine_list(&body)?;
        let mut report = LoadReport {
            loaded: 0,
            dropped: list.skipped,
        };
        for update in &list.updates {
            if self.apply_logged(update).is_some() {
                report.loaded += 1;
            } else {
                report.dropped += 1;
            }
        }
        tracing::info!(loaded = report.loaded, dropped = report.dropped, "initial load merged");
        Ok(report)
    }

    /// Merge one update, logging and swallowing per-record failures.
    fn apply_logged(&mut self, update: &PartialMachineUpdate) -> Option<crate::merge::Merged> {
        match self.registry.apply(update) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(machine_id = update.machine_id, error = %e, "dropping update");
                None
            }
        }
    }

    /// Merge a realtime update and describe what the shell should do.
    fn absorb(&mut self, update: &PartialMachineUpdate, events: &mut Vec<DashboardEvent>) {
        if let Some(merged) = self.apply_logged(update) {
            if merged.transition.status_changed() {
                tracing::debug!(
                    machine_id = update.machine_id,
                    from = ?merged.transition.previous,
                    to = ?merged.transition.current,
                    "status changed"
                );
            }
            events.push(DashboardEvent::Updated(update.machine_id));
            if merged.transition.subscription_cleared && merged.transition.finished_now() {
                events.push(DashboardEvent::SubscriptionReleased(update.machine_id));
            }
        }
    }

    pub fn handle_message(&mut self, msg: &RealtimeMessage) -> Vec<DashboardEvent> {
        let mut events = Vec::new();
        match msg {
            RealtimeMessage::Status(u) => self.absorb(u, &mut events),
            RealtimeMessage::Notify(u) => {
                self.absorb(u, &mut events);
                // Alert even for machines this session cannot track.
                let status = self
                    .registry
                    .get(u.machine_id)
                    .map(MachineState::status)
                    .or(u.status);
                match status {
                    Some(status) => events.push(DashboardEvent::Notification {
                        machine_id: u.machine_id,
                        status,
                    }),
                    None => tracing::warn!(machine_id = u.machine_id, "notify without a status"),
                }
            }
            RealtimeMessage::TimerSync { updates, skipped } => {
                if *skipped > 0 {
                    tracing::debug!(skipped, "timer_sync carried malformed records");
                }
                for u in updates {
                    self.absorb(u, &mut events);
                }
            }
        }
        events
    }

    pub fn handle_link(&mut self, event: &LinkEvent) -> Vec<DashboardEvent> {
        match event {
            LinkEvent::Open => self.set_link(LinkStatus::Connected),
            LinkEvent::Error(reason) => {
                tracing::warn!(%reason, "realtime link lost");
                self.set_link(LinkStatus::Disconnected)
            }
            LinkEvent::Message(msg) => self.handle_message(msg),
        }
    }

    fn set_link(&mut self, status: LinkStatus) -> Vec<DashboardEvent> {
        if self.link == status {
            return Vec::new();
        }
        self.link = status;
        vec![DashboardEvent::Link(status)]
    }

    /// Start a course on an idle machine.
    ///
    /// The card flips to operating and subscribed immediately; the backend
    /// response then confirms it, or the edit is rolled back and the error
    /// returned. A machine missing from the registry is created from the
    /// backend's reply instead.
    pub fn start_course(&mut self, machine_id: MachineId, course: &str) -> Result<&MachineState> {
        if !self.courses.is_empty() && !self.courses.iter().any(|c| c == course) {
            return Err(ClientError::InvalidAction("unknown course"));
        }
        if !self.registry.contains(machine_id) {
            return self.start_unseen(machine_id, course);
        }
        let before = self
            .registry
            .get(machine_id)
            .ok_or(ClientError::UnknownMachine(machine_id))?;
        if before.is_operating() {
            return Err(ClientError::InvalidAction("machine is already running"));
        }

        let edit = PartialMachineUpdate::new(machine_id)
            .status(before.machine_type().start_status())
            .subscribed(true);
        let undo = Optimistic::capture(before, &edit);
        self.registry.apply(&edit)?;
        tracing::debug!(machine_id, course, "optimistic course start");

        match self.backend.start_course(machine_id, course) {
            Ok(body) => {
                let confirm = wire::decode_course_started(machine_id, &body);
                tracing::info!(machine_id, course, "course started");
                self.registry.upsert(&confirm)
            }
            Err(e) => {
                let err = map_transport_error(e.as_ref());
                tracing::warn!(machine_id, error = %err, "course start failed; rolling back");
                self.rollback(&undo);
                Err(err)
            }
        }
    }

    /// Start on a machine the load did not mention. There is nothing to edit
    /// optimistically; the confirmation must say what kind of machine it is.
    fn start_unseen(&mut self, machine_id: MachineId, course: &str) -> Result<&MachineState> {
        tracing::debug!(machine_id, course, "starting course on unlisted machine");
        let body = self
            .backend
            .start_course(machine_id, course)
            .map_err(|e| map_transport_error(e.as_ref()))?;
        let mut confirm = wire::decode_course_started(machine_id, &body);
        if confirm.status.is_none() {
            confirm.status = confirm.machine_type.map(MachineType::start_status);
        }
        confirm.is_subscribed = Some(true);
        let state = self.registry.upsert(&confirm)?;
        tracing::info!(machine_id, course, "course started on newly listed machine");
        Ok(state)
    }

    /// Subscribe to or unsubscribe from completion notifications.
    ///
    /// Subscribing is only possible while the machine is running; asking for
    /// the state the machine is already in sends nothing.
    pub fn toggle_notify(&mut self, machine_id: MachineId, subscribe: bool) -> Result<&MachineState> {
        let before = self
            .registry
            .get(machine_id)
            .ok_or(ClientError::UnknownMachine(machine_id))?;
        if subscribe && !before.is_operating() {
            return Err(ClientError::InvalidAction(
                "notifications are only available while a machine is running",
            ));
        }
        if before.is_subscribed() == subscribe {
            tracing::debug!(machine_id, subscribe, "notify toggle already in requested state");
            return self.registry.upsert(&PartialMachineUpdate::new(machine_id));
        }

        let edit = PartialMachineUpdate::new(machine_id).subscribed(subscribe);
        let undo = Optimistic::capture(before, &edit);
        self.registry.apply(&edit)?;

        match self.backend.toggle_notify(machine_id, subscribe) {
            Ok(body) => {
                let confirm = wire::decode_notify_toggled(machine_id, subscribe, &body);
                tracing::info!(machine_id, subscribe, "notify toggle confirmed");
                self.registry.upsert(&confirm)
            }
            Err(e) => {
                let err = map_transport_error(e.as_ref());
                tracing::warn!(machine_id, error = %err, "notify toggle failed; rolling back");
                self.rollback(&undo);
                Err(err)
            }
        }
    }

    /// Tell the backend a finished machine no longer needs notifications.
    /// Local state is already unsubscribed; this only informs the server.
    pub fn release_subscription(&mut self, machine_id: MachineId) -> Result<()> {
        self.backend
            .toggle_notify(machine_id, false)
            .map(|_| ())
            .map_err(|e| map_transport_error(e.as_ref()))
    }

    /// Weekly congestion statistics.
    pub fn congestion(&mut self) -> Result<CongestionTable> {
        let body = self
            .backend
            .congestion()
            .map_err(|e| map_transport_error(e.as_ref()))?;
        congestion::decode_congestion(&body)
    }

    /// Current congestion advice; `None` when the backend has nothing to say.
    pub fn congestion_tip(&mut self) -> Result<Option<String>> {
        let body = self
            .backend
            .congestion_tip()
            .map_err(|e| map_transport_error(e.as_ref()))?;
        Ok(wire::decode_tip(&body))
    }

    /// Subscribe to (or unsubscribe from) alerts for a whole room. Returns
    /// the state the backend confirmed.
    pub fn reserve_room(&mut self, room_id: u32, reserve: bool) -> Result<bool> {
        let body = self
            .backend
            .reserve_room(room_id, reserve)
            .map_err(|e| map_transport_error(e.as_ref()))?;
        let confirmed = wire::decode_room_reserved(room_id, reserve, &body);
        if confirmed {
            self.reserved_rooms.insert(room_id);
        } else {
            self.reserved_rooms.remove(&room_id);
        }
        tracing::info!(room_id, reserved = confirmed, "room reservation updated");
        Ok(confirmed)
    }

    fn rollback(&mut self, undo: &Optimistic) {
        let Some(now) = self.registry.get(undo.machine_id) else {
            return;
        };
        let revert = undo.revert(now);
        if revert.is_empty() {
            tracing::debug!(machine_id = undo.machine_id, "nothing to roll back");
            return;
        }
        if let Err(e) = self.registry.apply(&revert) {
            tracing::error!(machine_id = undo.machine_id, error = %e, "rollback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedBackend;
    use crate::model::MachineType;

    const LOAD: &str = r#"{"machine_list":[
        {"machine_id":7,"machine_type":"washer","status":"OFF","isusing":0},
        {"machine_id":8,"machine_type":"dryer","status":"DRYING","timer":20,"elapsed_time_minutes":20,"isusing":0}
    ]}"#;

    fn loaded(backend: ScriptedBackend) -> Dashboard<ScriptedBackend> {
        let mut d = Dashboard::new(backend.with_load(LOAD), vec!["standard".to_string()]);
        d.load().unwrap();
        d
    }

    #[test]
    fn optimistic_revert_only_touches_unchanged_fields() {
        let mut reg = Registry::new();
        reg.upsert(&PartialMachineUpdate::new(1).machine_type(MachineType::Washer))
            .unwrap();
        let before = reg.get(1).unwrap().clone();
        let edit = PartialMachineUpdate::new(1)
            .status(MachineStatus::Washing)
            .subscribed(true);
        let undo = Optimistic::capture(&before, &edit);
        reg.upsert(&edit).unwrap();
        // server moved on to SPINNING in the meantime
        reg.upsert(&PartialMachineUpdate::new(1).status(MachineStatus::Spinning))
            .unwrap();
        let revert = undo.revert(reg.get(1).unwrap());
        assert_eq!(revert.status, None);
        assert_eq!(revert.is_subscribed, Some(false));
    }

    #[test]
    fn start_on_running_machine_is_refused_without_a_call() {
        let mut d = loaded(ScriptedBackend::new());
        let err = d.start_course(8, "standard").unwrap_err();
        assert_eq!(err, ClientError::InvalidAction("machine is already running"));
        assert!(d.backend_mut().calls().is_empty());
    }

    #[test]
    fn unknown_course_and_machine() {
        let mut d = loaded(ScriptedBackend::new());
        assert_eq!(
            d.start_course(7, "turbo").unwrap_err(),
            ClientError::InvalidAction("unknown course")
        );
        assert_eq!(
            d.toggle_notify(99, true).unwrap_err(),
            ClientError::UnknownMachine(99)
        );
    }

    #[test]
    fn link_events_only_report_changes() {
        let mut d = loaded(ScriptedBackend::new());
        assert_eq!(
            d.handle_link(&LinkEvent::Open),
            vec![DashboardEvent::Link(LinkStatus::Connected)]
        );
        assert!(d.handle_link(&LinkEvent::Open).is_empty());
        assert_eq!(
            d.handle_link(&LinkEvent::Error("closed".into())),
            vec![DashboardEvent::Link(LinkStatus::Disconnected)]
        );
    }
}
