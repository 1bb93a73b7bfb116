use serde::Serialize;
use washcall_core::{MachineId, MachineState, MachineStatus, MachineType};

use crate::Locale;
use crate::text;

/// Width of the terminal progress bar, excluding brackets.
pub const BAR_WIDTH: usize = 20;

/// What the timer slot of a card shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerView {
    Remaining {
        remaining: u32,
        elapsed: u32,
        total: u32,
        percent: u8,
    },
    Calculating,
    Done,
    Idle,
}

impl TimerView {
    pub fn of(state: &MachineState) -> Self {
        match state.status() {
            MachineStatus::Off => TimerView::Idle,
            MachineStatus::Finished => TimerView::Done,
            _ => match (state.remaining_minutes(), state.elapsed_minutes(), state.total_minutes()) {
                (Some(remaining), Some(elapsed), Some(total)) if total > 0 => TimerView::Remaining {
                    remaining,
                    elapsed,
                    total,
                    percent: state.progress_percent().unwrap_or(0),
                },
                _ => TimerView::Calculating,
            },
        }
    }

    pub fn text(&self, locale: Locale) -> String {
        match self {
            TimerView::Remaining { remaining, .. } => text::remaining_text(*remaining, locale),
            TimerView::Calculating => text::calculating(locale).to_string(),
            TimerView::Done => text::done(locale).to_string(),
            TimerView::Idle => text::idle(locale).to_string(),
        }
    }
}

/// Fixed-width bar such as `[#####---------------]`.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Affordance {
    pub enabled: bool,
    pub label: &'static str,
}

/// Start is offered only to idle machines; notify only to running ones the
/// user has not subscribed to yet.
pub fn affordances(state: &MachineState, locale: Locale) -> (Affordance, Affordance) {
    let start = Affordance {
        enabled: !state.is_operating(),
        label: text::start_label(locale),
    };
    let notify = if state.is_subscribed() {
        Affordance {
            enabled: false,
            label: text::registered_label(locale),
        }
    } else {
        Affordance {
            enabled: state.is_operating(),
            label: text::notify_label(locale),
        }
    };
    (start, notify)
}

/// Everything needed to draw one machine, in the chosen locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub machine_id: MachineId,
    pub name: String,
    pub room: Option<String>,
    pub machine_type: MachineType,
    pub status: MachineStatus,
    pub status_text: &'static str,
    pub timer: TimerView,
    pub timer_text: String,
    pub subscribed: bool,
    pub start: Affordance,
    pub notify: Affordance,
}

/// Pure function of the state: rendering twice gives the same card.
pub fn render(state: &MachineState, locale: Locale) -> CardView {
    let (start, notify) = affordances(state, locale);
    let timer = TimerView::of(state);
    CardView {
        machine_id: state.machine_id(),
        name: state.name().map_or_else(
            || text::default_name(state.machine_type(), state.machine_id(), locale),
            str::to_string,
        ),
        room: state.room().map(str::to_string),
        machine_type: state.machine_type(),
        status: state.status(),
        status_text: text::status_text(state.status(), state.machine_type(), locale),
        timer_text: timer.text(locale),
        timer,
        subscribed: state.is_subscribed(),
        start,
        notify,
    }
}

impl CardView {
    /// One terminal line: id, name, status, timer, bar and bell marker.
    pub fn to_line(&self) -> String {
        let bar = match self.timer {
            TimerView::Remaining { percent, .. } => format!(" {}", progress_bar(percent, BAR_WIDTH)),
            _ => String::new(),
        };
        let bell = if self.subscribed { " [*]" } else { "" };
        format!(
            "#{:<3} {:<12} {:<14} {}{}{}",
            self.machine_id, self.name, self.status_text, self.timer_text, bar, bell
        )
    }
}
