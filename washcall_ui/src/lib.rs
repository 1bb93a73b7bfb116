#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Turns `MachineState` into what the user sees: localized status text, the
//! timer slot, which actions are offered, and the weekly congestion chart.

pub mod card;
pub mod congestion;
pub mod locale;
pub mod text;

pub use card::{Affordance, BAR_WIDTH, CardView, TimerView, affordances, progress_bar, render};
pub use congestion::{DayChart, HourBar, congestion_chart, day_label};
pub use locale::Locale;
pub use text::{
    default_name, no_tip_text, notification_text, reservation_text, status_text,
    untracked_notification_text,
};
