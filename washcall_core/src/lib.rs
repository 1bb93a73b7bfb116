#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Client-side state reconciliation for WashCall (transport-agnostic).
//!
//! All I/O goes through `washcall_traits::Backend` and
//! `washcall_traits::Realtime`; this crate decides what the client believes
//! about each machine.
//!
//! ## Architecture
//!
//! - **Model**: `MachineState` and `PartialMachineUpdate` (`model` module)
//! - **Boundary decoding**: raw JSON to typed updates and messages (`wire`)
//! - **Merger**: field-independent reconciliation (`merge`)
//! - **Registry**: ordered `machine_id -> MachineState` map (`registry`)
//! - **Dashboard**: load, realtime handling, optimistic actions with rollback
//! - **Realtime**: reconnecting link supervisor (`realtime`)
//! - **Congestion**: weekly usage statistics (`congestion`)
//!
//! The client is purely reactive: timers only change when the backend says
//! so. Nothing here counts down on its own.

pub mod congestion;
pub mod dashboard;
pub mod error;
pub mod merge;
pub mod mocks;
pub mod model;
pub mod realtime;
pub mod registry;
pub mod transport_error;
pub mod wire;

pub use congestion::{CongestionTable, Weekday, decode_congestion};
pub use dashboard::{Dashboard, DashboardEvent, LinkStatus, LoadReport};
pub use error::{ClientError, Result};
pub use merge::{Merged, Transition, merge};
pub use model::{MachineId, MachineState, MachineStatus, MachineType, PartialMachineUpdate};
pub use realtime::{LinkEvent, RealtimeSupervisor};
pub use registry::Registry;
pub use wire::RealtimeMessage;
