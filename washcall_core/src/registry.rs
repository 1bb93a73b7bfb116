//! Session-scoped map from machine id to its last-known state.

use std::collections::HashMap;

use crate::error::Result;
use crate::merge::{Merged, merge};
use crate::model::{MachineId, MachineState, PartialMachineUpdate};

/// In-memory view model. Iteration order is first-insertion order, which for
/// a normal session is the order of the initial load response.
#[derive(Debug, Default)]
pub struct Registry {
    machines: HashMap<MachineId, MachineState>,
    order: Vec<MachineId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, machine_id: MachineId) -> Option<&MachineState> {
        self.machines.get(&machine_id)
    }

    pub fn contains(&self, machine_id: MachineId) -> bool {
        self.machines.contains_key(&machine_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All machines in rendering order. Call again to restart.
    pub fn all(&self) -> impl Iterator<Item = &MachineState> + '_ {
        self.order.iter().filter_map(|id| self.machines.get(id))
    }

    /// Merge `update` into the stored state and return the result.
    pub fn upsert(&mut self, update: &PartialMachineUpdate) -> Result<&MachineState> {
        let id = update.machine_id;
        self.apply(update)?;
        // apply() either inserted or replaced the entry for `id`
        Ok(&self.machines[&id])
    }

    /// Like [`Registry::upsert`] but also returns the status transition.
    pub fn apply(&mut self, update: &PartialMachineUpdate) -> Result<Merged> {
        let id = update.machine_id;
        let merged = merge(self.machines.get(&id), update)?;
        if self
            .machines
            .insert(id, merged.state.clone())
            .is_none()
        {
            self.order.push(id);
        }
        Ok(merged)
    }
}
