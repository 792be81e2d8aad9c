//! The agent slot registry: one slot per role, the only shared mutable state.
//!
//! Reads are public. Writes are crate-private so the transition engine is
//! the single mutator. All state sits behind one `Mutex`; critical sections
//! are short and never span an `.await`.
//!
//! A transition that suspends (waiting on the advisory provider) first
//! *claims* every slot it will touch. A claimed slot rejects new actions
//! until the claim drops. `reset` bumps an epoch so claims taken before the
//! reset neither release nor commit into the fresh state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use carechain_contracts::{action::Rejection, record::Record, role::AgentRole};

/// Status text of a slot nobody has touched yet.
pub const IDLE: &str = "IDLE";

/// One role's holding area.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    /// The record this slot owns, if any.
    pub record: Option<Record>,
    /// Human-readable status. In-flight work conventionally ends in "...".
    pub status: String,
}

impl Slot {
    fn idle() -> Self {
        Self {
            record: None,
            status: IDLE.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_none()
    }
}

struct RegistryState {
    slots: BTreeMap<AgentRole, Slot>,
    in_flight: BTreeSet<AgentRole>,
    epoch: u64,
}

impl RegistryState {
    fn fresh(epoch: u64) -> Self {
        Self {
            slots: AgentRole::ALL.iter().map(|r| (*r, Slot::idle())).collect(),
            in_flight: BTreeSet::new(),
            epoch,
        }
    }
}

/// Six named slots with atomic read and full-replace write.
pub struct SlotRegistry {
    state: Mutex<RegistryState>,
}

impl SlotRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::fresh(0)),
        }
    }

    /// Current contents of `role`'s slot. Never fails.
    pub fn get(&self, role: AgentRole) -> Slot {
        self.table().get(role).clone()
    }

    /// All six slots, in `AgentRole::ALL` order.
    pub fn snapshot(&self) -> Vec<(AgentRole, Slot)> {
        let table = self.table();
        AgentRole::ALL
            .iter()
            .map(|r| (*r, table.get(*r).clone()))
            .collect()
    }

    /// True while a transition holds a claim on `role`.
    pub fn is_in_flight(&self, role: AgentRole) -> bool {
        self.table().is_busy(role)
    }

    /// Lock the registry for a read-modify-write sequence.
    pub(crate) fn table(&self) -> SlotTable<'_> {
        SlotTable {
            registry: self,
            guard: self.lock(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        // A poisoned lock still holds consistent slot data: every write is a
        // single whole-slot replace.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive view of the registry for one atomic step.
pub(crate) struct SlotTable<'a> {
    registry: &'a SlotRegistry,
    guard: MutexGuard<'a, RegistryState>,
}

impl<'a> SlotTable<'a> {
    pub(crate) fn get(&self, role: AgentRole) -> &Slot {
        // Every role is inserted at construction and on reset.
        &self.guard.slots[&role]
    }

    /// Full replace of one slot.
    pub(crate) fn set(&mut self, role: AgentRole, record: Option<Record>, status: impl Into<String>) {
        self.guard.slots.insert(
            role,
            Slot {
                record,
                status: status.into(),
            },
        );
    }

    /// Replace only the status text, keeping the held record.
    pub(crate) fn set_status(&mut self, role: AgentRole, status: impl Into<String>) {
        let record = self.get(role).record.clone();
        self.set(role, record, status);
    }

    pub(crate) fn is_busy(&self, role: AgentRole) -> bool {
        self.guard.in_flight.contains(&role)
    }

    /// Empty every slot, release every claim, and start a new epoch.
    pub(crate) fn reset(&mut self) {
        let next = self.guard.epoch + 1;
        *self.guard = RegistryState::fresh(next);
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.guard.epoch
    }

    /// Fail with `Rejection::Busy` if any of `roles` is mid-transition.
    pub(crate) fn ensure_idle(&self, roles: &[AgentRole]) -> Result<(), Rejection> {
        match roles.iter().find(|r| self.is_busy(**r)) {
            Some(role) => Err(Rejection::Busy { role: *role }),
            None => Ok(()),
        }
    }

    /// Mark `roles` as in flight. The returned claim releases them on drop.
    ///
    /// The claim must be dropped after this table, never while it is alive.
    pub(crate) fn claim(&mut self, roles: &[AgentRole]) -> Result<Claim<'a>, Rejection> {
        self.ensure_idle(roles)?;
        self.guard.in_flight.extend(roles.iter().copied());
        Ok(Claim {
            registry: self.registry,
            roles: roles.to_vec(),
            epoch: self.guard.epoch,
        })
    }
}

/// An in-flight marker on one or more slots.
pub(crate) struct Claim<'a> {
    registry: &'a SlotRegistry,
    roles: Vec<AgentRole>,
    epoch: u64,
}

impl Claim<'_> {
    /// True when no reset has happened since the claim was taken.
    pub(crate) fn is_current(&self, table: &SlotTable<'_>) -> bool {
        table.epoch() == self.epoch
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut state = self.registry.lock();
        if state.epoch != self.epoch {
            return;
        }
        for role in &self.roles {
            state.in_flight.remove(role);
        }
    }
}

#[cfg(test)]
mod tests {
    use carechain_contracts::{
        action::Rejection,
        record::{Payload, Record},
        role::AgentRole,
    };

    use super::{SlotRegistry, IDLE};

    #[test]
    fn test_new_registry_has_six_idle_slots() {
        let registry = SlotRegistry::new();
        let slots = registry.snapshot();
        assert_eq!(slots.len(), 6);
        assert!(slots.iter().all(|(_, s)| s.is_empty() && s.status == IDLE));
        let roles: Vec<AgentRole> = slots.iter().map(|(r, _)| *r).collect();
        assert_eq!(roles, AgentRole::ALL.to_vec());
    }

    #[test]
    fn test_set_replaces_whole_slot() {
        let registry = SlotRegistry::new();
        let record = Record::admit(Payload::default());
        {
            let mut table = registry.table();
            table.set(AgentRole::Patient, Some(record.clone()), "Admitted");
            table.set_status(AgentRole::Patient, "Locked");
        }
        let slot = registry.get(AgentRole::Patient);
        assert_eq!(slot.record, Some(record));
        assert_eq!(slot.status, "Locked");
    }

    #[test]
    fn test_claim_marks_busy_until_dropped() {
        let registry = SlotRegistry::new();
        let claim = {
            let mut table = registry.table();
            table.claim(&[AgentRole::Specialist, AgentRole::HumanDoctor]).unwrap()
        };
        assert!(registry.is_in_flight(AgentRole::Specialist));
        {
            let mut table = registry.table();
            let second = table.claim(&[AgentRole::HumanDoctor]);
            assert_eq!(second.err(), Some(Rejection::Busy { role: AgentRole::HumanDoctor }));
        }
        drop(claim);
        assert!(!registry.is_in_flight(AgentRole::Specialist));
        assert!(!registry.is_in_flight(AgentRole::HumanDoctor));
    }

    #[test]
    fn test_reset_invalidates_outstanding_claims() {
        let registry = SlotRegistry::new();
        let stale = {
            let mut table = registry.table();
            table.claim(&[AgentRole::MedicalLab]).unwrap()
        };
        let fresh = {
            let mut table = registry.table();
            table.reset();
            assert!(!stale.is_current(&table));
            assert!(!table.is_busy(AgentRole::MedicalLab));
            table.claim(&[AgentRole::MedicalLab]).unwrap()
        };

        // Dropping the pre-reset claim leaves the new one in place.
        drop(stale);
        assert!(registry.is_in_flight(AgentRole::MedicalLab));
        drop(fresh);
        assert!(!registry.is_in_flight(AgentRole::MedicalLab));
    }
}
