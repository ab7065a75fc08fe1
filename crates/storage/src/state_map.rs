//! Per-realization states.

use ens_common::RealizationState;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{StorageError, StorageResult};

/// One state per realization.
///
/// Each entry is an atomic, so different realizations can be updated
/// concurrently through a shared reference.
#[derive(Debug)]
pub struct StateMap {
    states: Vec<AtomicU8>,
}

impl StateMap {
    /// Every realization `Undefined`.
    pub fn new(size: usize) -> Self {
        Self::from_states(vec![RealizationState::Undefined; size])
    }

    pub fn from_states(states: Vec<RealizationState>) -> Self {
        Self {
            states: states.into_iter().map(|s| AtomicU8::new(s.code())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn slot(&self, iens: usize) -> StorageResult<&AtomicU8> {
        self.states
            .get(iens)
            .ok_or(StorageError::RealizationOutOfRange {
                iens,
                size: self.states.len(),
            })
    }

    pub fn get(&self, iens: usize) -> StorageResult<RealizationState> {
        let code = self.slot(iens)?.load(Ordering::Acquire);
        Ok(RealizationState::from_code(code)?)
    }

    /// Overwrite the state, whatever it was.
    pub fn set(&self, iens: usize, state: RealizationState) -> StorageResult<()> {
        self.slot(iens)?.store(state.code(), Ordering::Release);
        Ok(())
    }

    pub fn is_legal_transition(from: RealizationState, to: RealizationState) -> bool {
        from.can_transition_to(to)
    }

    /// Move to `to` if the transition from the current state is legal.
    /// Returns the previous state.
    pub fn try_transition(
        &self,
        iens: usize,
        to: RealizationState,
    ) -> StorageResult<RealizationState> {
        let slot = self.slot(iens)?;
        let mut current = slot.load(Ordering::Acquire);
        loop {
            let from = RealizationState::from_code(current)?;
            if !Self::is_legal_transition(from, to) {
                return Err(StorageError::IllegalTransition { iens, from, to });
            }
            match slot.compare_exchange(current, to.code(), Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }

    /// Indices of realizations currently in `state`.
    pub fn realizations_in(&self, state: RealizationState) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.load(Ordering::Acquire) == state.code())
            .map(|(iens, _)| iens)
            .collect()
    }

    pub fn snapshot(&self) -> StorageResult<Vec<RealizationState>> {
        self.states
            .iter()
            .map(|s| Ok(RealizationState::from_code(s.load(Ordering::Acquire))?))
            .collect()
    }
}
