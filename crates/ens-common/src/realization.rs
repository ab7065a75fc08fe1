//! Per-realization load state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EnsError, EnsResult};

/// Recorded status of one ensemble member.
///
/// The discriminants are bit flags so that a set of states can be packed
/// into a single integer when selecting realizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RealizationState {
    #[default]
    Undefined = 1,
    Initialized = 2,
    HasData = 4,
    LoadFailure = 8,
    ParentFailure = 16,
}

impl RealizationState {
    pub const ALL: [RealizationState; 5] = [
        Self::Undefined,
        Self::Initialized,
        Self::HasData,
        Self::LoadFailure,
        Self::ParentFailure,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> EnsResult<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.code() == code)
            .ok_or(EnsError::UnknownState(code))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::Initialized => "INITIALIZED",
            Self::HasData => "HAS_DATA",
            Self::LoadFailure => "LOAD_FAILURE",
            Self::ParentFailure => "PARENT_FAILURE",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::LoadFailure | Self::ParentFailure)
    }

    /// Whether a run model may move a realization from `self` to `next`.
    pub fn can_transition_to(self, next: RealizationState) -> bool {
        use RealizationState::*;
        match self {
            Undefined => matches!(next, Initialized | ParentFailure),
            Initialized | HasData => {
                matches!(next, Initialized | HasData | LoadFailure | ParentFailure)
            }
            LoadFailure => matches!(next, Initialized | HasData | LoadFailure),
            ParentFailure => matches!(next, Initialized | ParentFailure),
        }
    }
}

impl fmt::Display for RealizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for state in RealizationState::ALL {
            assert_eq!(RealizationState::from_code(state.code()).unwrap(), state);
        }
        assert!(RealizationState::from_code(3).is_err());
    }

    #[test]
    fn test_transitions() {
        use RealizationState::*;
        assert!(Undefined.can_transition_to(Initialized));
        assert!(!Undefined.can_transition_to(HasData));
        assert!(Initialized.can_transition_to(HasData));
        assert!(HasData.can_transition_to(LoadFailure));
        assert!(!HasData.can_transition_to(Undefined));
        assert!(LoadFailure.can_transition_to(HasData));
        assert!(!ParentFailure.can_transition_to(HasData));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&RealizationState::HasData).unwrap();
        assert_eq!(json, "\"HAS_DATA\"");
        let state: RealizationState = serde_json::from_str("\"LOAD_FAILURE\"").unwrap();
        assert_eq!(state, RealizationState::LoadFailure);
    }
}
