use serde::Serialize;

/// Lifecycle of one item within a batch.
///
/// ```text
/// Received -> Validating -> Rejected -----------------------------> Finalized
///                        -> Staged -> Transforming -> Derived ----> Finalized
///                                                 -> FallenBack --> Finalized
///                                                 -> Failed ------> Finalized
/// ```
///
/// Staging failures go straight from `Validating` to `Failed`. A cancelled item moves to
/// `Failed` from whichever state it had reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Received,
    Validating,
    Rejected,
    Staged,
    Transforming,
    Derived,
    FallenBack,
    Failed,
    Finalized,
}

impl ItemState {
    pub fn can_transition_to(self, next: ItemState) -> bool {
        use ItemState::*;

        matches!(
            (self, next),
            (Received, Validating)
                | (Received, Failed)
                | (Validating, Rejected)
                | (Validating, Staged)
                | (Validating, Failed)
                | (Staged, Transforming)
                | (Staged, Failed)
                | (Transforming, Derived)
                | (Transforming, FallenBack)
                | (Transforming, Failed)
                | (Rejected, Finalized)
                | (Derived, Finalized)
                | (FallenBack, Finalized)
                | (Failed, Finalized)
        )
    }
}

/// A state transition reported on the progress channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemProgress {
    pub index: usize,
    pub filename: String,
    pub state: ItemState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            ItemState::Received,
            ItemState::Validating,
            ItemState::Staged,
            ItemState::Transforming,
            ItemState::Derived,
            ItemState::Finalized,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!ItemState::Received.can_transition_to(ItemState::Staged));
        assert!(!ItemState::Rejected.can_transition_to(ItemState::Staged));
        assert!(!ItemState::Staged.can_transition_to(ItemState::Derived));
        assert!(!ItemState::Finalized.can_transition_to(ItemState::Received));
        assert!(!ItemState::Derived.can_transition_to(ItemState::FallenBack));
        assert!(!ItemState::Finalized.can_transition_to(ItemState::Failed));
    }

    #[test]
    fn test_cancelled_items_can_fail_from_any_active_state() {
        for state in [
            ItemState::Received,
            ItemState::Validating,
            ItemState::Staged,
            ItemState::Transforming,
        ] {
            assert!(state.can_transition_to(ItemState::Failed), "{:?}", state);
        }
    }
}
