//! Refinement states

use crate::domain::{Idea, PromptMode};

/// States a session can rest in between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableState {
    Idle,
    BriefReady,
    IdeasDisplayed,
}

impl From<StableState> for RefineState {
    fn from(stable: StableState) -> Self {
        match stable {
            StableState::Idle => RefineState::Idle,
            StableState::BriefReady => RefineState::BriefReady,
            StableState::IdeasDisplayed => RefineState::IdeasDisplayed,
        }
    }
}

/// Where the refinement cycle currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefineState {
    /// No brief yet
    Idle,
    /// Brief and settings in place, nothing generated
    BriefReady,
    /// A generation prompt is out; `from` is where cancel or failure returns to
    Generating { from: StableState, mode: PromptMode },
    /// Ideas from the last response are showing
    IdeasDisplayed,
    /// A refine conversation about `target` is out
    Refining { target: Idea },
    /// Replacements for the displayed ideas at `indices` are out
    Replacing { indices: Vec<usize> },
}

impl RefineState {
    /// Generating, Refining or Replacing
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Generating { .. } | Self::Refining { .. } | Self::Replacing { .. }
        )
    }

    /// The stable state cancel or failure returns to
    pub fn rollback_target(&self) -> Option<StableState> {
        match self {
            Self::Generating { from, .. } => Some(*from),
            Self::Refining { .. } | Self::Replacing { .. } => Some(StableState::IdeasDisplayed),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BriefReady => "brief-ready",
            Self::Generating { .. } => "generating",
            Self::IdeasDisplayed => "ideas-displayed",
            Self::Refining { .. } => "refining",
            Self::Replacing { .. } => "replacing",
        }
    }
}

impl std::fmt::Display for RefineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_targets() {
        let generating = RefineState::Generating {
            from: StableState::BriefReady,
            mode: PromptMode::Initial,
        };
        assert!(generating.is_in_flight());
        assert_eq!(generating.rollback_target(), Some(StableState::BriefReady));

        let refining = RefineState::Refining {
            target: Idea::new("T", "D.", ""),
        };
        assert_eq!(refining.rollback_target(), Some(StableState::IdeasDisplayed));

        let replacing = RefineState::Replacing { indices: vec![0, 3] };
        assert!(replacing.is_in_flight());
        assert_eq!(replacing.rollback_target(), Some(StableState::IdeasDisplayed));
        assert_eq!(replacing.to_string(), "replacing");

        for stable in [RefineState::Idle, RefineState::BriefReady, RefineState::IdeasDisplayed] {
            assert!(!stable.is_in_flight());
            assert_eq!(stable.rollback_target(), None);
        }
    }

    #[test]
    fn test_stable_into_refine_state() {
        assert_eq!(RefineState::from(StableState::IdeasDisplayed), RefineState::IdeasDisplayed);
        assert_eq!(RefineState::IdeasDisplayed.to_string(), "ideas-displayed");
    }
}
