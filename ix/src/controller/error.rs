//! Studio error taxonomy

use thiserror::Error;

use crate::llm::LlmError;
use crate::prompts::PromptError;
use crate::store::StoreError;

/// Errors surfaced by the refinement controller
///
/// None of these are fatal; every path leaves the controller in a stable state.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("A creative brief is required")]
    MissingBrief,

    #[error("{0}")]
    InvalidLevel(String),

    #[error("{0}")]
    InvalidEngine(String),

    #[error("No valid ideas found. Check the AI response format.")]
    NoIdeasFound,

    #[error("AI request failed: {0}")]
    External(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("A request is already in progress")]
    Busy,

    #[error("Changing settings now needs confirmation")]
    ConfirmationRequired,

    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: String, action: &'static str },

    #[error("No idea at position {0}")]
    UnknownIdea(usize),

    #[error("Select at least one idea to replace")]
    NothingSelected,

    #[error("No campaign elements found. Expected lines of 'Title :: Description'.")]
    NoElementsFound,

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

impl StudioError {
    /// Raised before any external call because of bad user input
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingBrief | Self::InvalidLevel(_) | Self::InvalidEngine(_))
    }
}
