//! Prompt building errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading templates or building a prompt
#[derive(Debug, Error)]
pub enum PromptError {
    /// Initial and new-ideas prompts need a non-empty brief
    #[error("A creative brief is required")]
    MissingBrief,

    /// Refine prompts need a target idea
    #[error("No idea selected for refinement")]
    MissingTarget,

    #[error("Prompt template not found: {0}")]
    TemplateNotFound(String),

    #[error("Failed to read prompt {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template {name}: {message}")]
    Render { name: String, message: String },
}
