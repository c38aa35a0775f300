//! Session and durable storage
//!
//! - [`IdeaStore`] - generated, approved and annotated ideas
//! - [`JobRegistry`] - named briefs with their latest ideas

mod error;
mod idea_store;
mod jobs;

pub use error::StoreError;
pub use idea_store::{APPROVED_KEY, GENERAL_FEEDBACK_KEY, IdeaStore, WriteOutcome};
pub use jobs::{JOBS_KEY, JobRegistry};
