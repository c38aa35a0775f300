//! Core value types shared across the pipeline

mod brief;
mod idea;
mod job;
mod level;

pub use brief::{BriefFields, CreativeBrief, IdeaType, SPECIFIC_IDEA_TYPES, clean_brief_text};
pub use idea::{Idea, IdeaIdentity, clean_pasted_notes};
pub use job::Job;
pub use level::{AiEngine, CreativityLevel, DEFAULT_AUDIENCE, PromptMode};
