//! Prompt Template System
//!
//! Builds the instruction strings sent to the model from `.pmt` templates.
//!
//! Template loading chain:
//! 1. `.ixstudio/prompts/{name}.pmt` (user override)
//! 2. `prompts/{name}.pmt` (repo default)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax with HTML escaping disabled.

mod builder;
pub mod embedded;
mod error;
mod loader;

pub use builder::{FeedbackDigest, FixedSeed, PromptBuilder, PromptContext, RandomSeed, SeedSource};
pub use error::PromptError;
pub use loader::PromptLoader;
