//! IX Studio - creative idea pipeline for LLM-driven briefs
//!
//! IX turns a creative brief into a precise instruction for a language
//! model, parses whatever text comes back into typed ideas, and lets the
//! user approve, annotate and refine them across a session.
//!
//! # Core Concepts
//!
//! - **Prompt synthesis**: four creativity levels shape one fixed output contract
//! - **Tolerant parsing**: bolded labels, loose formatting, citations stripped
//! - **Durable approvals**: approved ideas survive sessions and only shrink on reset
//! - **Paste or call**: prompts run through an HTTP channel or a manual paste round trip
//!
//! # Modules
//!
//! - [`domain`] - Briefs, ideas, levels and jobs
//! - [`prompts`] - Template loading and prompt building
//! - [`parser`] - Model reply parsing
//! - [`store`] - Session idea store and job registry
//! - [`controller`] - Refinement state machine
//! - [`llm`] - LLM channel trait and chat completions client
//! - [`export`] - Markdown export
//! - [`repl`] - Interactive studio
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod export;
pub mod llm;
pub mod parser;
pub mod prompts;
pub mod repl;
pub mod store;

pub use config::Config;
pub use controller::{ExecuteOutcome, RefineState, RefinementController, Settings, StudioError};
pub use domain::{AiEngine, CreativeBrief, CreativityLevel, Idea, Job, PromptMode};
pub use llm::{LlmChannel, LlmError};
pub use parser::{CampaignElement, ParseOutcome, parse, parse_elements};
pub use prompts::{PromptBuilder, PromptContext};
pub use store::{IdeaStore, JobRegistry, StoreError, WriteOutcome};
