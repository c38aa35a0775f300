//! Interactive studio for IX
//!
//! A line-oriented front end over the refinement controller: set a brief,
//! build prompts, bring replies back by paste or through the LLM channel,
//! and curate the results with slash commands.

mod session;

pub use session::StudioSession;

use eyre::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::RefinementController;
use crate::llm::create_channel;

/// Run the interactive studio
///
/// This is the main entry point for `ix studio`. A missing API key is not an
/// error: the studio falls back to the paste workflow.
pub async fn run_interactive(config: &Config, controller: RefinementController) -> Result<()> {
    let channel = match create_channel(&config.llm) {
        Ok(channel) => Some(channel),
        Err(e) => {
            warn!(error = %e, "No LLM channel, paste workflow only");
            None
        }
    };
    info!(has_channel = channel.is_some(), "Starting studio");

    let mut session = StudioSession::new(controller, channel);
    session.run().await
}
