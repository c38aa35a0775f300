//! LLM execution channel
//!
//! The pipeline never depends on a concrete model API: it hands an
//! instruction string to an [`LlmChannel`] and gets raw text back.

use std::sync::Arc;

use tracing::debug;

mod channel;
mod chat;
mod error;

#[cfg(test)]
pub use channel::mock;
pub use channel::LlmChannel;
pub use chat::ChatClient;
pub use error::LlmError;

use crate::config::LlmConfig;

/// Providers reachable through the chat completions client
pub const PROVIDERS: &[&str] = &["xai", "openai"];

/// Create a channel for the configured provider
///
/// Supports "xai" and "openai", both through the chat completions API.
pub fn create_channel(config: &LlmConfig) -> Result<Arc<dyn LlmChannel>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_channel: called");
    if !PROVIDERS.contains(&config.provider.as_str()) {
        debug!(provider = %config.provider, "create_channel: unknown provider");
        return Err(LlmError::UnknownProvider(config.provider.clone()));
    }
    Ok(Arc::new(ChatClient::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_a_config_error() {
        let config = LlmConfig {
            provider: "bard".to_string(),
            ..Default::default()
        };
        let err = create_channel(&config).err().unwrap();
        assert!(matches!(err, LlmError::UnknownProvider(ref p) if p == "bard"));
        assert_eq!(err.status(), 400);
    }
}
