//! LlmChannel trait definition

use async_trait::async_trait;

use super::LlmError;

/// Runs one instruction string against a model and returns its raw reply
///
/// Each call is independent; no conversation state is kept between calls.
#[async_trait]
pub trait LlmChannel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock channel for unit tests; replays canned replies in order
    pub struct MockChannel {
        replies: Vec<Result<String, u16>>,
        call_count: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockChannel {
        pub fn new(replies: Vec<Result<String, u16>>) -> Self {
            debug!(reply_count = %replies.len(), "MockChannel::new: called");
            Self {
                replies,
                call_count: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub fn failing(status: u16) -> Self {
            Self::new(vec![Err(status)])
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmChannel for MockChannel {
        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            debug!("MockChannel::complete: called");
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            match self.replies.get(idx) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(status)) => Err(LlmError::ApiError {
                    status: *status,
                    message: "mock failure".to_string(),
                }),
                None => Err(LlmError::InvalidResponse("No more mock responses".to_string())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_channel_replays_in_order() {
            let channel = MockChannel::new(vec![Ok("one".to_string()), Err(500)]);
            assert_eq!(channel.complete("p1").await.unwrap(), "one");
            assert_eq!(channel.complete("p2").await.unwrap_err().status(), 500);
            assert!(channel.complete("p3").await.is_err());
            assert_eq!(channel.call_count(), 3);
            assert_eq!(channel.prompts(), vec!["p1", "p2", "p3"]);
        }
    }
}
