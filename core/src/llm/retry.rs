//! Retry-on-throttle wrapper
//!
//! Adds the rate-limit retry policy to any [`ModelClient`]: a throttled call
//! waits a fixed delay and tries again, up to a fixed number of attempts.
//! Every other failure goes straight back to the caller.

use super::{ModelClient, ModelReply, StatusCallback, Turn};
use crate::agent::tool::ToolDeclaration;
use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed wait between a throttled attempt and the next one
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(35),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Retry wrapper for a model client
pub struct RetryingClient {
    inner: Arc<dyn ModelClient>,
    policy: RetryPolicy,
    status_callback: Option<StatusCallback>,
}

impl RetryingClient {
    pub fn new(inner: Arc<dyn ModelClient>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            status_callback: None,
        }
    }

    /// Set a status callback for reporting retry waits
    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.status_callback = Some(callback);
        self
    }

    fn report_status(&self, message: &str) {
        if let Some(callback) = &self.status_callback {
            callback(message);
        }
    }
}

#[async_trait]
impl ModelClient for RetryingClient {
    async fn generate(
        &self,
        history: &[Turn],
        tools: &[ToolDeclaration],
        system_instruction: &str,
    ) -> Result<ModelReply> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.inner.generate(history, tools, system_instruction).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_rate_limit() => {
                    crate::warn_log!(
                        "Rate limited on attempt {}/{}: {}",
                        attempt,
                        max_attempts,
                        e
                    );
                    if attempt < max_attempts {
                        self.report_status(&format!(
                            "Rate limit hit. Retrying in {} seconds...",
                            self.policy.delay.as_secs()
                        ));
                        sleep(self.policy.delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        crate::error_log!("Rate limit persisted for {} attempts, giving up", max_attempts);
        Err(AgentError::RetriesExhausted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Replays a fixed script of outcomes, one per call
    struct ScriptedClient {
        script: Mutex<VecDeque<Result<ModelReply>>>,
        calls: AtomicU32,
    }

    impl ScriptedClient {
        fn new(script: Vec<Result<ModelReply>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        async fn generate(
            &self,
            _history: &[Turn],
            _tools: &[ToolDeclaration],
            _system_instruction: &str,
        ) -> Result<ModelReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::Internal {
                    message: "script exhausted".to_string(),
                }))
        }
    }

    fn throttled() -> Result<ModelReply> {
        Err(AgentError::RateLimited {
            message: "Resource has been exhausted".to_string(),
        })
    }

    fn done() -> Result<ModelReply> {
        Ok(ModelReply::FinalText("done".to_string()))
    }

    fn counting_callback() -> (StatusCallback, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: StatusCallback = Arc::new(move |msg: &str| sink.lock().push(msg.to_string()));
        (callback, seen)
    }

    /// Virtual time spent since `started`, to whole-second precision
    fn assert_waited(started: Instant, secs: u64) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_secs(secs) && elapsed < Duration::from_secs(secs + 1),
            "expected ~{}s of waiting, got {:?}",
            secs,
            elapsed
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(35));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_never_waits() {
        let inner = ScriptedClient::new(vec![done()]);
        let client = RetryingClient::new(inner.clone(), RetryPolicy::default());

        let started = Instant::now();
        let reply = client.generate(&[], &[], "").await.unwrap();

        assert_eq!(reply, ModelReply::FinalText("done".to_string()));
        assert_eq!(inner.calls(), 1);
        assert_waited(started, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_throttles_then_success_waits_twice() {
        let inner = ScriptedClient::new(vec![throttled(), throttled(), done()]);
        let (callback, seen) = counting_callback();
        let client =
            RetryingClient::new(inner.clone(), RetryPolicy::default()).with_status_callback(callback);

        let started = Instant::now();
        let reply = client.generate(&[], &[], "").await.unwrap();

        assert_eq!(reply, ModelReply::FinalText("done".to_string()));
        assert_eq!(inner.calls(), 3);
        assert_waited(started, 70);
        assert_eq!(seen.lock().len(), 2);
        assert!(seen.lock()[0].contains("Retrying in 35 seconds"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_on_every_attempt_exhausts_retries() {
        let inner = ScriptedClient::new(vec![throttled(), throttled(), throttled(), done()]);
        let (callback, seen) = counting_callback();
        let client =
            RetryingClient::new(inner.clone(), RetryPolicy::default()).with_status_callback(callback);

        let started = Instant::now();
        let err = client.generate(&[], &[], "").await.unwrap_err();

        assert!(matches!(err, AgentError::RetriesExhausted { attempts: 3 }));
        assert_eq!(inner.calls(), 3, "no attempt beyond the cap");
        assert_eq!(seen.lock().len(), 2, "no wait after the final attempt");
        assert_waited(started, 70);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_not_retried() {
        let inner = ScriptedClient::new(vec![
            Err(AgentError::Unauthorized {
                message: "API key not valid".to_string(),
            }),
            done(),
        ]);
        let client = RetryingClient::new(inner.clone(), RetryPolicy::default());

        let started = Instant::now();
        let err = client.generate(&[], &[], "").await.unwrap_err();

        assert!(matches!(err, AgentError::Unauthorized { .. }));
        assert_eq!(inner.calls(), 1);
        assert_waited(started, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_after_throttle_propagates() {
        let inner = ScriptedClient::new(vec![
            throttled(),
            Err(AgentError::ConnectionFailed {
                message: "reset by peer".to_string(),
            }),
        ]);
        let client = RetryingClient::new(inner.clone(), RetryPolicy::default());

        let err = client.generate(&[], &[], "").await.unwrap_err();

        assert!(matches!(err, AgentError::ConnectionFailed { .. }));
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_policy() {
        let inner = ScriptedClient::new(vec![throttled(), done()]);
        let client = RetryingClient::new(inner.clone(), RetryPolicy::no_retry());

        let err = client.generate(&[], &[], "").await.unwrap_err();

        assert!(matches!(err, AgentError::RetriesExhausted { attempts: 1 }));
        assert_eq!(inner.calls(), 1);
    }
}
