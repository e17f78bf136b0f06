//! Retry policy for generation calls.
//!
//! The upstream API drops connections and times out under load; those
//! failures are worth retrying with a short growing backoff. Anything
//! else (bad request, auth, quota) surfaces immediately.

use std::time::Duration;

use tracing::warn;

use studia_core::defaults::{GENERATION_ATTEMPTS, RETRY_BASE_DELAY_MS, RETRY_STEP_DELAY_MS};
use studia_core::{Error, GenerationBackend, Result};

/// Substrings marking a generation failure as transient, matched against
/// the lowercased error text.
const TRANSIENT_MARKERS: [&str; 7] = [
    "server disconnected",
    "timed out",
    "timeout",
    "connection reset",
    "temporarily unavailable",
    "ssl",
    "tls",
];

/// Whether an error looks like a transient transport failure.
pub fn is_transient(err: &Error) -> bool {
    let text = err.to_string().to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| text.contains(marker))
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS + u64::from(attempt) * RETRY_STEP_DELAY_MS)
}

/// Run a generation call with up to [`GENERATION_ATTEMPTS`] attempts.
///
/// Empty output counts as a failed attempt. Non-transient errors
/// propagate without retrying.
pub async fn generate_with_retry(backend: &dyn GenerationBackend, prompt: &str) -> Result<String> {
    let mut last_err: Option<Error> = None;

    for attempt in 0..GENERATION_ATTEMPTS {
        match backend.generate(prompt).await {
            Ok(raw) if !raw.trim().is_empty() => return Ok(raw),
            Ok(_) => {
                warn!(
                    subsystem = "inference",
                    component = "retry",
                    attempt,
                    model = backend.model_name(),
                    "Generation returned empty output"
                );
                last_err = Some(Error::Generation("empty model response".to_string()));
            }
            Err(err) => {
                if !is_transient(&err) {
                    return Err(err);
                }
                warn!(
                    subsystem = "inference",
                    component = "retry",
                    attempt,
                    model = backend.model_name(),
                    error = %err,
                    "Transient generation failure"
                );
                last_err = Some(err);
            }
        }

        if attempt + 1 < GENERATION_ATTEMPTS {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    Err(last_err.unwrap_or_else(|| Error::Generation("empty model response".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Plays back a scripted sequence of generation outcomes.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("unscripted".to_string()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn test_transient_vocabulary() {
        assert!(is_transient(&Error::Generation(
            "Request failed: operation timed out".to_string()
        )));
        assert!(is_transient(&Error::Generation(
            "Connection reset by peer".to_string()
        )));
        assert!(is_transient(&Error::Generation(
            "server disconnected without response".to_string()
        )));
        assert!(is_transient(&Error::Generation(
            "SSL handshake failed".to_string()
        )));
        assert!(!is_transient(&Error::Generation(
            "Gemini returned 400 Bad Request: invalid argument".to_string()
        )));
    }

    #[test]
    fn test_backoff_grows_per_attempt() {
        assert_eq!(backoff_delay(0), Duration::from_millis(600));
        assert_eq!(backoff_delay(1), Duration::from_millis(1500));
        assert_eq!(backoff_delay(2), Duration::from_millis(2400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_needs_one_call() {
        let backend = ScriptedBackend::new(vec![Ok("{}".to_string())]);
        let out = generate_with_retry(&backend, "prompt").await.unwrap();
        assert_eq!(out, "{}");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_then_success() {
        let backend = ScriptedBackend::new(vec![
            Err(Error::Generation("operation timed out".to_string())),
            Ok("recovered".to_string()),
        ]);
        let out = generate_with_retry(&backend, "prompt").await.unwrap();
        assert_eq!(out, "recovered");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_output_is_retried() {
        let backend = ScriptedBackend::new(vec![
            Ok("   ".to_string()),
            Ok("content".to_string()),
        ]);
        let out = generate_with_retry(&backend, "prompt").await.unwrap();
        assert_eq!(out, "content");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_stops_immediately() {
        let backend = ScriptedBackend::new(vec![
            Err(Error::Generation("Gemini returned 403: quota".to_string())),
            Ok("never reached".to_string()),
        ]);
        let err = generate_with_retry(&backend, "prompt").await.unwrap_err();
        assert!(err.to_string().contains("403"));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_surface_last_error() {
        let backend = ScriptedBackend::new(vec![
            Err(Error::Generation("timeout a".to_string())),
            Err(Error::Generation("timeout b".to_string())),
            Err(Error::Generation("timeout c".to_string())),
        ]);
        let err = generate_with_retry(&backend, "prompt").await.unwrap_err();
        assert!(err.to_string().contains("timeout c"));
        assert_eq!(backend.call_count(), GENERATION_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_empty_reports_empty_response() {
        let backend = ScriptedBackend::new(vec![
            Ok(String::new()),
            Ok(String::new()),
            Ok(String::new()),
        ]);
        let err = generate_with_retry(&backend, "prompt").await.unwrap_err();
        assert!(err.to_string().contains("empty model response"));
        assert_eq!(backend.call_count(), GENERATION_ATTEMPTS);
    }
}
