//! Generator that goes through the hand-off store
//!
//! Used by the restricted input surface: it cannot reach the network, so it
//! writes the prompt for the executor and waits for the matching answer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{HandoffChannel, HandoffRecord, POEM_KEY, PROMPT_KEY};
use crate::config::HandoffConfig;
use crate::generator::{GenerateError, GenerationResult, Generator};
use crate::tracker::{GenerationRequest, RequestId};

pub struct HandoffGenerator {
    channel: Arc<dyn HandoffChannel>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl HandoffGenerator {
    pub fn new(channel: Arc<dyn HandoffChannel>, poll_interval: Duration, max_wait: Duration) -> Self {
        debug!(?poll_interval, ?max_wait, "HandoffGenerator::new: called");
        Self {
            channel,
            poll_interval,
            max_wait,
        }
    }

    pub fn from_config(channel: Arc<dyn HandoffChannel>, config: &HandoffConfig) -> Self {
        Self::new(
            channel,
            Duration::from_millis(config.poll_interval_ms),
            Duration::from_millis(config.max_wait_ms),
        )
    }

    /// Look for the answer to `id`; anything else counts as pending
    fn poll_answer(&self, id: RequestId) -> Option<GenerationResult> {
        match self.channel.read(POEM_KEY) {
            Ok(Some(record)) if record.answers(id) => record.result,
            Ok(Some(record)) => {
                debug!(%id, found = %record.request_id, "poll_answer: answer belongs to another request");
                None
            }
            Ok(None) => None,
            Err(e) => {
                debug!(%id, error = %e, "poll_answer: read failed, still pending");
                None
            }
        }
    }
}

#[async_trait]
impl Generator for HandoffGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
        let id = request.id;
        debug!(%id, "complete: called");

        let record = HandoffRecord::dispatched(request);
        let written = self
            .channel
            .write(PROMPT_KEY, &record)
            .map_err(|e| GenerateError::Handoff(e.to_string()))?;
        if !written {
            return Err(GenerateError::Handoff("a newer prompt is already waiting".to_string()));
        }
        info!(%id, "Prompt handed off, waiting for executor");

        let deadline = Instant::now() + self.max_wait;
        let mut seen_version = None;

        loop {
            let version = self.channel.version();
            if seen_version != Some(version) {
                seen_version = Some(version);
                if let Some(result) = self.poll_answer(id) {
                    debug!(%id, version, "complete: answer found");
                    return match result {
                        GenerationResult::Success { text } => Ok(text),
                        GenerationResult::Failure { kind, message } => Err(GenerateError::Remote { kind, message }),
                    };
                }
            }

            let now = Instant::now();
            if now >= deadline {
                info!(%id, "Gave up waiting for executor");
                return Err(GenerateError::HandoffTimeout(self.max_wait));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::PromptComposer;
    use crate::generator::{ErrorKind, generate};
    use crate::handoff::MemoryHandoff;
    use crate::tracker::RequestTracker;
    use uuid::Uuid;

    fn request(seq: u64) -> GenerationRequest {
        let mut composer = PromptComposer::new();
        "ليل".chars().for_each(|c| composer.append_char(c));
        GenerationRequest::new(RequestId::new(Uuid::nil(), seq), composer.snapshot())
    }

    fn generator(channel: Arc<MemoryHandoff>, max_wait_ms: u64) -> HandoffGenerator {
        HandoffGenerator::new(channel, Duration::from_millis(5), Duration::from_millis(max_wait_ms))
    }

    /// Answer whatever prompt is waiting, once it shows up
    fn answer_when_ready(channel: Arc<MemoryHandoff>, result: GenerationResult) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                if let Some(prompt) = channel.read(PROMPT_KEY).unwrap() {
                    let answer = HandoffRecord::answer(prompt.request_id, prompt.prompt, result);
                    channel.write(POEM_KEY, &answer).unwrap();
                    return;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
    }

    #[tokio::test]
    async fn test_writes_prompt_and_returns_answer() {
        let channel = Arc::new(MemoryHandoff::new());
        let responder = answer_when_ready(channel.clone(), GenerationResult::success("نجوم"));

        let result = generate(&generator(channel.clone(), 2000), &request(1)).await;
        responder.await.unwrap();

        assert_eq!(result, GenerationResult::success("نجوم"));
        let prompt = channel.read(PROMPT_KEY).unwrap().unwrap();
        assert!(prompt.prompt.contains("ليل"));
        assert!(prompt.result.is_none());
    }

    #[tokio::test]
    async fn test_ignores_answer_for_other_request() {
        let channel = Arc::new(MemoryHandoff::new());
        let stale = HandoffRecord::answer(RequestId::new(Uuid::nil(), 1), "old", GenerationResult::success("قديم"));
        channel.write(POEM_KEY, &stale).unwrap();

        let result = generate(&generator(channel, 60), &request(2)).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::Network));
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_its_kind() {
        let channel = Arc::new(MemoryHandoff::new());
        let responder = answer_when_ready(
            channel.clone(),
            GenerationResult::failure(ErrorKind::Protocol, "Failed to parse response"),
        );

        let result = generate(&generator(channel, 2000), &request(1)).await;
        responder.await.unwrap();

        assert_eq!(
            result,
            GenerationResult::failure(ErrorKind::Protocol, "Failed to parse response")
        );
    }

    #[tokio::test]
    async fn test_older_dispatch_cannot_replace_newer_prompt() {
        let channel = Arc::new(MemoryHandoff::new());
        let handoff = Arc::new(generator(channel.clone(), 2000));

        let mut tracker = RequestTracker::new();
        let mut composer = PromptComposer::new();
        "بحر".chars().for_each(|c| composer.append_char(c));
        let first = tracker.begin(composer.snapshot());
        let second = tracker.begin(composer.snapshot());

        // Second request's task reaches the store first
        let newest = {
            let handoff = handoff.clone();
            let second = second.clone();
            tokio::spawn(async move { generate(handoff.as_ref(), &second).await })
        };
        while channel.read(PROMPT_KEY).unwrap().map(|p| p.request_id) != Some(second.id) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let older = generate(handoff.as_ref(), &first).await;
        assert_eq!(older.error_kind(), Some(ErrorKind::Network));
        assert_eq!(channel.read(PROMPT_KEY).unwrap().unwrap().request_id, second.id);

        let responder = answer_when_ready(channel.clone(), GenerationResult::success("موج"));
        responder.await.unwrap();
        assert_eq!(newest.await.unwrap(), GenerationResult::success("موج"));
    }

    #[tokio::test]
    async fn test_no_executor_times_out_as_network() {
        let channel = Arc::new(MemoryHandoff::new());

        let result = generate(&generator(channel, 30), &request(1)).await;

        match result {
            GenerationResult::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Network);
                assert!(message.contains("No result from executor"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
