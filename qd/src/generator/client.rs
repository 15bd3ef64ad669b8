//! Generator trait definition

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{GenerateError, GenerationResult, normalize_line_breaks};
use crate::tracker::GenerationRequest;

/// Something that turns an instruction into a poem
///
/// One call per request, no retries: retry policy belongs to whoever issues
/// the request.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Obtain the raw poem text for a request
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerateError>;
}

/// Run a request to a `GenerationResult`; every path ends in a result
///
/// Blank snapshots never reach the generator.
pub async fn generate(generator: &dyn Generator, request: &GenerationRequest) -> GenerationResult {
    debug!(id = %request.id, "generate: called");
    if request.snapshot.is_blank() {
        debug!(id = %request.id, "generate: blank snapshot, not dispatching");
        let err = GenerateError::EmptyPrompt;
        return GenerationResult::failure(err.kind(), err.to_string());
    }

    match generator.complete(request).await {
        Ok(text) => {
            debug!(id = %request.id, len = text.len(), "generate: success");
            GenerationResult::success(normalize_line_breaks(&text))
        }
        Err(e) => {
            warn!(id = %request.id, kind = %e.kind(), error = %e, "generate: failed");
            GenerationResult::failure(e.kind(), e.to_string())
        }
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// Scripted reply for one call
    pub enum MockReply {
        Poem(String),
        Fail(GenerateError),
        /// Wait until the test releases this call
        Gated(oneshot::Receiver<Result<String, GenerateError>>),
    }

    /// Mock generator for unit tests
    pub struct MockGenerator {
        replies: Mutex<VecDeque<MockReply>>,
        prompts: Mutex<Vec<String>>,
        call_count: AtomicUsize,
    }

    impl MockGenerator {
        pub fn new(replies: Vec<MockReply>) -> Self {
            debug!(reply_count = %replies.len(), "MockGenerator::new: called");
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for MockGenerator {
        async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerateError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt().to_string());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(MockReply::Poem(text)) => Ok(text),
                Some(MockReply::Fail(err)) => Err(err),
                Some(MockReply::Gated(rx)) => rx
                    .await
                    .unwrap_or_else(|_| Err(GenerateError::InvalidResponse("gate dropped".to_string()))),
                None => Err(GenerateError::InvalidResponse("No more mock replies".to_string())),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::composer::PromptComposer;
        use crate::generator::ErrorKind;
        use crate::tracker::RequestId;
        use uuid::Uuid;

        fn request(text: &str) -> GenerationRequest {
            let mut composer = PromptComposer::new();
            text.chars().for_each(|c| composer.append_char(c));
            GenerationRequest::new(RequestId::new(Uuid::now_v7(), 1), composer.snapshot())
        }

        #[tokio::test]
        async fn test_blank_prompt_never_dispatches() {
            let generator = MockGenerator::new(vec![MockReply::Poem("unused".to_string())]);

            let result = generate(&generator, &request("   ")).await;

            assert_eq!(result.error_kind(), Some(ErrorKind::Empty));
            assert_eq!(generator.call_count(), 0);
        }

        #[tokio::test]
        async fn test_success_normalizes_line_breaks() {
            let generator = MockGenerator::new(vec![MockReply::Poem("صدر\r\nعجز\r".to_string())]);

            let result = generate(&generator, &request("قمر")).await;

            assert_eq!(result, GenerationResult::success("صدر\nعجز\n"));
            assert_eq!(generator.call_count(), 1);
            assert!(generator.prompts()[0].contains("قمر"));
        }

        #[tokio::test]
        async fn test_errors_become_failures() {
            let generator = MockGenerator::new(vec![
                MockReply::Fail(GenerateError::Timeout(std::time::Duration::from_secs(60))),
                MockReply::Fail(GenerateError::InvalidResponse("missing poem".to_string())),
            ]);

            let first = generate(&generator, &request("نهر")).await;
            let second = generate(&generator, &request("نهر")).await;

            assert_eq!(first.error_kind(), Some(ErrorKind::Network));
            assert_eq!(second.error_kind(), Some(ErrorKind::Protocol));
        }

        #[tokio::test]
        async fn test_gated_reply_waits_for_release() {
            let (tx, rx) = oneshot::channel();
            let generator = std::sync::Arc::new(MockGenerator::new(vec![MockReply::Gated(rx)]));

            let task = {
                let generator = generator.clone();
                tokio::spawn(async move { generate(generator.as_ref(), &request("سحاب")).await })
            };
            tx.send(Ok("مطر".to_string())).unwrap();

            assert_eq!(task.await.unwrap(), GenerationResult::success("مطر"));
        }
    }
}
