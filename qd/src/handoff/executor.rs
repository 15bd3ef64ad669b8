//! Executor - network-capable side of the hand-off
//!
//! Picks up the waiting prompt, runs it through a real generator and writes
//! the answer back, unless the prompt was replaced in the meantime.

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{HandoffChannel, HandoffRecord, POEM_KEY, PROMPT_KEY};
use crate::composer::PromptSnapshot;
use crate::generator::{Generator, generate};
use crate::tracker::{GenerationRequest, RequestId};

/// What one pass over the store did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorOutcome {
    /// No prompt waiting
    Idle,
    /// The waiting prompt already has an answer
    AlreadyAnswered(RequestId),
    /// Generated and wrote the answer
    Answered(RequestId),
    /// The prompt changed while generating; the answer was dropped
    Superseded(RequestId),
}

pub struct Executor {
    channel: Arc<dyn HandoffChannel>,
    generator: Arc<dyn Generator>,
    poll_interval: Duration,
}

impl Executor {
    pub fn new(channel: Arc<dyn HandoffChannel>, generator: Arc<dyn Generator>, poll_interval: Duration) -> Self {
        debug!(?poll_interval, "Executor::new: called");
        Self {
            channel,
            generator,
            poll_interval,
        }
    }

    /// Handle the waiting prompt, if any
    pub async fn run_once(&self) -> Result<ExecutorOutcome> {
        let Some(prompt) = self.channel.read(PROMPT_KEY)? else {
            return Ok(ExecutorOutcome::Idle);
        };
        let id = prompt.request_id;

        if let Some(existing) = self.channel.read(POEM_KEY)?
            && existing.answers(id)
        {
            debug!(%id, "run_once: already answered");
            return Ok(ExecutorOutcome::AlreadyAnswered(id));
        }

        info!(%id, "Generating for handed-off prompt");
        let request = GenerationRequest::new(id, snapshot_for(&prompt.prompt));
        let result = generate(self.generator.as_ref(), &request).await;

        // Only answer the prompt we were asked
        match self.channel.read(PROMPT_KEY)? {
            Some(current) if current.request_id == id => {}
            current => {
                info!(
                    %id,
                    current = ?current.map(|c| c.request_id),
                    "Prompt replaced while generating, dropping answer"
                );
                return Ok(ExecutorOutcome::Superseded(id));
            }
        }

        let answer = HandoffRecord::answer(id, prompt.prompt, result);
        if !self.channel.write(POEM_KEY, &answer)? {
            warn!(%id, "Answer rejected as stale");
            return Ok(ExecutorOutcome::Superseded(id));
        }
        info!(%id, success = answer.result.as_ref().is_some_and(|r| r.is_success()), "Answer written");
        Ok(ExecutorOutcome::Answered(id))
    }

    /// Poll the store until `shutdown_rx` fires
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!(poll_interval = ?self.poll_interval, "Executor running");
        let mut seen_version = None;

        loop {
            let version = self.channel.version();
            if seen_version != Some(version) {
                seen_version = Some(version);
                match self.run_once().await {
                    Ok(ExecutorOutcome::Idle) | Ok(ExecutorOutcome::AlreadyAnswered(_)) => {}
                    Ok(outcome) => debug!(?outcome, "run: pass complete"),
                    Err(e) => warn!(error = %e, "Executor pass failed"),
                }
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Executor shutting down");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

/// Snapshot for an instruction that was rendered on the other side
fn snapshot_for(instruction: &str) -> PromptSnapshot {
    PromptSnapshot {
        raw_text: instruction.to_string(),
        topic: None,
        line_count: None,
        style: None,
        instruction: instruction.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::client::mock::{MockGenerator, MockReply};
    use crate::generator::{ErrorKind, GenerateError, GenerationResult};
    use crate::handoff::MemoryHandoff;
    use tokio::sync::oneshot;
    use uuid::Uuid;

    fn id(seq: u64) -> RequestId {
        RequestId::new(Uuid::nil(), seq)
    }

    fn executor(channel: Arc<MemoryHandoff>, replies: Vec<MockReply>) -> (Executor, Arc<MockGenerator>) {
        let generator = Arc::new(MockGenerator::new(replies));
        let executor = Executor::new(channel, generator.clone(), Duration::from_millis(5));
        (executor, generator)
    }

    #[tokio::test]
    async fn test_idle_without_prompt() {
        let channel = Arc::new(MemoryHandoff::new());
        let (executor, generator) = executor(channel, vec![]);

        assert_eq!(executor.run_once().await.unwrap(), ExecutorOutcome::Idle);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_answers_waiting_prompt_once() {
        let channel = Arc::new(MemoryHandoff::new());
        channel.write(PROMPT_KEY, &HandoffRecord::prompt(id(1), "اكتب شعر")).unwrap();
        let (executor, generator) = executor(channel.clone(), vec![MockReply::Poem("بيت\r\n".to_string())]);

        assert_eq!(executor.run_once().await.unwrap(), ExecutorOutcome::Answered(id(1)));
        assert_eq!(executor.run_once().await.unwrap(), ExecutorOutcome::AlreadyAnswered(id(1)));

        let answer = channel.read(POEM_KEY).unwrap().unwrap();
        assert_eq!(answer.result, Some(GenerationResult::success("بيت\n")));
        assert_eq!(generator.prompts(), vec!["اكتب شعر".to_string()]);
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_written_back() {
        let channel = Arc::new(MemoryHandoff::new());
        channel.write(PROMPT_KEY, &HandoffRecord::prompt(id(1), "اكتب")).unwrap();
        let (executor, _) = executor(
            channel.clone(),
            vec![MockReply::Fail(GenerateError::Timeout(Duration::from_secs(60)))],
        );

        executor.run_once().await.unwrap();

        let answer = channel.read(POEM_KEY).unwrap().unwrap();
        assert_eq!(answer.result.unwrap().error_kind(), Some(ErrorKind::Network));
    }

    #[tokio::test]
    async fn test_drops_answer_when_prompt_replaced() {
        let channel = Arc::new(MemoryHandoff::new());
        channel.write(PROMPT_KEY, &HandoffRecord::prompt(id(1), "أول")).unwrap();
        let (gate_tx, gate_rx) = oneshot::channel();
        let (executor, _) = executor(channel.clone(), vec![MockReply::Gated(gate_rx)]);

        let pass = tokio::spawn(async move { executor.run_once().await.unwrap() });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Surface submits a newer prompt while the executor is busy
        let mut newer = HandoffRecord::prompt(id(2), "ثان");
        newer.written_at += 1;
        channel.write(PROMPT_KEY, &newer).unwrap();
        gate_tx.send(Ok("للأول".to_string())).unwrap();

        assert_eq!(pass.await.unwrap(), ExecutorOutcome::Superseded(id(1)));
        assert!(channel.read(POEM_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let channel = Arc::new(MemoryHandoff::new());
        channel.write(PROMPT_KEY, &HandoffRecord::prompt(id(7), "وطن")).unwrap();
        let (executor, _) = executor(channel.clone(), vec![MockReply::Poem("دار".to_string())]);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move { executor.run(shutdown_rx).await });
        for _ in 0..200 {
            if channel.read(POEM_KEY).unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown_tx.send(()).await.unwrap();

        task.await.unwrap().unwrap();
        assert!(channel.read(POEM_KEY).unwrap().unwrap().answers(id(7)));
    }
}
