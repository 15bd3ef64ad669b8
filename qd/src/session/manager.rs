//! Session - actor that owns one input surface
//!
//! The actor is the single logical UI thread: it applies keystrokes to the
//! composer and document, guards dispatch through the tracker, and applies
//! completions to the surface. Generation runs on spawned tasks that report
//! back over a separate channel, so input is never blocked by the network.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::messages::{Completed, SessionCommand, SessionError, SessionEvent, SessionResponse, SurfaceView};
use crate::composer::{InstructionTemplate, PromptComposer, PromptSnapshot};
use crate::generator::{ErrorKind, GenerationResult, Generator, generate};
use crate::surface::{ApplyMode, Document, TextSurface};
use crate::tracker::{Completion, GenerationRequest, RequestId, RequestTracker};

/// How to set up a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mode: ApplyMode,
    pub template: Arc<InstructionTemplate>,
    /// Text already before the cursor when the surface gained focus
    pub context: String,
}

impl SessionOptions {
    pub fn new(mode: ApplyMode) -> Self {
        Self {
            mode,
            template: Arc::new(InstructionTemplate::embedded()),
            context: String::new(),
        }
    }

    pub fn with_template(mut self, template: Arc<InstructionTemplate>) -> Self {
        self.template = template;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Handle to send commands to the session actor
#[derive(Clone)]
pub struct Session {
    tx: mpsc::Sender<SessionCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Spawn a new session actor
    pub fn spawn(generator: Arc<dyn Generator>, options: SessionOptions) -> Self {
        debug!(mode = ?options.mode, context_len = options.context.len(), "spawn: called");
        let (tx, rx) = mpsc::channel(256);
        let (done_tx, done_rx) = mpsc::channel(16);
        let (event_tx, _) = broadcast::channel(64);

        let actor = SessionActor {
            typed_tail: options.context.chars().count(),
            composer: PromptComposer::from_context(&options.context, options.template),
            tracker: RequestTracker::new(),
            surface: TextSurface::with_document(options.mode, Document::with_text(options.context)),
            generator,
            done_tx,
            event_tx: event_tx.clone(),
        };
        tokio::spawn(actor_loop(actor, rx, done_rx));

        info!("Session spawned");
        Self { tx, event_tx }
    }

    /// Subscribe to request events
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand) -> SessionResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)
    }

    // === Keystrokes ===

    pub async fn append_char(&self, ch: char) -> SessionResponse<()> {
        debug!(%ch, "append_char: called");
        self.request(|reply| SessionCommand::AppendChar { ch, reply }).await
    }

    /// Type a string one key at a time
    pub async fn type_text(&self, text: &str) -> SessionResponse<()> {
        debug!(len = text.len(), "type_text: called");
        for ch in text.chars() {
            if ch == ' ' {
                self.insert_space().await?;
            } else {
                self.append_char(ch).await?;
            }
        }
        Ok(())
    }

    pub async fn insert_space(&self) -> SessionResponse<()> {
        debug!("insert_space: called");
        self.request(|reply| SessionCommand::InsertSpace { reply }).await
    }

    pub async fn delete_last(&self) -> SessionResponse<Option<char>> {
        debug!("delete_last: called");
        self.request(|reply| SessionCommand::DeleteLast { reply }).await
    }

    // === Structured choices ===

    /// Select a verse count; `None` clears it
    pub async fn set_line_count(&self, count: Option<u8>) -> SessionResponse<()> {
        debug!(?count, "set_line_count: called");
        self.request(|reply| SessionCommand::SetLineCount { count, reply })
            .await?
    }

    pub async fn set_topic(&self, topic: Option<String>) -> SessionResponse<()> {
        debug!(?topic, "set_topic: called");
        self.request(|reply| SessionCommand::SetTopic { topic, reply }).await
    }

    pub async fn set_style(&self, style: Option<String>) -> SessionResponse<()> {
        debug!(?style, "set_style: called");
        self.request(|reply| SessionCommand::SetStyle { style, reply }).await
    }

    pub async fn load_composer(&self, composer: PromptComposer) -> SessionResponse<()> {
        debug!("load_composer: called");
        self.request(|reply| SessionCommand::LoadComposer {
            composer: Box::new(composer),
            reply,
        })
        .await
    }

    // === Generation ===

    /// Dispatch the current prompt; returns at once with the new request id
    pub async fn generate(&self) -> SessionResponse<RequestId> {
        debug!("generate: called");
        self.request(|reply| SessionCommand::Generate { reply }).await
    }

    /// Move a staged poem into the document
    pub async fn paste(&self) -> SessionResponse<bool> {
        debug!("paste: called");
        self.request(|reply| SessionCommand::Paste { reply }).await
    }

    // === Queries ===

    pub async fn snapshot(&self) -> SessionResponse<PromptSnapshot> {
        debug!("snapshot: called");
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    pub async fn view(&self) -> SessionResponse<SurfaceView> {
        debug!("view: called");
        self.request(|reply| SessionCommand::View { reply }).await
    }

    /// Shutdown the session
    pub async fn shutdown(&self) -> SessionResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ChannelError)
    }
}

/// Wait for the terminal event of `id`
///
/// Subscribe before calling [`Session::generate`] so the event cannot be
/// missed. Returns `None` if the session goes away first.
pub async fn wait_settled(events: &mut broadcast::Receiver<SessionEvent>, id: RequestId) -> Option<SessionEvent> {
    debug!(%id, "wait_settled: called");
    loop {
        match events.recv().await {
            Ok(event) if event.is_terminal() && event.request_id() == Some(id) => return Some(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(%id, skipped, "wait_settled: event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

struct SessionActor {
    /// Trailing document characters that mirror the composer buffer
    typed_tail: usize,
    composer: PromptComposer,
    tracker: RequestTracker,
    surface: TextSurface,
    generator: Arc<dyn Generator>,
    done_tx: mpsc::Sender<Completed>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionActor {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Returns false when the actor should stop
    fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::AppendChar { ch, reply } => {
                self.composer.append_char(ch);
                self.typed_tail += 1;
                let mut buf = [0u8; 4];
                self.surface.document_mut().insert_text(ch.encode_utf8(&mut buf));
                let _ = reply.send(());
            }

            SessionCommand::InsertSpace { reply } => {
                self.composer.insert_space();
                self.typed_tail += 1;
                self.surface.document_mut().insert_text(" ");
                let _ = reply.send(());
            }

            SessionCommand::DeleteLast { reply } => {
                // Only typed text is shared with the composer
                let removed = self.surface.document_mut().delete_backward();
                if removed.is_some() && self.typed_tail > 0 {
                    self.typed_tail -= 1;
                    self.composer.delete_last();
                }
                let _ = reply.send(removed);
            }

            SessionCommand::SetLineCount { count, reply } => {
                let result = match count {
                    Some(n) => self.composer.set_line_count(n).map_err(SessionError::from),
                    None => {
                        self.composer.clear_line_count();
                        Ok(())
                    }
                };
                let _ = reply.send(result);
            }

            SessionCommand::SetTopic { topic, reply } => {
                match topic {
                    Some(topic) => self.composer.set_topic(topic),
                    None => self.composer.clear_topic(),
                }
                let _ = reply.send(());
            }

            SessionCommand::SetStyle { style, reply } => {
                self.composer.set_style(style.unwrap_or_default());
                let _ = reply.send(());
            }

            SessionCommand::LoadComposer { composer, reply } => {
                self.composer = *composer;
                self.typed_tail = 0;
                let _ = reply.send(());
            }

            SessionCommand::Generate { reply } => {
                let id = self.dispatch();
                let _ = reply.send(id);
            }

            SessionCommand::Paste { reply } => {
                let pasted = self.surface.paste();
                if pasted {
                    self.typed_tail = 0;
                    self.emit(SessionEvent::Pasted);
                }
                let _ = reply.send(pasted);
            }

            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.composer.snapshot());
            }

            SessionCommand::View { reply } => {
                let document = self.surface.document();
                let _ = reply.send(SurfaceView {
                    document: document.text().to_string(),
                    marked: document.marked_text().map(str::to_string),
                    preview: self.surface.preview().clone(),
                    state: self.tracker.state(),
                    stats: self.tracker.stats(),
                });
            }

            SessionCommand::Shutdown => {
                debug!("handle_command: Shutdown command");
                info!("Session shutting down");
                return false;
            }
        }
        true
    }

    /// Begin a request and hand it to a generation task
    fn dispatch(&mut self) -> RequestId {
        let request = self.tracker.begin(self.composer.snapshot());
        let id = request.id;
        self.surface.expect(id);
        self.surface.show_progress();
        self.emit(SessionEvent::Dispatched { id });

        spawn_generation(self.generator.clone(), request, self.done_tx.clone());
        self.tracker.mark_awaiting(id);
        info!(%id, "Generation dispatched");
        id
    }

    fn handle_completion(&mut self, done: Completed) {
        let Completed { id, result } = done;
        debug!(%id, success = result.is_success(), "handle_completion: called");

        match self.tracker.complete(id, result.clone()) {
            Completion::Apply { id, .. } => {
                if self.surface.apply_result(id, &result) && self.surface.mode() == ApplyMode::Document {
                    self.typed_tail = 0;
                }
                self.tracker.settle(id);
                self.emit(SessionEvent::Applied { id });
            }
            Completion::Fail { id, kind, message } => {
                self.surface.apply_result(id, &result);
                self.tracker.settle(id);
                self.emit(SessionEvent::Failed { id, kind, message });
            }
            Completion::Superseded { id } => {
                self.emit(SessionEvent::Superseded { id });
            }
        }
    }
}

/// Run one generation off the actor; a panicking generator becomes a failure
fn spawn_generation(generator: Arc<dyn Generator>, request: GenerationRequest, done_tx: mpsc::Sender<Completed>) {
    let id = request.id;
    tokio::spawn(async move {
        let task = tokio::spawn(async move { generate(generator.as_ref(), &request).await });
        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(%id, error = %e, "spawn_generation: generation task failed");
                GenerationResult::failure(ErrorKind::Protocol, format!("Generation task failed: {}", e))
            }
        };
        if done_tx.send(Completed { id, result }).await.is_err() {
            debug!(%id, "spawn_generation: session closed before completion");
        }
    });
}

async fn actor_loop(mut actor: SessionActor, mut rx: mpsc::Receiver<SessionCommand>, mut done_rx: mpsc::Receiver<Completed>) {
    debug!("actor_loop: called");

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(cmd) => {
                    if !actor.handle_command(cmd) {
                        break;
                    }
                }
                None => break,
            },
            Some(done) = done_rx.recv() => actor.handle_completion(done),
        }
    }

    debug!("Session actor stopped");
}
