//! Step-by-step generation wizard
//!
//! ```text
//! TaskSelection ──select_task──▶ Input ──next──▶ Settings ──next──▶ Result
//!       ▲                          │ needs a topic or an image caption │
//!       └──────────── back / reset ◀───────────────────────────────────┘
//! ```
//!
//! The wizard only collects choices; generation itself runs through a
//! [`Session`](crate::session::Session) in document mode.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::composer::{ComposerError, InstructionTemplate, LineCount, PromptComposer};
use crate::surface::layout::{DEFAULT_STYLE, is_topic};

/// Errors from illegal wizard moves
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("Not available in the {actual} step (expected {expected})")]
    WrongStep { expected: WizardStep, actual: WizardStep },

    #[error("Choose a task first")]
    NoTask,

    #[error("Choose a topic or attach an image first")]
    NoSource,

    #[error("Topics are disabled while an image is attached")]
    ImageAttached,

    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Already at the last step")]
    AtLastStep,

    #[error(transparent)]
    Composer(#[from] ComposerError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    #[default]
    TaskSelection,
    Input,
    Settings,
    Result,
}

impl WizardStep {
    fn next(self) -> Option<Self> {
        match self {
            WizardStep::TaskSelection => Some(WizardStep::Input),
            WizardStep::Input => Some(WizardStep::Settings),
            WizardStep::Settings => Some(WizardStep::Result),
            WizardStep::Result => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            WizardStep::TaskSelection => None,
            WizardStep::Input => Some(WizardStep::TaskSelection),
            WizardStep::Settings => Some(WizardStep::Input),
            WizardStep::Result => Some(WizardStep::Settings),
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::TaskSelection => "task selection",
            WizardStep::Input => "input",
            WizardStep::Settings => "settings",
            WizardStep::Result => "result",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Generate,
}

/// What the poem will be about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Topic(String),
    Image { caption: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard {
    step: WizardStep,
    task: Option<Task>,
    topic: Option<String>,
    image_caption: Option<String>,
    verses: LineCount,
    style: String,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::TaskSelection,
            task: None,
            topic: None,
            image_caption: None,
            verses: LineCount::DEFAULT,
            style: DEFAULT_STYLE.to_string(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn task(&self) -> Option<Task> {
        self.task
    }

    pub fn verses(&self) -> LineCount {
        self.verses
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn has_image(&self) -> bool {
        self.image_caption.is_some()
    }

    /// Current subject source; an attached image wins over a topic
    pub fn source(&self) -> Option<Source> {
        if let Some(caption) = &self.image_caption {
            return Some(Source::Image {
                caption: caption.clone(),
            });
        }
        self.topic.clone().map(Source::Topic)
    }

    fn require(&self, expected: WizardStep) -> Result<(), WizardError> {
        if self.step != expected {
            return Err(WizardError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    /// Pick a task and move on to input
    pub fn select_task(&mut self, task: Task) -> Result<(), WizardError> {
        debug!(?task, "select_task: called");
        self.require(WizardStep::TaskSelection)?;
        self.task = Some(task);
        self.step = WizardStep::Input;
        Ok(())
    }

    pub fn select_topic(&mut self, topic: &str) -> Result<(), WizardError> {
        debug!(%topic, "select_topic: called");
        self.require(WizardStep::Input)?;
        if self.has_image() {
            return Err(WizardError::ImageAttached);
        }
        if !is_topic(topic) {
            return Err(WizardError::UnknownTopic(topic.to_string()));
        }
        self.topic = Some(topic.to_string());
        Ok(())
    }

    /// Attach an image by its caption; blank captions detach
    pub fn attach_image(&mut self, caption: &str) -> Result<(), WizardError> {
        debug!(len = caption.len(), "attach_image: called");
        self.require(WizardStep::Input)?;
        let caption = caption.trim();
        self.image_caption = (!caption.is_empty()).then(|| caption.to_string());
        Ok(())
    }

    pub fn detach_image(&mut self) {
        self.image_caption = None;
    }

    pub fn set_verses(&mut self, count: u8) -> Result<(), WizardError> {
        self.require(WizardStep::Settings)?;
        self.verses = LineCount::new(count)?;
        Ok(())
    }

    /// Set the style; blank restores the default
    pub fn set_style(&mut self, style: &str) -> Result<(), WizardError> {
        self.require(WizardStep::Settings)?;
        let style = style.trim();
        self.style = if style.is_empty() { DEFAULT_STYLE } else { style }.to_string();
        Ok(())
    }

    pub fn next(&mut self) -> Result<WizardStep, WizardError> {
        match self.step {
            WizardStep::TaskSelection if self.task.is_none() => return Err(WizardError::NoTask),
            WizardStep::Input if self.source().is_none() => return Err(WizardError::NoSource),
            _ => {}
        }
        self.step = self.step.next().ok_or(WizardError::AtLastStep)?;
        debug!(step = %self.step, "next: advanced");
        Ok(self.step)
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        self.step = self.step.previous().ok_or(WizardError::AtFirstStep)?;
        debug!(step = %self.step, "back: moved");
        Ok(self.step)
    }

    pub fn reset(&mut self) {
        debug!("reset: called");
        *self = Self::new();
    }

    /// Build the composer for the collected choices
    pub fn compose(&self, template: Arc<InstructionTemplate>) -> Result<PromptComposer, WizardError> {
        let source = self.source().ok_or(WizardError::NoSource)?;
        let mut composer = match source {
            Source::Topic(topic) => {
                let mut composer = PromptComposer::with_template(template);
                composer.set_topic(topic);
                composer
            }
            Source::Image { caption } => PromptComposer::from_context(&caption, template),
        };
        composer.set_line_count(self.verses.get())?;
        composer.set_style(self.style.clone());
        Ok(composer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Arc<InstructionTemplate> {
        Arc::new(InstructionTemplate::embedded())
    }

    fn at_settings(topic: &str) -> Wizard {
        let mut wizard = Wizard::new();
        wizard.select_task(Task::Generate).unwrap();
        wizard.select_topic(topic).unwrap();
        wizard.next().unwrap();
        wizard
    }

    #[test]
    fn test_defaults() {
        let wizard = Wizard::new();
        assert_eq!(wizard.step(), WizardStep::TaskSelection);
        assert_eq!(wizard.verses().get(), 5);
        assert_eq!(wizard.style(), "طويل");
        assert!(wizard.source().is_none());
    }

    #[test]
    fn test_full_walk() {
        let mut wizard = at_settings("حكمة");
        assert_eq!(wizard.step(), WizardStep::Settings);

        wizard.set_verses(3).unwrap();
        wizard.set_style("كامل").unwrap();
        assert_eq!(wizard.next().unwrap(), WizardStep::Result);
        assert_eq!(wizard.next(), Err(WizardError::AtLastStep));

        let snapshot = wizard.compose(template()).unwrap().snapshot();
        assert_eq!(snapshot.subject(), Some("حكمة"));
        assert!(snapshot.instruction.contains("\"حكمة\""));
        assert!(snapshot.instruction.contains("عدد الابيات 3"));
        assert!(snapshot.instruction.contains("بأسلوب كامل"));
    }

    #[test]
    fn test_next_needs_task_and_source() {
        let mut wizard = Wizard::new();
        assert_eq!(wizard.next(), Err(WizardError::NoTask));

        wizard.select_task(Task::Generate).unwrap();
        assert_eq!(wizard.next(), Err(WizardError::NoSource));
        assert_eq!(wizard.step(), WizardStep::Input);
    }

    #[test]
    fn test_topic_disabled_with_image() {
        let mut wizard = Wizard::new();
        wizard.select_task(Task::Generate).unwrap();
        wizard.attach_image("غروب فوق البحر").unwrap();

        assert_eq!(wizard.select_topic("حب"), Err(WizardError::ImageAttached));
        assert_eq!(
            wizard.source(),
            Some(Source::Image {
                caption: "غروب فوق البحر".to_string()
            })
        );

        wizard.detach_image();
        wizard.select_topic("حب").unwrap();
        assert_eq!(wizard.source(), Some(Source::Topic("حب".to_string())));
    }

    #[test]
    fn test_unknown_topic_rejected() {
        let mut wizard = Wizard::new();
        wizard.select_task(Task::Generate).unwrap();
        assert_eq!(
            wizard.select_topic("بحر"),
            Err(WizardError::UnknownTopic("بحر".to_string()))
        );
    }

    #[test]
    fn test_image_caption_becomes_subject() {
        let mut wizard = Wizard::new();
        wizard.select_task(Task::Generate).unwrap();
        wizard.attach_image("نخلة").unwrap();
        wizard.next().unwrap();

        let snapshot = wizard.compose(template()).unwrap().snapshot();
        assert_eq!(snapshot.raw_text, "نخلة");
        assert!(snapshot.instruction.contains("عدد الابيات 5"));
    }

    #[test]
    fn test_back_and_reset() {
        let mut wizard = at_settings("وطن");
        assert_eq!(wizard.back().unwrap(), WizardStep::Input);
        assert_eq!(wizard.back().unwrap(), WizardStep::TaskSelection);
        assert_eq!(wizard.back(), Err(WizardError::AtFirstStep));

        let mut wizard = at_settings("وطن");
        wizard.set_verses(2).unwrap();
        wizard.reset();
        assert_eq!(wizard, Wizard::new());
    }

    #[test]
    fn test_settings_only_in_settings_step() {
        let mut wizard = Wizard::new();
        assert!(matches!(wizard.set_verses(3), Err(WizardError::WrongStep { .. })));

        let mut wizard = at_settings("دين");
        assert!(matches!(wizard.set_verses(8), Err(WizardError::Composer(_))));
        wizard.set_style("  ").unwrap();
        assert_eq!(wizard.style(), "طويل");
    }
}
