//! Wizard REPL

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::composer::InstructionTemplate;
use crate::session::{Session, SessionEvent, wait_settled};
use crate::surface::Preview;
use crate::surface::layout::TOPICS;
use crate::wizard::{Task, Wizard, WizardStep};

/// One line of wizard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    Task(Task),
    Topic(String),
    Image(String),
    Detach,
    Verses(u8),
    Style(String),
    Generate,
    Next,
    Back,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line typed at the wizard prompt
pub fn parse_wizard_line(line: &str) -> WizardInput {
    let trimmed = line.trim();
    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (trimmed, ""),
    };

    match (name, arg) {
        ("task", "generate") => WizardInput::Task(Task::Generate),
        ("topic", topic) if !topic.is_empty() => WizardInput::Topic(topic.to_string()),
        ("image", caption) if !caption.is_empty() => WizardInput::Image(caption.to_string()),
        ("detach", "") => WizardInput::Detach,
        ("verses", n) => n
            .parse()
            .map(WizardInput::Verses)
            .unwrap_or_else(|_| WizardInput::Unknown(trimmed.to_string())),
        ("style", style) => WizardInput::Style(style.to_string()),
        ("generate" | "gen", "") => WizardInput::Generate,
        ("next" | "n", "") => WizardInput::Next,
        ("back" | "b", "") => WizardInput::Back,
        ("reset", "") => WizardInput::Reset,
        ("help" | "h", "") => WizardInput::Help,
        ("quit" | "q", "") => WizardInput::Quit,
        _ => WizardInput::Unknown(trimmed.to_string()),
    }
}

/// Interactive wizard surface
pub struct WizardRepl {
    wizard: Wizard,
    session: Session,
    template: Arc<InstructionTemplate>,
}

impl WizardRepl {
    pub fn new(session: Session, template: Arc<InstructionTemplate>) -> Self {
        Self {
            wizard: Wizard::new(),
            session,
            template,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        println!();
        println!("{}", "Qasida wizard".bright_cyan().bold());
        println!("Type {} for help, {} to quit", "help".yellow(), "quit".yellow());
        self.print_step();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let prompt = format!("{} ", format!("[{}]>", self.wizard.step()).bright_green());
            match rl.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line.as_str());
                    if !self.handle(parse_wizard_line(&line)).await? {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        self.session.shutdown().await?;
        println!("Goodbye!");
        Ok(())
    }

    /// Returns false when the user quits
    async fn handle(&mut self, input: WizardInput) -> Result<bool> {
        debug!(?input, step = %self.wizard.step(), "handle: called");
        let before = self.wizard.step();
        let outcome = match input {
            WizardInput::Task(task) => self.wizard.select_task(task),
            WizardInput::Topic(topic) => self.wizard.select_topic(&topic),
            WizardInput::Image(caption) => self.wizard.attach_image(&caption),
            WizardInput::Detach => {
                self.wizard.detach_image();
                Ok(())
            }
            WizardInput::Verses(n) => self.wizard.set_verses(n),
            WizardInput::Style(style) => self.wizard.set_style(&style),
            WizardInput::Next => self.wizard.next().map(|_| ()),
            WizardInput::Back => self.wizard.back().map(|_| ()),
            WizardInput::Reset => {
                self.wizard.reset();
                Ok(())
            }
            WizardInput::Generate => {
                self.generate().await?;
                return Ok(true);
            }
            WizardInput::Help => {
                self.print_help();
                return Ok(true);
            }
            WizardInput::Quit => return Ok(false),
            WizardInput::Unknown(cmd) => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                return Ok(true);
            }
        };

        match outcome {
            Ok(()) if self.wizard.step() != before => self.print_step(),
            Ok(()) => println!("{}", "OK".dimmed()),
            Err(e) => println!("{} {}", "!".red(), e),
        }
        Ok(true)
    }

    /// Generate (or regenerate) from the collected choices
    async fn generate(&mut self) -> Result<()> {
        if self.wizard.step() != WizardStep::Result {
            println!("{} Finish the settings step first", "!".red());
            return Ok(());
        }
        let composer = match self.wizard.compose(self.template.clone()) {
            Ok(composer) => composer,
            Err(e) => {
                println!("{} {}", "!".red(), e);
                return Ok(());
            }
        };

        let mut events = self.session.subscribe_events();
        self.session.load_composer(composer).await?;
        let id = self.session.generate().await?;
        println!("{}", "جاري توليد القصيدة...".dimmed());

        match wait_settled(&mut events, id).await {
            Some(SessionEvent::Applied { .. }) => {
                let view = self.session.view().await?;
                let poem = match view.preview {
                    Preview::Poem(text) => text,
                    _ => view.document,
                };
                println!();
                println!("{}", poem.bright_white());
                println!();
            }
            Some(SessionEvent::Failed { .. }) => {
                let view = self.session.view().await?;
                println!("{} {}", "!".red(), view.preview);
            }
            Some(_) => println!("{}", "Superseded by a newer request.".dimmed()),
            None => return Err(eyre::eyre!("Session closed while generating")),
        }
        Ok(())
    }

    fn print_step(&self) {
        println!();
        match self.wizard.step() {
            WizardStep::TaskSelection => {
                println!("{}", "Choose a task".bright_cyan());
                println!("  {}", "task generate".yellow());
            }
            WizardStep::Input => {
                println!("{}", "Choose a topic or attach an image".bright_cyan());
                println!("  {} {}", "topic T".yellow(), TOPICS.join("، "));
                println!("  {}", "image CAPTION".yellow());
            }
            WizardStep::Settings => {
                println!("{}", "Settings".bright_cyan());
                println!("  verses: {}  style: {}", self.wizard.verses(), self.wizard.style());
                println!("  {} {}", "verses N".yellow(), "style S".yellow());
            }
            WizardStep::Result => {
                println!("{}", "Result".bright_cyan());
                println!("  {} to generate, again to regenerate", "generate".yellow());
            }
        }
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:16} Start the generate task", "task generate".yellow());
        println!("  {:16} Pick a topic", "topic T".yellow());
        println!("  {:16} Use an image caption as the subject", "image CAPTION".yellow());
        println!("  {:16} Remove the image", "detach".yellow());
        println!("  {:16} Verse count 1-7", "verses N".yellow());
        println!("  {:16} Poetic style", "style S".yellow());
        println!("  {:16} Generate from the result step", "generate".yellow());
        println!("  {:16} Move between steps", "next / back".yellow());
        println!("  {:16} Start over", "reset".yellow());
        println!("  {:16} Exit", "quit".yellow());
        println!();
    }
}
