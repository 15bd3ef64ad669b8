//! Keyboard REPL
//!
//! Each typed line is fed to the session one key at a time. Lines starting
//! with `:` are commands; a line that is exactly a function-key label presses
//! that key.

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::composer::LineCount;
use crate::session::{Session, SessionEvent, SurfaceView};
use crate::surface::Preview;
use crate::surface::layout::{self, KeyAction};

/// One line of keyboard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardInput {
    Type(String),
    Key(KeyAction),
    /// `None` clears the selection
    Lines(Option<u8>),
    Topic(Option<String>),
    Style(Option<String>),
    Show,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line typed at the keyboard prompt
pub fn parse_keyboard_line(line: &str) -> KeyboardInput {
    let trimmed = line.trim();

    if let Some(command) = trimmed.strip_prefix(':') {
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (command, None),
        };
        return match name {
            "del" | "d" => KeyboardInput::Key(KeyAction::Backspace),
            "space" => KeyboardInput::Key(KeyAction::Space),
            "gen" | "g" => KeyboardInput::Key(KeyAction::Generate),
            "paste" | "p" => KeyboardInput::Key(KeyAction::Paste),
            "lines" => match arg {
                None => KeyboardInput::Lines(None),
                Some(n) => match n.parse() {
                    Ok(n) => KeyboardInput::Lines(Some(n)),
                    Err(_) => KeyboardInput::Unknown(trimmed.to_string()),
                },
            },
            "topic" => KeyboardInput::Topic(arg.map(str::to_string)),
            "style" => KeyboardInput::Style(arg.map(str::to_string)),
            "show" | "s" => KeyboardInput::Show,
            "help" | "h" => KeyboardInput::Help,
            "quit" | "q" => KeyboardInput::Quit,
            _ => KeyboardInput::Unknown(trimmed.to_string()),
        };
    }

    match layout::action_for_label(trimmed) {
        Some(KeyAction::Letter(_)) | None => KeyboardInput::Type(line.to_string()),
        Some(action) => KeyboardInput::Key(action),
    }
}

/// Interactive keyboard surface
pub struct KeyboardRepl {
    session: Session,
}

impl KeyboardRepl {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();
        let printer = self.spawn_event_printer();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", "⌨".bright_green()));

            match readline {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line.as_str());

                    if !self.handle(parse_keyboard_line(&line)).await? {
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

        printer.abort();
        self.session.shutdown().await?;
        println!("Goodbye!");
        Ok(())
    }

    /// Returns false when the user quits
    async fn handle(&mut self, input: KeyboardInput) -> Result<bool> {
        debug!(?input, "handle: called");
        match input {
            KeyboardInput::Type(text) => {
                self.session.type_text(&text).await?;
                self.print_view(&self.session.view().await?);
            }
            KeyboardInput::Key(action) => self.press(action).await?,
            KeyboardInput::Lines(count) => match self.session.set_line_count(count).await {
                Ok(()) => println!("{}", "Line count updated.".dimmed()),
                Err(e) => println!("{} {}", "!".red(), e),
            },
            KeyboardInput::Topic(topic) => {
                self.session.set_topic(topic).await?;
                println!("{}", "Topic updated.".dimmed());
            }
            KeyboardInput::Style(style) => {
                self.session.set_style(style).await?;
                println!("{}", "Style updated.".dimmed());
            }
            KeyboardInput::Show => {
                let snapshot = self.session.snapshot().await?;
                self.print_view(&self.session.view().await?);
                if !snapshot.instruction.is_empty() {
                    println!("{} {}", "prompt:".cyan(), snapshot.instruction);
                }
            }
            KeyboardInput::Help => self.print_help(),
            KeyboardInput::Quit => return Ok(false),
            KeyboardInput::Unknown(cmd) => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", ":help".yellow());
            }
        }
        Ok(true)
    }

    async fn press(&mut self, action: KeyAction) -> Result<()> {
        match action {
            KeyAction::Letter(ch) => self.session.append_char(ch).await?,
            KeyAction::Space => self.session.insert_space().await?,
            KeyAction::Backspace => {
                self.session.delete_last().await?;
            }
            KeyAction::LineCountMenu => {
                let choices: Vec<String> = LineCount::choices().map(|c| c.to_string()).collect();
                println!("Choose a line count with {} ({})", ":lines N".yellow(), choices.join(" "));
                return Ok(());
            }
            KeyAction::Generate => {
                let id = self.session.generate().await?;
                println!("{} request {}", "→".bright_blue(), id.seq);
                return Ok(());
            }
            KeyAction::Paste => {
                if !self.session.paste().await? {
                    println!("{}", "Nothing to paste.".dimmed());
                    return Ok(());
                }
            }
        }
        self.print_view(&self.session.view().await?);
        Ok(())
    }

    /// Print outcomes as they arrive, without blocking the prompt
    fn spawn_event_printer(&self) -> JoinHandle<()> {
        let session = self.session.clone();
        let mut events = session.subscribe_events();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    SessionEvent::Applied { id } | SessionEvent::Failed { id, .. } => {
                        if let Ok(view) = session.view().await {
                            println!();
                            println!("{} request {} finished", "←".bright_blue(), id.seq);
                            print_preview(&view.preview);
                        }
                    }
                    SessionEvent::Superseded { id } => {
                        println!();
                        println!("{}", format!("request {} superseded, result dropped", id.seq).dimmed());
                    }
                    SessionEvent::Dispatched { .. } | SessionEvent::Pasted => {}
                }
            }
        })
    }

    fn print_view(&self, view: &SurfaceView) {
        println!("{} {}", "document:".cyan(), view.document);
        print_preview(&view.preview);
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "Qasida keyboard".bright_cyan().bold());
        for row in layout::render_rows() {
            println!("  {}", row);
        }
        println!("Type {} for help, {} to quit", ":help".yellow(), ":quit".yellow());
        println!();
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:14} Delete the last character", ":del".yellow());
        println!("  {:14} Insert a space", ":space".yellow());
        println!("  {:14} Select verse count 1-7 (no N clears)", ":lines N".yellow());
        println!("  {:14} Select a topic (none clears)", ":topic T".yellow());
        println!("  {:14} Select a style (none clears)", ":style S".yellow());
        println!("  {:14} Generate a poem", ":gen".yellow());
        println!("  {:14} Paste the preview into the document", ":paste".yellow());
        println!("  {:14} Show document, preview and prompt", ":show".yellow());
        println!("  {:14} Exit", ":quit".yellow());
        println!();
        println!("Any other line is typed as keystrokes. Key labels such as {} press that key.", layout::GENERATE_KEY);
        println!();
    }
}

fn print_preview(preview: &Preview) {
    match preview {
        Preview::Empty => {}
        Preview::Progress => println!("{} {}", "preview:".cyan(), preview.to_string().dimmed()),
        Preview::Poem(text) => println!("{}\n{}", "preview:".cyan(), text.bright_white()),
        Preview::Diagnostic(text) => println!("{} {}", "preview:".cyan(), text.red()),
    }
}
