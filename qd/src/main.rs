//! Qasida - poem generation hand-off pipeline
//!
//! CLI entry point for the keyboard, the wizard and the executor.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};
use uuid::Uuid;

use qasida::cli::{Cli, Command};
use qasida::config::Config;
use qasida::frontend::{KeyboardRepl, WizardRepl, build_generator, load_template};
use qasida::generator::create_generator;
use qasida::handoff::{Executor, ExecutorOutcome, FileHandoff, HandoffGenerator};
use qasida::session::{Session, SessionEvent, SessionOptions, wait_settled};
use qasida::surface::{ApplyMode, Preview};
use qasida::{GenerationRequest, GenerationResult, PromptSnapshot, RequestId, generate};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Can't log here yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qasida")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("qasida.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level from config first, before the full load
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let command = cli.command.unwrap_or(Command::Keyboard {
        handoff: false,
        context: String::new(),
    });
    let mode = command.resolve_apply_mode(config.surface.apply_mode);

    debug!(?command, ?mode, "main: dispatching command");
    match command {
        Command::Keyboard { handoff, context } => cmd_keyboard(&config, mode, handoff, context).await,
        Command::Wizard { handoff } => cmd_wizard(&config, mode, handoff).await,
        Command::Generate {
            text,
            lines,
            topic,
            style,
            handoff,
        } => cmd_generate(&config, mode, text.join(" "), lines, topic, style, handoff).await,
        Command::Submit { text } => cmd_submit(&config, text.join(" ")).await,
        Command::Executor { once } => cmd_executor(&config, once).await,
        Command::Config => cmd_config(&config),
    }
}

async fn cmd_keyboard(config: &Config, mode: ApplyMode, handoff: bool, context: String) -> Result<()> {
    debug!(?mode, handoff, "cmd_keyboard: called");
    let generator = build_generator(config, handoff)?;
    let options = SessionOptions::new(mode)
        .with_template(load_template(config)?)
        .with_context(context);
    let session = Session::spawn(generator, options);
    KeyboardRepl::new(session).run().await
}

async fn cmd_wizard(config: &Config, mode: ApplyMode, handoff: bool) -> Result<()> {
    debug!(?mode, handoff, "cmd_wizard: called");
    let generator = build_generator(config, handoff)?;
    let template = load_template(config)?;
    let session = Session::spawn(generator, SessionOptions::new(mode).with_template(template.clone()));
    WizardRepl::new(session, template).run().await
}

async fn cmd_generate(
    config: &Config,
    mode: ApplyMode,
    text: String,
    lines: Option<u8>,
    topic: Option<String>,
    style: Option<String>,
    handoff: bool,
) -> Result<()> {
    debug!(%text, ?lines, ?topic, ?style, handoff, "cmd_generate: called");
    let generator = build_generator(config, handoff)?;
    let session = Session::spawn(generator, SessionOptions::new(mode).with_template(load_template(config)?));

    session.type_text(&text).await?;
    session.set_line_count(lines).await?;
    session.set_topic(topic).await?;
    session.set_style(style).await?;

    let mut events = session.subscribe_events();
    let id = session.generate().await?;
    let event = wait_settled(&mut events, id).await;
    let view = session.view().await?;
    session.shutdown().await?;

    match (event, view.preview) {
        (Some(SessionEvent::Applied { .. }), Preview::Poem(poem)) => {
            println!("{}", poem);
            Ok(())
        }
        (Some(SessionEvent::Applied { .. }), _) => {
            println!("{}", view.document);
            Ok(())
        }
        (_, preview) => Err(eyre::eyre!("{}", preview)),
    }
}

async fn cmd_submit(config: &Config, text: String) -> Result<()> {
    debug!(%text, "cmd_submit: called");
    let channel = FileHandoff::open(&config.handoff.store_path)?;
    let generator = HandoffGenerator::from_config(Arc::new(channel), &config.handoff);

    let snapshot = PromptSnapshot {
        raw_text: text.clone(),
        topic: None,
        line_count: None,
        style: None,
        instruction: text,
    };
    let request = GenerationRequest::new(RequestId::new(Uuid::now_v7(), 1), snapshot);
    println!("{} {}", "submitted".dimmed(), request.id);

    match generate(&generator, &request).await {
        GenerationResult::Success { text } => {
            println!("{}", text);
            Ok(())
        }
        GenerationResult::Failure { kind, message } => Err(eyre::eyre!("{} failure: {}", kind, message)),
    }
}

async fn cmd_executor(config: &Config, once: bool) -> Result<()> {
    debug!(once, "cmd_executor: called");
    let channel = Arc::new(FileHandoff::open(&config.handoff.store_path)?);
    let generator = create_generator(&config.generator).context("Failed to create HTTP generator")?;
    let executor = Executor::new(
        channel,
        generator,
        Duration::from_millis(config.handoff.poll_interval_ms),
    );

    if once {
        match executor.run_once().await? {
            ExecutorOutcome::Idle => println!("{}", "No prompt waiting.".dimmed()),
            ExecutorOutcome::AlreadyAnswered(id) => println!("{} {}", "already answered".dimmed(), id),
            ExecutorOutcome::Answered(id) => println!("{} {}", "answered".green(), id),
            ExecutorOutcome::Superseded(id) => println!("{} {}", "superseded".yellow(), id),
        }
        return Ok(());
    }

    println!(
        "{} {} (Ctrl-C to stop)",
        "Executor watching".bright_cyan(),
        config.handoff.store_path.display()
    );
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    let run = tokio::spawn(async move { executor.run(shutdown_rx).await });

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, stopping executor");
    let _ = shutdown_tx.send(()).await;
    run.await??;
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}
