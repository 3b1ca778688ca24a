//! Memo Bot CLI - classify notes from the terminal.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use clap::{Args, Parser, Subcommand};
use memo_bot::error::{BotError, Result};
use memo_bot::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Memo Bot - files notes under categories and tags
#[derive(Parser)]
#[command(name = "memo-bot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, env = "MEMO_BOT_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init(InitArgs),

    /// Classify a single note
    Classify(ClassifyArgs),

    /// Classify notes read line by line from stdin
    Chat(ChatArgs),

    /// Show bot status and configuration
    Status,

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for the init command
#[derive(Args)]
struct InitArgs {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    force: bool,
}

/// Arguments for the classify command
#[derive(Args)]
struct ClassifyArgs {
    /// User the note belongs to
    #[arg(short, long, default_value_t = 0)]
    user: UserId,

    /// Print the raw classification as JSON
    #[arg(long, conflicts_with = "markdown")]
    json: bool,

    /// Print the reply as Telegram MarkdownV2
    #[arg(long)]
    markdown: bool,

    /// Note text
    #[arg(required = true, num_args = 1..)]
    text: Vec<String>,
}

/// Arguments for the chat command
#[derive(Args)]
struct ChatArgs {
    /// User the notes belong to
    #[arg(short, long, default_value_t = 0)]
    user: UserId,
}

/// Arguments for the config command
#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "memo_bot={level},memo={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let config_file = cli.config.unwrap_or_else(config_path);
    match cli.command {
        Commands::Init(args) => cmd_init(args, &config_file).await,
        Commands::Classify(args) => cmd_classify(args, &config_file).await,
        Commands::Chat(args) => cmd_chat(args, &config_file).await,
        Commands::Status => cmd_status(&config_file).await,
        Commands::Config(args) => cmd_config(args, &config_file).await,
    }
}

/// Initialize configuration.
async fn cmd_init(args: InitArgs, config_file: &Path) -> Result<()> {
    if config_file.exists() && !args.force {
        println!("Configuration already exists at: {}", config_file.display());
        println!("Use --force to overwrite.");
        return Ok(());
    }

    init_config(config_file)
        .await
        .map_err(|e| BotError::config(format!("failed to initialize config: {e}")))?;

    println!("Configuration created: {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("  1. export OPENAI_API_KEY=<key>");
    println!("  2. export OPENAI_ASSISTANT_ID=<assistant id>");
    println!("  3. memo-bot classify \"buy milk #errands\"");

    Ok(())
}

/// Load configuration, apply environment overrides and build a dispatcher.
async fn build_dispatcher(config_file: &Path) -> Result<Dispatcher> {
    let config = load_or_default(config_file).await?.with_env();

    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|issue| issue.level == IssueLevel::Error)
        .map(|issue| issue.message)
        .collect();
    if !errors.is_empty() {
        return Err(BotError::config(errors.join("; ")));
    }

    let classifier = Classifier::new(
        Arc::new(config.build_assistant()?),
        config.storage.open()?,
        config.classifier.clone(),
    )?;
    tracing::debug!(
        storage = config.storage.kind(),
        max_concurrent = config.dispatch.max_concurrent,
        "classifier ready"
    );

    Ok(Dispatcher::new(
        Arc::new(classifier),
        Arc::new(TagBook::new()),
        config.dispatch.max_concurrent,
    ))
}

/// Classify one note.
async fn cmd_classify(args: ClassifyArgs, config_file: &Path) -> Result<()> {
    let dispatcher = build_dispatcher(config_file).await?;
    let note = InboundNote::new(args.user, args.text.join(" "));

    let classified = tokio::select! {
        classified = dispatcher.process(note) => classified,
        _ = tokio::signal::ctrl_c() => {
            dispatcher.shutdown();
            return Ok(());
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classified.result)?);
    } else if args.markdown {
        println!("{}", render_markdown_reply(&classified.result));
    } else {
        print!("{}", render_reply(&classified.result));
    }

    Ok(())
}

/// Classify stdin lines concurrently until EOF, `/quit` or Ctrl+C.
async fn cmd_chat(args: ChatArgs, config_file: &Path) -> Result<()> {
    let dispatcher = build_dispatcher(config_file).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut replies = JoinSet::new();

    println!("Memo Bot Chat | /help for commands, /quit to exit\n");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                dispatcher.shutdown();
                break;
            }
        };
        let Some(line) = line else { break };

        match ChatCommand::parse(&line) {
            None => {}
            Some(ChatCommand::Quit) => break,
            Some(ChatCommand::Note(note)) => {
                let handle = dispatcher.dispatch(InboundNote::new(args.user, note));
                replies.spawn(async move {
                    let classified = handle.await?;
                    println!("> {}\n{}", classified.note.content, render_reply(&classified.result));
                    Ok::<(), BotError>(())
                });
            }
            Some(command) => {
                if let Some(reply) = command.respond(args.user, dispatcher.tags()).await {
                    println!("{reply}\n");
                }
            }
        }
    }

    while let Some(joined) = replies.join_next().await {
        joined??;
    }

    Ok(())
}

/// Show status.
async fn cmd_status(config_file: &Path) -> Result<()> {
    println!("Memo Bot Status\n");

    // Configuration
    println!("Configuration:");
    println!("  Path:   {}", config_file.display());
    println!(
        "  Exists: {}",
        if config_file.exists() { "yes" } else { "no" }
    );

    match load_or_default(config_file).await {
        Ok(config) => {
            let config = config.with_env();
            println!("  Valid:  {}", if config.is_valid() { "yes" } else { "no" });
            println!();
            println!("Assistant:");
            println!("  Base URL:     {}", config.assistant.base_url);
            println!(
                "  Assistant ID: {}",
                config.assistant.assistant_id.as_deref().unwrap_or("-")
            );
            println!();
            println!("Classifier:");
            println!("  Max tags:       {}", config.classifier.max_tags);
            println!(
                "  Session policy: {:?}",
                config.classifier.session_policy
            );
            println!("  Poll interval:  {}ms", config.classifier.poll_interval_ms);
            match config.classifier.max_wait_secs {
                Some(secs) => println!("  Max wait:       {secs}s"),
                None => println!("  Max wait:       unbounded"),
            }
            println!();
            println!("Storage:  {}", config.storage.kind());
            println!("Dispatch: {} concurrent", config.dispatch.max_concurrent);
        }
        Err(e) => {
            println!("  Valid:  no ({e})");
        }
    }

    println!();
    println!("Environment:");
    print_env_status("OPENAI_API_KEY");
    print_env_status("OPENAI_ASSISTANT_ID");
    print_env_status("OPENAI_BASE_URL");
    print_env_status("MEMO_BOT_CONFIG");

    Ok(())
}

/// Configuration management.
async fn cmd_config(args: ConfigArgs, config_file: &Path) -> Result<()> {
    match args.command {
        ConfigCommands::Path => {
            println!("{}", config_file.display());
        }
        ConfigCommands::Show => {
            if config_file.exists() {
                let content = tokio::fs::read_to_string(config_file)
                    .await
                    .map_err(|e| BotError::config(format!("failed to read config: {e}")))?;
                println!("{content}");
            } else {
                println!("Configuration file does not exist.");
                println!("Run 'memo-bot init' to create one.");
            }
        }
        ConfigCommands::Validate => {
            if !config_file.exists() {
                println!("error: configuration file does not exist");
                return Ok(());
            }

            match load_config_from(config_file).await {
                Ok(config) => {
                    let issues = config.with_env().validate();
                    if issues.is_empty() {
                        println!("Configuration is valid");
                    }
                    for issue in issues {
                        println!("{issue}");
                    }
                }
                Err(e) => println!("error: {e}"),
            }
        }
    }

    Ok(())
}

/// Print environment variable status.
fn print_env_status(name: &str) {
    let status = if std::env::var(name).is_ok() {
        "set"
    } else {
        "-"
    };
    println!("  {name}: {status}");
}
