use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inferlink::cli::CommandContext;
use inferlink::cli::commands::{bookmark, bookmark::BookmarkArgs, config, query, query::QueryArgs};
use inferlink::cli::ui::Output;

#[derive(Parser)]
#[command(name = "inferlink")]
#[command(
    version,
    about = "Resilient gateway to a language-model inference service"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Explicit config file; defaults to the global/project/env chain
    #[arg(long, short, env = "INFERLINK_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt through the gateway
    Query(QueryArgs),

    /// Embedding vector for a piece of text
    Embed { text: String },

    /// Free-text analysis of a bookmark
    Analyze(BookmarkArgs),

    /// Suggest tags for a bookmark
    Tags(BookmarkArgs),

    /// Suggest a category for a bookmark
    Categorize {
        #[command(flatten)]
        bookmark: BookmarkArgs,

        /// Comma-separated existing categories
        #[arg(long)]
        existing: Option<String>,
    },

    /// Semantic search over a JSON file of bookmarks
    Search {
        query: String,

        #[arg(long)]
        bookmarks: PathBuf,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective configuration
    Show {
        #[arg(long, short, default_value = "toml")]
        format: String,
    },
    /// Show config file paths
    Path,
    /// Write a default config file
    Init {
        #[arg(long, short)]
        global: bool,
        #[arg(long)]
        force: bool,
    },
}

/// Setup custom panic handler for better error messages
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31minferlink encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Output::new().error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => config::show(config_path, &format)?,
            ConfigAction::Path => config::path()?,
            ConfigAction::Init { global, force } => config::init(global, force)?,
        },
        command => {
            let ctx = CommandContext::load(config_path)?;
            let rt = Runtime::new()?;
            rt.block_on(async {
                match command {
                    Commands::Query(args) => query::run(&ctx, args).await,
                    Commands::Embed { text } => query::embed(&ctx, &text).await,
                    Commands::Analyze(args) => bookmark::analyze(&ctx, &args).await,
                    Commands::Tags(args) => bookmark::tags(&ctx, &args).await,
                    Commands::Categorize {
                        bookmark: args,
                        existing,
                    } => bookmark::categorize(&ctx, &args, existing.as_deref()).await,
                    Commands::Search {
                        query: text,
                        bookmarks,
                    } => bookmark::search(&ctx, &text, &bookmarks).await,
                    // Handled above without building a gateway
                    Commands::Config { .. } => Ok(()),
                }
            })?;
        }
    }

    Ok(())
}
