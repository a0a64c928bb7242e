//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use streamdown_core::config;

use crate::logging;

mod commands;

#[derive(Parser)]
#[command(name = "streamdown")]
#[command(version)]
#[command(about = "Render streamed markdown analyses and chat replies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output switches shared by the streaming commands.
#[derive(clap::Args, Debug, Clone, Copy, Default)]
struct StreamOutputArgs {
    /// Print the final snapshot as JSON instead of rendered text
    #[arg(long)]
    json: bool,

    /// Print one JSON line per snapshot while the stream is consumed
    #[arg(long)]
    snapshots: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Parse a markdown document and print it
    Render {
        /// Markdown file, or - for stdin
        #[arg(value_name = "FILE", default_value = "-")]
        input: String,

        /// Print the block tree as JSON
        #[arg(long)]
        json: bool,

        /// Override the render width from config
        #[arg(long)]
        width: Option<usize>,
    },

    /// Feed a captured event stream through the analysis pipeline
    Replay {
        /// Event-stream capture, or - for stdin
        #[arg(value_name = "FILE", default_value = "-")]
        input: String,

        #[command(flatten)]
        output: StreamOutputArgs,
    },

    /// Consume a live event stream over HTTP
    Watch {
        /// Event-stream endpoint
        #[arg(value_name = "URL")]
        url: String,

        /// Bearer token sent with the request
        #[arg(long, env = "STREAMDOWN_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[command(flatten)]
        output: StreamOutputArgs,
    },

    /// Replay assistant replies into a chat transcript
    Chat {
        /// One event-stream capture per reply, or - for stdin
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<String>,

        /// User message preceding each reply (repeat once per capture)
        #[arg(long = "user", value_name = "TEXT", required = true)]
        users: Vec<String>,

        /// Print the outbound history as JSON after the transcript
        #[arg(long)]
        history: bool,

        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config)?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, &config).await })
}

async fn dispatch(cli: Cli, config: &config::Config) -> Result<()> {
    match cli.command {
        Commands::Render { input, json, width } => {
            let width = width.unwrap_or_else(|| config.render_width());
            commands::render::run(&input, json, width)
        }
        Commands::Replay { input, output } => {
            commands::replay::run(&input, output.into(), config).await
        }
        Commands::Watch { url, token, output } => {
            commands::watch::run(&url, token.as_deref(), output.into(), config).await
        }
        Commands::Chat {
            inputs,
            users,
            history,
            json,
        } => {
            commands::chat::run(commands::chat::ChatRunOptions {
                inputs: &inputs,
                users: &users,
                history,
                json,
                config,
            })
            .await
        }
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}

impl From<StreamOutputArgs> for commands::replay::OutputMode {
    fn from(args: StreamOutputArgs) -> Self {
        commands::replay::OutputMode {
            json: args.json,
            snapshots: args.snapshots,
        }
    }
}
