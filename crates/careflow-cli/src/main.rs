mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "careflow",
    about = "Medical assistant orchestrator: route requests to specialist agents and integrate their answers",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, global = true, env = "CAREFLOW_CONFIG", default_value = careflow_core::config::CONFIG_FILE)]
    config: PathBuf,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat server
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single chat turn and print the response
    Chat {
        /// User id the turn belongs to
        #[arg(long, default_value = "cli")]
        user: String,
        /// Answer every oracle call with this action string instead of the
        /// configured oracle
        #[arg(long, value_name = "ACTION")]
        reply: Option<String>,
        /// The message
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Show which task types and executors an instruction routes to
    Classify {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List executors and their actions
    Executors,

    /// Inspect and validate configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Serve { port } => cmd::serve::run(&cli.config, port),
        Commands::Chat {
            user,
            reply,
            message,
        } => cmd::chat::run(&cli.config, &user, &message.join(" "), reply, cli.json),
        Commands::Classify { text } => cmd::classify::run(&cli.config, &text.join(" "), cli.json),
        Commands::Executors => cmd::executors::run(&cli.config, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&cli.config, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
