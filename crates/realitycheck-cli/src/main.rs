use clap::{Parser, Subcommand};
use realitycheck_core::{AppState, CoreError, SessionKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "realitycheck-cli", version, about = "RealityCheck CLI")]
struct Cli {
    /// Act as this user instead of the configured one
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Offline and touch-grass sessions
    Session {
        /// Session kind: offline or touch-grass
        #[arg(long, global = true, default_value = "offline")]
        kind: SessionKind,
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// In-app screen usage
    Usage {
        #[command(subcommand)]
        action: commands::usage::UsageAction,
    },
    /// Report a host app-state change (active, background, inactive)
    AppState { state: AppState },
    /// Offline-session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("REALITYCHECK_LOG")
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let user = cli.user;
    let result = match cli.command {
        Commands::Session { kind, action } => commands::session::run(action, kind, user),
        Commands::Usage { action } => commands::usage::run(action, user),
        Commands::AppState { state } => commands::app_state::run(state, user),
        Commands::Stats { action } => commands::stats::run(action, user),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "command failed");
        let message = match e.downcast_ref::<CoreError>() {
            Some(core) => core.user_message(),
            None => e.to_string(),
        };
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}
