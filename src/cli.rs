//! Command-line interface for the xferant maintenance binary.

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use xferant_config::{
    CliOverrides, Config, LoggingConfig, apply_overrides, load_config, validate_config,
};
use xferant_store::{Store, StoreConfig, spawn_reset_task};

/// Xferant CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "xferant",
    version,
    about = "Persistence and provisioning core for the Xferant VPN service",
    propagate_version = true
)]
pub struct Args {
    /// Config file path (json/yaml/toml). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the database schema up to date.
    Migrate,

    /// Expire every active user whose expiration time has passed.
    Sweep,

    /// Run the background maintenance tasks until interrupted.
    Run {
        /// Interval between expiration sweeps (seconds)
        #[arg(long, default_value_t = 60)]
        sweep_interval_secs: u64,
    },
}

/// Load and validate configuration, then run the requested command.
pub async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);

    let store_config = StoreConfig::from(&config);
    info!(database = %config.database.redacted_url(), "connecting");
    let store = Store::initialize(&store_config).await?;

    let result = match args.command {
        Command::Migrate => {
            info!(version = store.schema_version().await?, "schema ready");
            Ok(())
        }
        Command::Sweep => {
            let expired = store.expire_overdue_users(chrono::Utc::now()).await?;
            println!("{expired} user(s) expired");
            Ok(())
        }
        Command::Run {
            sweep_interval_secs,
        } => run_maintenance(&store, &config, sweep_interval_secs).await,
    };

    store.close().await;
    result
}

/// Drive the reset policy and periodic expiration sweeps until a shutdown
/// signal arrives.
async fn run_maintenance(
    store: &Store,
    config: &Config,
    sweep_interval_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    let reset_task = spawn_reset_task(
        store.clone(),
        config.accounting.reset.clone(),
        shutdown.clone(),
    );

    let mut ticker =
        tokio::time::interval(std::time::Duration::from_secs(sweep_interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = store.expire_overdue_users(chrono::Utc::now()).await {
                    warn!(error = %e, "expiration sweep failed");
                }
            }
        }
    }

    if let Some(task) = reset_task
        && let Err(e) = task.await
    {
        warn!(error = %e, "reset task failed");
    }
    info!("maintenance stopped");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialize the tracing subscriber from the logging configuration.
///
/// `level` accepts a plain level or a full `EnvFilter` directive; `format`
/// is plain, json or compact; `output` is stdout or stderr.
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    match (config.format.as_str(), config.output.as_str()) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let args = Args::try_parse_from(["xferant", "--config", "xferant.toml", "migrate"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("xferant.toml")));
        assert!(matches!(args.command, Command::Migrate));

        let args = Args::try_parse_from(["xferant", "run", "--sweep-interval-secs", "15"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Run {
                sweep_interval_secs: 15
            }
        ));

        let args = Args::try_parse_from(["xferant", "sweep", "--config", "x.yaml"]).unwrap();
        assert!(matches!(args.command, Command::Sweep));
        assert_eq!(args.config, Some(PathBuf::from("x.yaml")));
    }

    #[test]
    fn cli_command_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
