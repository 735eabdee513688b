//! Multiplayer blackjack server using the async table actor model.
//!
//! Tables are spawned on demand by the registry; this binary is only the
//! WebSocket transport in front of them. Accounts, authentication, and UI
//! live elsewhere.

mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use fair_blackjack::{MemoryAccounts, TableConfig, TableManager, ledger};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a multiplayer blackjack server

USAGE:
  fb_server [OPTIONS]

OPTIONS:
  --bind            IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:7979]
  --starting-chips  N        Chips for new accounts      [default: env STARTING_CHIPS or 1000]
  --turn-timeout    SECS     Per-decision timeout        [default: env TURN_TIMEOUT_SECS or 30]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  STARTING_CHIPS           Chips credited to a brand-new account
  TURN_TIMEOUT_SECS        Seconds a player may hold the turn
  (See .env file for all configuration options)
";

struct Args {
    bind: SocketAddr,
    starting_chips: u32,
    turn_timeout_secs: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists.
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.value_from_str("--bind").unwrap_or_else(|_| {
            std::env::var("SERVER_BIND")
                .unwrap_or_else(|_| "127.0.0.1:7979".to_string())
                .parse()
                .expect("Invalid SERVER_BIND address")
        }),
        starting_chips: pargs.value_from_str("--starting-chips").unwrap_or_else(|_| {
            std::env::var("STARTING_CHIPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(ledger::DEFAULT_STARTING_CHIPS)
        }),
        turn_timeout_secs: pargs.value_from_str("--turn-timeout").unwrap_or_else(|_| {
            std::env::var("TURN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30)
        }),
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();
    info!("starting blackjack server at {}", args.bind);

    let table_config = TableConfig {
        turn_timeout_secs: args.turn_timeout_secs,
        ..Default::default()
    };
    table_config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid table configuration: {e}"))?;

    let accounts = Arc::new(MemoryAccounts::new(args.starting_chips));
    let table_manager = Arc::new(TableManager::new(accounts, table_config));

    let app = api::create_router(api::AppState { table_manager });

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", args.bind, e))?;

    info!(
        "server is running at ws://{}/ws/<table>?username=<name>. Press Ctrl+C to stop.",
        args.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;

    info!("shutting down server...");

    Ok(())
}

/// Graceful shutdown signal.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
