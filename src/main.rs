use color_eyre::{eyre::eyre, Result};
use gesturedrive::config::{default_config_path, ensure_default_config, load_config};
use gesturedrive::keys::{ChannelSink, KeyTransition};
use gesturedrive::perception::ReplaySource;
use gesturedrive::session::DriveSession;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const KEY_CHANNEL_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let mut args = std::env::args().skip(1);
    let script_path = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| eyre!("Usage: gesturedrive <replay.toml> [config.toml]"))?;
    let config_path = args.next().map(PathBuf::from).unwrap_or_else(default_config_path);

    ensure_default_config(&config_path).await?;
    let config = load_config(&config_path).await?;

    let source = ReplaySource::load(&script_path)
        .await
        .map_err(|e| eyre!("Failed to load replay script: {}", e))?;

    let (sink, key_rx) = ChannelSink::channel(KEY_CHANNEL_CAPACITY);
    let simulator = tokio::spawn(run_key_simulator(key_rx));

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                ctrl_c_token.cancel();
            }
            Err(e) => error!("Unable to listen for Ctrl-C: {}", e),
        }
    });

    let session = DriveSession::create(&config, Box::new(sink), Box::new(source))?;
    let stats = session.start().run_until_cancelled(token).await?.finish();

    // The session (and with it the sink) is gone, so the simulator drains and exits
    simulator
        .await
        .map_err(|e| eyre!("Key simulator task failed: {}", e))?;

    info!("Done after {} cycles", stats.cycles);
    Ok(())
}

/// Stand-in for the OS key simulator: applies transitions by logging them
async fn run_key_simulator(mut rx: mpsc::Receiver<KeyTransition>) {
    info!("Key simulator ready");
    while let Some(transition) = rx.recv().await {
        info!("Key {} {}", transition.code, if transition.pressed { "down" } else { "up" });
    }
    info!("Key simulator stopped");
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let filter = std::env::var("RUST_LOG").unwrap_or_default();
    let level = log_level(&filter);

    FmtSubscriber::builder()
        .with_max_level(level.unwrap_or(Level::INFO))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();

    if level.is_none() {
        warn!(
            "RUST_LOG '{}' is not a plain level (trace, debug, info, warn, error), using info",
            filter
        );
    }
}

/// Only bare levels are understood, target directives are not
fn log_level(filter: &str) -> Option<Level> {
    Level::from_str(filter.trim()).ok()
}
