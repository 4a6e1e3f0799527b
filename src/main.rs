// Advice Relay - rate-limited chat relay in front of an LLM provider
//
// Browsers post a conversation to /api/chat; the relay checks the per-client
// sliding window, prepends the system prompt, makes one upstream call, and
// returns the reply with formatting artifacts stripped.
//
// Architecture:
// - Relay server (axum): routes, rate-limit middleware, CORS, panic boundary
// - Upstream client (reqwest): bearer-authenticated chat completion call
// - Config: env vars > ~/.config/advice-relay/config.toml > defaults
// - Logging (tracing): console plus optional rolling JSON files

mod cli;
mod config;
mod logging;
mod relay;
mod startup;

use anyhow::Result;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Handle CLI commands first (config --show, --reset, --path)
    // If a command was handled, exit early
    if cli::handle_cli()? {
        return Ok(());
    }

    // Ensure config template exists (helps operators discover options)
    Config::ensure_config_exists();

    // A broken config file or env value stops startup here
    let config = Config::from_env()?;

    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = logging::init(&config.logging);

    startup::print_startup(&config);
    startup::log_startup(&config);

    // Create shutdown channel for graceful server shutdown
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let mut server_handle = tokio::spawn(relay::start_server(config, shutdown_rx));

    let interrupted = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            true
        }
        // Server exited on its own (bind failure, fatal serve error)
        joined = &mut server_handle => {
            joined??;
            false
        }
    };

    if interrupted {
        tracing::info!("Shutting down...");

        // If the send fails, the server has already stopped
        let _ = shutdown_tx.send(());
        server_handle.await??;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
