// CLI module - command-line argument parsing and handlers
//
// Provides subcommands for configuration management:
// - config --show: Display effective configuration
// - config --reset [-y]: Regenerate config file with defaults
// - config --path: Print the config file location

use crate::config::{Config, VERSION};
use crate::relay::upstream;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};

/// Chat relay for the relationship advice service
#[derive(Parser)]
#[command(name = "advice-relay")]
#[command(version = VERSION)]
#[command(about = "Rate-limited chat relay in front of an LLM provider", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,

        /// Skip the overwrite prompt for --reset
        #[arg(long, short = 'y', requires = "reset")]
        yes: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub fn handle_cli() -> Result<bool> {
    let cli = Cli::parse();

    let Some(Commands::Config {
        show,
        reset,
        yes,
        path,
    }) = cli.command
    else {
        return Ok(false); // No subcommand, run the server
    };

    if path {
        println!("{}", config_path()?.display());
    } else if show {
        show_config()?;
    } else if reset {
        reset_config(yes)?;
    } else {
        println!("Usage: advice-relay config [--show|--reset [-y]|--path]");
    }
    Ok(true)
}

fn config_path() -> Result<std::path::PathBuf> {
    Config::config_path().context("Could not determine config path (no home directory)")
}

/// Describe the configured key without revealing it
fn describe_key(config: &Config) -> String {
    match upstream::fingerprint(config.upstream.api_key.as_deref()) {
        Some(fingerprint) => format!("set (sha256 {fingerprint})"),
        None => "not set".to_string(),
    }
}

/// Print the effective configuration as TOML-ish text
fn show_config() -> Result<()> {
    let config = Config::from_env()?;
    let source = match Config::config_path() {
        Some(path) if path.exists() => path.display().to_string(),
        _ => "defaults (no config file)".to_string(),
    };

    let lines = [
        "# Effective configuration (env > file > defaults)".to_string(),
        format!("# Source: {source}"),
        String::new(),
        format!("bind_addr = {:?}", config.bind_addr.to_string()),
        format!("environment = {:?}", config.environment),
        format!("system_prompt = <{} chars>", config.system_prompt.chars().count()),
        String::new(),
        "[upstream]".to_string(),
        format!("endpoint = \"{}{}\"", config.upstream.base_url, config.upstream.path),
        format!("api_key = {}", describe_key(&config)),
        format!("model = {:?}", config.upstream.model),
        format!("max_tokens = {}", config.upstream.max_tokens),
        format!("temperature = {}", config.upstream.temperature),
        format!("timeout_ms = {}", config.upstream.timeout.as_millis()),
        String::new(),
        "[rate_limit]".to_string(),
        format!("window_secs = {}", config.rate_limit.window.as_secs()),
        format!("max_requests = {}", config.rate_limit.max_requests),
        format!("trust_forwarded_for = {}", config.rate_limit.trust_forwarded_for),
        String::new(),
        "[cors]".to_string(),
        format!("allowed_origins = {:?}", config.allowed_origins()),
        String::new(),
        "[logging]".to_string(),
        format!("level = {:?}", config.logging.level_name()),
        format!("file_enabled = {}", config.logging.file_enabled),
    ];
    println!("{}", lines.join("\n"));
    Ok(())
}

fn confirm_overwrite(path: &std::path::Path) -> Result<bool> {
    eprint!("Config file exists at {}. Overwrite? [y/N] ", path.display());
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Rewrite the config file from `Config::default().to_toml()`
fn reset_config(assume_yes: bool) -> Result<()> {
    let path = config_path()?;

    if path.exists() && !assume_yes && !confirm_overwrite(&path)? {
        println!("Aborted.");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, Config::default().to_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Config reset to defaults: {}", path.display());
    Ok(())
}
