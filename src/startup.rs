// Startup module - banner and configuration summary
//
// The banner goes to stdout for operators watching the terminal; the same
// facts are logged through tracing so they also land in file logs.

use crate::config::{Config, VERSION};
use crate::relay::upstream;

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// One line of the startup checklist
struct CheckItem {
    label: &'static str,
    ok: bool,
    detail: String,
}

fn checklist(config: &Config) -> Vec<CheckItem> {
    let fingerprint = upstream::fingerprint(config.upstream.api_key.as_deref());

    vec![
        CheckItem {
            label: "API key",
            ok: fingerprint.is_some(),
            detail: match &fingerprint {
                Some(fp) => format!("sha256 {fp}"),
                None => "missing; chat requests will fail with 500".to_string(),
            },
        },
        CheckItem {
            label: "Upstream",
            ok: true,
            detail: format!("{} ({})", config.upstream.base_url, config.upstream.model),
        },
        CheckItem {
            label: "Rate limit",
            ok: config.rate_limit.max_requests > 0,
            detail: format!(
                "{} requests / {}s per client{}",
                config.rate_limit.max_requests,
                config.rate_limit.window.as_secs(),
                if config.rate_limit.trust_forwarded_for {
                    " (X-Forwarded-For)"
                } else {
                    ""
                }
            ),
        },
        CheckItem {
            label: "CORS",
            ok: !config.allowed_origins().is_empty(),
            detail: config.allowed_origins().join(", "),
        },
    ]
}

/// Print the startup banner and checklist
pub fn print_startup(config: &Config) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}Advice Relay{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Chat relay for the relationship advice service{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    for item in checklist(config) {
        let mark = if item.ok {
            format!("{GREEN}✓{RESET}")
        } else {
            format!("{YELLOW}!{RESET}")
        };
        println!("  {mark} {:<11} {DIM}{}{RESET}", item.label, item.detail);
    }
    println!();

    println!(
        "  {MAGENTA}▸{RESET} Relay listening on {BOLD}{}{RESET} {DIM}({}){RESET}",
        config.bind_addr, config.environment
    );
    println!();
}

/// Log the same summary through tracing
pub fn log_startup(config: &Config) {
    tracing::info!(
        version = VERSION,
        bind = %config.bind_addr,
        environment = %config.environment,
        upstream = %config.upstream.base_url,
        model = %config.upstream.model,
        "Relay starting"
    );

    match upstream::fingerprint(config.upstream.api_key.as_deref()) {
        Some(fp) => tracing::info!(key_fingerprint = %fp, "Upstream API key configured"),
        None => tracing::warn!(
            "Upstream API key is not configured; set UPSTREAM_API_KEY. Chat requests will fail"
        ),
    }

    tracing::info!(
        window_secs = config.rate_limit.window.as_secs(),
        max_requests = config.rate_limit.max_requests,
        trust_forwarded_for = config.rate_limit.trust_forwarded_for,
        "Rate limiting enabled"
    );
    tracing::debug!(origins = ?config.allowed_origins(), "CORS allow-list");
}
