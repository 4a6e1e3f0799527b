//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

/// Render a TOML string array
fn toml_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| format!("{:?}", s)).collect();
    format!("[{}]", quoted.join(", "))
}

impl Config {
    /// Serialize config to a commented TOML document
    ///
    /// The API key is never written out; it belongs in `UPSTREAM_API_KEY` or
    /// is added to the file by hand.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();

        out.push_str("# advice-relay configuration\n");
        out.push_str("# Environment variables override every value in this file.\n\n");

        out.push_str("# Listen address (env: RELAY_BIND, PORT overrides the port)\n");
        out.push_str(&format!("bind_addr = {:?}\n\n", self.bind_addr.to_string()));

        out.push_str("# \"production\" selects [cors].production_origins (env: RELAY_ENV)\n");
        out.push_str(&format!("environment = {:?}\n\n", self.environment));

        out.push_str("# System instruction prepended to every conversation\n");
        out.push_str(&format!("system_prompt = '''\n{}'''\n\n", self.system_prompt));

        out.push_str("[upstream]\n");
        out.push_str(&format!("base_url = {:?}\n", self.upstream.base_url));
        out.push_str(&format!("path = {:?}\n", self.upstream.path));
        out.push_str("# api_key = \"YOUR_ACTUAL_API_KEY\"   # prefer env: UPSTREAM_API_KEY\n");
        out.push_str(&format!("model = {:?}\n", self.upstream.model));
        out.push_str(&format!("max_tokens = {}\n", self.upstream.max_tokens));
        out.push_str(&format!("temperature = {:?}\n", self.upstream.temperature));
        out.push_str(&format!(
            "timeout_ms = {}\n\n",
            self.upstream.timeout.as_millis()
        ));

        out.push_str("[rate_limit]\n");
        out.push_str(&format!(
            "window_secs = {}\n",
            self.rate_limit.window.as_secs()
        ));
        out.push_str(&format!(
            "max_requests = {}\n",
            self.rate_limit.max_requests
        ));
        out.push_str("# Only behind a reverse proxy that sets X-Forwarded-For itself\n");
        out.push_str(&format!(
            "trust_forwarded_for = {}\n\n",
            self.rate_limit.trust_forwarded_for
        ));

        out.push_str("[cors]\n");
        out.push_str(&format!(
            "development_origins = {}\n",
            toml_list(&self.cors.development_origins)
        ));
        out.push_str(&format!(
            "production_origins = {}\n\n",
            toml_list(&self.cors.production_origins)
        ));

        out.push_str("[logging]\n");
        out.push_str("# trace, debug, info, warn, error (RUST_LOG overrides)\n");
        out.push_str(&format!("level = {:?}\n", self.logging.level_name()));
        out.push_str(&format!("file_enabled = {}\n", self.logging.file_enabled));
        out.push_str(&format!(
            "file_dir = {:?}\n",
            self.logging.file_dir.display().to_string()
        ));
        out.push_str("# hourly, daily, never\n");
        out.push_str(&format!(
            "file_rotation = {:?}\n",
            self.logging.file_rotation.as_str()
        ));
        out.push_str(&format!("file_prefix = {:?}\n", self.logging.file_prefix));

        out
    }
}
