use crate::application::DEFAULT_FLUSH_INTERVAL;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Proxy settings
    pub listen_addr: String,
    pub upstream_url: String,
    pub max_body_bytes: usize,

    // Control API settings
    pub api_listen_addr: String,

    // Queue store settings
    pub store_path: String,
    pub in_memory: bool,

    // Trigger settings
    pub flush_interval_secs: u64,
    pub probe_url: Option<String>,
    pub probe_timeout_ms: u64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            upstream_url: "http://127.0.0.1:3000".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
            api_listen_addr: "0.0.0.0:8081".to_string(),
            store_path: "queue.db".to_string(),
            in_memory: false,
            flush_interval_secs: DEFAULT_FLUSH_INTERVAL.as_secs(),
            probe_url: None,
            probe_timeout_ms: 2000,
            debug: false,
        }
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Build a [`Config`] from an arbitrary variable source.
pub fn load_config_from<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();
    let flag = |key: &str| {
        lookup(key)
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    };

    let listen_addr = lookup("DEFERRER_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let upstream_url = lookup("DEFERRER_UPSTREAM_URL").unwrap_or(defaults.upstream_url);
    if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
        anyhow::bail!("DEFERRER_UPSTREAM_URL must be an http(s) URL, got {}", upstream_url);
    }

    let max_body_bytes = lookup("DEFERRER_MAX_BODY_BYTES")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.max_body_bytes);

    let api_listen_addr = lookup("DEFERRER_API_LISTEN_ADDR").unwrap_or(defaults.api_listen_addr);

    let store_path = lookup("DEFERRER_STORE_PATH").unwrap_or(defaults.store_path);
    let in_memory = flag("DEFERRER_IN_MEMORY");

    let flush_interval_secs = lookup("DEFERRER_FLUSH_INTERVAL_SECS")
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(defaults.flush_interval_secs);

    let probe_url = lookup("DEFERRER_PROBE_URL").filter(|v| !v.is_empty());

    let probe_timeout_ms = lookup("DEFERRER_PROBE_TIMEOUT_MS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.probe_timeout_ms);

    let debug = lookup("DEBUG").is_some();

    Ok(Config {
        listen_addr,
        upstream_url,
        max_body_bytes,
        api_listen_addr,
        store_path,
        in_memory,
        flush_interval_secs,
        probe_url,
        probe_timeout_ms,
        debug,
    })
}
