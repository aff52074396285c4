//! Configuration parsing – reads a KEY=VALUE file (`birdia.conf`) and
//! applies environment overrides.
//!
//! Shared by the capture layer, the HTTP client and the console.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::idle::IdlePolicy;

/// Default API root used when neither the file nor the environment sets one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/v1";

/// Environment variable that overrides `API_URL`.
pub const API_URL_ENV: &str = "BIRDIA_API_URL";

/// Environment variable pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "BIRDIA_CONFIG";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // ── backend ──────────────────────────────────────────────────────
    pub api_url: String,
    pub request_timeout_secs: u64,

    // ── session ──────────────────────────────────────────────────────
    pub session_path: PathBuf,
    pub idle_timeout_secs: u64,
    pub idle_policy: IdlePolicy,

    // ── location ─────────────────────────────────────────────────────
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geolocation_url: Option<String>,
    pub geolocation_timeout_ms: u64,

    // ── recording ────────────────────────────────────────────────────
    pub rec_card: Option<String>,
    pub recording_dir: PathBuf,

    // ── views ────────────────────────────────────────────────────────
    pub page_size: usize,
    pub error_log_limit: u32,
    /// Default map centre as (latitude, longitude).
    pub map_center: (f64, f64),
    pub map_fly_zoom: u8,
}

impl Config {
    /// Per-user config path, e.g. `~/.config/birdia/birdia.conf`.
    pub fn default_path() -> PathBuf {
        project_dirs()
            .map(|d| d.config_dir().join("birdia.conf"))
            .unwrap_or_else(|| PathBuf::from("birdia.conf"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    /// Fixed device coordinates, when both are configured.
    pub fn fixed_location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

impl Default for Config {
    fn default() -> Self {
        from_map(&HashMap::new())
    }
}

/// Resolve the config path: explicit argument, then `BIRDIA_CONFIG`, then
/// the per-user default.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(Config::default_path)
}

/// Parse a `KEY=VALUE` configuration file and apply environment overrides.
pub fn load(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))?;

    let map = parse_conf(&text);
    info!("Loaded config from {}", path.display());
    Ok(apply_env(from_map(&map)))
}

/// Like [`load`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load(path)
    } else {
        debug!("No config at {} – using defaults", path.display());
        Ok(apply_env(Config::default()))
    }
}

fn apply_env(mut config: Config) -> Config {
    if let Ok(url) = std::env::var(API_URL_ENV) {
        if !url.trim().is_empty() {
            config.api_url = normalize_url(&url);
        }
    }
    config
}

fn from_map(map: &HashMap<String, String>) -> Config {
    let get = |key: &str| -> Option<String> { map.get(key).cloned().filter(|v| !v.is_empty()) };
    let get_u64 = |key: &str, default: u64| -> u64 {
        get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    };
    let get_f64 = |key: &str| -> Option<f64> { get(key).and_then(|v| v.parse().ok()) };

    let idle_grace = Duration::from_secs(get_u64("IDLE_GRACE_SECS", 60));
    let idle_policy = match get("IDLE_POLICY").as_deref().map(str::to_ascii_lowercase) {
        Some(p) if p == "logout" => IdlePolicy::Logout,
        _ => IdlePolicy::Prompt { grace: idle_grace },
    };

    let map_center = get("MAP_CENTER")
        .and_then(|v| parse_pair(&v))
        .unwrap_or((-2.1894, -79.8891));

    Config {
        api_url: normalize_url(&get("API_URL").unwrap_or_else(|| DEFAULT_API_URL.into())),
        request_timeout_secs: get_u64("REQUEST_TIMEOUT_SECS", 30),

        session_path: get("SESSION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_session_path),
        idle_timeout_secs: get_u64("IDLE_TIMEOUT_SECS", 15 * 60),
        idle_policy,

        latitude: get_f64("LATITUDE"),
        longitude: get_f64("LONGITUDE"),
        geolocation_url: get("GEOLOCATION_URL"),
        geolocation_timeout_ms: get_u64("GEOLOCATION_TIMEOUT_MS", 5000),

        rec_card: get("REC_CARD"),
        recording_dir: get("RECORDING_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir),

        page_size: get("PAGE_SIZE")
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(10),
        error_log_limit: get("ERROR_LOG_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(50),
        map_center,
        map_fly_zoom: get("MAP_FLY_ZOOM").and_then(|v| v.parse().ok()).unwrap_or(16),
    }
}

fn default_session_path() -> PathBuf {
    project_dirs()
        .map(|d| d.data_dir().join("session.json"))
        .unwrap_or_else(|| std::env::temp_dir().join("birdia-session.json"))
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "birdia")
}

pub fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_pair(v: &str) -> Option<(f64, f64)> {
    let (a, b) = v.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Parse `KEY=VALUE` lines into a map, stripping optional double-quotes.
fn parse_conf(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim();
            let val = val.trim().trim_matches('"');
            map.insert(key.to_string(), val.to_string());
        }
    }
    map
}

// ─── tests ───────────────────────────────────────────────────────────────
