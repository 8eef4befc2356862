//! Runtime configuration.
//!
//! Layered: compiled defaults, then an optional `synthmob.toml` (working
//! directory first, then the user config dir), then environment
//! variables. Malformed files or values log a warning and fall back;
//! configuration never aborts startup.

use std::path::PathBuf;

use serde::Deserialize;

/// Default ritual timing, in milliseconds.
const DEFAULT_RITUAL_INTERVAL_MS: u64 = 10 * 60 * 1000;
const DEFAULT_NOMINATE_DURATION_MS: u64 = 90 * 1000;
const DEFAULT_VOTE_DURATION_MS: u64 = 60 * 1000;
const DEFAULT_RESULT_DISPLAY_MS: u64 = 30 * 1000;

const DEFAULT_PORT: u16 = 8787;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    ritual: RitualConfig,
    #[serde(default)]
    server: ServerConfig,
}

#[derive(Deserialize, Default)]
struct RitualConfig {
    interval_ms: Option<u64>,
    nominate_duration_ms: Option<u64>,
    vote_duration_ms: Option<u64>,
    result_display_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct ServerConfig {
    port: Option<u16>,
    reset_admin_key: Option<String>,
    journal_path: Option<PathBuf>,
}

/// Resolved configuration handed to the core and the server binary.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub ritual_interval_ms: u64,
    pub nominate_duration_ms: u64,
    pub vote_duration_ms: u64,
    pub result_display_ms: u64,
    pub port: u16,
    pub reset_admin_key: Option<String>,
    pub journal_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ritual_interval_ms: DEFAULT_RITUAL_INTERVAL_MS,
            nominate_duration_ms: DEFAULT_NOMINATE_DURATION_MS,
            vote_duration_ms: DEFAULT_VOTE_DURATION_MS,
            result_display_ms: DEFAULT_RESULT_DISPLAY_MS,
            port: DEFAULT_PORT,
            reset_admin_key: None,
            journal_path: None,
        }
    }
}

impl CoreConfig {
    /// Load configuration: defaults, then file, then environment.
    pub fn load() -> Self {
        let mut config = Self::default();
        if let Some(file) = read_config_file() {
            config.apply_file(file);
        }
        config.apply_env();
        config
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.ritual.interval_ms {
            self.ritual_interval_ms = v;
        }
        if let Some(v) = file.ritual.nominate_duration_ms {
            self.nominate_duration_ms = v;
        }
        if let Some(v) = file.ritual.vote_duration_ms {
            self.vote_duration_ms = v;
        }
        if let Some(v) = file.ritual.result_display_ms {
            self.result_display_ms = v;
        }
        if let Some(v) = file.server.port {
            self.port = v;
        }
        if let Some(v) = file.server.reset_admin_key {
            self.reset_admin_key = Some(v);
        }
        if let Some(v) = file.server.journal_path {
            self.journal_path = Some(v);
        }
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_u64("RITUAL_INTERVAL_MS") {
            self.ritual_interval_ms = v;
        }
        if let Some(v) = env_u64("NOMINATE_DURATION_MS") {
            self.nominate_duration_ms = v;
        }
        if let Some(v) = env_u64("VOTE_DURATION_MS") {
            self.vote_duration_ms = v;
        }
        if let Some(v) = env_u64("RESULT_DISPLAY_MS") {
            self.result_display_ms = v;
        }
        if let Some(v) = env_u64("PORT") {
            self.port = v as u16;
        }
        if let Ok(v) = std::env::var("RESET_ADMIN_KEY") {
            if !v.is_empty() {
                self.reset_admin_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("SYNTHMOB_JOURNAL") {
            if !v.is_empty() {
                self.journal_path = Some(PathBuf::from(v));
            }
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!(target: "config", "ignoring non-numeric {}={}", name, raw);
            None
        }
    }
}

/// `synthmob.toml` in the working directory, then the user config dir.
fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("synthmob.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("synthmob").join("synthmob.toml"));
    }
    paths
}

fn read_config_file() -> Option<ConfigFile> {
    for path in config_paths() {
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(file) => return Some(file),
                Err(e) => {
                    log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e);
                }
            },
            Err(e) => {
                log::warn!(target: "config", "could not read config {}: {}", path.display(), e);
            }
        }
    }
    None
}
