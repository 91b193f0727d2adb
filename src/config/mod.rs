use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `text` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_dedup_window")]
    pub dedup_window_secs: u64,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_min_emit_interval")]
    pub min_emit_interval_secs: u64,
    #[serde(default = "default_position_timeout")]
    pub position_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_lookup_attempts")]
    pub shift_lookup_attempts: u32,
    #[serde(default = "default_lookup_delay")]
    pub shift_lookup_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_database() -> String {
    Config::database_file().to_string_lossy().to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_dedup_window() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    30
}
fn default_min_emit_interval() -> u64 {
    30
}
fn default_position_timeout() -> u64 {
    10
}
fn default_lookup_attempts() -> u32 {
    3
}
fn default_lookup_delay() -> u64 {
    250
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_request_timeout() -> u64 {
    15
}
fn default_batch_size() -> usize {
    200
}

/// `~/x` → `$HOME/x`; anything else unchanged.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            min_emit_interval_secs: default_min_emit_interval(),
            position_timeout_secs: default_position_timeout(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            shift_lookup_attempts: default_lookup_attempts(),
            shift_lookup_delay_ms: default_lookup_delay(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            dedup_window_secs: default_dedup_window(),
            tracker: TrackerConfig::default(),
            ingest: IngestConfig::default(),
            server: ServerConfig::default(),
            backfill: BackfillConfig::default(),
        }
    }
}

impl Config {
    /// Return the standard configuration directory (`~/.crewclock`)
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".crewclock")
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("crewclock.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("crewclock.sqlite")
    }

    /// Load configuration from `path`, or defaults if the file is missing.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut cfg: Config = serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("cannot parse {}: {e}", path.display())))?;

        cfg.database = expand_tilde(&cfg.database).to_string_lossy().to_string();
        Ok(cfg)
    }

    /// Write the configuration file to `config_path` and create the DB
    /// directory. In test mode nothing is written but the DB directory.
    pub fn init_all(custom_db: Option<String>, config_path: &Path, is_test: bool) -> AppResult<Self> {
        let dir = Self::config_dir();

        let db_path = match custom_db {
            Some(name) => {
                let p = expand_tilde(&name);
                if p.is_absolute() { p } else { dir.join(p) }
            }
            None => Self::database_file(),
        };

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        if !is_test {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let yaml = serde_yaml::to_string(&config)
                .map_err(|e| AppError::Config(e.to_string()))?;
            let mut file = fs::File::create(config_path)?;
            file.write_all(yaml.as_bytes())?;
        }

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(config)
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.dedup_window_secs as i64)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crewclock.conf");
        fs::write(
            &path,
            "database: /tmp/cc.sqlite\ntracker:\n  poll_interval_secs: 5\n",
        )
        .unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.database, "/tmp/cc.sqlite");
        assert_eq!(cfg.tracker.poll_interval_secs, 5);
        assert_eq!(cfg.tracker.min_emit_interval_secs, 30);
        assert_eq!(cfg.dedup_window_secs, 30);
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.conf")).unwrap();
        assert_eq!(cfg.log_format, "text");
    }

    #[test]
    fn broken_yaml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.conf");
        fs::write(&path, "tracker: [unclosed").unwrap();
        assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn init_all_writes_config_unless_test() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf").join("crewclock.conf");
        let db = dir.path().join("data").join("cc.sqlite");

        Config::init_all(Some(db.to_string_lossy().to_string()), &conf, true).unwrap();
        assert!(!conf.exists());
        assert!(db.parent().unwrap().exists());

        let cfg = Config::init_all(Some(db.to_string_lossy().to_string()), &conf, false).unwrap();
        assert!(conf.exists());
        assert_eq!(Config::load_from(&conf).unwrap().database, cfg.database);
    }
}
