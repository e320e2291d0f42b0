use crate::errors::{AppError, AppResult};
use crate::models::schedule::CycleSchedule;
use crate::utils::date::parse_offset;
use crate::utils::path::expand_tilde;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_schedule")]
    pub default_schedule: String,
    #[serde(default = "default_offset")]
    pub terminal_utc_offset: String,
    #[serde(default = "default_rest_lookback")]
    pub rest_lookback_days: u32,
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub default_driver: Option<i64>,
}

fn default_schedule() -> String {
    "8_DAY".to_string()
}
fn default_offset() -> String {
    "+00:00".to_string()
}
fn default_rest_lookback() -> u32 {
    3
}
fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Self::database_file().to_string_lossy().to_string(),
            default_schedule: default_schedule(),
            terminal_utc_offset: default_offset(),
            rest_lookback_days: default_rest_lookback(),
            busy_timeout_ms: default_busy_timeout(),
            default_driver: None,
        }
    }
}

impl Config {
    /// Return the standard configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".rhoslog")
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rhoslog.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("rhoslog.sqlite")
    }

    /// Load configuration from file, or return defaults if not found.
    pub fn load() -> AppResult<Self> {
        let path = Self::config_file();

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let cfg: Config = serde_yaml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        self.terminal_offset()?;
        self.schedule()?;
        if self.rest_lookback_days == 0 {
            return Err(AppError::Config(
                "rest_lookback_days must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        expand_tilde(&self.database)
    }

    pub fn terminal_offset(&self) -> AppResult<FixedOffset> {
        parse_offset(&self.terminal_utc_offset)
    }

    pub fn schedule(&self) -> AppResult<CycleSchedule> {
        self.default_schedule.parse()
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// A `--db` value: absolute paths as given, bare names under the config dir.
    pub fn resolve_db_path(name: &str) -> PathBuf {
        let p = expand_tilde(name);
        if p.is_absolute() {
            p
        } else {
            Self::config_dir().join(p)
        }
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Config> {
        let dir = Self::config_dir();

        let db_path = match custom_db {
            Some(name) => Self::resolve_db_path(&name),
            None => Self::database_file(),
        };

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = Config {
            database: db_path.to_string_lossy().to_string(),
            ..Config::default()
        };

        if !is_test {
            fs::create_dir_all(&dir)?;
            let yaml = serde_yaml::to_string(&config)?;
            let mut file = fs::File::create(Self::config_file()).map_err(|_| AppError::ConfigSave)?;
            file.write_all(yaml.as_bytes())
                .map_err(|_| AppError::ConfigSave)?;
        }

        Ok(config)
    }
}
