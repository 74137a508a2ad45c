use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::market_data::{COINGECKO_API_BASE, FINNHUB_API_BASE};
use crate::models::{default_instruments, InstrumentConfig};

pub const DEFAULT_CONFIG_FILE: &str = "mnav.toml";

/// Data directory used when running on a stateless host (`VERCEL=1`).
const STATELESS_DATA_DIR: &str = "/tmp";

/// How refresh cycles get triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// A background task refreshes every `interval`.
    #[default]
    Scheduled,
    /// Reads refresh first when the latest snapshot is older than `staleness`.
    OnDemand,
}

fn default_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_staleness() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_inter_call_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Refresh scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub mode: RefreshMode,

    /// Period of the background refresh in scheduled mode.
    #[serde(
        default = "default_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub interval: Duration,

    /// How old the latest snapshot can be before an on-demand read refreshes.
    #[serde(
        default = "default_staleness",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub staleness: Duration,

    /// Pause after each equity fetch, to stay under provider rate limits.
    #[serde(
        default = "default_inter_call_delay",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub inter_call_delay: Duration,

    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub request_timeout: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            mode: RefreshMode::default(),
            interval: default_interval(),
            staleness: default_staleness(),
            inter_call_delay: default_inter_call_delay(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Snapshot history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,

    /// JSONL file for durable history. Relative paths resolve against the
    /// data directory. Unset keeps history in memory only.
    pub path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
            path: None,
        }
    }
}

/// Upstream price provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Finnhub API token. `FINNHUB_API_KEY` overrides it.
    #[serde(skip_serializing)]
    pub finnhub_api_key: Option<String>,
    pub finnhub_base_url: String,
    pub coingecko_base_url: String,
    /// Symbol of the reserve asset.
    pub reserve_symbol: String,
    /// CoinGecko id for the reserve asset, when the built-in mapping is not enough.
    pub coingecko_coin_id: Option<String>,
    pub quote_currency: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            finnhub_base_url: FINNHUB_API_BASE.to_string(),
            coingecko_base_url: COINGECKO_API_BASE.to_string(),
            reserve_symbol: "ETH".to_string(),
            coingecko_coin_id: None,
            quote_currency: "usd".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Tracked instruments with their starting reference quantities.
    #[serde(default = "default_instruments")]
    pub instruments: Vec<InstrumentConfig>,

    /// JSON file persisting config updates. Relative paths resolve against
    /// the data directory. Unset keeps updates in memory only.
    pub config_store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            refresh: RefreshConfig::default(),
            history: HistoryConfig::default(),
            providers: ProvidersConfig::default(),
            instruments: default_instruments(),
            config_store_path: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    ///
    /// - `FINNHUB_API_KEY` sets the Finnhub token.
    /// - `VERCEL=1` switches to on-demand refresh with state under `/tmp`,
    ///   persisting history and config there unless paths are already set.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("FINNHUB_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.providers.finnhub_api_key = Some(key.trim().to_string());
        }

        if lookup("VERCEL").as_deref() == Some("1") {
            self.refresh.mode = RefreshMode::OnDemand;
            self.data_dir = Some(PathBuf::from(STATELESS_DATA_DIR));
            self.history.path.get_or_insert_with(|| PathBuf::from("history.jsonl"));
            self.config_store_path
                .get_or_insert_with(|| PathBuf::from("instrument_config.json"));
        }

        self
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    /// Resolve paths against `config_dir`.
    pub fn resolve(self, config_dir: &Path) -> ResolvedConfig {
        let data_dir = self.resolve_data_dir(config_dir);
        let resolve_file = |path: Option<PathBuf>| {
            path.map(|p| if p.is_absolute() { p } else { data_dir.join(p) })
        };

        ResolvedConfig {
            history_path: resolve_file(self.history.path.clone()),
            config_store_path: resolve_file(self.config_store_path.clone()),
            data_dir: data_dir.clone(),
            refresh: self.refresh,
            history: self.history,
            providers: self.providers,
            instruments: self.instruments,
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    /// Absolute location of the durable history file, if any.
    pub history_path: Option<PathBuf>,

    /// Absolute location of the config store file, if any.
    pub config_store_path: Option<PathBuf>,

    pub refresh: RefreshConfig,

    pub history: HistoryConfig,

    pub providers: ProvidersConfig,

    pub instruments: Vec<InstrumentConfig>,
}

impl ResolvedConfig {
    /// Load and resolve config from a file path, applying environment overrides.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?.with_env_overrides();
        Ok(config.resolve(config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            // Resolve the config path relative to current directory
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;

            Ok(Config::default().with_env_overrides().resolve(config_dir))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_data_dir_is_config_dir() {
        let config = Config::default();
        let config_dir = Path::new("/srv/mnav");
        assert_eq!(config.resolve_data_dir(config_dir), PathBuf::from("/srv/mnav"));
    }

    #[test]
    fn test_relative_data_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_data_dir(Path::new("/srv/mnav")),
            PathBuf::from("/srv/mnav/data")
        );
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.refresh.mode, RefreshMode::Scheduled);
        assert_eq!(config.refresh.interval, Duration::from_secs(3600));
        assert_eq!(config.refresh.staleness, Duration::from_secs(3600));
        assert_eq!(config.refresh.inter_call_delay, Duration::from_secs(2));
        assert_eq!(config.refresh.request_timeout, Duration::from_secs(30));
        assert_eq!(config.history.capacity, 100);
        assert!(config.history.path.is_none());
        assert_eq!(config.providers.reserve_symbol, "ETH");
        assert_eq!(config.providers.finnhub_base_url, "https://finnhub.io/api/v1");
        assert_eq!(config.providers.coingecko_base_url, "https://api.coingecko.com/api/v3");
        assert_eq!(config.instruments, default_instruments());
    }

    #[test]
    fn test_load_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("mnav.toml");
        std::fs::File::create(&config_path)?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.data_dir, None);
        assert_eq!(config.instruments.len(), 2);
        Ok(())
    }

    #[test]
    fn test_load_full_config() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("mnav.toml");

        let mut file = std::fs::File::create(&config_path)?;
        writeln!(file, "data_dir = \"./state\"")?;
        writeln!(file, "config_store_path = \"instruments.json\"")?;
        writeln!(file, "[refresh]")?;
        writeln!(file, "mode = \"on_demand\"")?;
        writeln!(file, "staleness = \"30m\"")?;
        writeln!(file, "inter_call_delay = \"500ms\"")?;
        writeln!(file, "[history]")?;
        writeln!(file, "capacity = 50")?;
        writeln!(file, "path = \"history.jsonl\"")?;
        writeln!(file, "[providers]")?;
        writeln!(file, "finnhub_api_key = \"abc\"")?;
        writeln!(file, "[[instruments]]")?;
        writeln!(file, "symbol = \"SBET\"")?;
        writeln!(file, "shares_outstanding = 129038060")?;
        writeln!(file, "eth_holdings = 521939")?;

        let config = Config::load(&config_path)?;
        assert_eq!(config.refresh.mode, RefreshMode::OnDemand);
        assert_eq!(config.refresh.staleness, Duration::from_secs(1800));
        assert_eq!(config.refresh.inter_call_delay, Duration::from_millis(500));
        assert_eq!(config.refresh.interval, Duration::from_secs(3600));
        assert_eq!(config.history.capacity, 50);
        assert_eq!(config.providers.finnhub_api_key.as_deref(), Some("abc"));
        assert_eq!(
            config.instruments,
            vec![InstrumentConfig::new("SBET", 129_038_060.0, 521_939.0)]
        );

        let resolved = config.resolve(dir.path());
        assert_eq!(resolved.data_dir, dir.path().join("./state"));
        assert_eq!(
            resolved.history_path,
            Some(dir.path().join("./state").join("history.jsonl"))
        );
        assert_eq!(
            resolved.config_store_path,
            Some(dir.path().join("./state").join("instruments.json"))
        );
        Ok(())
    }

    #[test]
    fn test_invalid_duration_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("mnav.toml");
        std::fs::write(&config_path, "[refresh]\ninterval = \"soon\"\n")?;
        assert!(Config::load(&config_path).is_err());
        Ok(())
    }

    #[test]
    fn test_env_api_key_override() {
        let config = Config::default().with_overrides_from(env(&[("FINNHUB_API_KEY", " key ")]));
        assert_eq!(config.providers.finnhub_api_key.as_deref(), Some("key"));
        assert_eq!(config.refresh.mode, RefreshMode::Scheduled);
    }

    #[test]
    fn test_stateless_host_switches_to_on_demand() {
        let config = Config::default().with_overrides_from(env(&[("VERCEL", "1")]));
        assert_eq!(config.refresh.mode, RefreshMode::OnDemand);

        let resolved = config.resolve(Path::new("/app"));
        assert_eq!(resolved.data_dir, PathBuf::from("/tmp"));
        assert_eq!(resolved.history_path, Some(PathBuf::from("/tmp/history.jsonl")));
        assert_eq!(
            resolved.config_store_path,
            Some(PathBuf::from("/tmp/instrument_config.json"))
        );
    }

    #[test]
    fn test_other_vercel_values_are_ignored() {
        let config = Config::default().with_overrides_from(env(&[("VERCEL", "0")]));
        assert_eq!(config.refresh.mode, RefreshMode::Scheduled);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn test_config_load_or_default_missing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::load_or_default(&dir.path().join("missing.toml"))?;
        assert_eq!(config.data_dir, None);
        Ok(())
    }

    #[test]
    fn test_resolved_config_resolves_relative_data_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("mnav.toml");
        std::fs::write(&config_path, "data_dir = \"./data\"\n")?;

        let resolved = ResolvedConfig::load(&config_path)?;
        assert_eq!(resolved.data_dir, dir.path().canonicalize()?.join("./data"));
        Ok(())
    }
}
