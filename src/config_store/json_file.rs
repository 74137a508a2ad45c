use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::{index_defaults, normalize_symbol, ConfigStore};
use crate::error::TrackerError;
use crate::models::InstrumentConfig;

/// Config store backed by a single JSON file holding the whole map.
///
/// ```text
/// {
///   "SBET": { "symbol": "SBET", "shares_outstanding": 129038060.0, "eth_holdings": 521939.0 },
///   "BMNR": { "symbol": "BMNR", "shares_outstanding": 0.0, "eth_holdings": 0.0 }
/// }
/// ```
///
/// Every `set` rewrites the file through a temp file and a rename.
pub struct JsonConfigStore {
    path: PathBuf,
    configs: RwLock<BTreeMap<String, InstrumentConfig>>,
    write_lock: Mutex<()>,
}

impl JsonConfigStore {
    /// Loads the file (if any) on top of `defaults`.
    ///
    /// Entries for symbols outside `defaults` are ignored.
    pub async fn open(
        path: impl AsRef<Path>,
        defaults: impl IntoIterator<Item = InstrumentConfig>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut configs = index_defaults(defaults);

        if let Some(stored) = read_map(&path).await? {
            for (key, stored) in stored {
                let symbol = normalize_symbol(&key);
                match configs.get_mut(&symbol) {
                    Some(entry) => {
                        entry.shares_outstanding = stored.shares_outstanding;
                        entry.eth_holdings = stored.eth_holdings;
                    }
                    None => warn!(symbol = %symbol, path = %path.display(), "ignoring config for untracked instrument"),
                }
            }
        }

        Ok(Self {
            path,
            configs: RwLock::new(configs),
            write_lock: Mutex::new(()),
        })
    }

    async fn persist(&self, configs: &BTreeMap<String, InstrumentConfig>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }

        let content = serde_json::to_string_pretty(configs).context("Failed to serialize config")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

async fn read_map(path: &Path) -> Result<Option<BTreeMap<String, InstrumentConfig>>> {
    match fs::read_to_string(path).await {
        Ok(content) => {
            let map = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
            Ok(Some(map))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

#[async_trait::async_trait]
impl ConfigStore for JsonConfigStore {
    async fn get(&self, symbol: &str) -> Result<Option<InstrumentConfig>, TrackerError> {
        Ok(self.configs.read().await.get(&normalize_symbol(symbol)).cloned())
    }

    async fn get_all(&self) -> Result<BTreeMap<String, InstrumentConfig>, TrackerError> {
        Ok(self.configs.read().await.clone())
    }

    /// The in-memory map only changes once the file write succeeded.
    async fn set(
        &self,
        symbol: &str,
        shares_outstanding: f64,
        eth_holdings: f64,
    ) -> Result<InstrumentConfig, TrackerError> {
        let symbol = normalize_symbol(symbol);
        let _guard = self.write_lock.lock().await;

        let mut next = self.configs.read().await.clone();
        let entry = next
            .get_mut(&symbol)
            .ok_or_else(|| TrackerError::UnknownInstrument(symbol.clone()))?;
        entry.shares_outstanding = shares_outstanding;
        entry.eth_holdings = eth_holdings;
        let updated = entry.clone();

        self.persist(&next).await?;
        *self.configs.write().await = next;

        info!(
            symbol = %updated.symbol,
            shares_outstanding,
            eth_holdings,
            "instrument config saved"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::default_instruments;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonConfigStore::open(dir.path().join("config.json"), default_instruments()).await?;
        assert_eq!(store.get("SBET").await?, Some(InstrumentConfig::unconfigured("SBET")));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_survives_reopen() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("state").join("config.json");

        let store = JsonConfigStore::open(&path, default_instruments()).await?;
        store.set("SBET", 129_038_060.0, 521_939.0).await?;
        drop(store);

        let reopened = JsonConfigStore::open(&path, default_instruments()).await?;
        assert_eq!(
            reopened.get("sbet").await?,
            Some(InstrumentConfig::new("SBET", 129_038_060.0, 521_939.0))
        );
        assert_eq!(reopened.get("BMNR").await?, Some(InstrumentConfig::unconfigured("BMNR")));
        assert!(!path.with_extension("json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_untracked_entries_in_file_are_ignored() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"XYZ": {"symbol": "XYZ", "shares_outstanding": 5.0, "eth_holdings": 5.0},
                "bmnr": {"symbol": "BMNR", "shares_outstanding": 121700000.0, "eth_holdings": 833137.0}}"#,
        )
        .await?;

        let store = JsonConfigStore::open(&path, default_instruments()).await?;
        let all = store.get_all().await?;
        assert_eq!(all.len(), 2);
        assert!(all["BMNR"].is_configured());
        assert!(store.get("XYZ").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_symbol_leaves_file_untouched() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        let store = JsonConfigStore::open(&path, default_instruments()).await?;

        let err = store.set("XYZ", 1.0, 1.0).await.unwrap_err();
        assert_eq!(err, TrackerError::UnknownInstrument("XYZ".into()));
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_failure_keeps_previous_values() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        let store = JsonConfigStore::open(&path, default_instruments()).await?;
        // A directory in place of the file makes the rename fail.
        fs::create_dir_all(&path).await?;
        fs::write(path.join("occupied"), "x").await?;

        let err = store.set("SBET", 1.0, 1.0).await.unwrap_err();
        assert!(matches!(err, TrackerError::Storage(_)));
        assert_eq!(store.get("SBET").await?, Some(InstrumentConfig::unconfigured("SBET")));
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_open() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").await?;
        assert!(JsonConfigStore::open(&path, default_instruments()).await.is_err());
        Ok(())
    }
}
