use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::memory::push_bounded;
use super::HistoryStore;
use crate::models::Snapshot;

/// History persisted as one JSON snapshot per line.
///
/// Reads are served from an in-memory window loaded at open. The file is
/// append-only and gets compacted back down to the window once it holds more
/// than twice `capacity` lines.
pub struct JsonlHistoryStore {
    path: PathBuf,
    capacity: usize,
    window: RwLock<VecDeque<Snapshot>>,
    /// Serializes file writes; holds the number of lines on disk.
    file_lines: Mutex<usize>,
}

impl JsonlHistoryStore {
    /// Opens (or starts) a history file, loading its most recent snapshots.
    ///
    /// Lines that fail to parse are skipped with a warning.
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let capacity = capacity.max(1);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read history file: {}", path.display()))
            }
        };

        let mut window = VecDeque::with_capacity(capacity);
        let mut lines = 0usize;
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            lines += 1;
            match serde_json::from_str::<Snapshot>(line) {
                Ok(snapshot) => push_bounded(&mut window, snapshot, capacity),
                Err(e) => warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "skipping unreadable history entry"
                ),
            }
        }

        debug!(path = %path.display(), loaded = window.len(), "history loaded");

        Ok(Self {
            path,
            capacity,
            window: RwLock::new(window),
            file_lines: Mutex::new(lines),
        })
    }

    async fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create history directory")?;
            }
        }
        Ok(())
    }

    async fn append_line(&self, snapshot: &Snapshot) -> Result<()> {
        self.ensure_parent().await?;

        let mut line = serde_json::to_string(snapshot).context("Failed to serialize snapshot")?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open history file: {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .await
            .context("Failed to append snapshot")?;
        file.flush().await.context("Failed to flush history file")?;
        Ok(())
    }

    /// Rewrites the file to contain exactly the in-memory window.
    async fn compact(&self) -> Result<usize> {
        let window = self.window.read().await.clone();

        let mut content = String::new();
        for snapshot in &window {
            content.push_str(&serde_json::to_string(snapshot).context("Failed to serialize snapshot")?);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content)
            .await
            .context("Failed to write compacted history")?;
        fs::rename(&tmp, &self.path)
            .await
            .context("Failed to replace history file")?;

        debug!(path = %self.path.display(), kept = window.len(), "history compacted");
        Ok(window.len())
    }
}

#[async_trait::async_trait]
impl HistoryStore for JsonlHistoryStore {
    /// The in-memory window is updated even when writing to disk fails, so
    /// readers still see the latest cycle; the error is returned to the caller.
    async fn append(&self, snapshot: Snapshot) -> Result<()> {
        let mut file_lines = self.file_lines.lock().await;

        let persisted = self.append_line(&snapshot).await;

        {
            let mut window = self.window.write().await;
            push_bounded(&mut window, snapshot, self.capacity);
        }

        persisted?;
        *file_lines += 1;

        if *file_lines > self.capacity * 2 {
            *file_lines = self.compact().await?;
        }
        Ok(())
    }

    async fn latest(&self) -> Result<Option<Snapshot>> {
        Ok(self.window.read().await.back().cloned())
    }

    async fn all(&self) -> Result<Vec<Snapshot>> {
        Ok(self.window.read().await.iter().cloned().collect())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
