use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

static VALID_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9]+\.pdf$").unwrap());

/// Directory of composed fax documents, served to the carrier by file name.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    base_url: String,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// URL the carrier fetches `file` from.
    pub fn media_url(&self, file: &str) -> String {
        format!("{}{}", self.base_url, file)
    }

    /// Only plain `<id>.pdf` names may be served; anything else could escape the directory.
    pub fn is_servable(name: &str) -> bool {
        VALID_FILE.is_match(name)
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn ensure_dir(&self) -> Result<(), MediaError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Write `data` under a fresh unique name with the given extension and return that name.
    pub async fn store(&self, data: &[u8], extension: &str) -> Result<String, MediaError> {
        let name = format!("{}.{}", Uuid::new_v4(), extension.trim_start_matches('.'));
        tokio::fs::write(self.path_for(&name), data).await?;
        Ok(name)
    }

    pub async fn read(&self, file: &str) -> Result<Vec<u8>, MediaError> {
        Ok(tokio::fs::read(self.path_for(file)).await?)
    }

    pub async fn remove(&self, file: &str) -> Result<(), MediaError> {
        tokio::fs::remove_file(self.path_for(file)).await?;
        Ok(())
    }

    /// Files of any kind older than `retention` that no live job references.
    ///
    /// Entries that cannot be inspected are logged and skipped.
    pub fn orphans(
        &self,
        referenced: &HashSet<&str>,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<Vec<PathBuf>, MediaError> {
        let mut stale = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "Unable to read media directory entry");
                    continue;
                }
            };
            let path = entry.path();
            let name = entry.file_name();
            if referenced.contains(name.to_string_lossy().as_ref()) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unable to stat media file");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let modified = match metadata.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Unable to stat media file");
                    continue;
                }
            };
            if now - modified > retention {
                stale.push(path);
            }
        }
        Ok(stale)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media file operation failed: {0}")]
    Io(#[from] io::Error),
}
