use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::CandidatePost;

/// Read-only snapshot of the posts corpus, loaded from a JSON file.
///
/// The engine never writes posts; `reload` picks up a new snapshot written
/// by whatever owns the data.
pub struct PostStore {
    posts: RwLock<Arc<Vec<CandidatePost>>>,
    source: Option<PathBuf>,
}

impl PostStore {
    /// Load posts from `path`. A missing file yields an empty corpus.
    pub fn open(path: &Path) -> Result<Self> {
        let posts = read_posts(path)?;
        Ok(Self {
            posts: RwLock::new(Arc::new(posts)),
            source: Some(path.to_path_buf()),
        })
    }

    pub fn from_posts(posts: Vec<CandidatePost>) -> Self {
        Self {
            posts: RwLock::new(Arc::new(posts)),
            source: None,
        }
    }

    /// Current corpus. Later reloads do not affect a snapshot already taken.
    pub fn snapshot(&self) -> Arc<Vec<CandidatePost>> {
        self.posts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-read the backing file, returning the new post count.
    pub fn reload(&self) -> Result<usize> {
        let path = self
            .source
            .as_deref()
            .context("Post store has no backing file")?;
        let posts = read_posts(path)?;
        let count = posts.len();
        *self.posts.write() = Arc::new(posts);
        tracing::info!("Reloaded {count} posts from {}", path.display());
        Ok(count)
    }
}

fn read_posts(path: &Path) -> Result<Vec<CandidatePost>> {
    if !path.exists() {
        tracing::warn!("Posts file {} not found, starting empty", path.display());
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read posts from {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse posts in {}", path.display()))
}
