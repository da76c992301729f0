//! Remote storage abstraction for rcbot.
//!
//! Remote paths are relative to a single configured remote and use `/` as the
//! separator. The empty string is the storage root.

mod rclone;

pub use rclone::RcloneClient;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
    pub modified_at: Option<DateTime<Utc>>,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
            modified_at: None,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
            modified_at: None,
        }
    }
}

/// Trait for remote storage backends.
///
/// No retries happen here; failures are returned to the caller as typed errors.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// List a directory in the backend's native order.
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>>;

    /// Copy one remote file into `local_dir` and return the local file path.
    async fn copy_in(&self, remote_path: &str, local_dir: &Path) -> Result<PathBuf>;

    /// Copy a local file into `remote_dir`. The local file is left in place.
    async fn copy_out(&self, local_file: &Path, remote_dir: &str) -> Result<()>;
}

/// Normalize a remote path: collapse repeated separators and trim both ends.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a parent directory and an entry name.
pub fn join(parent: &str, name: &str) -> String {
    let parent = normalize(parent);
    let name = normalize(name);
    match (parent.is_empty(), name.is_empty()) {
        (true, _) => name,
        (false, true) => parent,
        (false, false) => format!("{}/{}", parent, name),
    }
}

/// Parent of a path, truncating at the last separator. The root's parent is the root.
pub fn parent(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

/// Whether the path addresses the storage root.
pub fn is_root(path: &str) -> bool {
    normalize(path).is_empty()
}

/// Last component of a path.
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
