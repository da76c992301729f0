//! rclone-backed remote storage.
//!
//! Shells out to the `rclone` binary: `lsjson` for listings and `copy` for
//! transfers in both directions.

use super::{DirectoryEntry, RemoteStorage};
use crate::config::RemoteSettings;
use crate::error::{RcbotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// rclone exit code for "directory not found".
const EXIT_DIR_NOT_FOUND: i32 = 3;
/// rclone exit code for "file not found".
const EXIT_FILE_NOT_FOUND: i32 = 4;

/// Remote storage client driving the rclone command line.
#[derive(Debug, Clone)]
pub struct RcloneClient {
    binary: String,
    remote: String,
}

/// One object of `rclone lsjson` output.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsJsonItem {
    name: String,
    #[serde(default)]
    is_dir: bool,
    #[serde(default)]
    mod_time: Option<String>,
}

impl RcloneClient {
    pub fn new(binary: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            remote: remote.into().trim_end_matches(':').to_string(),
        }
    }

    pub fn from_settings(settings: &RemoteSettings) -> Self {
        Self::new(settings.rclone_bin.clone(), settings.name.clone())
    }

    /// Address a path on the remote as `remote:path`.
    ///
    /// With an empty remote name the path is handed to rclone unchanged,
    /// which rclone treats as a local path.
    pub fn address(&self, path: &str) -> String {
        if self.remote.is_empty() {
            path.to_string()
        } else {
            format!("{}:{}", self.remote, super::normalize(path))
        }
    }

    async fn run(&self, args: &[&OsStr]) -> Result<Output> {
        debug!("Running {} {:?}", self.binary, args);
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RcbotError::ToolNotFound(self.binary.clone())
                } else {
                    RcbotError::RemoteUnavailable(format!("{} execution failed: {e}", self.binary))
                }
            })
    }
}

#[async_trait]
impl RemoteStorage for RcloneClient {
    #[instrument(skip(self))]
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let target = self.address(path);
        let output = self.run(&[OsStr::new("lsjson"), OsStr::new(&target)]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(match output.status.code() {
                Some(EXIT_DIR_NOT_FOUND) | Some(EXIT_FILE_NOT_FOUND) => {
                    RcbotError::InvalidPath(format!("{target}: {stderr}"))
                }
                _ => RcbotError::RemoteUnavailable(stderr),
            });
        }

        let entries = parse_lsjson(&output.stdout)?;
        debug!("Listed {} entries under {}", entries.len(), target);
        Ok(entries)
    }

    #[instrument(skip(self, local_dir))]
    async fn copy_in(&self, remote_path: &str, local_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(local_dir).await?;
        let source = self.address(remote_path);

        info!("Copying {} into workspace", source);
        let output = self
            .run(&[OsStr::new("copy"), OsStr::new(&source), local_dir.as_os_str()])
            .await
            .map_err(as_transfer_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(match output.status.code() {
                Some(EXIT_DIR_NOT_FOUND) | Some(EXIT_FILE_NOT_FOUND) => {
                    RcbotError::NotFound(source)
                }
                _ => RcbotError::TransferFailed(stderr),
            });
        }

        newest_file(local_dir)?.ok_or(RcbotError::NotFound(source))
    }

    #[instrument(skip(self, local_file), fields(file = %local_file.display()))]
    async fn copy_out(&self, local_file: &Path, remote_dir: &str) -> Result<()> {
        let dest = self.address(remote_dir);

        info!("Uploading to {}", dest);
        let output = self
            .run(&[OsStr::new("copy"), local_file.as_os_str(), OsStr::new(&dest)])
            .await
            .map_err(as_transfer_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RcbotError::TransferFailed(stderr));
        }
        Ok(())
    }
}

fn as_transfer_error(err: RcbotError) -> RcbotError {
    match err {
        RcbotError::RemoteUnavailable(msg) => RcbotError::TransferFailed(msg),
        other => other,
    }
}

/// Parse `rclone lsjson` output into directory entries, keeping rclone's order.
fn parse_lsjson(stdout: &[u8]) -> Result<Vec<DirectoryEntry>> {
    let items: Vec<LsJsonItem> = serde_json::from_slice(stdout)
        .map_err(|e| RcbotError::ProtocolError(format!("Failed to parse rclone lsjson output: {e}")))?;

    Ok(items
        .into_iter()
        .map(|item| DirectoryEntry {
            name: item.name,
            is_directory: item.is_dir,
            modified_at: item
                .mod_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
        })
        .collect())
}

/// Most recently modified regular file in `dir`.
///
/// rclone does not report where a copied object landed, so the newest file
/// in the (job-private) directory is taken as the result.
fn newest_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)?.flatten() {
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
