//! Direct-link downloads.
//!
//! Fetches a URL over HTTP, uploads the file to the videos folder and removes
//! the local copy once the upload has succeeded.

use crate::error::{RcbotError, Result};
use crate::remote::RemoteStorage;
use futures::StreamExt;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION, CONTENT_TYPE};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Name used when neither the response nor the URL provides one.
const DEFAULT_FILE_NAME: &str = "download";

static DRIVE_FILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/file/d/([A-Za-z0-9_-]+)").expect("Invalid regex"));

static DISPOSITION_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*\s*=\s*[^';]*'[^';]*'"?([^";]+)"?|filename\s*=\s*"?([^";]+)"?"#)
        .expect("Invalid regex")
});

/// Result of a completed direct-link job.
#[derive(Debug, Clone)]
pub struct DirectLinkReport {
    /// URL actually fetched, after any rewriting.
    pub fetched_url: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub remote_dir: String,
}

/// Downloads links and publishes them to remote storage.
pub struct DirectLinkPipeline {
    client: reqwest::Client,
    storage: Arc<dyn RemoteStorage>,
    destination: String,
    downloads_dir: PathBuf,
}

impl DirectLinkPipeline {
    pub fn new(storage: Arc<dyn RemoteStorage>, destination: &str, downloads_dir: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("rcbot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            storage,
            destination: destination.to_string(),
            downloads_dir,
        })
    }

    /// Fetch `url` and upload it. With `rewrite`, known share links are
    /// turned into direct-download links first.
    ///
    /// The local copy is kept when the upload fails.
    #[instrument(skip(self))]
    pub async fn run(&self, url: &str, rewrite: bool) -> Result<DirectLinkReport> {
        let fetched_url = if rewrite {
            normalize_link(url)
        } else {
            url.trim().to_string()
        };
        if fetched_url != url.trim() {
            info!("Rewrote share link to {}", fetched_url);
        }

        let (local, size_bytes) = self.fetch(&fetched_url).await?;
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if let Err(e) = self.storage.copy_out(&local, &self.destination).await {
            warn!("Upload failed, keeping {}", local.display());
            return Err(RcbotError::TransferFailed(format!(
                "upload to {} failed, local copy kept at {}: {}",
                self.destination,
                local.display(),
                e
            )));
        }

        if let Err(e) = tokio::fs::remove_file(&local).await {
            warn!("Failed to remove {}: {}", local.display(), e);
        }

        info!("Uploaded {} ({} bytes) to {}", file_name, size_bytes, self.destination);
        Ok(DirectLinkReport {
            fetched_url,
            file_name,
            size_bytes,
            remote_dir: self.destination.clone(),
        })
    }

    /// Stream `url` into the downloads directory. Nothing is written for
    /// error responses.
    pub async fn fetch(&self, url: &str) -> Result<(PathBuf, u64)> {
        let parsed = Url::parse(url).map_err(|e| RcbotError::InvalidInput(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RcbotError::InvalidInput(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let response = self.client.get(parsed.clone()).send().await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(RcbotError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let file_name = target_file_name(response.headers(), &parsed);
        tokio::fs::create_dir_all(&self.downloads_dir).await?;
        let (local, file) = create_unique(&self.downloads_dir, &file_name).await?;
        debug!("Downloading {} to {}", url, local.display());

        match write_body(response, file).await {
            Ok(size) => Ok((local, size)),
            Err(e) => {
                let _ = tokio::fs::remove_file(&local).await;
                Err(e)
            }
        }
    }
}

/// Create `name` in `dir`, or `stem_N.ext` when that name is taken. Existing
/// files are never opened for writing.
async fn create_unique(dir: &Path, name: &str) -> Result<(PathBuf, tokio::fs::File)> {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut candidate = dir.join(name);
    let mut duplicate = 1;
    loop {
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                candidate = dir.join(format!("{}_{}{}", stem, duplicate, suffix));
                duplicate += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

async fn write_body(response: reqwest::Response, mut file: tokio::fs::File) -> Result<u64> {
    let mut stream = response.bytes_stream();
    let mut size: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        size = size.saturating_add(chunk.len() as u64);
    }
    file.flush().await?;
    Ok(size)
}

/// Rewrite known share links into direct-download links. Anything else is
/// returned unchanged.
pub fn normalize_link(link: &str) -> String {
    let link = link.trim();
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if host == "drive.google.com" {
        let id = DRIVE_FILE_PATH
            .captures(url.path())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| {
                url.query_pairs()
                    .find(|(k, _)| k == "id")
                    .map(|(_, v)| v.to_string())
            });
        return match id {
            Some(id) => format!("https://drive.google.com/uc?export=download&id={}", id),
            None => link.to_string(),
        };
    }

    if host == "dropbox.com" || host.ends_with(".dropbox.com") {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "dl")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair("dl", "1");
        return url.to_string();
    }

    link.to_string()
}

/// Pick the local file name for a response.
fn target_file_name(headers: &HeaderMap, url: &Url) -> String {
    let from_header = headers
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition);

    let from_url = || {
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).map(|d| d.into_owned()).unwrap_or_else(|_| s.to_string()))
    };

    let name = sanitize_filename(
        &from_header
            .or_else(from_url)
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
    );

    if Path::new(&name).extension().is_some() {
        return name;
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    format!("{}.{}", name, extension_for(content_type))
}

fn filename_from_disposition(header: &str) -> Option<String> {
    // RFC 5987 `filename*=` wins over plain `filename=`.
    let mut best: Option<String> = None;
    for caps in DISPOSITION_FILENAME.captures_iter(header) {
        let (extended, value) = match (caps.get(1), caps.get(2)) {
            (Some(m), _) => (true, m.as_str().trim()),
            (None, Some(m)) => (false, m.as_str().trim()),
            (None, None) => continue,
        };
        let decoded = urlencoding::decode(value)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| value.to_string());
        if decoded.is_empty() {
            continue;
        }
        if extended {
            return Some(decoded);
        }
        best.get_or_insert(decoded);
    }
    best
}

/// Replace path separators and control characters, and strip leading dots.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// File extension for a `Content-Type` value.
pub fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "text/plain" => "txt",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStorage;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pipeline(storage: Arc<FakeStorage>, dir: &Path) -> DirectLinkPipeline {
        DirectLinkPipeline::new(storage, "rcbot/videos", dir.to_path_buf()).unwrap()
    }

    #[test]
    fn test_normalize_drive_links() {
        assert_eq!(
            normalize_link("https://drive.google.com/file/d/1AbC_d-9/view?usp=sharing"),
            "https://drive.google.com/uc?export=download&id=1AbC_d-9"
        );
        assert_eq!(
            normalize_link("https://drive.google.com/open?id=XYZ123"),
            "https://drive.google.com/uc?export=download&id=XYZ123"
        );
        assert_eq!(
            normalize_link("https://drive.google.com/drive/folders/abc"),
            "https://drive.google.com/drive/folders/abc"
        );
    }

    #[test]
    fn test_normalize_dropbox_links() {
        assert_eq!(
            normalize_link("https://www.dropbox.com/s/abc/clip.mp4?dl=0"),
            "https://www.dropbox.com/s/abc/clip.mp4?dl=1"
        );
        assert_eq!(
            normalize_link("https://www.dropbox.com/scl/fi/x/clip.mp4?rlkey=k"),
            "https://www.dropbox.com/scl/fi/x/clip.mp4?rlkey=k&dl=1"
        );
    }

    #[test]
    fn test_unknown_hosts_pass_through() {
        assert_eq!(normalize_link(" https://example.com/a.mp4 "), "https://example.com/a.mp4");
        assert_eq!(normalize_link("not a url"), "not a url");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("a\u{0007}b.mp4"), "a_b.mp4");
        assert_eq!(sanitize_filename("..."), "download");
        assert_eq!(sanitize_filename("  clip.mp4 "), "clip.mp4");
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("video/mp4"), "mp4");
        assert_eq!(extension_for("Audio/MPEG; charset=binary"), "mp3");
        assert_eq!(extension_for("application/octet-stream"), "bin");
        assert_eq!(extension_for(""), "bin");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_target_file_name_precedence() {
        let url = Url::parse("https://example.com/media/from%20url.mp4").unwrap();

        let mut headers = HeaderMap::new();
        assert_eq!(target_file_name(&headers, &url), "from url.mp4");

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="plain.mov"; filename*=UTF-8''n%C3%A4me.mkv"#),
        );
        assert_eq!(target_file_name(&headers, &url), "näme.mkv");

        headers.insert(CONTENT_DISPOSITION, HeaderValue::from_static("attachment; filename=report"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
        assert_eq!(target_file_name(&headers, &url), "report.pdf");

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename*=iso-8859-1'en'caf%E9.mp4"),
        );
        assert_eq!(target_file_name(&headers, &url), "caf%E9.mp4");

        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename*=utf-8'en'talk%20one.mp4"),
        );
        assert_eq!(target_file_name(&headers, &url), "talk one.mp4");

        let bare = Url::parse("https://example.com/").unwrap();
        assert_eq!(target_file_name(&HeaderMap::new(), &bare), "download.bin");
    }

    #[tokio::test]
    async fn test_not_found_creates_nothing_and_uploads_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.mp4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let storage = Arc::new(FakeStorage::new());
        let dir = tempfile::tempdir().unwrap();
        let downloads = dir.path().join("downloads");
        let err = pipeline(storage.clone(), &downloads)
            .run(&format!("{}/missing.mp4", server.uri()), false)
            .await
            .unwrap_err();

        assert!(matches!(err, RcbotError::HttpStatus { status: 404 }));
        assert!(storage.uploads().is_empty());
        assert!(!downloads.exists() || std::fs::read_dir(&downloads).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_download_upload_and_cleanup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(b"0123456789".to_vec()),
            )
            .mount(&server)
            .await;

        let storage = Arc::new(FakeStorage::new());
        let dir = tempfile::tempdir().unwrap();
        let report = pipeline(storage.clone(), dir.path())
            .run(&format!("{}/get", server.uri()), true)
            .await
            .unwrap();

        assert_eq!(report.file_name, "get.mp4");
        assert_eq!(report.size_bytes, 10);
        let uploads = storage.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].remote_dir, "rcbot/videos");
        assert_eq!(uploads[0].contents, "0123456789");
        assert!(!dir.path().join("get.mp4").exists());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_local_copy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"clip.webm\"")
                    .set_body_bytes(b"data".to_vec()),
            )
            .mount(&server)
            .await;

        let storage = Arc::new(FakeStorage::new());
        storage.fail_copy_out_matching("clip");
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(storage.clone(), dir.path())
            .run(&format!("{}/whatever", server.uri()), false)
            .await
            .unwrap_err();

        assert!(matches!(err, RcbotError::TransferFailed(_)));
        assert!(err.to_string().contains("local copy kept"));
        assert!(dir.path().join("clip.webm").exists());
    }

    #[tokio::test]
    async fn test_kept_copy_is_not_overwritten_by_next_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a/uc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"FIRST-VIDEO".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b/uc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"SECOND".to_vec()))
            .mount(&server)
            .await;

        let storage = Arc::new(FakeStorage::new());
        storage.fail_copy_out_matching("uc");
        let dir = tempfile::tempdir().unwrap();
        let links = pipeline(storage.clone(), dir.path());

        links.run(&format!("{}/a/uc", server.uri()), false).await.unwrap_err();
        links.run(&format!("{}/b/uc", server.uri()), false).await.unwrap_err();

        assert_eq!(std::fs::read_to_string(dir.path().join("uc.bin")).unwrap(), "FIRST-VIDEO");
        assert_eq!(std::fs::read_to_string(dir.path().join("uc_1.bin")).unwrap(), "SECOND");
    }

    #[tokio::test]
    async fn test_create_unique_appends_counter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"old").unwrap();
        std::fs::write(dir.path().join("clip_1.mp4"), b"old").unwrap();

        let (path, _file) = create_unique(dir.path(), "clip.mp4").await.unwrap();
        assert_eq!(path, dir.path().join("clip_2.mp4"));
        assert_eq!(std::fs::read(dir.path().join("clip.mp4")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let storage = Arc::new(FakeStorage::new());
        let dir = tempfile::tempdir().unwrap();
        let err = pipeline(storage, dir.path())
            .run("ftp://example.com/file", false)
            .await
            .unwrap_err();
        assert!(matches!(err, RcbotError::InvalidInput(_)));
    }
}
