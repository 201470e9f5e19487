//! Getting an image onto local disk: URL/path validation and HTTP download.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::ImageFormat;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::media::temp_beside;

/// Outcome of a completed [`download`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub format: ImageFormat,
}

/// Parse `input` as an absolute `http`/`https` URL.
pub fn validate_url(input: &str) -> Result<Url> {
    let input = input.trim();
    let url = Url::parse(input).map_err(|e| Error::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;
    check_web_url(&url)?;
    Ok(url)
}

fn check_web_url(url: &Url) -> Result<()> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(Error::UnsupportedScheme(other.to_string())),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(())
}

/// Turn a user-supplied name into `<name>.jpg`.
///
/// A trailing `.jpg`/`.jpeg` is dropped before the extension is added, so
/// `"cat.JPG"` and `"cat"` both become `"cat.jpg"`.
pub fn normalize_filename(input: &str) -> Result<String> {
    let name = input.trim();
    let lower = name.to_ascii_lowercase();
    let stem = [".jpeg", ".jpg"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map_or(name, |ext| &name[..name.len() - ext.len()])
        .trim();

    if stem.is_empty() {
        return Err(Error::InvalidInput("file name must not be empty".to_string()));
    }
    if stem.contains(['/', '\\']) || stem == "." || stem == ".." {
        return Err(Error::InvalidInput(format!(
            "'{name}' is not a plain file name"
        )));
    }
    Ok(format!("{stem}.jpg"))
}

/// Check that `input` names an existing regular file.
pub fn resolve_local(input: &str) -> Result<PathBuf> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("path must not be empty".to_string()));
    }
    let path = PathBuf::from(input);
    if path.is_dir() {
        return Err(Error::InvalidInput(format!("{} is a directory", path.display())));
    }
    if !path.is_file() {
        return Err(Error::NotFound(path));
    }
    Ok(path)
}

/// Download `url` to `dest`.
///
/// The body is streamed into a temp file next to `dest`, which is renamed
/// into place only once the whole body arrived and decodes as an image.
/// `progress` receives `(bytes_so_far, content_length)` after every chunk.
pub async fn download(
    url: &Url,
    dest: &Path,
    config: &DownloadConfig,
    mut progress: impl FnMut(u64, Option<u64>),
) -> Result<DownloadReport> {
    check_web_url(url)?;

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::Network(e.to_string()))?;

    log::debug!("GET {url}");
    let mut resp = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| request_error(e, url, config))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            status: status.as_u16(),
        });
    }

    let total = resp.content_length();
    if let (Some(total), Some(max)) = (total, config.max_bytes) {
        if total > max {
            return Err(too_large(max));
        }
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("no content type")
        .to_string();

    let mut tmp = temp_beside(dest)?;
    let mut received: u64 = 0;
    let mut head = Vec::with_capacity(64);

    while let Some(chunk) = resp.chunk().await.map_err(|e| request_error(e, url, config))? {
        received += chunk.len() as u64;
        match config.max_bytes {
            Some(max) if received > max => return Err(too_large(max)),
            _ => {}
        }
        if head.len() < 64 {
            let take = (64 - head.len()).min(chunk.len());
            head.extend_from_slice(&chunk[..take]);
        }
        tmp.write_all(&chunk)?;
        progress(received, total);
    }

    let format = image::guess_format(&head)
        .map_err(|_| Error::NotAnImage(format!("{received} bytes of {content_type}")))?;

    tmp.as_file().sync_all()?;
    // A close-delimited body ends early without a transport error.
    let tmp_path = tmp.path().to_path_buf();
    tokio::task::spawn_blocking(move || check_decodes(&tmp_path, format))
        .await
        .map_err(|e| Error::Decode(format!("image check did not finish: {e}")))??;

    tmp.persist(dest).map_err(|e| Error::Io(e.error))?;
    log::info!("Downloaded {received} bytes to {}", dest.display());

    Ok(DownloadReport {
        path: dest.to_path_buf(),
        bytes: received,
        format,
    })
}

fn check_decodes(path: &Path, format: ImageFormat) -> Result<()> {
    let mut reader = image::ImageReader::open(path)?;
    reader.set_format(format);
    reader
        .decode()
        .map(drop)
        .map_err(|e| Error::Decode(format!("downloaded image is incomplete or corrupt: {e}")))
}

fn request_error(e: reqwest::Error, url: &Url, config: &DownloadConfig) -> Error {
    if e.is_timeout() {
        Error::Timeout(config.timeout_secs)
    } else if e.is_connect() {
        Error::Connect {
            host: url.host_str().unwrap_or_default().to_string(),
            reason: root_cause(&e),
        }
    } else {
        Error::Network(root_cause(&e))
    }
}

/// reqwest's own message is generic; the innermost source says what happened.
fn root_cause(e: &reqwest::Error) -> String {
    let mut source: &dyn std::error::Error = e;
    while let Some(next) = source.source() {
        source = next;
    }
    source.to_string()
}

fn too_large(max: u64) -> Error {
    Error::Network(format!("response exceeds the {max}-byte download limit"))
}
