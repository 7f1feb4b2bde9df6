//! Input resolution: turn an upload, a path or a URL into [`ImageUpload`].
//!
//! The web UI builds an `ImageUpload` straight from the multipart body. The
//! CLI accepts a local path or an HTTP(S) URL; URLs are downloaded into memory
//! since the bytes are only needed for a single request.

use crate::error::AnalyzerError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Raw image bytes plus what the client said about them.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            ..Default::default()
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// A zero-byte upload counts as no upload.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL to image bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ImageUpload, AnalyzerError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AnalyzerError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Read a local image file.
async fn read_local(path_str: &str) -> Result<ImageUpload, AnalyzerError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(AnalyzerError::PermissionDenied { path });
        }
        Err(_) => return Err(AnalyzerError::FileNotFound { path }),
    };

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    let mut upload = ImageUpload::new(bytes);
    upload.file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    Ok(upload)
}

/// Download an image into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ImageUpload, AnalyzerError> {
    info!("Downloading image from {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalyzerError::Internal(format!("HTTP client: {e}")))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AnalyzerError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnalyzerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            AnalyzerError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnalyzerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    debug!("Downloaded {} bytes", bytes.len());

    let file_name = url
        .rsplit('/')
        .next()
        .map(|s| s.split(['?', '#']).next().unwrap_or(s))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ImageUpload {
        bytes: bytes.to_vec(),
        file_name,
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/part.png"));
        assert!(is_url("http://example.com/part.png"));
        assert!(!is_url("/tmp/part.png"));
        assert!(!is_url("part.png"));
    }

    #[test]
    fn empty_upload_detected() {
        assert!(ImageUpload::new(Vec::new()).is_empty());
        assert!(!ImageUpload::new(vec![1u8]).is_empty());
    }

    #[tokio::test]
    async fn reads_local_file_with_name() {
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .expect("tempfile");
        tmp.write_all(b"\x89PNG\r\n\x1a\n").expect("write");

        let upload = resolve_input(tmp.path().to_str().unwrap(), 5)
            .await
            .expect("local file resolves");
        assert_eq!(upload.bytes, b"\x89PNG\r\n\x1a\n");
        assert!(upload.file_name.unwrap().ends_with(".png"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here.jpg", 5).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let err = resolve_input("   ", 5).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidInput { .. }));
    }
}
