use crate::error::{DownloadError, InstallError, IntegrityError};
use crate::types::ArtifactDescriptor;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::LOCATION;
use reqwest::StatusCode;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Redirect hops followed before a fetch is abandoned.
pub const MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = concat!("gohome-launcher/", env!("CARGO_PKG_VERSION"));

/// HTTP client that follows redirects itself so the hop count stays bounded
/// and every failure names the URL it happened on.
pub struct Fetcher {
    client: reqwest::Client,
    max_redirects: usize,
    show_progress: bool,
}

impl Fetcher {
    pub fn new(timeout: Option<Duration>) -> Result<Self, DownloadError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(DownloadError::Client)?;
        Ok(Self {
            client,
            max_redirects: MAX_REDIRECTS,
            show_progress: true,
        })
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Hides the download progress bar when `show` is false.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Sends a GET and follows redirects until a 200 arrives.
    async fn open(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let mut current = url.to_string();

        for hop in 0..=self.max_redirects {
            tracing::debug!("GET {} (hop {})", current, hop);
            let response = self
                .client
                .get(&current)
                .send()
                .await
                .map_err(|source| DownloadError::Transport {
                    url: current.clone(),
                    source,
                })?;

            let status = response.status();
            if status == StatusCode::OK {
                return Ok(response);
            }

            if is_followed_redirect(status) {
                let next = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|location| response.url().join(location).ok())
                    .ok_or_else(|| DownloadError::MissingLocation {
                        url: current.clone(),
                        status: status.as_u16(),
                    })?;
                tracing::debug!("Following {} redirect to {}", status.as_u16(), next);
                current = next.to_string();
                continue;
            }

            return Err(DownloadError::Status {
                url: current,
                status: status.as_u16(),
            });
        }

        Err(DownloadError::TooManyRedirects {
            url: url.to_string(),
            limit: self.max_redirects,
        })
    }

    /// Streams `url` into `local_path` and returns the body's hex SHA-256.
    pub async fn download_file(
        &self,
        url: &str,
        local_path: &Path,
    ) -> Result<String, InstallError> {
        let filename = local_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| url.to_string());
        tracing::info!("Downloading {} from {}", filename, url);

        let response = self.open(url).await?;
        let total_size = response.content_length().unwrap_or(0);

        let pb = if self.show_progress {
            ProgressBar::new(total_size)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(format!("Downloading {}", filename));

        let mut file = fs::File::create(local_path)
            .map_err(|e| InstallError::permission("create", local_path, e))?;
        let mut hasher = Sha256::new();
        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| DownloadError::Body {
                url: url.to_string(),
                source,
            })?;
            file.write_all(&chunk)
                .map_err(|e| InstallError::permission("write", local_path, e))?;
            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.sync_all()
            .map_err(|e| InstallError::permission("write", local_path, e))?;

        pb.finish_and_clear();
        let digest = hex::encode(hasher.finalize());
        tracing::debug!("Downloaded {} bytes, sha256 {}", downloaded, digest);
        Ok(digest)
    }

    /// Fetches a small text document such as a checksums manifest.
    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let response = self.open(url).await?;
        response.text().await.map_err(|source| DownloadError::Body {
            url: url.to_string(),
            source,
        })
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Rejects anything that is not a 64-digit hex SHA-256.
pub fn normalize_checksum(value: &str) -> Result<String, IntegrityError> {
    let normalized = value.trim().to_lowercase();
    match hex::decode(&normalized) {
        Ok(bytes) if bytes.len() == 32 => Ok(normalized),
        _ => Err(IntegrityError::MalformedChecksum {
            value: value.to_string(),
        }),
    }
}

/// Compares the staged artifact's digest against the descriptor's expectation.
pub fn verify_checksum(
    descriptor: &ArtifactDescriptor,
    actual: &str,
) -> Result<(), IntegrityError> {
    let Some(expected) = descriptor.expected_checksum.as_deref() else {
        return Ok(());
    };
    let expected = normalize_checksum(expected)?;
    if expected != actual.to_lowercase() {
        return Err(IntegrityError::Mismatch {
            filename: descriptor.filename.clone(),
            expected,
            actual: actual.to_string(),
        });
    }
    tracing::debug!("Checksum verified for {}", descriptor.filename);
    Ok(())
}
