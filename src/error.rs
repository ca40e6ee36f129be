use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub const RELEASES_PAGE: &str = "https://github.com/anIcedAntFA/gohome/releases";
pub const GO_INSTALL_HINT: &str = "go install github.com/anIcedAntFA/gohome/cmd/gohome@latest";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error(
        "unsupported platform {os}/{arch}: no prebuilt gohome binary exists for this target \
         (supported: darwin, linux, windows on amd64 or arm64)"
    )]
    UnsupportedPlatform { os: String, arch: String },

    #[error("invalid release version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error("failed to extract {archive}: {reason}")]
    Extraction { archive: PathBuf, reason: String },

    #[error("cannot {action} {path}: {source}")]
    Permission {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    pub(crate) fn permission(
        action: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        InstallError::Permission {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn extraction(archive: impl Into<PathBuf>, reason: impl ToString) -> Self {
        InstallError::Extraction {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }

    /// What the user can do instead when this failure is not recoverable.
    pub fn remediation(&self) -> String {
        let alternatives = format!(
            "Alternative installation methods:\n  - Download binary: {}\n  - Go install: {}",
            RELEASES_PAGE, GO_INSTALL_HINT
        );
        let hint = match self {
            InstallError::UnsupportedPlatform { .. } => {
                "Build gohome from source for this platform."
            }
            InstallError::InvalidVersion { .. } => {
                "The pinned version is malformed; check GOHOME_VERSION or reinstall the package."
            }
            InstallError::Download(_) => {
                "Check your internet connection and that the release exists."
            }
            InstallError::Integrity(_) => {
                "The downloaded archive did not match its expected checksum and was discarded."
            }
            InstallError::Extraction { .. } => {
                "The release archive could not be unpacked; it may be corrupt."
            }
            InstallError::Permission { .. } => {
                "Make sure the install directory is writable, or set GOHOME_INSTALL_DIR."
            }
        };
        format!("{}\n{}", hint, alternatives)
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("could not initialise the HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("download of {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("download of {url} exceeded the limit of {limit} redirects")]
    TooManyRedirects { url: String, limit: usize },

    #[error("{url} answered with redirect status {status} but no usable Location header")]
    MissingLocation { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading the response body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("checksum mismatch for {filename}: expected sha256 {expected}, got {actual}")]
    Mismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    #[error("checksums manifest {manifest_url} has no entry for {filename}")]
    MissingManifestEntry {
        filename: String,
        manifest_url: String,
    },

    #[error("'{value}' is not a hex-encoded sha256 digest")]
    MalformedChecksum { value: String },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("binary missing at {path}, triggering install failed because {source}")]
    Install {
        path: PathBuf,
        #[source]
        source: InstallError,
    },

    #[error("failed to launch {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lost track of {path} while waiting for it: {source}")]
    Wait {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("launcher misconfigured: {0:#}")]
    Config(#[from] anyhow::Error),
}

impl LaunchError {
    pub fn remediation(&self) -> String {
        match self {
            LaunchError::Install { source, .. } => source.remediation(),
            LaunchError::Spawn { path, .. } => format!(
                "The installed binary could not be started. Remove {} to force a fresh install.\n\
                 Releases: {}",
                path.display(),
                RELEASES_PAGE
            ),
            LaunchError::Wait { .. } => format!(
                "The wrapped command may still be running; check its own output.\nReleases: {}",
                RELEASES_PAGE
            ),
            LaunchError::Config(_) => format!(
                "Check the GOHOME_* environment variables.\nReleases: {}",
                RELEASES_PAGE
            ),
        }
    }
}
