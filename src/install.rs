use crate::artifact::find_manifest_checksum;
use crate::config::LauncherConfig;
use crate::download::{normalize_checksum, verify_checksum, Fetcher};
use crate::error::{InstallError, IntegrityError};
use crate::extract::extract_archive;
use crate::receipt::InstallReceipt;
use crate::types::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Prefix of the per-attempt staging directories created inside the install root.
pub const STAGING_PREFIX: &str = ".gohome-staging-";

/// Staging directories older than this belong to an attempt that was killed.
const STALE_STAGING_AGE: Duration = Duration::from_secs(15 * 60);

pub struct Installer {
    source: ReleaseSource,
    checksum: ChecksumPolicy,
    fetcher: Fetcher,
}

impl Installer {
    pub fn new(
        source: ReleaseSource,
        checksum: ChecksumPolicy,
        fetch_timeout: Option<Duration>,
    ) -> Result<Self, InstallError> {
        Ok(Self {
            source,
            checksum,
            fetcher: Fetcher::new(fetch_timeout)?,
        })
    }

    pub fn from_config(config: &LauncherConfig) -> Result<Self, InstallError> {
        Self::new(
            config.source.clone(),
            config.checksum.clone(),
            config.fetch_timeout,
        )
    }

    /// Turns the download progress bar on or off.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.fetcher = self.fetcher.with_progress(show);
        self
    }

    /// Downloads, verifies and installs `spec` into `root`.
    ///
    /// Nothing becomes visible at the final path until the extracted binary
    /// is renamed into place, and the staging directory is removed on every
    /// exit path. Re-running replaces whatever a previous attempt left.
    pub async fn install(
        &self,
        spec: &ReleaseSpec,
        root: &InstallRoot,
    ) -> Result<PathBuf, InstallError> {
        let tool = &self.source.tool;
        tracing::info!(
            "Installing {} v{} for {}/{}...",
            tool,
            spec.version,
            spec.platform,
            spec.arch
        );

        fs::create_dir_all(root.dir())
            .map_err(|e| InstallError::permission("create directory", root.dir(), e))?;
        sweep_stale_staging(root.dir());

        let expected = self.expected_checksum(spec).await?;
        let descriptor = self.source.describe(spec, expected);
        tracing::debug!("Artifact: {:?}", descriptor);

        let staging_dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root.dir())
            .map_err(|e| {
                InstallError::permission("create staging directory in", root.dir(), e)
            })?;
        let staging_path = staging_dir.path();

        let archive_path = staging_path.join(&descriptor.filename);
        let digest = self
            .fetcher
            .download_file(&descriptor.url, &archive_path)
            .await?;
        verify_checksum(&descriptor, &digest)?;

        let executable_name = spec.platform.executable_name(tool);
        let extracted = extract_archive(
            &archive_path,
            descriptor.format,
            &staging_path.join("extract"),
            &executable_name,
        )?;
        set_executable(&extracted)?;

        let final_path = root.executable_path(tool, spec.platform);
        fs::rename(&extracted, &final_path)
            .map_err(|e| InstallError::permission("move binary into", &final_path, e))?;

        let receipt = InstallReceipt::new(spec, &descriptor.filename, &digest);
        if let Err(e) = receipt.save(root, staging_path) {
            tracing::warn!("Installed binary but could not record receipt: {}", e);
        }

        if !is_runnable(&final_path) {
            return Err(InstallError::permission(
                "verify executable",
                &final_path,
                std::io::Error::other("installed file is missing or not executable"),
            ));
        }

        if let Err(e) = staging_dir.close() {
            tracing::warn!("Could not remove staging directory: {}", e);
        }

        tracing::info!(
            "Successfully installed {} v{} to {}",
            tool,
            spec.version,
            final_path.display()
        );
        Ok(final_path)
    }

    async fn expected_checksum(&self, spec: &ReleaseSpec) -> Result<Option<String>, InstallError> {
        match &self.checksum {
            ChecksumPolicy::Pinned(sha) => Ok(Some(normalize_checksum(sha)?)),
            ChecksumPolicy::Manifest => {
                let manifest_url = self.source.checksums_url(spec);
                let filename = self.source.artifact_filename(spec);
                tracing::debug!("Fetching checksums manifest {}", manifest_url);
                let manifest = self.fetcher.fetch_text(&manifest_url).await?;
                let sha = find_manifest_checksum(&manifest, &filename).ok_or_else(|| {
                    IntegrityError::MissingManifestEntry {
                        filename,
                        manifest_url,
                    }
                })?;
                Ok(Some(normalize_checksum(&sha)?))
            }
            ChecksumPolicy::Skip => {
                tracing::warn!(
                    "No checksum configured for {} v{}; trusting the download as-is (set GOHOME_SHA256 or GOHOME_VERIFY=manifest to verify)",
                    self.source.tool,
                    spec.version
                );
                Ok(None)
            }
        }
    }
}

/// Present, a regular file, and (on Unix) carrying an execute bit.
pub fn is_runnable(path: &Path) -> bool {
    let Ok(metadata) = fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Archives do not reliably carry the mode bits, so set them explicitly.
fn set_executable(path: &Path) -> Result<(), InstallError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .map_err(|e| InstallError::permission("read permissions of", path, e))?
            .permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)
            .map_err(|e| InstallError::permission("set executable bit on", path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn sweep_stale_staging(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let now = SystemTime::now();
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(STAGING_PREFIX) {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > STALE_STAGING_AGE) {
            tracing::debug!("Removing stale staging directory {}", entry.path().display());
            if let Err(e) = fs::remove_dir_all(entry.path()) {
                tracing::debug!("Could not remove {}: {}", entry.path().display(), e);
            }
        }
    }
}
