use crate::error::InstallError;
use crate::types::{Arch, InstallRoot, Platform, ReleaseSpec};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const RECEIPT_FILE_NAME: &str = ".gohome-receipt.json";

/// Record of what is currently installed in an install root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallReceipt {
    pub version: String,
    pub platform: Platform,
    pub arch: Arch,
    pub filename: String,
    pub sha256: String,
    pub installed_at: String,
}

impl InstallReceipt {
    pub fn new(spec: &ReleaseSpec, filename: &str, sha256: &str) -> Self {
        Self {
            version: spec.version.to_string(),
            platform: spec.platform,
            arch: spec.arch,
            filename: filename.to_string(),
            sha256: sha256.to_string(),
            installed_at: Utc::now().to_rfc3339(),
        }
    }

    /// Reads the receipt, treating a missing or unreadable one as absent.
    pub fn load(root: &InstallRoot) -> Option<Self> {
        let path = root.receipt_path();
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                tracing::warn!("Ignoring unreadable receipt {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Writes next to the binary through a temp file and a rename.
    pub fn save(&self, root: &InstallRoot, staging_dir: &Path) -> Result<(), InstallError> {
        let path = root.receipt_path();
        let staged = staging_dir.join(RECEIPT_FILE_NAME);
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            InstallError::permission("serialize", &staged, std::io::Error::other(e))
        })?;
        fs::write(&staged, content).map_err(|e| InstallError::permission("write", &staged, e))?;
        fs::rename(&staged, &path).map_err(|e| InstallError::permission("replace", &path, e))?;
        Ok(())
    }

    /// Whether the installed release is the one requested.
    pub fn matches(&self, version: &semver::Version) -> bool {
        crate::platform::parse_version(&self.version)
            .map(|installed| &installed == version)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let root = InstallRoot::new(dir.path());
        let staging = TempDir::new_in(dir.path()).unwrap();
        let spec = ReleaseSpec {
            version: semver::Version::new(1, 2, 3),
            platform: Platform::Linux,
            arch: Arch::Amd64,
        };

        let receipt = InstallReceipt::new(&spec, "tool_1.2.3_linux_amd64.tar.gz", "abc");
        receipt.save(&root, staging.path()).unwrap();

        let loaded = InstallReceipt::load(&root).unwrap();
        assert_eq!(loaded, receipt);
        assert!(loaded.matches(&semver::Version::new(1, 2, 3)));
        assert!(!loaded.matches(&semver::Version::new(1, 2, 4)));
        assert!(!staging.path().join(RECEIPT_FILE_NAME).exists());
    }

    #[test]
    fn test_garbage_receipt_is_ignored() {
        let dir = TempDir::new().unwrap();
        let root = InstallRoot::new(dir.path());
        fs::write(root.receipt_path(), "{not json").unwrap();
        assert!(InstallReceipt::load(&root).is_none());
    }
}
