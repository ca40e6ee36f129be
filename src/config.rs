use crate::types::*;
use anyhow::{anyhow, Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

pub const APP_NAME: &str = "gohome";
pub const TOOL_NAME: &str = "gohome";
pub const RELEASE_OWNER: &str = "anIcedAntFA";
pub const RELEASE_REPO: &str = "gohome";
pub const DEFAULT_RELEASE_HOST: &str = "https://github.com";
pub const BIN_DIR_NAME: &str = "bin";

/// Release installed when nothing overrides it, fixed at packaging time.
pub const PINNED_VERSION: &str = env!("GOHOME_PINNED_VERSION");
pub const PINNED_SHA256: Option<&str> = option_env!("GOHOME_PINNED_SHA256");
pub const GIT_COMMIT: &str = env!("GOHOME_GIT_COMMIT");

pub const ENV_INSTALL_DIR: &str = "GOHOME_INSTALL_DIR";
pub const ENV_RELEASE_HOST: &str = "GOHOME_RELEASE_HOST";
pub const ENV_VERSION: &str = "GOHOME_VERSION";
pub const ENV_SHA256: &str = "GOHOME_SHA256";
pub const ENV_VERIFY: &str = "GOHOME_VERIFY";
pub const ENV_FETCH_TIMEOUT: &str = "GOHOME_FETCH_TIMEOUT_SECS";
pub const ENV_LOG: &str = "GOHOME_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    pub source: ReleaseSource,
    pub version: String,
    pub install_dir: PathBuf,
    pub checksum: ChecksumPolicy,
    pub fetch_timeout: Option<Duration>,
}

impl LauncherConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Builds the configuration from build-time pins plus whatever `lookup`
    /// returns for the `GOHOME_*` overrides.
    ///
    /// The install directory is taken as-is; every other value must be UTF-8.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let get_os = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let get = |key: &str| -> Result<Option<String>> {
            match get_os(key) {
                None => Ok(None),
                Some(raw) => raw
                    .into_string()
                    .map(|v| Some(v).filter(|v| !v.trim().is_empty()))
                    .map_err(|raw| anyhow!("{} is not valid UTF-8: {:?}", key, raw)),
            }
        };

        let host = get(ENV_RELEASE_HOST)?
            .map(|h| h.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_RELEASE_HOST.to_string());

        let version = get(ENV_VERSION)?.unwrap_or_else(|| PINNED_VERSION.to_string());

        let install_dir = match get_os(ENV_INSTALL_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => default_install_dir()?,
        };

        let checksum = checksum_policy(
            get(ENV_SHA256)?,
            get(ENV_VERIFY)?,
            pinned_sha256_for(&version, PINNED_VERSION, PINNED_SHA256),
        )?;

        let fetch_timeout = get(ENV_FETCH_TIMEOUT)?
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a number of seconds", ENV_FETCH_TIMEOUT))
            })
            .transpose()?;

        let config = LauncherConfig {
            source: ReleaseSource {
                host,
                owner: RELEASE_OWNER.to_string(),
                repo: RELEASE_REPO.to_string(),
                tool: TOOL_NAME.to_string(),
            },
            version,
            install_dir,
            checksum,
            fetch_timeout,
        };
        tracing::debug!("Launcher configuration: {:?}", config);
        Ok(config)
    }

    pub fn install_root(&self) -> InstallRoot {
        InstallRoot::new(&self.install_dir)
    }
}

/// Per-user location used when no install directory is configured.
pub fn default_install_dir() -> Result<PathBuf> {
    let path = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?
        .join(APP_NAME)
        .join(BIN_DIR_NAME);
    Ok(path)
}

/// The build-time digest describes the pinned release's artifact only, so it
/// is dropped once `GOHOME_VERSION` selects anything else.
fn pinned_sha256_for<'a>(
    version: &str,
    pinned_version: &str,
    pinned_sha256: Option<&'a str>,
) -> Option<&'a str> {
    let same = match (
        crate::platform::parse_version(version),
        crate::platform::parse_version(pinned_version),
    ) {
        (Ok(wanted), Ok(pinned)) => wanted == pinned,
        _ => version.trim() == pinned_version.trim(),
    };
    pinned_sha256.filter(|_| same)
}

fn checksum_policy(
    sha256: Option<String>,
    verify: Option<String>,
    pinned_sha256: Option<&str>,
) -> Result<ChecksumPolicy> {
    let mode = verify.map(|v| v.trim().to_lowercase());
    match mode.as_deref() {
        Some("none") | Some("skip") | Some("off") => return Ok(ChecksumPolicy::Skip),
        Some("manifest") | Some("pinned") | None => {}
        Some(other) => {
            return Err(anyhow!(
                "{} must be one of 'manifest', 'pinned' or 'none', got '{}'",
                ENV_VERIFY,
                other
            ))
        }
    }

    if let Some(sha) = sha256.or_else(|| pinned_sha256.map(str::to_string)) {
        return Ok(ChecksumPolicy::Pinned(sha.trim().to_lowercase()));
    }

    if mode.as_deref() == Some("manifest") {
        return Ok(ChecksumPolicy::Manifest);
    }

    Ok(ChecksumPolicy::Skip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<LauncherConfig> {
        let vars: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        LauncherConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = config_from(&[
            (ENV_INSTALL_DIR, "/tmp/gohome-root"),
            (ENV_RELEASE_HOST, "http://127.0.0.1:8080/"),
            (ENV_VERSION, "2.0.1"),
            (ENV_SHA256, "ABCDEF"),
            (ENV_FETCH_TIMEOUT, "30"),
        ])
        .unwrap();

        assert_eq!(config.install_dir, PathBuf::from("/tmp/gohome-root"));
        assert_eq!(config.source.host, "http://127.0.0.1:8080");
        assert_eq!(config.source.owner, RELEASE_OWNER);
        assert_eq!(config.version, "2.0.1");
        assert_eq!(config.checksum, ChecksumPolicy::Pinned("abcdef".to_string()));
        assert_eq!(config.fetch_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_defaults_track_the_pin() {
        let config = config_from(&[(ENV_INSTALL_DIR, "/tmp/x")]).unwrap();
        assert_eq!(config.version, PINNED_VERSION);
        assert_eq!(config.source.host, DEFAULT_RELEASE_HOST);
        assert_eq!(config.fetch_timeout, None);
    }

    #[test]
    fn test_verify_modes() {
        let config = config_from(&[(ENV_INSTALL_DIR, "/tmp/x"), (ENV_VERIFY, "none")]).unwrap();
        assert_eq!(config.checksum, ChecksumPolicy::Skip);

        if PINNED_SHA256.is_none() {
            let config =
                config_from(&[(ENV_INSTALL_DIR, "/tmp/x"), (ENV_VERIFY, "manifest")]).unwrap();
            assert_eq!(config.checksum, ChecksumPolicy::Manifest);
        }

        assert!(config_from(&[(ENV_INSTALL_DIR, "/tmp/x"), (ENV_VERIFY, "maybe")]).is_err());
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        let err = config_from(&[(ENV_INSTALL_DIR, "/tmp/x"), (ENV_FETCH_TIMEOUT, "soon")])
            .unwrap_err();
        assert!(err.to_string().contains(ENV_FETCH_TIMEOUT));
    }

    #[test]
    fn test_version_override_drops_the_build_pinned_digest() {
        let config = config_from(&[(ENV_INSTALL_DIR, "/tmp/x"), (ENV_VERSION, "9.9.9")]).unwrap();
        assert_eq!(config.version, "9.9.9");
        assert_eq!(config.checksum, ChecksumPolicy::Skip);

        let config = config_from(&[
            (ENV_INSTALL_DIR, "/tmp/x"),
            (ENV_VERSION, "9.9.9"),
            (ENV_SHA256, "ab".repeat(32).as_str()),
        ])
        .unwrap();
        assert_eq!(config.checksum, ChecksumPolicy::Pinned("ab".repeat(32)));
    }

    #[test]
    fn test_pinned_digest_follows_the_pinned_version() {
        let digest = "aa".repeat(32);
        assert_eq!(
            pinned_sha256_for("1.0.0", "1.0.0", Some(&digest)),
            Some(digest.as_str())
        );
        assert_eq!(
            pinned_sha256_for("v1.0.0", "1.0.0", Some(&digest)),
            Some(digest.as_str())
        );
        assert_eq!(pinned_sha256_for("9.9.9", "1.0.0", Some(&digest)), None);
        assert_eq!(pinned_sha256_for("1.0.0", "1.0.0", None), None);

        assert_eq!(
            checksum_policy(None, None, pinned_sha256_for("9.9.9", "1.0.0", Some(&digest)))
                .unwrap(),
            ChecksumPolicy::Skip
        );
        assert_eq!(
            checksum_policy(None, None, pinned_sha256_for("1.0.0", "1.0.0", Some(&digest)))
                .unwrap(),
            ChecksumPolicy::Pinned(digest.clone())
        );
        assert_eq!(
            checksum_policy(None, Some("none".to_string()), Some(&digest)).unwrap(),
            ChecksumPolicy::Skip
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_install_dir_is_kept() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"/tmp/gohome-\xff-root".to_vec());
        let expected = raw.clone();
        let config = LauncherConfig::from_lookup(|key| {
            (key == ENV_INSTALL_DIR).then(|| raw.clone())
        })
        .unwrap();
        assert_eq!(config.install_dir, PathBuf::from(expected));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_version_is_an_error() {
        use std::os::unix::ffi::OsStringExt;

        let err = LauncherConfig::from_lookup(|key| match key {
            ENV_INSTALL_DIR => Some(OsString::from("/tmp/x")),
            ENV_VERSION => Some(OsString::from_vec(b"1.\xff".to_vec())),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains(ENV_VERSION));
    }
}
