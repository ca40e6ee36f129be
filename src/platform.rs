use crate::error::InstallError;
use crate::types::*;

/// Every (platform, arch) pair a release is published for.
pub const SUPPORT_MATRIX: &[(Platform, Arch)] = &[
    (Platform::Darwin, Arch::Amd64),
    (Platform::Darwin, Arch::Arm64),
    (Platform::Linux, Arch::Amd64),
    (Platform::Linux, Arch::Arm64),
    (Platform::Windows, Arch::Amd64),
    (Platform::Windows, Arch::Arm64),
];

pub fn get_system_info() -> HostInfo {
    HostInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

fn parse_platform(os: &str) -> Option<Platform> {
    match os.to_lowercase().as_str() {
        "macos" | "darwin" => Some(Platform::Darwin),
        "linux" => Some(Platform::Linux),
        "windows" | "win32" => Some(Platform::Windows),
        _ => None,
    }
}

fn parse_arch(arch: &str) -> Option<Arch> {
    match arch.to_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" => Some(Arch::Amd64),
        "aarch64" | "arm64" => Some(Arch::Arm64),
        _ => None,
    }
}

/// Maps raw OS-reported values onto the support matrix.
///
/// Pure: the caller supplies the host values, nothing is read from the
/// environment here.
pub fn detect(host: &HostInfo) -> Result<(Platform, Arch), InstallError> {
    let unsupported = || InstallError::UnsupportedPlatform {
        os: host.os.clone(),
        arch: host.arch.clone(),
    };

    let platform = parse_platform(&host.os).ok_or_else(unsupported)?;
    let arch = parse_arch(&host.arch).ok_or_else(unsupported)?;

    if !SUPPORT_MATRIX.contains(&(platform, arch)) {
        return Err(unsupported());
    }

    tracing::trace!(
        "Host {}/{} maps to {}/{}",
        host.os,
        host.arch,
        platform,
        arch
    );
    Ok((platform, arch))
}

/// Builds the release spec for `version` on `host`.
pub fn resolve(version: &str, host: &HostInfo) -> Result<ReleaseSpec, InstallError> {
    let (platform, arch) = detect(host)?;
    let version = parse_version(version)?;
    Ok(ReleaseSpec {
        version,
        platform,
        arch,
    })
}

pub fn parse_version(version: &str) -> Result<semver::Version, InstallError> {
    let trimmed = version.trim();
    let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
    semver::Version::parse(bare).map_err(|source| InstallError::InvalidVersion {
        version: version.to_string(),
        source,
    })
}
