use crate::types::*;

impl ReleaseSpec {
    /// Git tag the release is published under, e.g. `v1.2.3`.
    pub fn tag(&self) -> String {
        format!("v{}", self.version)
    }
}

impl ReleaseSource {
    /// Base URL all assets of `spec`'s release are downloaded from.
    pub fn release_download_url(&self, spec: &ReleaseSpec) -> String {
        format!(
            "{}/{}/{}/releases/download/{}",
            self.host.trim_end_matches('/'),
            self.owner,
            self.repo,
            spec.tag()
        )
    }

    /// `<tool>_<version>_<platform>_<arch>.<ext>`
    pub fn artifact_filename(&self, spec: &ReleaseSpec) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.tool,
            spec.version,
            spec.platform,
            spec.arch,
            spec.platform.archive_format().extension()
        )
    }

    /// Name of the checksums file published alongside the archives.
    pub fn checksums_filename(&self, spec: &ReleaseSpec) -> String {
        format!("{}_{}_checksums.txt", self.tool, spec.version)
    }

    pub fn checksums_url(&self, spec: &ReleaseSpec) -> String {
        format!(
            "{}/{}",
            self.release_download_url(spec),
            self.checksums_filename(spec)
        )
    }

    pub fn describe(
        &self,
        spec: &ReleaseSpec,
        expected_checksum: Option<String>,
    ) -> ArtifactDescriptor {
        let filename = self.artifact_filename(spec);
        let url = format!("{}/{}", self.release_download_url(spec), filename);
        ArtifactDescriptor {
            filename,
            url,
            format: spec.platform.archive_format(),
            expected_checksum,
        }
    }
}

/// Finds the digest for `filename` in a `sha256sum`-style manifest.
pub fn find_manifest_checksum(manifest: &str, filename: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == filename).then(|| digest.to_lowercase())
    })
}
