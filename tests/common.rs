use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Unroutable release host: any install attempt fails fast with a transport error.
#[allow(dead_code)]
pub const UNREACHABLE_HOST: &str = "http://127.0.0.1:9";

// Each test binary uses a different subset of these helpers.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub install_dir: PathBuf,
    pub launcher_path: PathBuf,
    pub installer_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let install_dir = temp_dir.path().join("bin");

        Self {
            install_dir,
            launcher_path: PathBuf::from(env!("CARGO_BIN_EXE_gohome")),
            installer_path: PathBuf::from(env!("CARGO_BIN_EXE_gohome-install")),
            _temp_dir: temp_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self._temp_dir.path()
    }

    fn isolate(&self, cmd: &mut Command) {
        cmd.env("GOHOME_INSTALL_DIR", &self.install_dir);
        cmd.env("GOHOME_RELEASE_HOST", UNREACHABLE_HOST);
        cmd.env("GOHOME_VERSION", "1.2.3");
        cmd.env_remove("GOHOME_SHA256");
        cmd.env_remove("GOHOME_VERIFY");
        cmd.env_remove("GOHOME_LOG");
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_DATA_HOME", self._temp_dir.path().join("data"));
    }

    /// The launcher, pointed at this context's install root.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.launcher_path);
        self.isolate(&mut cmd);
        cmd
    }

    pub fn installer_cmd(&self) -> Command {
        let mut cmd = Command::new(&self.installer_path);
        self.isolate(&mut cmd);
        cmd
    }

    pub fn binary_path(&self) -> PathBuf {
        self.install_dir.join(if cfg!(windows) { "gohome.exe" } else { "gohome" })
    }

    /// Pretends a previous run already installed `script` as the gohome binary.
    pub fn install_script(&self, script: &str) -> PathBuf {
        fs::create_dir_all(&self.install_dir).expect("Failed to create install dir");
        let path = self.binary_path();
        fs::write(&path, script).expect("Failed to write fake binary");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("Failed to make fake binary executable");
        }
        path
    }
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_code(&self, code: i32) -> &Self {
        assert_eq!(
            self.status.code(),
            Some(code),
            "Unexpected exit status {:?}\nstdout: {}\nstderr: {}",
            self.status,
            self.stdout,
            self.stderr
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}

/// A `.tar.gz` release archive holding `script` as the gohome binary, and
/// its hex SHA-256.
#[allow(dead_code)]
pub fn release_archive(script: &str) -> (Vec<u8>, String) {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use sha2::{Digest, Sha256};

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(script.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "gohome", script.as_bytes())
        .expect("Failed to append archive entry");
    let archive = builder
        .into_inner()
        .expect("Failed to finish tar")
        .finish()
        .expect("Failed to finish gzip");
    let digest = hex::encode(Sha256::digest(&archive));
    (archive, digest)
}

/// URL path the launcher requests for version 1.2.3 on this host.
#[allow(dead_code)]
pub fn release_asset_path() -> String {
    use gohome_launcher::config::{RELEASE_OWNER, RELEASE_REPO, TOOL_NAME};
    use gohome_launcher::platform::{get_system_info, resolve};
    use gohome_launcher::ReleaseSource;

    let spec = resolve("1.2.3", &get_system_info()).expect("test host is supported");
    let source = ReleaseSource {
        host: String::new(),
        owner: RELEASE_OWNER.to_string(),
        repo: RELEASE_REPO.to_string(),
        tool: TOOL_NAME.to_string(),
    };
    format!(
        "/{}/{}/releases/download/v1.2.3/{}",
        RELEASE_OWNER,
        RELEASE_REPO,
        source.artifact_filename(&spec)
    )
}

/// Sorted entry names directly inside `dir` (empty if it does not exist).
#[allow(dead_code)]
pub fn list_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
