use crate::config::LauncherConfig;
use crate::error::LaunchError;
use crate::install::{is_runnable, Installer};
use crate::platform;
use crate::receipt::InstallReceipt;
use crate::types::*;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};

/// Where a launcher invocation is. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    Start,
    CheckInstalled,
    Installing,
    Ready,
    Running,
    Exited(i32),
    Signaled(i32),
    SpawnFailed,
    Failed,
}

impl LaunchState {
    fn rank(&self) -> u8 {
        match self {
            LaunchState::Start => 0,
            LaunchState::CheckInstalled => 1,
            LaunchState::Installing => 2,
            LaunchState::Ready => 3,
            LaunchState::Running => 4,
            LaunchState::Exited(_)
            | LaunchState::Signaled(_)
            | LaunchState::SpawnFailed
            | LaunchState::Failed => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 5
    }
}

pub struct Launcher {
    config: LauncherConfig,
    host: HostInfo,
    state: LaunchState,
}

impl Launcher {
    pub fn new(config: LauncherConfig, host: HostInfo) -> Self {
        Self {
            config,
            host,
            state: LaunchState::Start,
        }
    }

    pub fn from_env() -> Result<Self, LaunchError> {
        Ok(Self::new(
            LauncherConfig::from_env()?,
            platform::get_system_info(),
        ))
    }

    pub fn state(&self) -> LaunchState {
        self.state
    }

    fn transition(&mut self, next: LaunchState) {
        debug_assert!(
            !self.state.is_terminal() && next.rank() > self.state.rank(),
            "invalid launcher transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!("Launcher state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Returns the installed executable, installing the pinned release first
    /// when it is missing, not executable, or a different version.
    pub async fn ensure_installed(&mut self) -> Result<PathBuf, LaunchError> {
        self.transition(LaunchState::CheckInstalled);
        let root = self.config.install_root();
        let tool = self.config.source.tool.clone();

        let spec = match platform::resolve(&self.config.version, &self.host) {
            Ok(spec) => spec,
            Err(source) => {
                self.transition(LaunchState::Failed);
                return Err(LaunchError::Install {
                    path: root.dir().join(&tool),
                    source,
                });
            }
        };
        let path = root.executable_path(&tool, spec.platform);

        if is_runnable(&path) {
            match InstallReceipt::load(&root) {
                Some(receipt) if !receipt.matches(&spec.version) => {
                    tracing::info!(
                        "Installed {} is v{}, launcher wants v{}. Reinstalling.",
                        tool,
                        receipt.version,
                        spec.version
                    );
                }
                _ => {
                    tracing::debug!("Using installed binary {}", path.display());
                    self.transition(LaunchState::Ready);
                    return Ok(path);
                }
            }
        } else if path.exists() {
            tracing::warn!(
                "{} exists but is not executable. Reinstalling.",
                path.display()
            );
        } else {
            tracing::info!("{} not found. Installing.", path.display());
        }

        self.transition(LaunchState::Installing);
        let installed = match Installer::from_config(&self.config) {
            Ok(installer) => installer.install(&spec, &root).await,
            Err(e) => Err(e),
        };
        match installed {
            Ok(path) => {
                self.transition(LaunchState::Ready);
                Ok(path)
            }
            Err(source) => {
                self.transition(LaunchState::Failed);
                Err(LaunchError::Install { path, source })
            }
        }
    }

    /// Ensures the binary is installed, then runs it to completion.
    pub async fn launch(&mut self, request: &LaunchRequest) -> Result<ExitOutcome, LaunchError> {
        let path = self.ensure_installed().await?;

        self.transition(LaunchState::Running);
        match run(&path, request).await {
            Ok(outcome) => {
                self.transition(match outcome {
                    ExitOutcome::Exited(code) => LaunchState::Exited(code),
                    ExitOutcome::Signaled(sig) => LaunchState::Signaled(sig),
                });
                Ok(outcome)
            }
            Err(e) => {
                self.transition(LaunchState::SpawnFailed);
                Err(e)
            }
        }
    }
}

/// Runs `path` with the request's argv and environment, sharing this
/// process's stdin, stdout and stderr, and waits for it to finish.
pub async fn run(path: &Path, request: &LaunchRequest) -> Result<ExitOutcome, LaunchError> {
    let spawn_error = |source: io::Error| LaunchError::Spawn {
        path: path.to_path_buf(),
        source,
    };

    // Registered before spawning so a supervisor's signal cannot slip past.
    let mut signals = SignalRelay::register();

    let mut command = Command::new(path);
    command
        .args(&request.argv)
        .env_clear()
        .envs(request.env.iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    tracing::debug!("Executing: {} {:?}", path.display(), request.argv);
    let mut child = command.spawn().map_err(spawn_error)?;

    let status = signals.wait(&mut child).await.map_err(|source| LaunchError::Wait {
        path: path.to_path_buf(),
        source,
    })?;
    let outcome = outcome_from_status(status);
    tracing::debug!("Child finished: {:?}", outcome);
    Ok(outcome)
}

#[cfg(unix)]
fn outcome_from_status(status: ExitStatus) -> ExitOutcome {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => ExitOutcome::Exited(code),
        (None, Some(sig)) => ExitOutcome::Signaled(sig),
        (None, None) => ExitOutcome::Exited(1),
    }
}

#[cfg(not(unix))]
fn outcome_from_status(status: ExitStatus) -> ExitOutcome {
    ExitOutcome::Exited(status.code().unwrap_or(1))
}

/// Terminates this process the same way the child terminated.
pub fn relay(outcome: ExitOutcome) -> ! {
    match outcome {
        ExitOutcome::Exited(code) => std::process::exit(code),
        ExitOutcome::Signaled(sig) => terminate_self_with_signal(sig),
    }
}

/// Dies from `sig` so a parent shell observes a signal termination.
#[cfg(unix)]
pub fn terminate_self_with_signal(sig: i32) -> ! {
    tracing::debug!("Re-raising signal {}", sig);
    // SAFETY: resetting the disposition of a valid signal number, unblocking it
    // and raising it on the current thread; no memory is shared with a handler.
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
        let mut set: libc::sigset_t = std::mem::zeroed();
        libc::sigemptyset(&mut set);
        libc::sigaddset(&mut set, sig);
        libc::pthread_sigmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut());
        libc::raise(sig);
    }
    // Only reached for signals whose default action does not terminate.
    std::process::exit(128 + sig)
}

/// Windows has no POSIX signals; use the shell convention for the exit code.
#[cfg(not(unix))]
pub fn terminate_self_with_signal(sig: i32) -> ! {
    std::process::exit(128 + sig)
}

/// Forwards SIGTERM and SIGHUP to the child while it runs.
///
/// SIGINT and SIGQUIT come from the terminal, which already delivers them to
/// the whole foreground process group; they are absorbed here so the child
/// sees them once and decides its own fate. The cost: a SIGINT or SIGQUIT
/// sent to the launcher's pid alone (`kill -INT <pid>` from a supervisor)
/// never reaches the child. Supervisors should signal the process group or
/// use SIGTERM, which is forwarded.
#[cfg(unix)]
struct SignalRelay {
    streams: Option<UnixSignals>,
}

#[cfg(unix)]
struct UnixSignals {
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
    interrupt: tokio::signal::unix::Signal,
    quit: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl UnixSignals {
    fn listen() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
            interrupt: signal(SignalKind::interrupt())?,
            quit: signal(SignalKind::quit())?,
        })
    }
}

#[cfg(unix)]
impl SignalRelay {
    fn register() -> Self {
        match UnixSignals::listen() {
            Ok(streams) => Self {
                streams: Some(streams),
            },
            Err(e) => {
                tracing::warn!("Signal forwarding unavailable: {}", e);
                Self { streams: None }
            }
        }
    }

    async fn wait(&mut self, child: &mut Child) -> io::Result<ExitStatus> {
        let Some(signals) = self.streams.as_mut() else {
            return child.wait().await;
        };
        let pid = child.id();
        loop {
            tokio::select! {
                status = child.wait() => return status,
                _ = signals.terminate.recv() => forward_signal(pid, libc::SIGTERM),
                _ = signals.hangup.recv() => forward_signal(pid, libc::SIGHUP),
                _ = signals.interrupt.recv() => {
                    tracing::debug!("SIGINT received; waiting for the child to exit");
                }
                _ = signals.quit.recv() => {
                    tracing::debug!("SIGQUIT received; waiting for the child to exit");
                }
            }
        }
    }
}

#[cfg(unix)]
fn forward_signal(pid: Option<u32>, sig: i32) {
    let Some(pid) = pid else {
        return;
    };
    tracing::debug!("Forwarding signal {} to child {}", sig, pid);
    // SAFETY: libc::kill with a pid obtained from our own spawned child.
    let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
    if rc != 0 {
        tracing::debug!(
            "Forwarding signal {} failed: {}",
            sig,
            io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
struct SignalRelay;

#[cfg(not(unix))]
impl SignalRelay {
    fn register() -> Self {
        SignalRelay
    }

    /// Ctrl-C reaches every process on the console, the child included.
    async fn wait(&mut self, child: &mut Child) -> io::Result<ExitStatus> {
        loop {
            tokio::select! {
                status = child.wait() => return status,
                _ = tokio::signal::ctrl_c() => {
                    tracing::debug!("Ctrl-C received; waiting for the child to exit");
                }
            }
        }
    }
}
