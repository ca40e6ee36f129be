//! Self-installing launcher for the `gohome` CLI.
//!
//! The launcher resolves the host platform, installs the matching prebuilt
//! release into a private directory on first use, and then runs it with the
//! caller's arguments, environment and standard streams, relaying its exit
//! code or terminating signal.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod install;
pub mod launch;
pub mod logging;
pub mod platform;
pub mod receipt;
pub mod types;


pub use config::LauncherConfig;
pub use error::{DownloadError, InstallError, IntegrityError, LaunchError};
pub use install::Installer;
pub use launch::{relay, run, terminate_self_with_signal, Launcher};
pub use types::*;
