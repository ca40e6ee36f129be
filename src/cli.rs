use clap::Parser;
use std::path::PathBuf;

fn get_version() -> &'static str {
    const BASE_VERSION: &str = env!("CARGO_PKG_VERSION");
    let version = format!(
        "v{} (installs gohome v{}, commit {})",
        BASE_VERSION,
        crate::config::PINNED_VERSION,
        crate::config::GIT_COMMIT
    );
    // Leaked once at startup so clap can hold a 'static str.
    Box::leak(version.into_boxed_str())
}

/// Command line of `gohome-install`, run by package post-install hooks.
#[derive(Parser, Debug)]
#[command(name = "gohome-install")]
#[command(about = "Download and install the prebuilt gohome binary")]
#[command(version = get_version())]
pub struct InstallCli {
    /// Increase verbosity (use multiple times for more detail)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Reduce output to errors only
    #[arg(short, long)]
    pub quiet: bool,

    /// Reinstall even if the pinned version is already present
    #[arg(short, long)]
    pub force: bool,

    /// Install into this directory instead of the default location
    #[arg(long, value_name = "DIR", env = "GOHOME_INSTALL_DIR")]
    pub install_dir: Option<PathBuf>,

    /// Print only the installed binary path on success
    #[arg(long)]
    pub print_path: bool,
}
