use anyhow::{Context, Result};
use clap::Parser;
use gohome_launcher::cli::InstallCli;
use gohome_launcher::config::{LauncherConfig, TOOL_NAME};
use gohome_launcher::install::is_runnable;
use gohome_launcher::logging::{level_for, print_failure, setup_logging};
use gohome_launcher::platform::{get_system_info, resolve};
use gohome_launcher::receipt::InstallReceipt;
use gohome_launcher::{InstallError, Installer};
use std::path::PathBuf;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = InstallCli::parse();
    setup_logging(level_for(cli.verbose, cli.quiet));

    let mut config = LauncherConfig::from_env().context("Could not load launcher configuration")?;
    if let Some(dir) = &cli.install_dir {
        config.install_dir = dir.clone();
    }

    match install(&config, cli.force, !cli.quiet).await {
        Ok(path) => {
            if cli.print_path {
                println!("{}", path.display());
            } else if !cli.quiet {
                println!("gohome installed successfully!");
                println!("Binary location: {}", path.display());
                println!();
                println!("Get started:");
                println!("   {} --help", TOOL_NAME);
            }
            Ok(())
        }
        Err(e) => {
            print_failure(&format!("Installation failed: {}", e), &e.remediation());
            std::process::exit(1);
        }
    }
}

async fn install(
    config: &LauncherConfig,
    force: bool,
    show_progress: bool,
) -> Result<PathBuf, InstallError> {
    let spec = resolve(&config.version, &get_system_info())?;
    let root = config.install_root();
    let path = root.executable_path(TOOL_NAME, spec.platform);

    let current = InstallReceipt::load(&root).is_some_and(|r| r.matches(&spec.version));
    if !force && current && is_runnable(&path) {
        tracing::info!("gohome v{} is already installed.", spec.version);
        return Ok(path);
    }

    Installer::from_config(config)?
        .with_progress(show_progress)
        .install(&spec, &root)
        .await
}
