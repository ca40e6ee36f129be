use crate::config::ENV_LOG;
use console::style;
use std::fmt::Display;

/// Installs the global subscriber. Output goes to stderr: stdout belongs to
/// the wrapped tool.
///
/// `GOHOME_LOG` takes precedence over `level` when it holds a valid filter.
pub fn setup_logging(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}

/// Level for a `-v`/`-q` flag combination.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose == 0 {
        "warn"
    } else if verbose == 1 {
        "info"
    } else {
        "debug"
    }
}

/// One paragraph describing the failure, then what to do about it.
pub fn print_failure(message: &dyn Display, remediation: &str) {
    eprintln!("{} {}", style("error:").red().bold(), message);
    eprintln!();
    eprintln!("{}", remediation);
}
