use gohome_launcher::logging::{print_failure, setup_logging};
use gohome_launcher::{relay, LaunchRequest, Launcher};

/// Entry point with no flags of its own: every argument belongs to gohome.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    setup_logging("warn");

    let request = LaunchRequest::from_current_process();

    let mut launcher = match Launcher::from_env() {
        Ok(launcher) => launcher,
        Err(e) => {
            print_failure(&e, &e.remediation());
            std::process::exit(1);
        }
    };

    let result = launcher.launch(&request).await;
    match result {
        Ok(outcome) => relay(outcome),
        Err(e) => {
            tracing::debug!("Launcher finished in state {:?}", launcher.state());
            print_failure(&e, &e.remediation());
            std::process::exit(1);
        }
    }
}
