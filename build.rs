use std::process::Command;

fn main() {
    // Get the git commit hash
    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    // The release the launcher installs is pinned at packaging time.
    // Without an explicit pin it tracks the package version.
    let pinned_version = std::env::var("GOHOME_PINNED_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| std::env::var("CARGO_PKG_VERSION").unwrap_or_default());

    println!("cargo:rustc-env=GOHOME_GIT_COMMIT={}", commit);
    println!("cargo:rustc-env=GOHOME_PINNED_VERSION={}", pinned_version);

    if let Ok(sha) = std::env::var("GOHOME_PINNED_SHA256") {
        let sha = sha.trim();
        if !sha.is_empty() {
            println!("cargo:rustc-env=GOHOME_PINNED_SHA256={}", sha);
        }
    }

    println!("cargo:rerun-if-env-changed=GOHOME_PINNED_VERSION");
    println!("cargo:rerun-if-env-changed=GOHOME_PINNED_SHA256");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
}
