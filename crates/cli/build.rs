use std::process::Command;

fn main() {
    // PRICECHECK_GIT_HASH overrides the git lookup.
    println!("cargo:rerun-if-env-changed=PRICECHECK_GIT_HASH");
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    let git_hash = std::env::var("PRICECHECK_GIT_HASH")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            Command::new("git")
                .args(["rev-parse", "--short=7", "HEAD"])
                .output()
                .ok()
                .filter(|output| output.status.success())
                .and_then(|output| String::from_utf8(output.stdout).ok())
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=PRICECHECK_GIT_HASH={git_hash}");
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET={target}");
}
