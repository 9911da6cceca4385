use std::process::Command;

/// Short commit of the checkout, or "unknown" outside a git tree.
fn commit_hash() -> String {
    let output = Command::new("git").args(["rev-parse", "--short=7", "HEAD"]).output();
    match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => "unknown".to_string(),
    }
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads");
    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit_hash());

    // Shown by `biblion --version`
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=TARGET={target}");
}
