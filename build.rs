//! Stamps `th --version` with when and from which commit it was built.
//!
//! Exposes `TH_BUILD_TIMESTAMP` (UTC, RFC 3339 seconds) and `TH_GIT_COMMIT`
//! (short hash, `unknown` outside a checkout) to `env!`.

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let built_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    println!("cargo:rustc-env=TH_BUILD_TIMESTAMP={}", built_at);

    let commit = short_commit().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=TH_GIT_COMMIT={}", commit);
}

fn short_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}
