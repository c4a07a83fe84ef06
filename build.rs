// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");

    // Packaged builds pin the version from outside
    let version = match std::env::var("SURVEY_CAMERA_VERSION") {
        Ok(v) => v,
        Err(_) => git_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Version from `git describe`, with the short hash appended.
///
/// "0.1.0" on a tag becomes "0.1.0-abcdef1", while "0.1.0-5-gabcdef1"
/// (commits after a tag) becomes "0.1.0-dirty-abcdef1".
fn git_version() -> String {
    let described = Command::new("git")
        .args(["describe", "--tags", "--always", "--match", "v*"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string());

    let Some(described) = described else {
        return format!(
            "{}-{}",
            env!("CARGO_PKG_VERSION"),
            commit_hash().unwrap_or_else(|| "unknown".to_string())
        );
    };

    let version = described.strip_prefix('v').unwrap_or(&described);
    if version.contains('-') {
        let parts: Vec<&str> = version.rsplitn(3, '-').collect();
        if parts.len() >= 3 {
            let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
            return format!("{}-dirty-{}", parts[2], hash);
        }
        return version.to_string();
    }

    let hash = commit_hash().unwrap_or_else(|| "unknown".to_string());
    format!("{}-{}", version, hash)
}

fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;

    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}
