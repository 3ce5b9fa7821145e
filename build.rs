// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    // Re-run build script if git HEAD changes
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=QRSCAN_VERSION");

    // Packagers may pin the version string
    let version = std::env::var("QRSCAN_VERSION").unwrap_or_else(|_| git_version());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Crate version, suffixed with the commit when built from a checkout
///
/// - "0.1.0" outside a git checkout
/// - "0.1.0-abcdef1" at a clean commit
/// - "0.1.0-dirty-abcdef1" with uncommitted changes
fn git_version() -> String {
    let base = env!("CARGO_PKG_VERSION");

    let Some(hash) = git(&["rev-parse", "--short", "HEAD"]) else {
        return base.to_string();
    };

    let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
        .map(|status| !status.is_empty())
        .unwrap_or(false);

    if dirty {
        format!("{}-dirty-{}", base, hash)
    } else {
        format!("{}-{}", base, hash)
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;

    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        None
    }
}
