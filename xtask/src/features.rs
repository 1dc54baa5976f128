use std::process::Command;

use anyhow::{Context, Result};

/// Crates whose optional features must compile in every supported combination
const FEATURE_MATRIX: &[(&str, &[&str])] = &[
    ("rentkenya-common", &[]),
    ("rentkenya-common", &["foundation"]),
    ("rentkenya-common", &["observability"]),
    ("rentkenya-common", &["test-utils"]),
    ("rentkenya-common", &["observability", "test-utils"]),
    ("rentkenya-domain", &["ts-gen"]),
    ("rentkenya-app", &["ts-gen"]),
];

/// Check that every feature combination compiles on its own.
pub fn test_feature_matrix() -> Result<()> {
    let total = FEATURE_MATRIX.len();
    println!("Checking {total} feature combinations...");

    for (index, (package, features)) in FEATURE_MATRIX.iter().enumerate() {
        let joined = features.join(",");
        let label = if features.is_empty() { format!("{package} (no features)") } else { format!("{package} [{joined}]") };

        println!("\n[{}/{total}] cargo check -p {label}", index + 1);

        let mut command = Command::new("cargo");
        command.args(["check", "-p", package, "--no-default-features"]);
        if !features.is_empty() {
            command.arg("--features").arg(&joined);
        }

        let status = command.status().with_context(|| format!("Failed to run cargo check for {label}"))?;
        if !status.success() {
            anyhow::bail!("Feature combination {label} failed to compile");
        }

        println!("✅ {label} compiled successfully");
    }

    println!("\n✅ All {total} feature combinations compile successfully!");
    Ok(())
}
