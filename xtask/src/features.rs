use std::process::Command;

use anyhow::{Context, Result};

const PACKAGE: &str = "pulsearc-retry";

const FEATURE_COMBINATIONS: &[&[&str]] = &[
    &[], // default
    &["async"],
    &["serde"],
    &["async", "serde"],
];

/// Check that every feature combination builds and passes its tests.
pub fn test_feature_matrix() -> Result<()> {
    println!("Testing {} {PACKAGE} feature combinations...", FEATURE_COMBINATIONS.len());

    for (index, features) in FEATURE_COMBINATIONS.iter().enumerate() {
        let joined = features.join(",");
        let is_default = features.is_empty();
        let display_label = if is_default { "default".to_string() } else { joined.clone() };
        let feature_arg = if is_default { None } else { Some(joined) };

        println!(
            "\n[{}/{}] cargo test -p {PACKAGE}{}",
            index + 1,
            FEATURE_COMBINATIONS.len(),
            feature_arg.as_ref().map(|arg| format!(" --features {arg}")).unwrap_or_default()
        );

        let mut command = Command::new("cargo");
        command.arg("test").arg("-p").arg(PACKAGE);

        if let Some(feature_list) = feature_arg.as_ref() {
            command.arg("--features").arg(feature_list.as_str());
        }

        let status = command
            .status()
            .with_context(|| format!("Failed to run cargo test for '{display_label}'"))?;

        if !status.success() {
            anyhow::bail!("Feature combination '{display_label}' failed");
        }

        println!("✅ Features '{display_label}' passed");
    }

    println!("\n✅ All {} feature combinations passed!", FEATURE_COMBINATIONS.len());

    Ok(())
}
