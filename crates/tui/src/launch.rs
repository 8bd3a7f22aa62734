use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

#[cfg(target_os = "macos")]
const OPENER: (&str, &[&str]) = ("open", &[]);
#[cfg(target_os = "windows")]
const OPENER: (&str, &[&str]) = ("cmd", &["/C", "start", ""]);
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENER: (&str, &[&str]) = ("xdg-open", &[]);

/// Hand `url` to the system browser.
pub async fn open_url(url: &str) -> Result<()> {
    let (program, args) = OPENER;
    let status = Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| format!("failed to execute {program}"))?;

    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}
