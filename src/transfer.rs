// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Downloads and wallpaper application.
//!
//! [`download`] is idempotent: an absolute local path comes back unchanged
//! and an already-present destination file is never re-fetched, so it is
//! safe to call for thumbnails, full-resolution images, and history items
//! alike.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Fetch `source` into `dest_dir`, returning the local file path.
/// If `source` is already an absolute local path it is returned as-is.
pub fn download(source: &str, dest_dir: &Path) -> Result<PathBuf> {
    let as_path = Path::new(source);
    if as_path.is_absolute() {
        return Ok(as_path.to_path_buf());
    }

    fs::create_dir_all(dest_dir).context("creating download dir")?;

    let name = remote_filename(source)
        .with_context(|| format!("no file name in URL {source:?}"))?;
    let dest = dest_dir.join(name);

    // skip download if already cached
    if dest.exists() {
        return Ok(dest);
    }

    let mut resp = reqwest::blocking::get(source)
        .with_context(|| format!("downloading {source}"))?;
    if !resp.status().is_success() {
        bail!("download returned status {}", resp.status());
    }

    let mut file = File::create(&dest).context("creating file")?;
    resp.copy_to(&mut file).context("writing file")?;

    Ok(dest)
}

/// Last path segment of a URL, with any query/fragment stripped.
fn remote_filename(url: &str) -> Option<&str> {
    let tail = url.rsplit('/').next().unwrap_or(url);
    let tail = tail.split(['?', '#']).next().unwrap_or(tail);
    (!tail.is_empty()).then_some(tail)
}

/// Apply the image at `path` as the desktop wallpaper.
/// A non-empty `script` is run with the path appended as the final argument;
/// otherwise a per-platform default command is used.
pub fn apply(path: &Path, script: &str) -> Result<()> {
    if !script.is_empty() {
        let mut parts = script.split_whitespace();
        let program = parts.next().context("empty wallpaper script")?;
        let status = Command::new(program)
            .args(parts)
            .arg(path)
            .status()
            .with_context(|| format!("running wallpaper script {program:?}"))?;
        if !status.success() {
            bail!("wallpaper script exited with {status}");
        }
        return Ok(());
    }
    apply_native(path)
}

#[cfg(target_os = "macos")]
fn apply_native(path: &Path) -> Result<()> {
    let script = format!(
        "tell application \"Finder\" to set desktop picture to POSIX file \"{}\"",
        path.display()
    );
    let status = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .status()
        .context("running osascript")?;
    if !status.success() {
        bail!("osascript exited with {status}");
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn apply_native(path: &Path) -> Result<()> {
    // GNOME-family sessions take the picture through gsettings; everything
    // else goes through feh. A custom desktop gets the `script` config key.
    let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
    if desktop.to_ascii_lowercase().contains("gnome") {
        let uri = format!("file://{}", path.display());
        for key in ["picture-uri", "picture-uri-dark"] {
            let status = Command::new("gsettings")
                .args(["set", "org.gnome.desktop.background", key])
                .arg(&uri)
                .status()
                .context("running gsettings")?;
            if !status.success() {
                bail!("gsettings exited with {status}");
            }
        }
        return Ok(());
    }

    let status = Command::new("feh")
        .arg("--bg-fill")
        .arg(path)
        .status()
        .context("running feh (set `script` in the config if feh is unavailable)")?;
    if !status.success() {
        bail!("feh exited with {status}");
    }
    Ok(())
}

/// Open a URL in the default browser. Best-effort; failures are ignored.
pub fn open_in_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let mut cmd = Command::new("open");
    #[cfg(target_os = "windows")]
    let mut cmd = {
        let mut c = Command::new("cmd");
        c.args(["/c", "start"]);
        c
    };
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let mut cmd = Command::new("xdg-open");

    let _ = cmd.arg(url).spawn();
}
