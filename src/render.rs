// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Cell renderers.
//!
//! A [`CellRenderer`] turns an image file into a block of terminal escape
//! sequences sized for one grid cell. The real implementation shells out to
//! `chafa`; when it is not installed a placeholder renderer keeps the grid
//! usable. The output format is probed from the environment once at startup.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

pub trait CellRenderer {
    fn render(&self, image_path: &Path, width: u16, height: u16) -> Result<String>;
}

/// Check whether chafa can be spawned at all.
pub fn chafa_available() -> bool {
    Command::new("chafa")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

/// Pick the chafa `--format` value for the current environment.
///
/// chafa's own `--format=auto` only inspects `$TERM`, missing terminals like
/// WezTerm that advertise themselves via `$TERM_PROGRAM`. Inside tmux, pixel
/// protocols either don't pass through or come back with embedded newlines
/// that line-by-line cell drawing corrupts, so plain symbols are forced.
fn detect_format() -> &'static str {
    format_for(
        std::env::var_os("TMUX").is_some(),
        &std::env::var("TERM_PROGRAM").unwrap_or_default(),
        &std::env::var("TERM").unwrap_or_default(),
    )
}

fn format_for(in_tmux: bool, term_program: &str, term: &str) -> &'static str {
    if in_tmux {
        return "symbols";
    }
    match term_program {
        "WezTerm" => return "kitty",
        "iTerm.app" => return "iterm",
        _ => {}
    }
    if term == "xterm-kitty" {
        return "kitty";
    }
    "auto"
}

/// Renders images by shelling out to the chafa CLI tool.
pub struct ChafaRenderer {
    format: &'static str,
}

impl ChafaRenderer {
    pub fn new() -> Self {
        Self {
            format: detect_format(),
        }
    }
}

impl Default for ChafaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CellRenderer for ChafaRenderer {
    fn render(&self, image_path: &Path, width: u16, height: u16) -> Result<String> {
        let out = Command::new("chafa")
            .arg(format!("--format={}", self.format))
            .arg("--size")
            .arg(format!("{width}x{height}"))
            .arg("--stretch")
            .arg(image_path)
            .output()
            .context("running chafa")?;
        if !out.status.success() {
            bail!("chafa exited with {}", out.status);
        }

        // chafa wraps its output in cursor hide/show sequences; strip them so
        // the grid keeps sole ownership of cursor state.
        let text = String::from_utf8_lossy(&out.stdout)
            .replace("\x1b[?25l", "")
            .replace("\x1b[?25h", "");
        Ok(text)
    }
}

/// Renders a fixed "NO PREVIEW" box when chafa is unavailable.
pub struct PlaceholderRenderer;

impl CellRenderer for PlaceholderRenderer {
    fn render(&self, _image_path: &Path, width: u16, height: u16) -> Result<String> {
        let w = usize::from(width);
        let h = usize::from(height);
        let inner = w.saturating_sub(2);
        let edge = format!("+{}+", "-".repeat(inner));
        let mid = format!("|{}|", center_pad("NO PREVIEW", inner));
        let blank = format!("|{}|", " ".repeat(inner));

        let mut out = String::new();
        out.push_str(&edge);
        out.push('\n');
        let body = h.saturating_sub(2);
        for i in 0..body {
            if i == body / 2 {
                out.push_str(&mid);
            } else {
                out.push_str(&blank);
            }
            out.push('\n');
        }
        out.push_str(&edge);
        Ok(out)
    }
}

/// Dotted block standing in for a cell whose thumbnail is not on disk yet.
pub fn placeholder_block(width: usize, height: usize) -> String {
    let mut out = String::new();
    for _ in 0..height {
        out.push_str(&"░".repeat(width));
        out.push('\n');
    }
    out
}

pub fn center_pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.chars().take(width).collect();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_tmux_forces_symbols() {
        assert_eq!(format_for(true, "WezTerm", "xterm-kitty"), "symbols");
    }

    #[test]
    fn test_format_for_term_program() {
        assert_eq!(format_for(false, "WezTerm", "xterm-256color"), "kitty");
        assert_eq!(format_for(false, "iTerm.app", "xterm-256color"), "iterm");
    }

    #[test]
    fn test_format_for_term_fallbacks() {
        assert_eq!(format_for(false, "", "xterm-kitty"), "kitty");
        assert_eq!(format_for(false, "", "xterm-256color"), "auto");
    }

    #[test]
    fn test_placeholder_block_dimensions() {
        let block = placeholder_block(4, 3);
        let lines: Vec<&str> = block.trim_end_matches('\n').split('\n').collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            assert_eq!(line.chars().count(), 4);
        }
    }

    #[test]
    fn test_placeholder_renderer_box() {
        let rendered = PlaceholderRenderer
            .render(Path::new("missing.png"), 20, 5)
            .unwrap();
        let lines: Vec<&str> = rendered.split('\n').collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with('+') && lines[0].ends_with('+'));
        assert!(rendered.contains("NO PREVIEW"));
        for line in lines {
            assert_eq!(line.chars().count(), 20);
        }
    }

    #[test]
    fn test_center_pad_pads_both_sides() {
        assert_eq!(center_pad("ab", 6), "  ab  ");
        assert_eq!(center_pad("abc", 6), " abc  ");
    }

    #[test]
    fn test_center_pad_truncates_long_input() {
        assert_eq!(center_pad("1920x1080", 4), "1920");
        assert_eq!(center_pad("abc", 3), "abc");
    }
}
