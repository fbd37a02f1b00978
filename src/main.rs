// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Application entry point.
//!
//! This module:
//! - parses CLI args (search-style subcommands plus a free-text query)
//! - merges flags over the config file over defaults
//! - fetches the first result page (or scans the local download history)
//! - picks a renderer and hands everything to the interactive grid
//!
//! The grid prints the applied wallpaper's path on stdout when the user
//! confirms a selection; quitting prints nothing and still exits zero.

mod api;
mod config;
mod grid;
mod input;
mod layout;
mod render;
mod transfer;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use crate::api::{Client, SearchOptions, Thumbs, Wallpaper};
use crate::config::{Config, split_list};
use crate::grid::Grid;
use crate::render::{CellRenderer, ChafaRenderer, PlaceholderRenderer, chafa_available};

#[derive(Parser, Debug)]
#[command(name = "tapet", about = "Terminal wallpaper picker")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Wallhaven API key
    #[arg(long, global = true)]
    apikey: Option<String>,

    /// Comma-separated: sfw,sketchy,nsfw
    #[arg(long, global = true)]
    purity: Option<String>,

    /// Comma-separated: general,anime,people
    #[arg(long, global = true)]
    categories: Option<String>,

    /// Minimum resolution, e.g. 1920x1080
    #[arg(long = "min-resolution", global = true)]
    min_resolution: Option<String>,

    /// Comma-separated aspect ratios, e.g. 16x9,16x10
    #[arg(long, global = true)]
    ratios: Option<String>,

    /// Directory to save wallpapers
    #[arg(long = "download-dir", global = true)]
    download_dir: Option<String>,

    /// Script to run to set the wallpaper (path appended)
    #[arg(long, global = true)]
    script: Option<String>,

    /// Print progress detail
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search by keyword
    #[command(visible_alias = "s")]
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Top-rated wallpapers
    #[command(visible_alias = "t")]
    Top { query: Vec<String> },
    /// Trending wallpapers
    #[command(visible_alias = "h")]
    Hot { query: Vec<String> },
    /// Newest wallpapers
    #[command(visible_alias = "n")]
    New { query: Vec<String> },
    /// Random wallpapers
    #[command(visible_alias = "r")]
    Random { query: Vec<String> },
    /// Browse previously downloaded wallpapers
    History,
}

impl Command {
    /// Search options and a progress label; `None` for the history browser.
    fn search_options(&self) -> Option<(SearchOptions, String)> {
        let (query, sorting, label) = match self {
            Command::Search { query } => (query, "relevance", format!("Searching for {:?}", query.join(" "))),
            Command::Top { query } => (query, "toplist", "Fetching top wallpapers".to_string()),
            Command::Hot { query } => (query, "hot", "Fetching hot wallpapers".to_string()),
            Command::New { query } => (query, "date_added", "Fetching new wallpapers".to_string()),
            Command::Random { query } => (query, "random", "Fetching random wallpapers".to_string()),
            Command::History => return None,
        };
        Some((
            SearchOptions {
                query: query.join(" "),
                sorting: sorting.to_string(),
            },
            label,
        ))
    }
}

const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Build catalog items from previously downloaded files. Resolution labels
/// come from the image headers; unreadable files just get a blank label.
fn collect_history(dir: &Path) -> Result<Vec<Wallpaper>> {
    if !dir.is_dir() {
        bail!("No download history at {:?}", dir);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    files.sort();
    if files.is_empty() {
        bail!("No downloaded wallpapers in {:?}", dir);
    }

    Ok(files
        .into_iter()
        .map(|p| {
            let resolution = image::image_dimensions(&p)
                .map(|(w, h)| format!("{w}x{h}"))
                .unwrap_or_default();
            Wallpaper {
                id: p
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("local")
                    .to_string(),
                url: String::new(),
                path: p.to_string_lossy().into_owned(),
                resolution,
                thumbs: Thumbs::default(),
            }
        })
        .collect())
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(v) = &cli.apikey {
        cfg.apikey = v.clone();
    }
    if let Some(v) = &cli.purity {
        cfg.purity = split_list(v);
    }
    if let Some(v) = &cli.categories {
        cfg.categories = split_list(v);
    }
    if let Some(v) = &cli.min_resolution {
        cfg.min_resolution = v.clone();
    }
    if let Some(v) = &cli.ratios {
        cfg.ratios = split_list(v);
    }
    if let Some(v) = &cli.download_dir {
        cfg.download_dir = v.clone();
    }
    if let Some(v) = &cli.script {
        cfg.script = v.clone();
    }
    if cli.verbose {
        cfg.verbose = true;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::load();
    apply_cli_overrides(&mut cfg, &cli);

    let client = Client::new(
        cfg.apikey.clone(),
        cfg.purity_param(),
        cfg.categories_param(),
        cfg.min_resolution.clone(),
        cfg.ratios_param(),
    );

    let (wallpapers, last_page, opts) = match cli.command.search_options() {
        Some((opts, label)) => {
            println!("{label}...");
            let (wallpapers, meta) = client.search_page(&opts, 1)?;
            if wallpapers.is_empty() {
                println!("No results found.");
                return Ok(());
            }
            println!(
                "Found {} wallpapers across {} pages. Loading...",
                meta.total, meta.last_page
            );
            (wallpapers, meta.last_page, opts)
        }
        None => {
            let wallpapers = collect_history(&cfg.resolved_download_dir())?;
            println!("Browsing {} downloaded wallpapers...", wallpapers.len());
            // a single pre-loaded page; the scheduler never fires
            (wallpapers, 1, SearchOptions::default())
        }
    };

    let renderer: Box<dyn CellRenderer> = if chafa_available() {
        Box::new(ChafaRenderer::new())
    } else {
        eprintln!("Warning: chafa not found, falling back to placeholder renderer");
        Box::new(PlaceholderRenderer)
    };

    let mut grid = Grid::new(
        wallpapers,
        renderer,
        cfg.resolved_download_dir(),
        cfg.script.clone(),
        client,
        opts,
        last_page,
        cfg.verbose,
    )?;

    if let Some(path) = grid.run()? {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_cli_parses_search_with_query() {
        let cli = Cli::try_parse_from(["tapet", "search", "misty", "forest"]).unwrap();
        let (opts, _label) = cli.command.search_options().unwrap();
        assert_eq!(opts.query, "misty forest");
        assert_eq!(opts.sorting, "relevance");
    }

    #[test]
    fn test_cli_search_requires_query() {
        assert!(Cli::try_parse_from(["tapet", "search"]).is_err());
    }

    #[test]
    fn test_cli_subcommand_aliases() {
        let cli = Cli::try_parse_from(["tapet", "t"]).unwrap();
        let (opts, _) = cli.command.search_options().unwrap();
        assert_eq!(opts.sorting, "toplist");
        assert_eq!(opts.query, "");

        let cli = Cli::try_parse_from(["tapet", "r", "space"]).unwrap();
        let (opts, _) = cli.command.search_options().unwrap();
        assert_eq!(opts.sorting, "random");
        assert_eq!(opts.query, "space");
    }

    #[test]
    fn test_cli_history_has_no_search_options() {
        let cli = Cli::try_parse_from(["tapet", "history"]).unwrap();
        assert!(cli.command.search_options().is_none());
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "tapet",
            "top",
            "--apikey",
            "k1",
            "--purity",
            "sfw,sketchy",
            "--download-dir",
            "/tmp/walls",
        ])
        .unwrap();
        let mut cfg = Config::default();
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.apikey, "k1");
        assert_eq!(cfg.purity, vec!["sfw", "sketchy"]);
        assert_eq!(cfg.download_dir, "/tmp/walls");
        // untouched values keep their defaults
        assert_eq!(cfg.categories, vec!["general", "anime", "people"]);
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(&PathBuf::from("a.png")));
        assert!(is_image_file(&PathBuf::from("a.PNG")));
        assert!(is_image_file(&PathBuf::from("a.jpeg")));
        assert!(is_image_file(&PathBuf::from("a.webp")));
        assert!(!is_image_file(&PathBuf::from("a.txt")));
        assert!(!is_image_file(&PathBuf::from("noextension")));
    }

    #[test]
    fn test_collect_history_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("b.jpg")).unwrap();
        File::create(dir.path().join("a.png")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let items = collect_history(dir.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a");
        assert_eq!(items[1].id, "b");
        // history items carry their absolute local path, no remote thumb
        assert!(Path::new(&items[0].path).is_absolute());
        assert!(items[0].thumbs.small.is_empty());
        // empty files have no readable header, so no resolution label
        assert_eq!(items[0].resolution, "");
    }

    #[test]
    fn test_collect_history_empty_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_history(dir.path()).is_err());
    }

    #[test]
    fn test_collect_history_missing_dir_errors() {
        assert!(collect_history(Path::new("/nonexistent/tapet-history")).is_err());
    }
}
