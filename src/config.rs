// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Configuration management.
//!
//! Config values are loaded with the following priority (highest to lowest):
//! 1. Environment variables (TAPET_*)
//! 2. Config file (~/.config/tapet/config.toml)
//! 3. Default values
//!
//! Command-line flags override all of these; that merge happens in `main`.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub apikey: String,
    pub purity: Vec<String>,
    pub categories: Vec<String>,
    pub min_resolution: String,
    pub ratios: Vec<String>,
    pub download_dir: String,
    pub script: String,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apikey: String::new(),
            purity: vec!["sfw".to_string()],
            categories: vec![
                "general".to_string(),
                "anime".to_string(),
                "people".to_string(),
            ],
            min_resolution: String::new(),
            ratios: Vec::new(),
            download_dir: "~/Pictures/wallpapers".to_string(),
            script: String::new(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load config with priority: env vars > config file > defaults
    pub fn load() -> Self {
        let mut config = Self::load_from_file().unwrap_or_default();
        config.apply_env_overrides();
        config.fill_empty_with_defaults();
        config
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tapet").join("config.toml"))
    }

    fn load_from_file() -> Option<Self> {
        let path = Self::config_path()?;
        let content = std::fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("TAPET_APIKEY") {
            self.apikey = v;
        }
        if let Ok(v) = std::env::var("TAPET_PURITY") {
            self.purity = split_list(&v);
        }
        if let Ok(v) = std::env::var("TAPET_CATEGORIES") {
            self.categories = split_list(&v);
        }
        if let Ok(v) = std::env::var("TAPET_MIN_RESOLUTION") {
            self.min_resolution = v;
        }
        if let Ok(v) = std::env::var("TAPET_RATIOS") {
            self.ratios = split_list(&v);
        }
        if let Ok(v) = std::env::var("TAPET_DOWNLOAD_DIR") {
            self.download_dir = v;
        }
        if let Ok(v) = std::env::var("TAPET_SCRIPT") {
            self.script = v;
        }
        if std::env::var_os("TAPET_DEBUG").is_some() {
            self.verbose = true;
        }
    }

    /// A config file can set `purity = []` or blank the download dir; fall
    /// back to defaults rather than sending an all-zero filter to the API.
    fn fill_empty_with_defaults(&mut self) {
        let defaults = Self::default();
        if self.purity.is_empty() {
            self.purity = defaults.purity;
        }
        if self.categories.is_empty() {
            self.categories = defaults.categories;
        }
        if self.download_dir.is_empty() {
            self.download_dir = defaults.download_dir;
        }
    }

    /// The 3-bit purity string the API expects: sfw / sketchy / nsfw.
    pub fn purity_param(&self) -> String {
        let mut bits = [b'0'; 3];
        for p in &self.purity {
            match p.as_str() {
                "sfw" => bits[0] = b'1',
                "sketchy" => bits[1] = b'1',
                "nsfw" => bits[2] = b'1',
                _ => {}
            }
        }
        String::from_utf8_lossy(&bits).into_owned()
    }

    /// The 3-bit categories string the API expects: general / anime / people.
    pub fn categories_param(&self) -> String {
        let mut bits = [b'0'; 3];
        for c in &self.categories {
            match c.as_str() {
                "general" => bits[0] = b'1',
                "anime" => bits[1] = b'1',
                "people" => bits[2] = b'1',
                _ => {}
            }
        }
        String::from_utf8_lossy(&bits).into_owned()
    }

    pub fn ratios_param(&self) -> String {
        self.ratios.join(",")
    }

    pub fn resolved_download_dir(&self) -> PathBuf {
        if let Some(rest) = self.download_dir.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(&self.download_dir)
    }
}

pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.purity, vec!["sfw"]);
        assert_eq!(config.categories, vec!["general", "anime", "people"]);
        assert_eq!(config.download_dir, "~/Pictures/wallpapers");
        assert!(config.apikey.is_empty());
        assert!(config.script.is_empty());
        assert!(!config.verbose);
    }

    #[test]
    fn test_toml_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            apikey = "k123"
            purity = ["sfw", "sketchy"]
            "#,
        )
        .unwrap();
        assert_eq!(config.apikey, "k123");
        assert_eq!(config.purity, vec!["sfw", "sketchy"]);
        // untouched fields fall back to defaults
        assert_eq!(config.categories, vec!["general", "anime", "people"]);
        assert_eq!(config.download_dir, "~/Pictures/wallpapers");
    }

    #[test]
    fn test_fill_empty_with_defaults() {
        let mut config: Config = toml::from_str(
            r#"
            purity = []
            download_dir = ""
            "#,
        )
        .unwrap();
        config.fill_empty_with_defaults();
        assert_eq!(config.purity, vec!["sfw"]);
        assert_eq!(config.download_dir, "~/Pictures/wallpapers");
    }

    #[test]
    fn test_purity_param() {
        let config = Config::default();
        assert_eq!(config.purity_param(), "100");

        let config = Config {
            purity: vec!["sfw".to_string(), "nsfw".to_string()],
            ..Default::default()
        };
        assert_eq!(config.purity_param(), "101");

        let config = Config {
            purity: vec!["bogus".to_string()],
            ..Default::default()
        };
        assert_eq!(config.purity_param(), "000");
    }

    #[test]
    fn test_categories_param() {
        let config = Config::default();
        assert_eq!(config.categories_param(), "111");

        let config = Config {
            categories: vec!["anime".to_string()],
            ..Default::default()
        };
        assert_eq!(config.categories_param(), "010");
    }

    #[test]
    fn test_ratios_param() {
        let config = Config {
            ratios: vec!["16x9".to_string(), "16x10".to_string()],
            ..Default::default()
        };
        assert_eq!(config.ratios_param(), "16x9,16x10");
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a,b , c"), vec!["a", "b", "c"]);
        assert_eq!(split_list("a,,b"), vec!["a", "b"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_resolved_download_dir_absolute_passthrough() {
        let config = Config {
            download_dir: "/srv/wallpapers".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_download_dir(),
            PathBuf::from("/srv/wallpapers")
        );
    }

    #[test]
    fn test_resolved_download_dir_expands_tilde() {
        let config = Config::default();
        let resolved = config.resolved_download_dir();
        if let Some(home) = dirs::home_dir() {
            assert!(resolved.starts_with(home));
            assert!(resolved.ends_with("Pictures/wallpapers"));
        }
    }
}
