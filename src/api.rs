// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Catalog search client.
//!
//! Thin blocking wrapper over the wallhaven search API. One call fetches one
//! page of results plus the pagination metadata; the grid drives paging.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

const BASE_URL: &str = "https://wallhaven.cc/api/v1/search";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbs {
    #[serde(default)]
    pub large: String,
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub small: String,
}

/// One catalog entry. `path` is the full-resolution source: a remote URL for
/// API results, an absolute local path for history items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Wallpaper {
    pub id: String,
    #[serde(default)]
    pub url: String,
    pub path: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub thumbs: Thumbs,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub last_page: u32,
    #[serde(default)]
    pub total: u32,
}

#[derive(Deserialize)]
struct SearchResponse {
    data: Vec<Wallpaper>,
    meta: Meta,
}

/// Sorting values: relevance, date_added, random, views, favorites, toplist, hot.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub query: String,
    pub sorting: String,
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::blocking::Client,
    api_key: String,
    purity: String,
    categories: String,
    min_resolution: String,
    ratios: String,
}

impl Client {
    pub fn new(
        api_key: String,
        purity: String,
        categories: String,
        min_resolution: String,
        ratios: String,
    ) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_key,
            purity,
            categories,
            min_resolution,
            ratios,
        }
    }

    pub fn search_page(
        &self,
        opts: &SearchOptions,
        page: u32,
    ) -> Result<(Vec<Wallpaper>, Meta)> {
        let mut req = self.http.get(BASE_URL).query(&[("page", page.to_string())]);
        if !opts.query.is_empty() {
            req = req.query(&[("q", opts.query.as_str())]);
        }
        if !opts.sorting.is_empty() {
            req = req.query(&[("sorting", opts.sorting.as_str())]);
        }
        if !self.purity.is_empty() {
            req = req.query(&[("purity", self.purity.as_str())]);
        }
        if !self.categories.is_empty() {
            req = req.query(&[("categories", self.categories.as_str())]);
        }
        if !self.min_resolution.is_empty() {
            req = req.query(&[("atleast", self.min_resolution.as_str())]);
        }
        if !self.ratios.is_empty() {
            req = req.query(&[("ratios", self.ratios.as_str())]);
        }
        if !self.api_key.is_empty() {
            req = req
                .query(&[("apikey", self.api_key.as_str())])
                .header("X-API-Key", self.api_key.as_str());
        }

        let resp = req.send().context("executing search request")?;
        if !resp.status().is_success() {
            bail!("API returned status {}", resp.status());
        }

        let body: SearchResponse = resp.json().context("decoding search response")?;
        Ok((body.data, body.meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "data": [{
                "id": "abc123",
                "url": "https://wallhaven.cc/w/abc123",
                "path": "https://w.wallhaven.cc/full/ab/wallhaven-abc123.jpg",
                "resolution": "1920x1080",
                "thumbs": {
                    "large": "https://th.wallhaven.cc/lg/ab/abc123.jpg",
                    "original": "https://th.wallhaven.cc/orig/ab/abc123.jpg",
                    "small": "https://th.wallhaven.cc/small/ab/abc123.jpg"
                }
            }],
            "meta": {"current_page": 1, "last_page": 42, "total": 1000, "per_page": 24}
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].id, "abc123");
        assert_eq!(parsed.data[0].resolution, "1920x1080");
        assert!(parsed.data[0].thumbs.small.ends_with("abc123.jpg"));
        assert_eq!(parsed.meta.last_page, 42);
        assert_eq!(parsed.meta.total, 1000);
    }

    #[test]
    fn test_parse_search_response_missing_optional_fields() {
        let body = r#"{
            "data": [{"id": "x", "path": "https://example.com/x.jpg"}],
            "meta": {}
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data[0].url, "");
        assert_eq!(parsed.data[0].resolution, "");
        assert_eq!(parsed.data[0].thumbs.small, "");
        assert_eq!(parsed.meta.last_page, 0);
    }
}
