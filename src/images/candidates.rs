//! Image source candidates and placeholder generation.

use crate::config::Config;
use serde::{Deserialize, Serialize};

/// Characters of the product name shown on a generated placeholder.
const PLACEHOLDER_TEXT_LEN: usize = 15;

/// One fallback image source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum ImageSource {
    /// Image previously downloaded by the catalog service
    Local(String),
    /// Canonical remote image URL
    Remote(String),
    /// URL rebuilt from the original shop's picture path
    OriginalSite(String),
}

impl ImageSource {
    /// Returns the URL to load.
    pub fn url(&self) -> &str {
        match self {
            ImageSource::Local(url) | ImageSource::Remote(url) | ImageSource::OriginalSite(url) => {
                url
            }
        }
    }

    /// Returns a short label for the source kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Local(_) => "local",
            ImageSource::Remote(_) => "remote",
            ImageSource::OriginalSite(_) => "original",
        }
    }
}

/// Settings that shape image candidates and placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSettings {
    /// Origin the original shop serves pictures from
    pub original_site_url: String,
    /// Base URL of the placeholder generator
    pub placeholder_url: String,
    /// Origin that relative local image paths are resolved against
    pub local_origin: Option<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ImageSettings {
    /// Derives image settings from the application configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            original_site_url: config.original_site_url.trim_end_matches('/').to_string(),
            placeholder_url: config.placeholder_url.clone(),
            local_origin: origin_of(&config.api_url).map(str::to_string),
        }
    }

    /// Builds the candidate list in fixed priority order: local copy,
    /// canonical remote URL, reconstructed original-site URL.
    ///
    /// Blank inputs are skipped and a URL already present is not repeated.
    pub fn candidates(
        &self,
        local: Option<&str>,
        remote: Option<&str>,
        original_pic: Option<&str>,
    ) -> Vec<ImageSource> {
        let local = non_blank(local).map(|path| ImageSource::Local(self.absolute_local(path)));
        let remote = non_blank(remote).map(|url| ImageSource::Remote(url.to_string()));
        let original =
            non_blank(original_pic).map(|pic| ImageSource::OriginalSite(self.original_url(pic)));

        let mut candidates: Vec<ImageSource> = Vec::with_capacity(3);
        for candidate in [local, remote, original].into_iter().flatten() {
            if !candidates.iter().any(|c| c.url() == candidate.url()) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    /// Returns the placeholder reference for a product name.
    pub fn placeholder(&self, name: &str) -> String {
        let fragment: String = name.trim().chars().take(PLACEHOLDER_TEXT_LEN).collect();
        let text = if fragment.trim().is_empty() { "No Image" } else { fragment.trim() };
        format!("{}?text={}", self.placeholder_url, urlencoding::encode(text))
    }

    fn original_url(&self, pic: &str) -> String {
        if is_absolute(pic) {
            return pic.to_string();
        }
        if pic.starts_with('/') {
            format!("{}{}", self.original_site_url, pic)
        } else {
            format!("{}/{}", self.original_site_url, pic)
        }
    }

    fn absolute_local(&self, path: &str) -> String {
        match &self.local_origin {
            Some(origin) if !is_absolute(path) => {
                format!("{}/{}", origin, path.trim_start_matches('/'))
            }
            _ => path.to_string(),
        }
    }
}

/// Returns `scheme://host[:port]` of an absolute URL.
pub fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")? + 3;
    let host_end = url[scheme_end..].find('/').map(|i| scheme_end + i).unwrap_or(url.len());
    if host_end == scheme_end {
        return None;
    }
    Some(&url[..host_end])
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
