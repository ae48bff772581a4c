use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::states;

const DEFAULT_BAMF_BASE_URL: &str = "https://www.bamf.de";
const DEFAULT_TRANSLATOR_ENDPOINT: &str =
    "https://api.cognitive.microsofttranslator.com/translate?api-version=3.0";
const DEFAULT_TRANSLATOR_REGION: &str = "swedencentral";
const DEFAULT_TARGET_LANGUAGES: &str = "en,tr,ar,ru,uk,fa,fr,es,it,pl";

/// Runtime settings, read from the environment (and `.env` if present).
///
/// Nothing here is mandatory at startup. Missing service keys surface later
/// as authentication failures of the individual enrichment calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Question site with running-counter markup.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Question site discovered through its sitemap, with ids in the markup.
    #[serde(default)]
    pub sitemap_base_url: Option<String>,
    #[serde(default = "default_bamf_base_url")]
    pub bamf_base_url: String,
    #[serde(default = "default_translator_endpoint")]
    pub translator_endpoint: String,
    #[serde(default)]
    pub translator_key: String,
    #[serde(default = "default_translator_region")]
    pub translator_region: String,
    #[serde(default)]
    pub ai_url: String,
    #[serde(default)]
    pub ai_key: String,
    #[serde(default = "default_target_languages")]
    target_languages: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    states: Option<String>,
}

fn default_bamf_base_url() -> String {
    DEFAULT_BAMF_BASE_URL.to_string()
}

fn default_translator_endpoint() -> String {
    DEFAULT_TRANSLATOR_ENDPOINT.to_string()
}

fn default_translator_region() -> String {
    DEFAULT_TRANSLATOR_REGION.to_string()
}

fn default_target_languages() -> String {
    DEFAULT_TARGET_LANGUAGES.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Settings {
    pub fn load() -> Result<Self> {
        // A missing .env is the normal case in scheduled runs.
        let _ = dotenvy::dotenv();
        Self::from_env(config::Environment::default())
    }

    fn from_env(env: config::Environment) -> Result<Self> {
        let settings: Settings = config::Config::builder()
            .add_source(env)
            .build()
            .context("Failed to read environment")?
            .try_deserialize()
            .context("Failed to parse settings")?;
        Ok(settings.normalized())
    }

    /// Settings from literal key/value pairs instead of the process environment.
    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::from_env(config::Environment::default().source(Some(map))).unwrap()
    }

    fn normalized(mut self) -> Self {
        let trim = |s: Option<String>| {
            s.map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
        };
        self.base_url = trim(self.base_url);
        self.sitemap_base_url = trim(self.sitemap_base_url);
        self.bamf_base_url = self.bamf_base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn target_languages(&self) -> Vec<String> {
        split_list(&self.target_languages)
    }

    /// Configured state codes, lowercased; unknown codes are dropped.
    pub fn states(&self) -> Vec<String> {
        match &self.states {
            Some(list) if !list.trim().is_empty() => split_list(list)
                .into_iter()
                .map(|s| s.to_lowercase())
                .filter(|s| states::is_code(s))
                .collect(),
            _ => states::all_codes(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        Settings::from_pairs(pairs)
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings_from(&[]);
        assert_eq!(s.base_url, None);
        assert_eq!(s.bamf_base_url, "https://www.bamf.de");
        assert_eq!(s.translator_region, "swedencentral");
        assert!(s.translator_key.is_empty());
        assert_eq!(s.states().len(), 16);
        assert!(s.target_languages().contains(&"en".to_string()));
        assert_eq!(s.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn trailing_slashes_and_blanks_are_normalized() {
        let s = settings_from(&[
            ("BASE_URL", "https://fragen.example/"),
            ("SITEMAP_BASE_URL", "  "),
        ]);
        assert_eq!(s.base_url.as_deref(), Some("https://fragen.example"));
        assert_eq!(s.sitemap_base_url, None);
    }

    #[test]
    fn lists_are_split_and_filtered() {
        let s = settings_from(&[("TARGET_LANGUAGES", "en, tr,,ar"), ("STATES", "BY,xx,be")]);
        assert_eq!(s.target_languages(), vec!["en", "tr", "ar"]);
        assert_eq!(s.states(), vec!["by", "be"]);
    }
}
