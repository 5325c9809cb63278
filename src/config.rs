use std::{env, fs};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::run::filter::EntryFilter;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Deserialize)]
struct FileConfig {
    global: GlobalConfig,
    #[serde(default, rename = "source")]
    sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize)]
struct GlobalConfig {
    base: PathBuf,
    keyword_length: u32,
    summary_length: u32,
    language: String,
}

/// One configured feed subscription. `url` holds one or more feed URLs,
/// comma-separated. The filter triple is all-or-nothing: setting one or two
/// of `filter_apply`/`filter_type`/`filter_rule` fails validation.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub filter_apply: Option<String>,
    #[serde(default)]
    pub filter_type: Option<String>,
    #[serde(default)]
    pub filter_rule: Option<String>,
    /// Maximum retained entry count for the output artifact. Defaults to 0,
    /// which accepts no new entries.
    #[serde(default)]
    pub max_items: usize,
}

impl SourceConfig {
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.url.split(',').map(str::trim).filter(|u| !u.is_empty())
    }

    /// Validate the filter triple and compile it. `Ok(None)` means the
    /// source takes every entry.
    pub fn filter(&self) -> Result<Option<EntryFilter>> {
        match (&self.filter_apply, &self.filter_type, &self.filter_rule) {
            (None, None, None) => Ok(None),
            (Some(apply), Some(kind), Some(rule)) => {
                Ok(Some(EntryFilter::from_config(apply, kind, rule)?))
            }
            _ => bail!(
                "filter_apply, filter_type and filter_rule must be set together for source {}",
                self.name
            ),
        }
    }
}

/// Completion-service settings resolved from the environment once at startup.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub proxy: Option<String>,
    pub deployment_url: String,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let user = env::var("U_NAME").unwrap_or_default();
        Self {
            api_key: env::var("OPENAI_API_KEY").ok(),
            base_url: env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            proxy: env::var("OPENAI_PROXY").ok(),
            deployment_url: format!("https://{user}.github.io/rss-digest/"),
        }
    }
}

/// Immutable process-wide configuration, loaded once and passed by reference
/// into the pipeline. No ambient lookups happen past this point.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base: PathBuf,
    pub keyword_length: u32,
    pub summary_length: u32,
    pub language: String,
    pub sources: Vec<SourceConfig>,
    pub env: EnvConfig,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading config from {}", path.as_ref().display()))?;
        let file: FileConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.as_ref().display()))?;
        Ok(Self {
            base: file.global.base,
            keyword_length: file.global.keyword_length,
            summary_length: file.global.summary_length,
            language: file.global.language,
            sources: file.sources,
            env: EnvConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(apply: Option<&str>, kind: Option<&str>, rule: Option<&str>) -> SourceConfig {
        SourceConfig {
            name: "tech".to_string(),
            url: "https://example.com/feed".to_string(),
            filter_apply: apply.map(str::to_string),
            filter_type: kind.map(str::to_string),
            filter_rule: rule.map(str::to_string),
            max_items: 10,
        }
    }

    #[test]
    fn filter_triple_all_unset_passes() {
        assert!(source(None, None, None).filter().unwrap().is_none());
    }

    #[test]
    fn filter_triple_all_set_passes() {
        let f = source(Some("title"), Some("include"), Some("rust")).filter().unwrap();
        assert!(f.is_some());
    }

    #[test]
    fn filter_triple_partially_set_fails() {
        assert!(source(Some("title"), None, None).filter().is_err());
        assert!(source(None, Some("include"), None).filter().is_err());
        assert!(source(Some("title"), Some("include"), None).filter().is_err());
        assert!(source(None, Some("include"), Some("rust")).filter().is_err());
    }

    #[test]
    fn urls_split_on_commas_and_trim() {
        let mut s = source(None, None, None);
        s.url = "https://a.example/feed, https://b.example/rss ,".to_string();
        let urls: Vec<&str> = s.urls().collect();
        assert_eq!(urls, vec!["https://a.example/feed", "https://b.example/rss"]);
    }

    #[test]
    fn config_parses_global_and_sources() {
        let raw = r#"
            [global]
            base = "docs"
            keyword_length = 5
            summary_length = 200
            language = "en"

            [[source]]
            name = "tech"
            url = "https://example.com/feed"
            max_items = 20
        "#;
        let file: FileConfig = toml::from_str(raw).unwrap();
        assert_eq!(file.global.keyword_length, 5);
        assert_eq!(file.sources.len(), 1);
        assert_eq!(file.sources[0].name, "tech");
        assert_eq!(file.sources[0].max_items, 20);
        assert!(file.sources[0].filter_apply.is_none());
    }
}
