// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration, loaded from JSON.

use anyhow::{Context, Result};
use loom_core::ComponentResourceSelector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by the page cache and the request renderer.
///
/// Every field has a default, so a configuration file only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoomConfig {
    /// In production mode the render queue does not record a command trace.
    pub production_mode: bool,
    /// `env_logger` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Locale used when a request asks for an unsupported one.
    pub default_locale: String,
    /// Locales the application has pages for.
    pub supported_locales: Vec<String>,
    /// Key of the markup in a partial (Ajax) render reply.
    pub partial_content_key: String,
}

impl Default for LoomConfig {
    fn default() -> Self {
        Self {
            production_mode: false,
            log_filter: "info".to_string(),
            default_locale: "en".to_string(),
            supported_locales: vec!["en".to_string()],
            partial_content_key: "content".to_string(),
        }
    }
}

impl LoomConfig {
    /// Reads settings from JSON text; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads settings from a JSON file. Errors name the offending path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Writes every setting, defaults included, as indented JSON.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write configuration {}", path.display()))?;
        Ok(())
    }

    /// Whether render queues should record the commands they execute.
    pub fn render_tracing(&self) -> bool {
        !self.production_mode
    }

    /// Negotiates the locale of a request and returns the page cache selector.
    ///
    /// A supported locale is used as is (compared case-insensitively). A
    /// regional variant such as `fr_CA` falls back to its language when only
    /// `fr` is supported; anything else gets the default locale.
    pub fn selector_for(&self, locale: &str) -> ComponentResourceSelector {
        ComponentResourceSelector::new(self.negotiate(locale))
    }

    fn negotiate(&self, requested: &str) -> String {
        let supported = |candidate: &str| {
            self.supported_locales
                .iter()
                .find(|locale| locale.eq_ignore_ascii_case(candidate))
                .cloned()
        };
        if let Some(locale) = supported(requested) {
            return locale;
        }
        let language = requested.split(['_', '-']).next().unwrap_or_default();
        if !language.is_empty() && language.len() < requested.len() {
            if let Some(locale) = supported(language) {
                return locale;
            }
        }
        self.default_locale.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = LoomConfig::from_json(r#"{ "production_mode": true }"#).unwrap();
        assert!(config.production_mode);
        assert!(!config.render_tracing());
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.partial_content_key, "content");
    }

    #[test]
    fn test_selector_negotiation() {
        let config = LoomConfig {
            supported_locales: vec!["en".into(), "fr".into(), "de_CH".into()],
            ..LoomConfig::default()
        };

        assert_eq!(config.selector_for("FR").locale(), "fr");
        assert_eq!(config.selector_for("fr_CA").locale(), "fr");
        assert_eq!(config.selector_for("de_ch").locale(), "de_CH");
        assert_eq!(config.selector_for("de").locale(), "en");
        assert_eq!(config.selector_for("").locale(), "en");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loom.json");
        let config = LoomConfig {
            log_filter: "loom=debug".into(),
            ..LoomConfig::default()
        };

        config.to_file(&path).unwrap();
        let loaded = LoomConfig::from_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let error = LoomConfig::from_file("/nonexistent/loom.json").unwrap_err();
        assert!(error.to_string().contains("/nonexistent/loom.json"));
    }

    #[test]
    fn test_malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ production_mode: ").unwrap();

        let error = LoomConfig::from_file(&path).unwrap_err();

        assert!(error.to_string().starts_with("Invalid configuration in"));
        assert!(error.to_string().contains("broken.json"));
    }
}
