//! Extension configuration.
//!
//! Sources, lowest to highest precedence: [`ExtensionConfig::default`],
//! JSON ([`ExtensionConfig::from_json`]), environment
//! ([`ExtensionConfig::from_env`]).

use serde::{Deserialize, Serialize};
use sqlicu_error::{IcuError, Result};
use sqlicu_types::{CollationStrength, TextEncoding};
use tracing::info;

/// Default strength for the two-argument `icu_load_collation`.
pub const ENV_STRENGTH: &str = "SQLICU_STRENGTH";
/// Text encoding requested for registered collations.
pub const ENV_ENCODING: &str = "SQLICU_ENCODING";
/// `"1"`/`"true"` or `"0"`/`"false"`: register `icu_lower`/`icu_upper`.
pub const ENV_CASE_MAPPING: &str = "SQLICU_CASE_MAPPING";
/// Collations loaded at install time: `locale=name[:strength];...`.
pub const ENV_PRELOAD: &str = "SQLICU_PRELOAD";

/// One collation to load while installing the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollationSpec {
    pub locale: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<CollationStrength>,
}

impl CollationSpec {
    #[must_use]
    pub fn new(locale: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            name: name.into(),
            strength: None,
        }
    }

    #[must_use]
    pub const fn with_strength(mut self, strength: CollationStrength) -> Self {
        self.strength = Some(strength);
        self
    }
}

/// Settings applied when the extension is installed into a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionConfig {
    /// Strength used when `icu_load_collation` is called without one.
    pub default_strength: CollationStrength,
    /// Encoding SQLite should hand to collation callbacks.
    pub text_encoding: TextEncoding,
    /// Register `icu_lower` and `icu_upper`.
    pub case_mapping: bool,
    /// Collations loaded during install.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preload: Vec<CollationSpec>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            default_strength: CollationStrength::default(),
            text_encoding: TextEncoding::default(),
            case_mapping: true,
            preload: Vec::new(),
        }
    }
}

impl ExtensionConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`IcuError::Config`] for malformed JSON, unknown fields, or
    /// invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|error| IcuError::config(error.to_string()))
    }

    /// Build a configuration from the `SQLICU_*` environment variables.
    ///
    /// Reads:
    /// - `SQLICU_STRENGTH`: `primary` .. `identical` (default: secondary)
    /// - `SQLICU_ENCODING`: `utf8`, `utf16le`, `utf16be` (default: utf8)
    /// - `SQLICU_CASE_MAPPING`: boolean (default: true)
    /// - `SQLICU_PRELOAD`: `locale=name[:strength]` entries separated by `;`
    ///
    /// # Errors
    ///
    /// Returns [`IcuError::Config`] if any variable is set to an invalid
    /// value.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (keyed by the `SQLICU_*` names).
    ///
    /// # Errors
    ///
    /// Same as [`ExtensionConfig::from_env`].
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_STRENGTH) {
            self.default_strength = value
                .parse()
                .map_err(|error| IcuError::config(format!("{ENV_STRENGTH}: {error}")))?;
        }
        if let Some(value) = lookup(ENV_ENCODING) {
            self.text_encoding = value
                .parse()
                .map_err(|error| IcuError::config(format!("{ENV_ENCODING}: {error}")))?;
        }
        if let Some(value) = lookup(ENV_CASE_MAPPING) {
            self.case_mapping = parse_flag(&value).ok_or_else(|| {
                IcuError::config(format!("{ENV_CASE_MAPPING}: '{value}' is not a boolean"))
            })?;
        }
        if let Some(value) = lookup(ENV_PRELOAD) {
            self.preload = parse_preload(&value)?;
        }
        info!(
            strength = %self.default_strength,
            encoding = %self.text_encoding,
            case_mapping = self.case_mapping,
            preload = self.preload.len(),
            "extension configuration resolved"
        );
        Ok(self)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `locale=name[:strength];...`. Empty entries are skipped.
fn parse_preload(value: &str) -> Result<Vec<CollationSpec>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (locale, rest) = entry.split_once('=').ok_or_else(|| {
                IcuError::config(format!("{ENV_PRELOAD}: '{entry}' is not locale=name"))
            })?;
            let (name, strength) = match rest.split_once(':') {
                Some((name, strength)) => (name, Some(strength)),
                None => (rest, None),
            };
            let (locale, name) = (locale.trim(), name.trim());
            if locale.is_empty() || name.is_empty() {
                return Err(IcuError::config(format!(
                    "{ENV_PRELOAD}: '{entry}' has an empty locale or name"
                )));
            }
            let mut spec = CollationSpec::new(locale, name);
            if let Some(strength) = strength {
                let strength = strength
                    .parse()
                    .map_err(|error| IcuError::config(format!("{ENV_PRELOAD}: {error}")))?;
                spec = spec.with_strength(strength);
            }
            Ok(spec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExtensionConfig::default();
        assert_eq!(config.default_strength, CollationStrength::Secondary);
        assert_eq!(config.text_encoding, TextEncoding::Utf8);
        assert!(config.case_mapping);
        assert!(config.preload.is_empty());
    }

    #[test]
    fn test_from_json_partial() {
        let config = ExtensionConfig::from_json(
            r#"{
                "default_strength": "TERTIARY",
                "preload": [
                    {"locale": "ru_RU", "name": "russian"},
                    {"locale": "de_DE", "name": "german", "strength": "PRIMARY"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.default_strength, CollationStrength::Tertiary);
        assert!(config.case_mapping);
        assert_eq!(config.preload[0], CollationSpec::new("ru_RU", "russian"));
        assert_eq!(
            config.preload[1],
            CollationSpec::new("de_DE", "german").with_strength(CollationStrength::Primary)
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_fields_and_values() {
        assert!(matches!(
            ExtensionConfig::from_json(r#"{"bogus": 1}"#),
            Err(IcuError::Config { .. })
        ));
        assert!(ExtensionConfig::from_json(r#"{"text_encoding": "latin1"}"#).is_err());
        assert!(ExtensionConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_serialization_shape() {
        let config = ExtensionConfig {
            text_encoding: TextEncoding::Utf16le,
            ..ExtensionConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(
            json,
            r#"{"default_strength":"SECONDARY","text_encoding":"utf16le","case_mapping":true}"#
        );
        assert_eq!(ExtensionConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_overrides() {
        let config = ExtensionConfig::default()
            .with_overrides(lookup(&[
                (ENV_STRENGTH, "primary"),
                (ENV_ENCODING, "utf-16be"),
                (ENV_CASE_MAPPING, "0"),
                (ENV_PRELOAD, "en_US=english; ru_RU=russian:tertiary;"),
            ]))
            .unwrap();
        assert_eq!(config.default_strength, CollationStrength::Primary);
        assert_eq!(config.text_encoding, TextEncoding::Utf16be);
        assert!(!config.case_mapping);
        assert_eq!(
            config.preload,
            vec![
                CollationSpec::new("en_US", "english"),
                CollationSpec::new("ru_RU", "russian").with_strength(CollationStrength::Tertiary),
            ]
        );
    }

    #[test]
    fn test_overrides_reject_bad_values() {
        for (key, value) in [
            (ENV_STRENGTH, "loud"),
            (ENV_ENCODING, "ebcdic"),
            (ENV_CASE_MAPPING, "maybe"),
            (ENV_PRELOAD, "en_US"),
            (ENV_PRELOAD, "=english"),
            (ENV_PRELOAD, "en_US=english:sideways"),
        ] {
            let err = ExtensionConfig::default()
                .with_overrides(lookup(&[(key, value)]))
                .unwrap_err();
            assert!(matches!(err, IcuError::Config { .. }), "{key}={value}");
        }
    }

    #[test]
    fn test_no_overrides_is_default() {
        let config = ExtensionConfig::default().with_overrides(|_| None).unwrap();
        assert_eq!(config, ExtensionConfig::default());
    }
}
