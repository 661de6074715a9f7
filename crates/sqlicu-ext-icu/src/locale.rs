//! Locale identifier parsing and eager validation.
//!
//! ICU4X never fails to build a collator: an unknown language silently
//! falls back to root ordering. Loading a collation for a misspelled locale
//! would then "work" and sort wrongly, so identifiers are validated here
//! before any comparator is constructed.

use std::fmt;

use icu_locid::{LanguageIdentifier, Locale};
use icu_locid_transform::LocaleExpander;
use sqlicu_error::{IcuError, Result};

/// A validated locale identifier.
///
/// Keeps the caller's spelling (`"ru_RU"`) next to the parsed form
/// (`ru-RU`) so errors and logs show what the user actually wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcuLocale {
    requested: String,
    locale: Locale,
}

impl IcuLocale {
    /// Parse and validate an ICU/POSIX/BCP 47 style identifier.
    ///
    /// Accepts `_` or `-` separators and Unicode `-u-` keywords. Rejects
    /// identifiers whose language has no likely-subtags data, and ones
    /// carrying private-use or unknown extensions.
    ///
    /// # Errors
    ///
    /// Returns [`IcuError::LocaleUnavailable`] when the identifier is empty,
    /// malformed, or not recognized.
    pub fn parse(requested: &str) -> Result<Self> {
        let trimmed = requested.trim();
        if trimmed.is_empty() {
            return Err(IcuError::locale_unavailable(
                requested,
                "empty locale identifier",
            ));
        }

        let normalized = trimmed.replace('_', "-");
        let locale: Locale = normalized.parse().map_err(|error| {
            IcuError::locale_unavailable(requested, format!("malformed identifier: {error:?}"))
        })?;

        if !locale.extensions.other.is_empty() || !locale.extensions.private.is_empty() {
            return Err(IcuError::locale_unavailable(
                requested,
                "unsupported extension subtags",
            ));
        }

        let mut expanded = locale.id.clone();
        LocaleExpander::new_extended().maximize(&mut expanded);
        if expanded.script.is_none() || expanded.region.is_none() {
            return Err(IcuError::locale_unavailable(
                requested,
                format!("no linguistic data for language '{}'", locale.id.language),
            ));
        }

        Ok(Self {
            requested: requested.to_owned(),
            locale,
        })
    }

    /// The identifier exactly as the caller spelled it.
    #[must_use]
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Parsed ICU4X locale.
    #[must_use]
    pub const fn as_locale(&self) -> &Locale {
        &self.locale
    }

    /// Language identifier part (no extensions).
    #[must_use]
    pub const fn language_identifier(&self) -> &LanguageIdentifier {
        &self.locale.id
    }
}

impl fmt::Display for IcuLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.locale)
    }
}
