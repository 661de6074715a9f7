//! ICU4X comparators and the "construct a comparator for locale L" seam.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use icu_collator::{Collator, CollatorOptions, Strength};
use icu_provider::DataLocale;
use sqlicu_error::{IcuError, Result};
use sqlicu_func::LocaleComparator;
use sqlicu_types::CollationStrength;

use crate::locale::IcuLocale;

/// Cache key for one comparator: the locale identifier exactly as requested
/// plus the comparison strength.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollatorKey {
    locale: String,
    strength: CollationStrength,
}

impl CollatorKey {
    #[must_use]
    pub fn new(locale: impl Into<String>, strength: CollationStrength) -> Self {
        Self {
            locale: locale.into(),
            strength,
        }
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    #[must_use]
    pub const fn strength(&self) -> CollationStrength {
        self.strength
    }
}

impl fmt::Display for CollatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.locale, self.strength)
    }
}

/// Factory for locale comparators.
///
/// Construction may be slow (it loads linguistic tables) and may fail for
/// unknown locales. The collator cache calls it at most once per key.
pub trait LocaleRules: Send + Sync {
    /// Build a comparator for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`IcuError::LocaleUnavailable`] for unrecognized locales.
    fn create(&self, key: &CollatorKey) -> Result<Arc<dyn LocaleComparator>>;
}

/// [`LocaleRules`] backed by ICU4X compiled collation data.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcuRules;

impl LocaleRules for IcuRules {
    fn create(&self, key: &CollatorKey) -> Result<Arc<dyn LocaleComparator>> {
        let locale = IcuLocale::parse(key.locale())?;
        Ok(Arc::new(IcuCollation::new(&locale, key.strength())?))
    }
}

/// A locale comparator wrapping an ICU4X [`Collator`].
pub struct IcuCollation {
    locale: String,
    strength: CollationStrength,
    collator: Collator,
}

impl IcuCollation {
    /// Build a collator for `locale` at `strength`.
    ///
    /// # Errors
    ///
    /// Returns [`IcuError::LocaleUnavailable`] if ICU4X cannot load data for
    /// the locale.
    pub fn new(locale: &IcuLocale, strength: CollationStrength) -> Result<Self> {
        let mut options = CollatorOptions::new();
        options.strength = Some(icu_strength(strength));
        let data_locale = DataLocale::from(locale.as_locale());
        let collator = Collator::try_new(&data_locale, options).map_err(|error| {
            IcuError::locale_unavailable(locale.requested(), format!("{error:?}"))
        })?;
        Ok(Self {
            locale: locale.requested().to_owned(),
            strength,
            collator,
        })
    }

    #[must_use]
    pub const fn strength(&self) -> CollationStrength {
        self.strength
    }
}

impl fmt::Debug for IcuCollation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IcuCollation")
            .field("locale", &self.locale)
            .field("strength", &self.strength)
            .finish_non_exhaustive()
    }
}

impl LocaleComparator for IcuCollation {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn compare_text(&self, left: &str, right: &str) -> Ordering {
        self.collator.compare(left, right)
    }
}

const fn icu_strength(strength: CollationStrength) -> Strength {
    match strength {
        CollationStrength::Primary => Strength::Primary,
        CollationStrength::Secondary => Strength::Secondary,
        CollationStrength::Tertiary => Strength::Tertiary,
        CollationStrength::Quaternary => Strength::Quaternary,
        CollationStrength::Identical => Strength::Identical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collation(locale: &str, strength: CollationStrength) -> IcuCollation {
        IcuCollation::new(&IcuLocale::parse(locale).unwrap(), strength).unwrap()
    }

    #[test]
    fn test_secondary_strength_ignores_case() {
        let en = collation("en_US", CollationStrength::Secondary);
        assert_eq!(en.compare_text("Apple", "apple"), Ordering::Equal);
        assert_eq!(en.compare_text("apple", "Banana"), Ordering::Less);
        assert_eq!(en.compare_text("zebra", "Apple"), Ordering::Greater);
    }

    #[test]
    fn test_tertiary_strength_sees_case() {
        let en = collation("en_US", CollationStrength::Tertiary);
        assert_ne!(en.compare_text("Apple", "apple"), Ordering::Equal);
    }

    #[test]
    fn test_primary_strength_ignores_accents() {
        let fr = collation("fr", CollationStrength::Primary);
        assert_eq!(fr.compare_text("cote", "côté"), Ordering::Equal);
        let fr2 = collation("fr", CollationStrength::Secondary);
        assert_ne!(fr2.compare_text("cote", "côté"), Ordering::Equal);
    }

    #[test]
    fn test_russian_alphabet_order() {
        let ru = collation("ru_RU", CollationStrength::Secondary);
        assert_eq!(ru.compare_text("абрикос", "Бананы"), Ordering::Less);
        assert_eq!(ru.compare_text("яблоко", "бананы"), Ordering::Greater);
        assert_eq!(ru.compare_text("Яблоко", "яблоко"), Ordering::Equal);
    }

    #[test]
    fn test_swedish_tailoring_differs_from_german() {
        // Swedish sorts ö after z; German sorts it with o.
        let sv = collation("sv_SE", CollationStrength::Secondary);
        let de = collation("de_DE", CollationStrength::Secondary);
        assert_eq!(sv.compare_text("öl", "zebra"), Ordering::Greater);
        assert_eq!(de.compare_text("öl", "zebra"), Ordering::Less);
    }

    #[test]
    fn test_icu_rules_reports_unknown_locale() {
        let err = IcuRules
            .create(&CollatorKey::new("not_a_real_locale", CollationStrength::Secondary))
            .unwrap_err();
        assert!(matches!(err, IcuError::LocaleUnavailable { .. }));
    }

    #[test]
    fn test_icu_rules_keeps_requested_locale() {
        let comparator = IcuRules
            .create(&CollatorKey::new("en_US", CollationStrength::Tertiary))
            .unwrap();
        assert_eq!(comparator.locale(), "en_US");
    }

    #[test]
    fn test_collator_key_display() {
        let key = CollatorKey::new("ru_RU", CollationStrength::Primary);
        assert_eq!(key.to_string(), "ru_RU/PRIMARY");
        assert_eq!(key.locale(), "ru_RU");
        assert_eq!(key.strength(), CollationStrength::Primary);
    }

    #[test]
    fn test_icu_collation_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IcuCollation>();
    }
}
