//! ICU4X-backed locale support for sqlicu.
//!
//! - [`locale`]: identifier parsing and validation.
//! - [`collator`]: ICU4X comparators and the [`LocaleRules`] factory seam.
//! - [`cache`]: single-flight comparator cache.
//! - [`casemap`]: `icu_lower` / `icu_upper`.
//!
//! Also provides `icu_version()`.

pub mod cache;
pub mod casemap;
pub mod collator;
pub mod locale;

pub use cache::CollatorCache;
pub use casemap::{IcuLowerFunc, IcuUpperFunc};
pub use collator::{CollatorKey, IcuCollation, IcuRules, LocaleRules};
pub use locale::IcuLocale;

use sqlicu_error::Result;
use sqlicu_func::ScalarFunction;
use sqlicu_func::scalar::check_arity;
use sqlicu_types::SqliteValue;

/// Build identification reported by `icu_version()`.
pub const ICU_VERSION: &str = concat!("sqlicu ", env!("CARGO_PKG_VERSION"), " (ICU4X 1.5)");

/// `icu_version()` -- extension and locale-data version string.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcuVersionFunc;

impl ScalarFunction for IcuVersionFunc {
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue> {
        check_arity(self, args)?;
        Ok(SqliteValue::Text(ICU_VERSION.to_owned()))
    }

    fn num_args(&self) -> i32 {
        0
    }

    fn name(&self) -> &'static str {
        "icu_version"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_stable() {
        let a = IcuVersionFunc.invoke(&[]).unwrap();
        let b = IcuVersionFunc.invoke(&[]).unwrap();
        assert_eq!(a, b);
        assert!(a.as_text().unwrap().contains("ICU4X"));
        assert!(IcuVersionFunc.is_deterministic());
    }

    #[test]
    fn test_version_rejects_arguments() {
        assert!(IcuVersionFunc.invoke(&[SqliteValue::Integer(1)]).is_err());
    }
}
