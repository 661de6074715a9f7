//! `icu_lower(text [, locale])` and `icu_upper(text [, locale])`.
//!
//! Full Unicode case mapping with language-specific rules (Turkish dotted
//! and dotless i, Lithuanian accents, German sharp s expanding to `SS`).
//! SQLite's built-in `lower()`/`upper()` only fold ASCII.

use icu_casemap::CaseMapper;
use icu_locid::LanguageIdentifier;
use sqlicu_error::Result;
use sqlicu_func::ScalarFunction;
use sqlicu_func::scalar::{check_arity, required_text};
use sqlicu_types::SqliteValue;

use crate::locale::IcuLocale;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseDirection {
    Lower,
    Upper,
}

fn map_case(
    function: &'static str,
    direction: CaseDirection,
    args: &[SqliteValue],
) -> Result<SqliteValue> {
    let Some(value) = args.first() else {
        return Ok(SqliteValue::Null);
    };
    if value.is_null() {
        return Ok(SqliteValue::Null);
    }
    let text = value.to_text();

    let langid = if args.len() > 1 {
        let requested = required_text(function, args, 1, "locale")?;
        IcuLocale::parse(&requested)?.language_identifier().clone()
    } else {
        LanguageIdentifier::UND
    };

    let mapper = CaseMapper::new();
    let mapped = match direction {
        CaseDirection::Lower => mapper.lowercase_to_string(&text, &langid),
        CaseDirection::Upper => mapper.uppercase_to_string(&text, &langid),
    };
    Ok(SqliteValue::Text(mapped))
}

/// `icu_lower(X [, locale])`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcuLowerFunc;

impl ScalarFunction for IcuLowerFunc {
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue> {
        check_arity(self, args)?;
        map_case(self.name(), CaseDirection::Lower, args)
    }

    fn num_args(&self) -> i32 {
        2
    }

    fn min_args(&self) -> i32 {
        1
    }

    fn name(&self) -> &'static str {
        "icu_lower"
    }
}

/// `icu_upper(X [, locale])`.
#[derive(Debug, Default, Clone, Copy)]
pub struct IcuUpperFunc;

impl ScalarFunction for IcuUpperFunc {
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue> {
        check_arity(self, args)?;
        map_case(self.name(), CaseDirection::Upper, args)
    }

    fn num_args(&self) -> i32 {
        2
    }

    fn min_args(&self) -> i32 {
        1
    }

    fn name(&self) -> &'static str {
        "icu_upper"
    }
}
