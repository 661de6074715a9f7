pub mod value;

use std::fmt;
use std::str::FromStr;

use sqlicu_error::IcuError;

pub use value::SqliteValue;

/// Encoding used for text handed to collation callbacks.
///
/// Discriminants match SQLite's `SQLITE_UTF8`, `SQLITE_UTF16LE` and
/// `SQLITE_UTF16BE` so the value can be passed straight to
/// `sqlite3_create_collation_v2`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TextEncoding {
    /// UTF-8 encoding (the most common).
    #[default]
    Utf8 = 1,
    /// UTF-16le (little-endian).
    Utf16le = 2,
    /// UTF-16be (big-endian).
    Utf16be = 3,
}

impl TextEncoding {
    /// The `eTextRep` value SQLite expects for this encoding.
    #[must_use]
    pub const fn sqlite_text_rep(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Utf8 => "utf8",
            Self::Utf16le => "utf16le",
            Self::Utf16be => "utf16be",
        })
    }
}

impl FromStr for TextEncoding {
    type Err = IcuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "utf8" => Ok(Self::Utf8),
            "utf16le" => Ok(Self::Utf16le),
            "utf16be" => Ok(Self::Utf16be),
            other => Err(IcuError::config(format!("unknown text encoding '{other}'"))),
        }
    }
}

/// Comparison strength of a locale collator.
///
/// Each level adds distinctions on top of the previous one: base letters,
/// then accents, then case, then punctuation, then code points.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum CollationStrength {
    /// Base letters only (`a = A = á`).
    Primary,
    /// Base letters and accents; case-insensitive (`a = A`, `a < á`).
    #[default]
    Secondary,
    /// Case-sensitive.
    Tertiary,
    /// Distinguishes punctuation when it is ignorable at lower levels.
    Quaternary,
    /// Falls back to code point order for otherwise-equal strings.
    Identical,
}

impl CollationStrength {
    /// Canonical SQL keyword for this strength.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Primary => "PRIMARY",
            Self::Secondary => "SECONDARY",
            Self::Tertiary => "TERTIARY",
            Self::Quaternary => "QUATERNARY",
            Self::Identical => "IDENTICAL",
        }
    }
}

impl fmt::Display for CollationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

impl FromStr for CollationStrength {
    type Err = IcuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRIMARY" => Ok(Self::Primary),
            "SECONDARY" => Ok(Self::Secondary),
            "TERTIARY" => Ok(Self::Tertiary),
            "QUATERNARY" => Ok(Self::Quaternary),
            "IDENTICAL" => Ok(Self::Identical),
            _ => Err(IcuError::InvalidStrength {
                value: s.to_owned(),
            }),
        }
    }
}
