//! Locale-aware collations for SQLite.
//!
//! ```no_run
//! use rusqlite::Connection;
//!
//! let conn = Connection::open_in_memory()?;
//! sqlicu::install(&conn)?;
//! conn.query_row("SELECT icu_load_collation('ru_RU', 'russian')", [], |_| Ok(()))?;
//! let mut stmt = conn.prepare("SELECT word FROM words ORDER BY word COLLATE russian")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! SQL surface:
//! - `icu_version()`
//! - `icu_load_collation(locale, name [, strength])`
//! - `icu_lower(text [, locale])`, `icu_upper(text [, locale])`

pub mod config;
pub mod connection;
mod engine;

pub use config::{CollationSpec, ExtensionConfig};
pub use connection::{IcuExtension, install, install_with, install_with_rules};
pub use sqlicu_error::{ErrorCode, IcuError, Result};
pub use sqlicu_ext_icu::{CollatorKey, ICU_VERSION, IcuRules, LocaleRules};
pub use sqlicu_func::{BindOutcome, Binding, LocaleComparator};
pub use sqlicu_types::{CollationStrength, TextEncoding};
