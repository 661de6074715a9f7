use thiserror::Error;

/// Primary error type for the collation extension.
///
/// Only load-time failures are errors. Compare-time problems (undecodable
/// text, a binding whose comparator is gone) are downgraded to byte order
/// by the collation layer and never reach this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IcuError {
    // === Locale Errors ===
    /// The locale-rules library does not recognize the identifier.
    #[error("locale unavailable: '{locale}' ({detail})")]
    LocaleUnavailable { locale: String, detail: String },

    /// Unknown collation strength keyword.
    #[error("unknown collation strength: '{value}'")]
    InvalidStrength { value: String },

    // === Function Errors ===
    /// Bad argument passed to one of the SQL functions.
    #[error("{function}: {detail}")]
    InvalidArgument { function: String, detail: String },

    // === Engine Errors ===
    /// The engine refused to register a collation sequence.
    #[error("unable to register collation '{name}' (sqlite code {code})")]
    CollationRegistration { name: String, code: i32 },

    /// Error reported by the SQL engine itself.
    #[error("sqlite error: {0}")]
    Engine(String),

    // === Configuration Errors ===
    /// Invalid extension configuration.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// The extension was used against the wrong or a closed connection.
    #[error("library used incorrectly: {0}")]
    Misuse(String),

    // === Internal Errors ===
    /// Internal logic error (should never happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// SQLite result codes relevant to this extension.
///
/// Values match C SQLite's `sqlite3.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Successful result.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Internal logic error.
    Internal = 2,
    /// Database is busy.
    Busy = 5,
    /// Out of memory.
    NoMem = 7,
    /// Library used incorrectly.
    Misuse = 21,
}

impl IcuError {
    /// Map this error to a SQLite error code.
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::LocaleUnavailable { .. }
            | Self::InvalidStrength { .. }
            | Self::InvalidArgument { .. }
            | Self::Engine(_) => ErrorCode::Error,
            Self::CollationRegistration { code, .. } => match *code {
                5 => ErrorCode::Busy,
                7 => ErrorCode::NoMem,
                21 => ErrorCode::Misuse,
                _ => ErrorCode::Error,
            },
            Self::Config { .. } | Self::Misuse(_) => ErrorCode::Misuse,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the caller can likely fix this by changing the statement.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LocaleUnavailable { .. }
                | Self::InvalidStrength { .. }
                | Self::InvalidArgument { .. }
                | Self::Config { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::LocaleUnavailable { .. } => {
                Some("Use a BCP 47 / ICU locale such as 'en_US', 'ru_RU' or 'de'")
            }
            Self::InvalidStrength { .. } => Some(
                "Use one of PRIMARY, SECONDARY, TERTIARY, QUATERNARY, IDENTICAL",
            ),
            Self::CollationRegistration { code: 5, .. } => {
                Some("Finish or reset active statements and retry")
            }
            _ => None,
        }
    }

    /// Create a locale-unavailable error.
    pub fn locale_unavailable(locale: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::LocaleUnavailable {
            locale: locale.into(),
            detail: detail.into(),
        }
    }

    /// Create an invalid-argument error for a SQL function.
    pub fn invalid_argument(function: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            detail: detail.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Create a misuse error.
    pub fn misuse(msg: impl Into<String>) -> Self {
        Self::Misuse(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using `IcuError`.
pub type Result<T> = std::result::Result<T, IcuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_locale_unavailable() {
        let err = IcuError::locale_unavailable("xx_YY", "no likely subtags");
        assert_eq!(
            err.to_string(),
            "locale unavailable: 'xx_YY' (no likely subtags)"
        );
    }

    #[test]
    fn error_display_invalid_argument() {
        let err = IcuError::invalid_argument("icu_load_collation", "collation name is empty");
        assert_eq!(err.to_string(), "icu_load_collation: collation name is empty");
    }

    #[test]
    fn error_code_mapping() {
        assert_eq!(
            IcuError::locale_unavailable("x", "y").error_code(),
            ErrorCode::Error
        );
        assert_eq!(IcuError::config("bad").error_code(), ErrorCode::Misuse);
        assert_eq!(IcuError::internal("bug").error_code(), ErrorCode::Internal);
        assert_eq!(
            IcuError::misuse("connection closed").error_code(),
            ErrorCode::Misuse
        );
        assert_eq!(
            IcuError::CollationRegistration {
                name: "english".to_owned(),
                code: 5,
            }
            .error_code(),
            ErrorCode::Busy
        );
        assert_eq!(ErrorCode::Misuse as i32, 21);
    }

    #[test]
    fn user_recoverable() {
        assert!(IcuError::locale_unavailable("x", "y").is_user_recoverable());
        assert!(
            IcuError::InvalidStrength {
                value: "LOUD".to_owned()
            }
            .is_user_recoverable()
        );
        assert!(!IcuError::internal("bug").is_user_recoverable());
        assert!(!IcuError::misuse("connection closed").is_user_recoverable());
        assert!(!IcuError::Engine("disk".to_owned()).is_user_recoverable());
    }

    #[test]
    fn suggestions() {
        assert!(IcuError::locale_unavailable("x", "y").suggestion().is_some());
        assert!(
            IcuError::CollationRegistration {
                name: "n".to_owned(),
                code: 5
            }
            .suggestion()
            .is_some()
        );
        assert!(IcuError::internal("bug").suggestion().is_none());
    }
}
