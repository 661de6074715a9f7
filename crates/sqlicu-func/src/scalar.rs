//! Scalar SQL function trait and argument helpers.
//!
//! Functions are written against [`SqliteValue`] so they can be unit-tested
//! without an engine; the engine adapter converts values at the boundary.

use sqlicu_error::{IcuError, Result};
use sqlicu_types::SqliteValue;

/// A scalar SQL function.
pub trait ScalarFunction: Send + Sync {
    /// Evaluate the function for one row.
    fn invoke(&self, args: &[SqliteValue]) -> Result<SqliteValue>;

    /// Maximum number of arguments.
    fn num_args(&self) -> i32;

    /// Minimum number of arguments. Each count in
    /// `min_args()..=num_args()` is registered as its own overload.
    fn min_args(&self) -> i32 {
        self.num_args()
    }

    /// SQL-visible function name.
    fn name(&self) -> &'static str;

    /// Whether the result depends only on the arguments.
    fn is_deterministic(&self) -> bool {
        true
    }
}

/// Fetch argument `index` as text, rejecting NULL and empty strings.
///
/// Non-text values are coerced the way SQLite's `CAST(x AS TEXT)` would.
///
/// # Errors
///
/// Returns [`IcuError::InvalidArgument`] when the argument is missing, NULL,
/// or empty.
pub fn required_text(
    function: &str,
    args: &[SqliteValue],
    index: usize,
    what: &str,
) -> Result<String> {
    let value = args.get(index).ok_or_else(|| {
        IcuError::invalid_argument(function, format!("missing {what} argument"))
    })?;
    if value.is_null() {
        return Err(IcuError::invalid_argument(
            function,
            format!("{what} must not be NULL"),
        ));
    }
    let text = value.to_text();
    if text.trim().is_empty() {
        return Err(IcuError::invalid_argument(
            function,
            format!("{what} must not be empty"),
        ));
    }
    Ok(text)
}

/// Check the argument count against `function`'s declared arity.
///
/// # Errors
///
/// Returns [`IcuError::InvalidArgument`] for a count outside
/// `min_args()..=num_args()`.
pub fn check_arity<F: ScalarFunction + ?Sized>(function: &F, args: &[SqliteValue]) -> Result<()> {
    let count = i32::try_from(args.len()).unwrap_or(i32::MAX);
    if (function.min_args()..=function.num_args()).contains(&count) {
        Ok(())
    } else {
        Err(IcuError::invalid_argument(
            function.name(),
            format!(
                "expected {}..={} arguments, got {count}",
                function.min_args(),
                function.num_args()
            ),
        ))
    }
}
