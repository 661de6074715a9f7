//! Engine-facing building blocks for locale collations.
//!
//! - [`text`]: engine text spans to comparator input.
//! - [`collation`]: the collation trait, the locale comparator seam, and
//!   the name → comparator registry.
//! - [`scalar`]: the scalar SQL function trait.

pub mod collation;
pub mod scalar;
pub mod text;

pub use collation::{
    BinaryCollation, BindOutcome, Binding, CollationFunction, CollationRegistry, CollationSlot,
    LocaleComparator, collate_with,
};
pub use scalar::ScalarFunction;
pub use text::{ComparableView, FallbackReason, to_comparable};
