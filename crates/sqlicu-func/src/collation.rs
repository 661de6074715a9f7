//! Collation callback trait, locale comparator seam, and the name registry.
//!
//! Collations are pure comparators used by ORDER BY, GROUP BY, DISTINCT,
//! and index traversal. The engine calls them with two raw byte spans and
//! expects a three-way result; it has no way to receive an error.
//!
//! The [`CollationRegistry`] maps case-insensitive names to
//! [`CollationSlot`]s. A slot holds a *weak* reference to the comparator
//! owned by the collator cache, so the registry can never keep a comparator
//! alive past its owner or dereference one that is gone.
//!
//! # Contract
//!
//! For a fixed binding, [`CollationSlot::compare`] is:
//! - **Deterministic**: same inputs always produce the same output.
//! - **Antisymmetric**: `compare(a, b)` is the reverse of `compare(b, a)`.
//! - **Transitive**: if `a < b` and `b < c`, then `a < c`.
//!
//! Decodable text sorts by the comparator with a byte-order tie-break.
//! Undecodable operands sort after all decodable ones, by bytes. Mixing the
//! two classes by plain byte order would break transitivity.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use sqlicu_error::Result;
use sqlicu_types::TextEncoding;
use tracing::{debug, info, trace};

use crate::text::{FallbackReason, to_comparable};

/// A collation comparator over raw engine bytes.
pub trait CollationFunction: Send + Sync {
    /// Collation name (for `COLLATE name`).
    fn name(&self) -> &str;

    /// Compare two engine text spans.
    ///
    /// Must be deterministic, antisymmetric, and transitive.
    fn compare(&self, left: &[u8], right: &[u8]) -> Ordering;
}

/// Linguistic ordering rules for one locale.
///
/// Instances are immutable after construction and shared read-only by every
/// collation name bound to them.
pub trait LocaleComparator: Send + Sync + fmt::Debug {
    /// Locale identifier this comparator was built for.
    fn locale(&self) -> &str;

    /// Compare two decoded strings under the locale's rules.
    fn compare_text(&self, left: &str, right: &str) -> Ordering;
}

// ── Default fallback ─────────────────────────────────────────────────────

/// BINARY collation: raw `memcmp` byte comparison.
///
/// This is SQLite's default collation and the fallback for every failure
/// that can happen at compare time.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryCollation;

impl CollationFunction for BinaryCollation {
    fn name(&self) -> &str {
        "BINARY"
    }

    fn compare(&self, left: &[u8], right: &[u8]) -> Ordering {
        left.cmp(right)
    }
}

/// Compare two engine spans with `comparator`, keeping a total order.
///
/// Byte-equal inputs are equal without consulting the comparator. When the
/// comparator reports equality the original bytes break the tie, so
/// linguistically equal strings still sort repeatably.
pub fn collate_with(
    comparator: &dyn LocaleComparator,
    left: &[u8],
    right: &[u8],
    encoding: TextEncoding,
) -> Ordering {
    if left == right {
        return Ordering::Equal;
    }
    match (
        to_comparable(left, encoding),
        to_comparable(right, encoding),
    ) {
        (Ok(l), Ok(r)) => comparator
            .compare_text(l.as_str(), r.as_str())
            .then_with(|| left.cmp(right)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(reason), Err(_)) => {
            trace!(?reason, locale = comparator.locale(), "collation byte fallback");
            left.cmp(right)
        }
    }
}

// ── Slots ────────────────────────────────────────────────────────────────

/// The comparator a collation name currently points at.
#[derive(Debug)]
pub struct Binding {
    locale: String,
    comparator: Weak<dyn LocaleComparator>,
}

impl Binding {
    fn new(comparator: &Arc<dyn LocaleComparator>) -> Self {
        Self {
            locale: comparator.locale().to_owned(),
            comparator: Arc::downgrade(comparator),
        }
    }

    /// Locale identifier of the bound comparator.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Whether the comparator is still owned by its cache.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.comparator.strong_count() > 0
    }
}

/// Registry entry for one collation name.
///
/// The engine's collation callback holds an `Arc` to the slot for as long as
/// the collation is registered. Rebinding swaps the slot's binding in place,
/// so the engine never has to re-register the name.
#[derive(Debug)]
pub struct CollationSlot {
    name: String,
    encoding: TextEncoding,
    binding: ArcSwap<Binding>,
}

impl CollationSlot {
    fn new(name: &str, encoding: TextEncoding, comparator: &Arc<dyn LocaleComparator>) -> Self {
        Self {
            name: name.to_owned(),
            encoding,
            binding: ArcSwap::from_pointee(Binding::new(comparator)),
        }
    }

    /// Encoding the engine hands to this slot's callback.
    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Snapshot of the current binding.
    #[must_use]
    pub fn binding(&self) -> Arc<Binding> {
        self.binding.load_full()
    }

    fn rebind(&self, comparator: &Arc<dyn LocaleComparator>) -> Arc<Binding> {
        self.binding.swap(Arc::new(Binding::new(comparator)))
    }
}

impl CollationFunction for CollationSlot {
    fn name(&self) -> &str {
        &self.name
    }

    fn compare(&self, left: &[u8], right: &[u8]) -> Ordering {
        // One load per call: a concurrent rebind cannot mix comparators
        // within a single comparison.
        let binding = self.binding.load();
        match binding.comparator.upgrade() {
            Some(comparator) => collate_with(comparator.as_ref(), left, right, self.encoding),
            None => {
                trace!(
                    collation = %self.name,
                    reason = ?FallbackReason::StaleBinding,
                    "collation byte fallback"
                );
                BinaryCollation.compare(left, right)
            }
        }
    }
}

// ── Collation registry ───────────────────────────────────────────────────

/// Result of [`CollationRegistry::bind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The name was unbound; a new slot was created and published.
    Created,
    /// The name existed; its binding was swapped.
    Rebound,
}

/// Registry of locale collations, keyed by case-insensitive name.
///
/// Reads (`find`, `compare`) load an immutable snapshot and take no lock.
/// Writes (`bind`, `unbind_all`) are serialized by a single writer mutex.
#[derive(Debug)]
pub struct CollationRegistry {
    encoding: TextEncoding,
    slots: ArcSwap<HashMap<String, Arc<CollationSlot>>>,
    writer: Mutex<()>,
}

impl Default for CollationRegistry {
    fn default() -> Self {
        Self::new(TextEncoding::Utf8)
    }
}

impl CollationRegistry {
    /// Create an empty registry whose slots decode text as `encoding`.
    #[must_use]
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            slots: ArcSwap::from_pointee(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// Encoding used by every slot in this registry.
    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Bind `name` to `comparator`.
    ///
    /// For a name that is not yet registered, `on_new` runs under the
    /// writer lock before the slot is published; if it fails nothing is
    /// published. An existing name has its binding swapped atomically.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `on_new`.
    pub fn bind<F>(
        &self,
        name: &str,
        comparator: &Arc<dyn LocaleComparator>,
        on_new: F,
    ) -> Result<BindOutcome>
    where
        F: FnOnce(&Arc<CollationSlot>) -> Result<()>,
    {
        let canon = canonical_name(name);
        let _writer = self.writer.lock();
        let current = self.slots.load_full();

        if let Some(slot) = current.get(&canon) {
            let previous = slot.rebind(comparator);
            info!(
                collation_name = %canon,
                locale = comparator.locale(),
                previous_locale = previous.locale(),
                "collation rebound"
            );
            return Ok(BindOutcome::Rebound);
        }

        let slot = Arc::new(CollationSlot::new(name, self.encoding, comparator));
        on_new(&slot)?;

        let mut next = HashMap::clone(&current);
        next.insert(canon.clone(), slot);
        self.slots.store(Arc::new(next));
        info!(
            collation_name = %canon,
            locale = comparator.locale(),
            encoding = %self.encoding,
            "collation registered"
        );
        Ok(BindOutcome::Created)
    }

    /// Look up a collation slot by name (case-insensitive).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<CollationSlot>> {
        let canon = canonical_name(name);
        let result = self.slots.load().get(&canon).cloned();
        debug!(
            collation = %canon,
            hit = result.is_some(),
            "collation registry lookup"
        );
        result
    }

    /// Current binding of `name`, for diagnostics.
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<Arc<Binding>> {
        self.slots
            .load()
            .get(&canonical_name(name))
            .map(|slot| slot.binding())
    }

    /// Check whether a collation with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.load().contains_key(&canonical_name(name))
    }

    /// Compare two spans under the collation called `name`.
    ///
    /// Never fails: an unknown name compares by bytes.
    pub fn compare(&self, name: &str, left: &[u8], right: &[u8]) -> Ordering {
        let slots = self.slots.load();
        match slots.get(&canonical_name(name)) {
            Some(slot) => slot.compare(left, right),
            None => {
                trace!(
                    collation = name,
                    reason = ?FallbackReason::UnknownCollation,
                    "collation byte fallback"
                );
                BinaryCollation.compare(left, right)
            }
        }
    }

    /// Registered names (canonical form), sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.load().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.load().len()
    }

    /// Whether no names are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.load().is_empty()
    }

    /// Drop every binding. Returns how many names were removed.
    ///
    /// Slots already handed to the engine keep working and compare by bytes
    /// once their comparators are released.
    pub fn unbind_all(&self) -> usize {
        let _writer = self.writer.lock();
        let previous = self.slots.swap(Arc::new(HashMap::new()));
        if !previous.is_empty() {
            info!(collations = previous.len(), "collation registry cleared");
        }
        previous.len()
    }
}

fn canonical_name(name: &str) -> String {
    name.to_ascii_uppercase()
}
