#![no_main]

//! Fuzz the collation callback path.
//!
//! Arbitrary byte spans in every text encoding go through the text bridge
//! and an ICU comparator. Comparisons must not panic and must stay
//! antisymmetric, with `Equal` only for byte-identical spans.

use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use sqlicu_ext_icu::{CollatorKey, IcuRules, LocaleRules};
use sqlicu_func::{LocaleComparator, collate_with, to_comparable};
use sqlicu_types::{CollationStrength, TextEncoding};

static COMPARATORS: LazyLock<Vec<Arc<dyn LocaleComparator>>> = LazyLock::new(|| {
    [("en_US", CollationStrength::Secondary), ("tr_TR", CollationStrength::Tertiary)]
        .into_iter()
        .filter_map(|(locale, strength)| IcuRules.create(&CollatorKey::new(locale, strength)).ok())
        .collect()
});

#[derive(Debug, Arbitrary)]
enum FuzzEncoding {
    Utf8,
    Utf16le,
    Utf16be,
}

impl From<FuzzEncoding> for TextEncoding {
    fn from(value: FuzzEncoding) -> Self {
        match value {
            FuzzEncoding::Utf8 => Self::Utf8,
            FuzzEncoding::Utf16le => Self::Utf16le,
            FuzzEncoding::Utf16be => Self::Utf16be,
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    encoding: FuzzEncoding,
    left: Vec<u8>,
    right: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    if input.left.len() > 4096 || input.right.len() > 4096 {
        return;
    }
    let encoding = TextEncoding::from(input.encoding);

    // The bridge never alters the engine's buffer.
    let before = input.left.clone();
    let _ = to_comparable(&input.left, encoding);
    assert_eq!(before, input.left);

    for comparator in COMPARATORS.iter() {
        let forward = collate_with(comparator.as_ref(), &input.left, &input.right, encoding);
        let backward = collate_with(comparator.as_ref(), &input.right, &input.left, encoding);
        assert_eq!(forward, backward.reverse());
        assert_eq!(forward == Ordering::Equal, input.left == input.right);
    }
});
