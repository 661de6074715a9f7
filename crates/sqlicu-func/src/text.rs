//! Bridge from engine-owned text buffers to comparator input.
//!
//! The engine hands collation callbacks a raw `(pointer, length)` span in
//! the encoding the collation was registered with. Nothing here assumes NUL
//! termination, and nothing mutates or keeps the engine's buffer.
//!
//! UTF-8 spans are borrowed as-is after validation. UTF-16 spans are decoded
//! into a scratch `String` owned by the returned view, so its lifetime ends
//! with the comparison that created it.

use std::borrow::Cow;

use sqlicu_types::TextEncoding;

/// Why a comparison was downgraded to byte order.
///
/// None of these are errors: a collation callback must always produce an
/// ordering, so each reason is logged and recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    /// The operand is not valid text in the registered encoding.
    DecodeFallback,
    /// The name is bound but its comparator has been released.
    StaleBinding,
    /// No collation with the requested name is registered.
    UnknownCollation,
}

/// Read-only view of one operand in the comparator's encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparableView<'a> {
    text: Cow<'a, str>,
}

impl ComparableView<'_> {
    /// The decoded text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the view points into the engine's buffer (no conversion).
    #[must_use]
    pub const fn is_borrowed(&self) -> bool {
        matches!(self.text, Cow::Borrowed(_))
    }
}

/// Convert an engine text span into a comparator view.
///
/// # Errors
///
/// Returns [`FallbackReason::DecodeFallback`] when `bytes` is not valid in
/// `encoding` (bad UTF-8, odd UTF-16 length, unpaired surrogate).
pub fn to_comparable(
    bytes: &[u8],
    encoding: TextEncoding,
) -> Result<ComparableView<'_>, FallbackReason> {
    match encoding {
        TextEncoding::Utf8 => std::str::from_utf8(bytes)
            .map(|text| ComparableView {
                text: Cow::Borrowed(text),
            })
            .map_err(|_| FallbackReason::DecodeFallback),
        TextEncoding::Utf16le => decode_utf16(bytes, u16::from_le_bytes),
        TextEncoding::Utf16be => decode_utf16(bytes, u16::from_be_bytes),
    }
}

fn decode_utf16(
    bytes: &[u8],
    unit: fn([u8; 2]) -> u16,
) -> Result<ComparableView<'static>, FallbackReason> {
    if bytes.len() % 2 != 0 {
        return Err(FallbackReason::DecodeFallback);
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));

    // One UTF-16 unit never expands past three UTF-8 bytes.
    let mut scratch = String::with_capacity(bytes.len() / 2 * 3);
    for decoded in char::decode_utf16(units) {
        scratch.push(decoded.map_err(|_| FallbackReason::DecodeFallback)?);
    }
    Ok(ComparableView {
        text: Cow::Owned(scratch),
    })
}
