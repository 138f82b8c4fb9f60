//! Conversion between register bytes and their hexadecimal text.
//!
//! Values are handled most-significant byte first here; physical byte order
//! is applied by the caller through [`Endianness`](crate::regs::Endianness).

use std::borrow::Cow;

use crate::err::WriteError;
use crate::regs::RegisterSpec;

/// Render a most-significant-first value as `0x` followed by two lowercase
/// hex digits per byte.
pub fn render(msb_first: &[u8]) -> String {
    let mut text = String::with_capacity(2 + msb_first.len() * 2);
    text.push_str("0x");
    text.extend(msb_first.iter().map(|byte| format!("{byte:02x}")));
    text
}

/// Drop a leading `0x` or `0X`.
pub fn strip_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

/// Parse `text` into exactly `spec.size_bytes` bytes, most significant first,
/// zero-extended on the left.
///
/// Every check happens here, before the caller stores anything, so a refused
/// value never leaves a half-written register behind.
pub fn encode(spec: &RegisterSpec, text: &str) -> Result<Vec<u8>, WriteError> {
    if spec.read_only {
        return Err(WriteError::ReadOnlyViolation {
            register: spec.name,
        });
    }

    let digits = strip_prefix(text);
    if let Some(character) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(WriteError::InvalidCharacter {
            register: spec.name,
            character,
            value: digits.to_string(),
        });
    }

    // Two digits per byte: "abc" is read as "0abc"
    let digits: Cow<'_, str> = if digits.len() % 2 != 0 {
        Cow::Owned(format!("0{digits}"))
    } else {
        Cow::Borrowed(digits)
    };

    let value_bytes = digits.len() / 2;
    if value_bytes > spec.size_bytes {
        return Err(WriteError::ValueTooLarge {
            register: spec.name,
            value_bytes,
            register_bytes: spec.size_bytes,
        });
    }

    let mut bytes = vec![0u8; spec.size_bytes];
    let start = spec.size_bytes - value_bytes;
    for (slot, pair) in bytes[start..].iter_mut().zip(digits.as_bytes().chunks(2)) {
        *slot = decode_pair(spec, pair)?;
    }
    Ok(bytes)
}

fn decode_pair(spec: &RegisterSpec, pair: &[u8]) -> Result<u8, WriteError> {
    let conversion_failure = || WriteError::ConversionFailure {
        register: spec.name,
        pair: String::from_utf8_lossy(pair).into_owned(),
    };
    let pair = std::str::from_utf8(pair).map_err(|_| conversion_failure())?;
    u8::from_str_radix(pair, 16).map_err(|_| conversion_failure())
}
