//! Bit-field extraction and sign extension.
//!
//! The `try_*` variants validate their ranges and return [`BitsError`].
//! Decode routines only ever pass constant, in-range arguments, so they use
//! the plain variants, which check their arguments in debug builds only.

/// An invalid bit range or width was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BitsError {
    /// `high` is below `low`.
    #[error("bit range {high}..={low} is inverted")]
    InvertedRange { high: u32, low: u32 },

    /// A bit index past the top of a `u64`.
    #[error("bit index {0} is outside 0..=63")]
    OutOfRange(u32),

    /// A sign-extension width outside `1..=64`.
    #[error("sign-extension width {0} is outside 1..=64")]
    BadWidth(u32),
}

/// Mask covering the low `width` bits; `width` must be in `0..=64`.
const fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Extract the inclusive bit range `high..=low` of `value`.
pub fn try_bits(value: u64, high: u32, low: u32) -> Result<u64, BitsError> {
    if high > 63 {
        return Err(BitsError::OutOfRange(high));
    }
    if high < low {
        return Err(BitsError::InvertedRange { high, low });
    }
    Ok((value >> low) & low_mask(high - low + 1))
}

/// Extract the inclusive bit range `high..=low` of `value`.
pub fn bits(value: u64, high: u32, low: u32) -> u64 {
    debug_assert!(low <= high && high < 64, "bad bit range {high}..={low}");
    try_bits(value, high, low).unwrap_or(0)
}

/// Extract bit `n` of `value` as 0 or 1.
pub fn bit(value: u64, n: u32) -> u64 {
    debug_assert!(n < 64, "bit index {n} out of range");
    (value >> (n & 63)) & 1
}

/// Interpret the low `width` bits of `value` as two's complement.
pub fn try_sign_extend(value: u64, width: u32) -> Result<i64, BitsError> {
    if width == 0 || width > 64 {
        return Err(BitsError::BadWidth(width));
    }
    if width == 64 {
        return Ok(value as i64);
    }
    let m = 1u64 << (width - 1);
    let x = value & low_mask(width);
    Ok((x ^ m).wrapping_sub(m) as i64)
}

/// Interpret the low `width` bits of `value` as two's complement.
pub fn sign_extend(value: u64, width: u32) -> i64 {
    debug_assert!((1..=64).contains(&width), "bad sign-extension width {width}");
    try_sign_extend(value, width).unwrap_or(0)
}
