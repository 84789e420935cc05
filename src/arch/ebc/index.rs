//! The EBC index encoding.
//!
//! An index packs a signed offset made of a constant byte count and a count
//! of natural units (pointer-sized slots) into a 16, 32 or 64-bit word:
//!
//! ```text
//!  bits-1  bits-2..bits-4  bits-5..a   a-1..0
//! +------+---------------+-----------+---------+
//! | sign |  width w      | constant  | natural |
//! +------+---------------+-----------+---------+
//! ```
//!
//! The natural field is `a = w * (bits / 8)` bits wide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arch::DecodeError;
use crate::bits::{bit, bits};

/// Size of one natural unit, i.e. of a pointer on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PointerSize {
    /// 32-bit images.
    #[default]
    Four,
    /// PE32+ images.
    Eight,
}

impl PointerSize {
    pub fn bytes(self) -> u64 {
        match self {
            PointerSize::Four => 4,
            PointerSize::Eight => 8,
        }
    }

    /// Wrap an address computation to the target's address width.
    pub fn mask(self, value: u64) -> u64 {
        match self {
            PointerSize::Four => value & 0xFFFF_FFFF,
            PointerSize::Eight => value,
        }
    }

    /// Pick the size from a PE optional-header magic.
    pub fn from_pe_magic(magic: u16) -> Self {
        if magic == 0x20B {
            PointerSize::Eight
        } else {
            PointerSize::Four
        }
    }
}

impl TryFrom<u8> for PointerSize {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(PointerSize::Four),
            8 => Ok(PointerSize::Eight),
            other => Err(format!("pointer size must be 4 or 8, got {other}")),
        }
    }
}

impl From<PointerSize> for u8 {
    fn from(size: PointerSize) -> u8 {
        size.bytes() as u8
    }
}

impl fmt::Display for PointerSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}

/// The fields of one index word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedIndex {
    pub negative: bool,
    pub width_selector: u8,
    /// Bit width of the natural field.
    pub actual_width: u32,
    pub constant: u64,
    pub natural: u64,
    /// `constant + natural * pointer_size`
    pub offset: u64,
    pub signed_offset: i64,
}

/// Split an index word of `size` bits (16, 32 or 64).
pub fn decode_index(raw: u64, size: u32, ptr: PointerSize) -> Result<DecodedIndex, DecodeError> {
    let unit = match size {
        16 => 2,
        32 => 4,
        64 => 8,
        _ => return Err(DecodeError::InvalidForm("index width")),
    };
    let top = size - 1;
    let negative = bit(raw, top) == 1;
    let w = bits(raw, top - 1, top - 3);
    let a = w as u32 * unit;
    if a > size - 4 {
        return Err(DecodeError::InvalidIndex(raw));
    }

    let constant = if a < size - 4 { bits(raw, top - 4, a) } else { 0 };
    let natural = if a > 0 { bits(raw, a - 1, 0) } else { 0 };
    let offset = constant.wrapping_add(natural.wrapping_mul(ptr.bytes()));
    let signed_offset = if negative {
        (offset as i64).wrapping_neg()
    } else {
        offset as i64
    };

    Ok(DecodedIndex {
        negative,
        width_selector: w as u8,
        actual_width: a,
        constant,
        natural,
        offset,
        signed_offset,
    })
}

#[cfg(test)]
pub(crate) fn pack(negative: bool, w: u64, constant: u64, natural: u64, size: u32) -> u64 {
    let a = w * (size as u64 / 8);
    ((negative as u64) << (size - 1)) | (w << (size - 4)) | (constant << a) | natural
}
