//! Immutable signal snapshots.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::bits;

/// An immutable snapshot of a bit-vector signal.
///
/// `raw` is always reduced to `bits` and has every floating bit cleared, so
/// two snapshots compare equal when they float on the same bits and agree on
/// all driven bits. The bit width takes no part in equality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Value {
    raw: u64,
    high_z: u64,
    bits: u8,
}

impl Value {
    /// A fully driven value.
    pub fn new(raw: u64, bits: u8) -> Self {
        Self::with_high_z(raw, 0, bits)
    }

    /// A value whose bits all float.
    pub fn high_z(bits: u8) -> Self {
        Self::with_high_z(0, u64::MAX, bits)
    }

    /// A value with a per-bit high-Z mask.
    pub fn with_high_z(raw: u64, high_z: u64, bits: u8) -> Self {
        let mask = bits::mask(bits);
        let high_z = high_z & mask;
        Self {
            raw: raw & mask & !high_z,
            high_z,
            bits,
        }
    }

    /// A one bit value.
    pub fn from_bool(b: bool) -> Self {
        Self::new(u64::from(b), 1)
    }

    /// The driven bits; floating bits read as zero.
    pub fn value(&self) -> u64 {
        self.raw
    }

    /// The value sign-extended from its top bit.
    pub fn signed(&self) -> i64 {
        bits::sign_extend(self.raw, self.bits)
    }

    pub fn bool(&self) -> bool {
        self.raw != 0
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// True if any bit floats.
    pub fn is_high_z(&self) -> bool {
        self.high_z != 0
    }

    /// True if every bit floats.
    pub fn is_fully_high_z(&self) -> bool {
        self.high_z == bits::mask(self.bits)
    }

    pub fn high_z_mask(&self) -> u64 {
        self.high_z
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.high_z == other.high_z && self.raw == other.raw
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.high_z.hash(state);
        self.raw.hash(state);
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fully_high_z() {
            f.write_str("Z")
        } else if self.is_high_z() {
            f.write_str(&z_mask_string(self.raw, self.high_z, self.bits))
        } else {
            f.write_str(&short_hex(self.raw))
        }
    }
}

/// Binary rendering with `z` for every floating bit, most significant first.
pub(crate) fn z_mask_string(value: u64, high_z: u64, bits: u8) -> String {
    (0..u32::from(bits))
        .rev()
        .map(|i| {
            let m = 1u64 << i;
            if high_z & m != 0 {
                'z'
            } else if value & m != 0 {
                '1'
            } else {
                '0'
            }
        })
        .collect()
}

/// Short hex rendering. The `0x` prefix is only added where the digits alone
/// could be mistaken for a decimal number.
pub(crate) fn short_hex(value: u64) -> String {
    let digits = format!("{value:X}");
    let has_letter = digits.bytes().any(|b| b.is_ascii_alphabetic());
    if has_letter || digits.len() == 1 {
        digits
    } else {
        format!("0x{digits}")
    }
}
