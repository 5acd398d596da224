//! Bit manipulation helpers shared by values and gates.
//!
//! All widths are in the range `1..=64`. Shifts by 64 or more saturate to
//! zero instead of wrapping.

/// Largest supported signal width.
pub const MAX_BITS: u8 = 64;

/// Shift `val` up by `bits`, yielding zero for shifts of 64 or more.
pub fn up(val: u64, bits: u32) -> u64 {
    if bits < 64 { val << bits } else { 0 }
}

/// Shift `val` down by `bits`, yielding zero for shifts of 64 or more.
pub fn down(val: u64, bits: u32) -> u64 {
    if bits < 64 { val >> bits } else { 0 }
}

/// Mask with the lowest `bits` bits set.
pub fn mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// The most significant bit of a `bits` wide value.
pub fn signed_flag(bits: u8) -> u64 {
    up(1, u32::from(bits.max(1)) - 1)
}

/// True if the sign bit of a `bits` wide value is set.
pub fn is_negative(value: u64, bits: u8) -> bool {
    value & signed_flag(bits) != 0
}

/// Sign-extend a `bits` wide value to 64 bits.
pub fn sign_extend(value: u64, bits: u8) -> i64 {
    if bits >= 64 || !is_negative(value, bits) {
        value as i64
    } else {
        (value | !mask(bits)) as i64
    }
}
