//! Byte/word packing and single-bit helpers shared by the CPU and bus.

/// Combine a high and low byte into a 16-bit word.
#[inline]
pub const fn to_u16(hi: u8, lo: u8) -> u16 {
    ((hi as u16) << 8) | lo as u16
}

/// Split a 16-bit word into `(hi, lo)`.
#[inline]
pub const fn from_u16(val: u16) -> (u8, u8) {
    ((val >> 8) as u8, val as u8)
}

/// Returns whether bit `n` (0-7) of `val` is set.
#[inline]
pub const fn bit(val: u8, n: u8) -> bool {
    val & (1 << (n & 0x07)) != 0
}

/// Returns `val` with bit `n` (0-7) forced to `on`.
#[inline]
pub const fn set_bit(val: u8, n: u8, on: bool) -> u8 {
    let mask = 1 << (n & 0x07);
    if on { val | mask } else { val & !mask }
}
