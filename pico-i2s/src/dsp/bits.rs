//! Bit-level helpers for the multiplexed output formats.
//!
//! The EXDF and dual formats shift left and right out on two pins in the
//! same bit clock. The PIO program pulls one 64-bit word per frame as two
//! datums and emits bit pairs, so the channels are perfectly interleaved:
//! left occupies the odd bit positions and right the even ones.

/// Spread the 32 bits of `x` over the even bit positions of a `u64`.
#[inline(always)]
pub fn part1by1(x: u32) -> u64 {
    let mut x = x as u64;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

/// Inverse of [`part1by1`]: gather the even bits of `x`.
#[inline(always)]
pub fn compact1by1(x: u64) -> u32 {
    let mut x = x & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x >> 16)) & 0x0000_0000_FFFF_FFFF;
    x as u32
}

/// Bit-multiplex one frame into the two datums the PIO shifts out,
/// high word first.
#[inline(always)]
pub fn interleave_pair(left: i32, right: i32) -> [i32; 2] {
    let merged = (part1by1(left as u32) << 1) | part1by1(right as u32);
    [(merged >> 32) as u32 as i32, merged as u32 as i32]
}

/// Recover `(left, right)` from a pair produced by [`interleave_pair`].
pub fn deinterleave_pair(words: [i32; 2]) -> (i32, i32) {
    let merged = ((words[0] as u32 as u64) << 32) | words[1] as u32 as u64;
    (compact1by1(merged >> 1) as i32, compact1by1(merged) as i32)
}

/// Two's-complement negation with `i32::MIN` mapped to `i32::MAX`.
#[inline(always)]
pub fn negate_saturating(x: i32) -> i32 {
    x.saturating_neg()
}
