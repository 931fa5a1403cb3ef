//! Decoding of interleaved little-endian PCM bytes.
//!
//! Every resolution is left-justified into a full `i32` so that volume
//! scaling and packing never need to know the source bit depth:
//!
//! | Depth | Bytes per sample | Placement |
//! |-------|------------------|-----------|
//! | 16 | 2 | bits 16..32 |
//! | 24 | 3 | bits 8..32 |
//! | 32 | 4 | as is |
//!
//! A trailing partial frame is ignored.

use crate::error::Error;

/// Resolution of the incoming PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitDepth {
    Bits16,
    Bits24,
    Bits32,
}

impl BitDepth {
    /// Bytes occupied by one sample of one channel.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            BitDepth::Bits16 => 2,
            BitDepth::Bits24 => 3,
            BitDepth::Bits32 => 4,
        }
    }

    /// Bytes occupied by one stereo frame.
    pub const fn frame_bytes(self) -> usize {
        self.bytes_per_sample() * 2
    }

    /// Width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            BitDepth::Bits16 => 16,
            BitDepth::Bits24 => 24,
            BitDepth::Bits32 => 32,
        }
    }

    /// Decode one sample from exactly `bytes_per_sample()` bytes.
    #[inline(always)]
    fn decode(self, b: &[u8]) -> i32 {
        match self {
            BitDepth::Bits16 => (i16::from_le_bytes([b[0], b[1]]) as i32) << 16,
            BitDepth::Bits24 => i32::from_le_bytes([0, b[0], b[1], b[2]]),
            BitDepth::Bits32 => i32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self, Error> {
        match bits {
            16 => Ok(BitDepth::Bits16),
            24 => Ok(BitDepth::Bits24),
            32 => Ok(BitDepth::Bits32),
            other => Err(Error::InvalidBitDepth(other)),
        }
    }
}

/// Iterate `(left, right)` left-justified pairs from interleaved PCM bytes.
pub fn frames(bytes: &[u8], depth: BitDepth) -> impl Iterator<Item = (i32, i32)> + '_ {
    let n = depth.bytes_per_sample();
    bytes
        .chunks_exact(depth.frame_bytes())
        .map(move |frame| (depth.decode(&frame[..n]), depth.decode(&frame[n..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_depth_from_u8() {
        assert_eq!(BitDepth::try_from(16), Ok(BitDepth::Bits16));
        assert_eq!(BitDepth::try_from(24), Ok(BitDepth::Bits24));
        assert_eq!(BitDepth::try_from(32), Ok(BitDepth::Bits32));
        assert_eq!(BitDepth::try_from(8), Err(Error::InvalidBitDepth(8)));
        assert_eq!(BitDepth::try_from(20), Err(Error::InvalidBitDepth(20)));
    }

    #[test]
    fn decode_16_bit() {
        let mut bytes = [0u8; 8];
        bytes[0..2].copy_from_slice(&0x4000i16.to_le_bytes());
        bytes[2..4].copy_from_slice(&(-0x4000i16).to_le_bytes());
        bytes[4..6].copy_from_slice(&i16::MIN.to_le_bytes());
        bytes[6..8].copy_from_slice(&(-1i16).to_le_bytes());

        let mut it = frames(&bytes, BitDepth::Bits16);
        assert_eq!(it.next(), Some((0x4000_0000, -0x4000_0000)));
        assert_eq!(it.next(), Some((i32::MIN, -0x1_0000)));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn decode_24_bit() {
        // 0x123456 and -1 (0xFFFFFF)
        let bytes = [0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF];
        let mut it = frames(&bytes, BitDepth::Bits24);
        assert_eq!(it.next(), Some((0x1234_5600, -0x100)));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn decode_32_bit() {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&i32::MAX.to_le_bytes());
        bytes[4..8].copy_from_slice(&i32::MIN.to_le_bytes());
        let mut it = frames(&bytes, BitDepth::Bits32);
        assert_eq!(it.next(), Some((i32::MAX, i32::MIN)));
        assert_eq!(it.next(), None);
    }

    #[test]
    fn partial_frame_is_ignored() {
        let bytes = [0u8; 7];
        assert_eq!(frames(&bytes, BitDepth::Bits16).count(), 1);
        assert_eq!(frames(&bytes, BitDepth::Bits24).count(), 1);
        assert_eq!(frames(&bytes, BitDepth::Bits32).count(), 0);
    }
}
