//! Packing of scaled stereo frames into DMA datums.
//!
//! ## Block layouts
//!
//! | Packing | Datums per frame | Layout |
//! |---------|------------------|--------|
//! | [`Standard`](Packing::Standard) | 2 | `L R` |
//! | [`BitMultiplexed`](Packing::BitMultiplexed) | 2 | `hi(LR) lo(LR)` bit-interleaved |
//! | [`DualMono`](Packing::DualMono) | 4 | `hi(LR) lo(LR) hi(-L-R) lo(-L-R)` |
//!
//! The dual layout drives the second DAC with inverted polarity for
//! balanced wiring.

use crate::config::Packing;
use crate::dsp::bits::{interleave_pair, negate_saturating};
use crate::dsp::volume::apply_gain;

/// Datums one stereo frame occupies under `packing`.
pub const fn datums_per_frame(packing: Packing) -> usize {
    match packing {
        Packing::Standard | Packing::BitMultiplexed => 2,
        Packing::DualMono => 4,
    }
}

/// Pack one frame into `out`, which must hold `datums_per_frame(packing)`.
#[inline(always)]
pub fn pack_frame(packing: Packing, left: i32, right: i32, out: &mut [i32]) {
    match packing {
        Packing::Standard => {
            out[0] = left;
            out[1] = right;
        }
        Packing::BitMultiplexed => {
            out[..2].copy_from_slice(&interleave_pair(left, right));
        }
        Packing::DualMono => {
            out[..2].copy_from_slice(&interleave_pair(left, right));
            out[2..4].copy_from_slice(&interleave_pair(
                negate_saturating(left),
                negate_saturating(right),
            ));
        }
    }
}

/// Scale `frames` by `(left, right)` Q29 gains and pack them into `dest`.
///
/// Frames that do not fit are dropped. Returns the datum count written.
pub fn pack_block<I>(dest: &mut [i32], packing: Packing, gains: (i32, i32), frames: I) -> usize
where
    I: IntoIterator<Item = (i32, i32)>,
{
    let n = datums_per_frame(packing);
    let mut written = 0;
    for (out, (l, r)) in dest.chunks_exact_mut(n).zip(frames) {
        pack_frame(packing, apply_gain(l, gains.0), apply_gain(r, gains.1), out);
        written += n;
    }
    written
}
