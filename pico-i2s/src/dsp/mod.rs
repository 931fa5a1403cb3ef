//! Sample arithmetic: volume scaling and bit multiplexing.
//!
//! - [`volume`]: dB to Q29 gain table and the shared per-channel gains
//! - [`bits`]: perfect bit interleave and saturating negation

pub mod bits;
pub mod volume;
