//! Producer-side data path: PCM bytes in, DMA-ready blocks out.
//!
//! ```text
//! bytes ──unpack::frames──► (L, R) ──pack::pack_block──► SampleRing slot ──► drain
//!                                      volume + packing
//! ```
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`unpack`] | Little-endian 16/24/32-bit PCM to left-justified frames |
//! | [`pack`] | Volume and format packing into 32-bit datums |
//! | [`ring`] | Fixed-slot block FIFO shared with the drain |

pub mod pack;
pub mod ring;
pub mod unpack;

pub use ring::SampleRing;
pub use unpack::BitDepth;
