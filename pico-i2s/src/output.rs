//! Stream-style convenience wrapper over one [`I2sEngine`].
//!
//! [`I2sOutput`] fixes the input bit depth at [`begin`](I2sOutput::begin)
//! and offers typed writes, percentage volume and a polling `flush`,
//! similar to an Arduino `Stream` sink.
//!
//! ```ignore
//! let mut out = I2sOutput::new(engine);
//! out.begin(44_100, 16)?;
//! out.set_volume_percent(50);
//! for frame in tone {
//!     while !out.write_stereo_i16(frame.0, frame.1)? {}
//! }
//! out.flush(&mut delay, 100);
//! out.end();
//! ```

use embedded_hal::delay::DelayNs;

use crate::clock;
use crate::constants::TARGET_LEVEL;
use crate::dsp::volume::{percent_to_db, Channel};
use crate::engine::I2sEngine;
use crate::error::{Error, Result};
use crate::hal::{ClockTree, PioBackend};
use crate::io::unpack::BitDepth;

/// Engine plus the stream's bit depth.
pub struct I2sOutput<'s, P, C, const SLOTS: usize, const LEN: usize>
where
    P: PioBackend,
    C: ClockTree,
{
    engine: I2sEngine<'s, P, C, SLOTS, LEN>,
    depth: Option<BitDepth>,
}

impl<'s, P, C, const SLOTS: usize, const LEN: usize> I2sOutput<'s, P, C, SLOTS, LEN>
where
    P: PioBackend,
    C: ClockTree,
{
    pub fn new(engine: I2sEngine<'s, P, C, SLOTS, LEN>) -> Self {
        I2sOutput { engine, depth: None }
    }

    pub fn engine(&self) -> &I2sEngine<'s, P, C, SLOTS, LEN> {
        &self.engine
    }

    /// Configuration and drain attachment go through the engine.
    pub fn engine_mut(&mut self) -> &mut I2sEngine<'s, P, C, SLOTS, LEN> {
        &mut self.engine
    }

    pub fn into_engine(self) -> I2sEngine<'s, P, C, SLOTS, LEN> {
        self.engine
    }

    /// Start output at `rate` for `bit_depth` (16, 24 or 32) input.
    pub fn begin(&mut self, rate: u32, bit_depth: u8) -> Result<()> {
        let depth = BitDepth::try_from(bit_depth)?;
        clock::validate_rate(rate)?;
        self.engine.initialize(rate)?;
        self.depth = Some(depth);
        Ok(())
    }

    /// Stop output.
    pub fn end(&mut self) {
        self.engine.shutdown();
        self.depth = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.depth.is_some() && self.engine.is_running()
    }

    /// Bit depth given to [`begin`](Self::begin).
    pub fn bit_depth(&self) -> Option<u8> {
        self.depth.map(BitDepth::bits)
    }

    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    fn depth(&self) -> Result<BitDepth> {
        match self.depth {
            Some(depth) if self.engine.is_running() => Ok(depth),
            _ => Err(Error::NotInitialized),
        }
    }

    // ── Writes ─────────────────────────────────────────────────────────

    /// Queue one block of interleaved PCM bytes at the stream's bit depth.
    ///
    /// `Ok(false)` means the ring is full. Input past
    /// [`I2sEngine::frames_per_block`] frames is dropped, so split longer
    /// buffers across calls.
    pub fn write(&mut self, bytes: &[u8]) -> Result<bool> {
        let depth = self.depth()?;
        self.engine.enqueue(bytes, depth.bits())
    }

    /// Queue one block of interleaved `i16` samples.
    pub fn write_i16(&mut self, samples: &[i16]) -> Result<bool> {
        self.depth()?;
        self.engine.enqueue_frames(
            samples
                .chunks_exact(2)
                .map(|s| ((s[0] as i32) << 16, (s[1] as i32) << 16)),
        )
    }

    /// Queue one block of interleaved `i32` samples.
    pub fn write_i32(&mut self, samples: &[i32]) -> Result<bool> {
        self.depth()?;
        self.engine
            .enqueue_frames(samples.chunks_exact(2).map(|s| (s[0], s[1])))
    }

    /// Queue a single frame as its own block.
    pub fn write_stereo_i16(&mut self, left: i16, right: i16) -> Result<bool> {
        self.write_i16(&[left, right])
    }

    /// Queue a single frame as its own block.
    pub fn write_stereo_i32(&mut self, left: i32, right: i32) -> Result<bool> {
        self.write_i32(&[left, right])
    }

    // ── Buffer state ───────────────────────────────────────────────────

    /// Bytes of input at the stream's bit depth the free slots can take.
    pub fn available_for_write(&self) -> usize {
        let Ok(depth) = self.depth() else {
            return 0;
        };
        let free = self.engine.capacity() - self.engine.occupancy();
        free * self.engine.frames_per_block() * depth.frame_bytes()
    }

    /// Whether the ring is below [`TARGET_LEVEL`] and a generator should
    /// produce another block. `false` before `begin`.
    pub fn needs_data(&self) -> bool {
        if self.depth().is_err() {
            return false;
        }
        self.engine.occupancy() < TARGET_LEVEL.min(self.engine.capacity())
    }

    /// Whether the ring is full. Also `true` before `begin`.
    pub fn is_full(&self) -> bool {
        if self.depth().is_err() {
            return true;
        }
        self.engine.occupancy() >= self.engine.capacity()
    }

    /// Poll until every queued block has been handed to the DMA, sleeping
    /// 1 ms between polls. Gives up after `timeout_ms` polls.
    ///
    /// Returns `true` once the ring is empty.
    pub fn flush<D: DelayNs>(&mut self, delay: &mut D, timeout_ms: u32) -> bool {
        if self.depth().is_err() {
            return true;
        }
        for _ in 0..timeout_ms {
            if self.engine.occupancy() == 0 {
                return true;
            }
            delay.delay_ms(1);
        }
        self.engine.occupancy() == 0
    }

    // ── Volume and rate ────────────────────────────────────────────────

    /// Volume of both channels in percent (0 mutes, 100 is unity).
    pub fn set_volume_percent(&self, percent: u8) {
        self.engine.set_volume(percent_to_db(percent), Channel::Both);
    }

    /// Per-channel volume in percent.
    pub fn set_volume_percent_lr(&self, left: u8, right: u8) {
        self.engine.set_volume(percent_to_db(left), Channel::Left);
        self.engine.set_volume(percent_to_db(right), Channel::Right);
    }

    /// Volume of both channels in dB (`-100..=0`).
    pub fn set_volume_db(&self, db: i16) {
        self.engine.set_volume(db, Channel::Both);
    }

    /// Per-channel volume in dB.
    pub fn set_volume_db_lr(&self, left: i16, right: i16) {
        self.engine.set_volume(left, Channel::Left);
        self.engine.set_volume(right, Channel::Right);
    }

    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        self.engine.change_sample_rate(rate)
    }
}

// ── Float conversion ───────────────────────────────────────────────────────

/// Full-scale `f32` in `[-1, 1]` to `i16`, clamping.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Full-scale `f32` in `[-1, 1]` to `i32`, clamping.
pub fn f32_to_i32(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) * 2_147_483_647.0) as i32
}

/// Full-scale `f32` in `[-1, 1]` to a 24-bit value in the low bits of an
/// `i32`, clamping.
pub fn f32_to_i24(sample: f32) -> i32 {
    (sample.clamp(-1.0, 1.0) * 8_388_607.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BUF_DEPTH, DATA_LEN, RING_SLOTS};
    use crate::engine::I2sShared;
    use crate::mock::{MockClocks, MockPio};

    type Output<'s> = I2sOutput<'s, MockPio, MockClocks, RING_SLOTS, DATA_LEN>;

    fn output(shared: &I2sShared) -> Output<'_> {
        I2sOutput::new(I2sEngine::new(
            shared,
            MockPio::new(),
            MockClocks::new(125_000_000),
        ))
    }

    struct CountingDelay(u32);

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += ns / 1_000_000;
        }
    }

    #[test]
    fn writes_need_begin() {
        let shared = I2sShared::new();
        let mut out = output(&shared);
        assert_eq!(out.write(&[0; 4]), Err(Error::NotInitialized));
        assert_eq!(out.write_i16(&[0, 0]), Err(Error::NotInitialized));
        assert_eq!(out.available_for_write(), 0);
        assert!(out.is_full());
        assert!(!out.is_initialized());
    }

    #[test]
    fn begin_validates() {
        let shared = I2sShared::new();
        let mut out = output(&shared);
        assert_eq!(out.begin(48_000, 8), Err(Error::InvalidBitDepth(8)));
        assert_eq!(out.begin(500, 16), Err(Error::InvalidSampleRate(500)));
        assert!(!out.engine().is_running());

        out.begin(48_000, 24).unwrap();
        assert!(out.is_initialized());
        assert_eq!(out.bit_depth(), Some(24));
        assert_eq!(out.sample_rate(), 48_000);
    }

    #[test]
    fn available_for_write_counts_free_blocks() {
        let shared = I2sShared::new();
        let mut out = output(&shared);
        out.begin(48_000, 16).unwrap();
        assert_eq!(out.available_for_write(), BUF_DEPTH * DATA_LEN * 2);

        assert!(out.write_stereo_i16(1, 2).unwrap());
        assert_eq!(out.available_for_write(), (BUF_DEPTH - 1) * DATA_LEN * 2);

        for _ in 1..BUF_DEPTH {
            assert!(out.write_stereo_i32(1, 2).unwrap());
        }
        assert!(out.is_full());
        assert_eq!(out.available_for_write(), 0);
        assert!(!out.write(&[0; 4]).unwrap());
    }

    #[test]
    fn needs_data_below_target_level() {
        let shared = I2sShared::new();
        let mut out = output(&shared);
        assert!(!out.needs_data());

        out.begin(48_000, 16).unwrap();
        for _ in 0..TARGET_LEVEL {
            assert!(out.needs_data());
            assert!(out.write_stereo_i16(1, 1).unwrap());
        }
        assert!(!out.needs_data());
        assert!(!out.is_full());

        shared.ring().dequeue_with(|_| ());
        assert!(out.needs_data());
    }

    #[test]
    fn long_writes_are_cut_at_one_block() {
        let shared = I2sShared::new();
        let mut out = output(&shared);
        out.begin(48_000, 32).unwrap();
        let per_block = out.engine().frames_per_block();
        assert_eq!(per_block, DATA_LEN / 2);

        let samples = [7i32; DATA_LEN + 8];
        assert!(out.write_i32(&samples).unwrap());
        assert_eq!(out.engine().occupancy(), 1);
        assert_eq!(shared.ring().dequeue_with(|b| b.len()), Some(per_block * 2));
    }

    #[test]
    fn flush_polls_with_delay() {
        let shared = I2sShared::new();
        let mut out = output(&shared);
        out.begin(48_000, 16).unwrap();
        let mut delay = CountingDelay(0);
        assert!(out.flush(&mut delay, 10));
        assert_eq!(delay.0, 0);

        out.write_i16(&[1, 1]).unwrap();
        assert!(!out.flush(&mut delay, 10));
        assert_eq!(delay.0, 10);
    }

    #[test]
    fn percent_volume() {
        let shared = I2sShared::new();
        let out = output(&shared);
        out.set_volume_percent_lr(100, 0);
        let (l, r) = shared.volume().gains();
        assert_eq!(l, crate::dsp::volume::UNITY_GAIN);
        assert_eq!(r, crate::dsp::volume::DB_TO_GAIN[100]);

        out.set_volume_db(-3);
        assert_eq!(shared.volume().gains().0, crate::dsp::volume::DB_TO_GAIN[3]);
    }

    #[test]
    fn end_stops() {
        let shared = I2sShared::new();
        let mut out = output(&shared);
        out.begin(44_100, 32).unwrap();
        out.write_i32(&[1, 2, 3, 4]).unwrap();
        out.end();
        assert!(!out.is_initialized());
        assert_eq!(out.engine().occupancy(), 0);
        assert_eq!(out.set_sample_rate(48_000), Err(Error::NotInitialized));
    }

    #[test]
    fn float_conversion_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), 32767);
        assert_eq!(f32_to_i16(-2.0), -32767);
        assert_eq!(f32_to_i16(0.5), 16383);
        assert_eq!(f32_to_i32(1.5), i32::MAX);
        assert_eq!(f32_to_i32(-1.0), i32::MIN);
        assert_eq!(f32_to_i24(1.0), 8_388_607);
        assert_eq!(f32_to_i24(-1.0), -8_388_607);
    }
}
