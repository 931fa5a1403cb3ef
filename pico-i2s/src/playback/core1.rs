//! Second-core drain.
//!
//! Runs forever on core 1 so that the interrupt context of core 0 stays
//! free. Each step copies the next block into one half of a double
//! buffer, waits for the transfer reading the other half to finish, and
//! starts the new one. The only wait is for the DMA, bounded by one
//! block's playing time.

use crate::constants::{MUTE_BLOCK_LEN, START_LEVEL};
use crate::engine::I2sShared;
use crate::hal::DmaChannel;

use super::{Hysteresis, PlaybackDrain, PlaybackHandler, PlaybackState, MUTE_BLOCK};

/// Two DMA source blocks, alternated by [`SecondCoreDrain`].
pub struct DmaBuffers<const LEN: usize> {
    blocks: [[i32; LEN]; 2],
}

impl<const LEN: usize> DmaBuffers<LEN> {
    pub const fn new() -> Self {
        DmaBuffers {
            blocks: [[0; LEN]; 2],
        }
    }
}

impl<const LEN: usize> Default for DmaBuffers<LEN> {
    fn default() -> Self {
        Self::new()
    }
}

/// Double-buffered drain for a dedicated core.
pub struct SecondCoreDrain<'s, D, H, const SLOTS: usize, const LEN: usize>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    shared: &'s I2sShared<SLOTS, LEN>,
    dma: D,
    handler: H,
    hysteresis: Hysteresis,
    buffers: &'s mut DmaBuffers<LEN>,
    /// Half to fill next.
    next: usize,
}

impl<'s, D, H, const SLOTS: usize, const LEN: usize> SecondCoreDrain<'s, D, H, SLOTS, LEN>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    /// Wrap a claimed and configured channel.
    pub(crate) fn new(
        shared: &'s I2sShared<SLOTS, LEN>,
        dma: D,
        handler: H,
        buffers: &'s mut DmaBuffers<LEN>,
    ) -> Self {
        SecondCoreDrain {
            shared,
            dma,
            handler,
            hysteresis: Hysteresis::new(START_LEVEL),
            buffers,
            next: 0,
        }
    }

    /// Swap the playback handler, returning the previous one.
    ///
    /// The new handler hears the next transition; the current state is
    /// not replayed.
    pub fn set_handler(&mut self, handler: H) -> H {
        core::mem::replace(&mut self.handler, handler)
    }

    /// One iteration of the drain loop.
    pub fn step(&mut self) {
        if !self.shared.is_running() {
            self.dma.wait_for_finish();
            return;
        }

        let shared = self.shared;
        let ring = shared.ring();
        if let Some(playing) = self.hysteresis.observe(ring.occupancy_relaxed()) {
            trace!("playback {}", playing);
            self.handler.playback_state(playing);
        }

        let dest = &mut self.buffers.blocks[self.next];
        let live = if self.hysteresis.is_playing() {
            ring.dequeue_with(|block| {
                dest[..block.len()].copy_from_slice(block);
                block.len()
            })
            .filter(|&len| len > 0)
        } else {
            None
        };

        let (src, len) = match live {
            Some(len) => (dest.as_ptr(), len),
            None => (MUTE_BLOCK.as_ptr(), MUTE_BLOCK_LEN),
        };

        self.dma.wait_for_finish();
        // SAFETY: `dest` is not touched again until the step after next,
        // which first waits for this transfer to finish. MUTE_BLOCK is an
        // immutable static.
        unsafe { self.dma.start(src, len) };
        self.next ^= 1;
    }

    /// Drain forever. Call on core 1.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }
}

impl<D, H, const SLOTS: usize, const LEN: usize> PlaybackDrain for SecondCoreDrain<'_, D, H, SLOTS, LEN>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    fn service(&mut self) {
        self.step();
    }

    fn state(&self) -> PlaybackState {
        self.hysteresis.state()
    }
}

impl<D, H, const SLOTS: usize, const LEN: usize> Drop for SecondCoreDrain<'_, D, H, SLOTS, LEN>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    fn drop(&mut self) {
        self.dma.abort();
        self.dma.release();
        self.shared.detach_drain();
    }
}
