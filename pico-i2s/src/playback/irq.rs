//! Interrupt-driven drain.
//!
//! ## Usage
//!
//! ```ignore
//! static SHARED: I2sShared = I2sShared::new();
//!
//! // After engine.initialize(48_000):
//! let drain = engine.interrupt_drain(dma_ch0, StatusLed::new(led))?;
//! // Move `drain` into the DMA_IRQ_0 handler's state, then:
//! #[interrupt]
//! fn DMA_IRQ_0() {
//!     DRAIN.on_dma_complete();
//! }
//! ```

use crate::constants::{MUTE_BLOCK_LEN, START_LEVEL};
use crate::engine::I2sShared;
use crate::hal::DmaChannel;

use super::{Hysteresis, PlaybackDrain, PlaybackHandler, PlaybackState, MUTE_BLOCK};

/// Re-arms the DMA from the DMA transfer-complete interrupt.
///
/// The DMA reads ring slots in place; the ring's spare slot keeps the
/// block in flight intact until the next interrupt retires it.
pub struct InterruptDrain<'s, D, H, const SLOTS: usize, const LEN: usize>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    shared: &'s I2sShared<SLOTS, LEN>,
    dma: D,
    handler: H,
    hysteresis: Hysteresis,
}

impl<'s, D, H, const SLOTS: usize, const LEN: usize> InterruptDrain<'s, D, H, SLOTS, LEN>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    /// Wrap a claimed and configured channel and start the first transfer.
    pub(crate) fn new(shared: &'s I2sShared<SLOTS, LEN>, dma: D, handler: H) -> Self {
        let mut drain = InterruptDrain {
            shared,
            dma,
            handler,
            hysteresis: Hysteresis::new(START_LEVEL),
        };
        drain.service();
        drain
    }

    /// Swap the playback handler, returning the previous one.
    ///
    /// The new handler hears the next transition; the current state is
    /// not replayed.
    pub fn set_handler(&mut self, handler: H) -> H {
        core::mem::replace(&mut self.handler, handler)
    }

    /// Body of the DMA interrupt handler.
    pub fn on_dma_complete(&mut self) {
        self.dma.acknowledge_irq();
        self.service();
    }
}

impl<D, H, const SLOTS: usize, const LEN: usize> PlaybackDrain for InterruptDrain<'_, D, H, SLOTS, LEN>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    fn service(&mut self) {
        if !self.shared.is_running() {
            return;
        }

        let shared = self.shared;
        let ring = shared.ring();
        if let Some(playing) = self.hysteresis.observe(ring.occupancy_relaxed()) {
            trace!("playback {}", playing);
            self.handler.playback_state(playing);
        }

        if self.hysteresis.is_playing() {
            let dma = &mut self.dma;
            let started = ring.dequeue_with(|block| {
                if block.is_empty() {
                    return false;
                }
                // SAFETY: the slot is the ring's spare until the next
                // dequeue, which only happens after this transfer completes.
                unsafe { dma.start(block.as_ptr(), block.len()) };
                true
            });
            if started == Some(true) {
                return;
            }
        }

        // SAFETY: MUTE_BLOCK is an immutable static.
        unsafe { self.dma.start(MUTE_BLOCK.as_ptr(), MUTE_BLOCK_LEN) };
    }

    fn state(&self) -> PlaybackState {
        self.hysteresis.state()
    }
}

impl<D, H, const SLOTS: usize, const LEN: usize> Drop for InterruptDrain<'_, D, H, SLOTS, LEN>
where
    D: DmaChannel,
    H: PlaybackHandler,
{
    fn drop(&mut self) {
        self.dma.set_irq_enabled(false);
        self.dma.abort();
        self.dma.release();
        self.shared.detach_drain();
    }
}
