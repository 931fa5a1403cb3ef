//! Draining the sample ring into the DMA.
//!
//! Exactly one consumer drains the ring per session, chosen by
//! [`DrainMode`](crate::config::DrainMode):
//!
//! | Drain | Context | Buffers |
//! |-------|---------|---------|
//! | [`InterruptDrain`] | DMA transfer-complete IRQ | DMA reads the ring slot directly |
//! | [`SecondCoreDrain`] | Loop on core 1 | Copies into a [`DmaBuffers`] double buffer |
//!
//! Both run the same [`Hysteresis`]: output mutes as soon as the ring is
//! seen empty and resumes only once it has refilled to the start level.
//! The [`PlaybackHandler`] hears about each of those transitions once.

mod core1;
mod irq;

pub use core1::{DmaBuffers, SecondCoreDrain};
pub use irq::InterruptDrain;

use embedded_hal::digital::OutputPin;

use crate::constants::MUTE_BLOCK_LEN;

/// Silence played while muted.
pub(crate) static MUTE_BLOCK: [i32; MUTE_BLOCK_LEN] = [0; MUTE_BLOCK_LEN];

// ── Playback state handler ─────────────────────────────────────────────────

/// Notified when output switches between silence and live audio.
///
/// Called from the drain's context (an interrupt or core 1), so it must
/// be short and must not block.
pub trait PlaybackHandler {
    fn playback_state(&mut self, playing: bool);
}

impl<F: FnMut(bool)> PlaybackHandler for F {
    fn playback_state(&mut self, playing: bool) {
        self(playing)
    }
}

/// Ignores playback state changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl PlaybackHandler for NoopHandler {
    fn playback_state(&mut self, _playing: bool) {}
}

/// Lights a status LED while audio is playing.
///
/// This is the usual handler to attach a drain with; pass
/// [`NoopHandler`] instead when there is no indicator. Pin errors are
/// ignored so a status LED never stalls the drain.
pub struct StatusLed<P> {
    pin: P,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P) -> Self {
        StatusLed { pin }
    }

    pub fn free(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> PlaybackHandler for StatusLed<P> {
    fn playback_state(&mut self, playing: bool) {
        let _ = if playing {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
    }
}

// ── Mute hysteresis ────────────────────────────────────────────────────────

/// Output state seen by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaybackState {
    /// Nothing observed yet.
    Idle,
    /// Ring ran dry; playing the mute block.
    Silent,
    /// Playing live blocks.
    Playing,
}

/// Silent/playing debouncer over ring occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hysteresis {
    state: PlaybackState,
    start_level: usize,
}

impl Hysteresis {
    /// Resume playing once occupancy reaches `start_level` (at least 1).
    pub const fn new(start_level: usize) -> Self {
        Hysteresis {
            state: PlaybackState::Idle,
            start_level: if start_level == 0 { 1 } else { start_level },
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Feed one occupancy sample. Returns the new `playing` value on a
    /// transition, `None` otherwise.
    pub fn observe(&mut self, occupancy: usize) -> Option<bool> {
        match self.state {
            PlaybackState::Idle | PlaybackState::Playing if occupancy == 0 => {
                self.state = PlaybackState::Silent;
                Some(false)
            }
            PlaybackState::Idle | PlaybackState::Silent if occupancy >= self.start_level => {
                self.state = PlaybackState::Playing;
                Some(true)
            }
            _ => None,
        }
    }
}

// ── Drain interface ────────────────────────────────────────────────────────

/// A consumer that moves blocks from the ring to the DMA.
pub trait PlaybackDrain {
    /// Run one drain step: pick the next block and start its transfer.
    fn service(&mut self);

    /// Current output state.
    fn state(&self) -> PlaybackState;
}
