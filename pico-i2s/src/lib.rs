//! # pico-i2s-pio
//!
//! A `no_std`, allocation-free audio output engine for the RP2040 that
//! turns interleaved PCM into I2S-family serial audio using one PIO block
//! and one DMA channel. It is written for USB audio bridges and similar
//! streaming sinks where the producer delivers one packet per USB frame.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Config | [`config`] / [`constants`] | Pins, wire format, clock mode, drain mode |
//! | Hardware | [`hal`] | `ClockTree`, `PioBackend` and `DmaChannel` traits |
//! | Clocks | [`clock`] | System clock presets and PIO dividers per sample rate |
//! | Data path | [`io`] / [`dsp`] | PCM decode, volume, packing, block ring |
//! | Engine | [`engine`] | Lifecycle and the producer side |
//! | Drains | [`playback`] | IRQ or second-core consumers with mute hysteresis |
//! | Façade | [`output`] | Stream-style writes and percent volume (feature-gated) |
//!
//! ## Quick start
//!
//! ```ignore
//! use pico_i2s_pio::{ClockMode, DrainMode, I2sEngine, I2sShared, OutputFormat, StatusLed};
//!
//! static SHARED: I2sShared = I2sShared::new();
//!
//! let mut engine = I2sEngine::new(&SHARED, pio0, clocks);
//! engine.configure(OutputFormat::I2s, ClockMode::LowJitter, DrainMode::Interrupt)?;
//! engine.initialize(48_000)?;
//! let drain = engine.interrupt_drain(dma_ch0, StatusLed::new(led))?;
//!
//! // USB audio OUT endpoint callback:
//! if !engine.enqueue(packet, 24)? {
//!     // ring full, drop or retry
//! }
//! ```
//!
//! ## Features
//!
//! | Feature | Default | Enables |
//! |---------|---------|---------|
//! | `facade` | yes | [`output::I2sOutput`] convenience wrapper |
//! | `defmt` | no | Logging through `defmt` and `defmt::Format` derives |
//!
//! ## Audio parameters
//!
//! - **Sample rates:** 8 kHz to 384 kHz ([`constants::MIN_SAMPLE_RATE`], [`constants::MAX_SAMPLE_RATE`])
//! - **Input:** interleaved stereo, 16/24/32-bit little-endian
//! - **Ring:** [`constants::BUF_DEPTH`] blocks of up to [`constants::DATA_LEN`] datums

#![no_std]

// Must come first so the logging macros are visible to later modules.
mod fmt;

pub mod clock;
pub mod config;
pub mod constants;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod hal;
pub mod io;
pub mod playback;

#[cfg(feature = "facade")]
pub mod output;

#[cfg(test)]
mod mock;

pub use config::{ClockMode, Config, DrainMode, OutputFormat, PinConfig};
pub use dsp::volume::Channel;
pub use engine::{I2sEngine, I2sShared};
pub use error::{Error, Resource, Result};
pub use playback::{DmaBuffers, InterruptDrain, NoopHandler, PlaybackHandler, SecondCoreDrain, StatusLed};

#[cfg(feature = "facade")]
pub use output::I2sOutput;
