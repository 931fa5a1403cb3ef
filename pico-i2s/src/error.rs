//! Error taxonomy for the output engine.
//!
//! Only configuration and hardware-contention failures are errors. A full
//! ring on enqueue (or an empty ring on dequeue) is ordinary flow control
//! and is reported as `bool` / `Option` by the queue APIs instead.

use thiserror::Error;

/// Hardware resource the engine claims at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// PIO state machine emitting the data/word/bit clocks.
    #[error("data state machine {0}")]
    DataStateMachine(u8),
    /// PIO state machine emitting the master clock.
    #[error("master clock state machine {0}")]
    MclkStateMachine(u8),
    /// PIO instruction memory for the output programs.
    #[error("PIO instruction memory")]
    InstructionMemory,
    /// DMA channel feeding the data state machine.
    #[error("DMA channel {0}")]
    DmaChannel(u8),
}

/// Errors reported by the engine's configuration and lifecycle calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Sample rate outside `MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE`.
    #[error("sample rate {0} Hz is out of range")]
    InvalidSampleRate(u32),
    /// The selected clock mode cannot reach this rate with an integer divider.
    #[error("sample rate {0} Hz is not reachable with an integer divider")]
    UnreachableSampleRate(u32),
    /// Bit depth other than 16, 24 or 32.
    #[error("unsupported bit depth {0}")]
    InvalidBitDepth(u8),
    /// Pin assignment out of range or overlapping for the selected format.
    #[error("invalid pin assignment for the selected output format")]
    InvalidPins,
    /// A state machine, instruction memory or DMA channel is already in use.
    #[error("{0} is already claimed")]
    ResourceBusy(Resource),
    /// The call requires a running engine.
    #[error("engine is not initialized")]
    NotInitialized,
    /// Configuration cannot change while the engine is running.
    #[error("engine is running")]
    Busy,
    /// The requested drain does not match the configured strategy.
    #[error("drain strategy does not match the configuration")]
    StrategyMismatch,
    /// A drain already consumes this engine's ring.
    #[error("a drain is already attached")]
    DrainTaken,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
