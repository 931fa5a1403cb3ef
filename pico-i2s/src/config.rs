//! Pin, format and clocking configuration.
//!
//! Everything here is plain data chosen before [`I2sEngine::initialize`]
//! runs and fixed for the rest of the session.
//!
//! [`I2sEngine::initialize`]: crate::engine::I2sEngine::initialize

use crate::error::{Error, Result};

/// Highest GPIO number on the RP2040 user bank.
pub const MAX_GPIO: u8 = 29;

/// Wire format emitted on the data pin(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputFormat {
    /// Philips I2S with a 128fs master clock on a separate pin.
    #[default]
    I2s,
    /// PT8211: BCLK 32fs, LSB-justified 16 bit, no master clock.
    Pt8211,
    /// Two data lines carrying bit-multiplexed left/right (external DF).
    Exdf,
    /// I2S to two DACs, second output polarity-inverted.
    I2sDual,
    /// PT8211 to two DACs, second output polarity-inverted.
    Pt8211Dual,
}

/// How a block is laid out in 32-bit datums.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Packing {
    /// `L R L R ...`, two datums per frame.
    Standard,
    /// Left/right bits interleaved into one 64-bit word, two datums per frame.
    BitMultiplexed,
    /// Bit-multiplexed pair followed by its negated pair, four datums per frame.
    DualMono,
}

impl OutputFormat {
    /// Packing policy this format consumes.
    pub const fn packing(self) -> Packing {
        match self {
            OutputFormat::I2s | OutputFormat::Pt8211 => Packing::Standard,
            OutputFormat::Exdf => Packing::BitMultiplexed,
            OutputFormat::I2sDual | OutputFormat::Pt8211Dual => Packing::DualMono,
        }
    }

    /// Number of consecutive data pins driven by the state machine.
    pub const fn data_pins(self) -> u8 {
        match self {
            OutputFormat::I2s | OutputFormat::Pt8211 => 1,
            _ => 2,
        }
    }

    /// Number of consecutive side-set clock pins starting at the clock base.
    pub const fn clock_pins(self) -> u8 {
        match self {
            // WCK, BCK and its own MCLK
            OutputFormat::Exdf => 3,
            _ => 2,
        }
    }

    /// Whether a separate state machine generates the master clock.
    pub const fn uses_mclk_state_machine(self) -> bool {
        matches!(self, OutputFormat::I2s | OutputFormat::I2sDual)
    }
}

/// Clock generation strategy trading simplicity for jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockMode {
    /// Fractional PIO divider from the unchanged system clock.
    #[default]
    Default,
    /// System PLL retuned so an integer divider reaches the rate.
    LowJitter,
    /// As [`ClockMode::LowJitter`] at twice the system frequency (1.20 V core).
    LowJitterOverclock,
    /// System clock taken from an external audio oscillator on a GPIN pin.
    External,
}

/// Execution context that drains the ring into the DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrainMode {
    /// DMA-complete interrupt re-arms the transfer.
    #[default]
    Interrupt,
    /// A loop on the second core double-buffers into the DMA.
    SecondCore,
}

/// GPIO assignment.
///
/// `clock_pin_base` is the word clock, `clock_pin_base + 1` the bit clock
/// (and `+ 2` the master clock for [`OutputFormat::Exdf`]). Dual formats
/// use `data_pin` and `data_pin + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub data_pin: u8,
    pub clock_pin_base: u8,
    pub mclk_pin: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        PinConfig {
            data_pin: 18,
            clock_pin_base: 20,
            mclk_pin: 22,
        }
    }
}

impl PinConfig {
    /// Bitmask of the pins the data state machine drives for `format`.
    pub const fn pin_mask(&self, format: OutputFormat) -> u32 {
        let data = (1u32 << format.data_pins()) - 1;
        let clock = (1u32 << format.clock_pins()) - 1;
        (data << self.data_pin) | (clock << self.clock_pin_base)
    }

    /// Check the assignment against `format`.
    pub fn validate(&self, format: OutputFormat) -> Result<()> {
        let last_data = self.data_pin as u16 + format.data_pins() as u16 - 1;
        let last_clock = self.clock_pin_base as u16 + format.clock_pins() as u16 - 1;
        if last_data > MAX_GPIO as u16 || last_clock > MAX_GPIO as u16 {
            return Err(Error::InvalidPins);
        }

        let data = ((1u32 << format.data_pins()) - 1) << self.data_pin;
        let clock = ((1u32 << format.clock_pins()) - 1) << self.clock_pin_base;
        if data & clock != 0 {
            return Err(Error::InvalidPins);
        }

        if format.uses_mclk_state_machine() {
            if self.mclk_pin > MAX_GPIO {
                return Err(Error::InvalidPins);
            }
            if (data | clock) & (1 << self.mclk_pin) != 0 {
                return Err(Error::InvalidPins);
            }
        }
        Ok(())
    }
}

/// Complete engine configuration.
///
/// The PIO block and DMA channel are whichever the
/// [`PioBackend`](crate::hal::PioBackend) and
/// [`DmaChannel`](crate::hal::DmaChannel) handles wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub pins: PinConfig,
    pub format: OutputFormat,
    pub clock_mode: ClockMode,
    pub drain: DrainMode,
    /// Data state machine; the master clock uses `state_machine + 1`.
    pub state_machine: u8,
}

impl Config {
    /// Validate pins and state machine numbers.
    pub fn validate(&self) -> Result<()> {
        self.pins.validate(self.format)?;
        let last_sm = if self.format.uses_mclk_state_machine() {
            self.state_machine.saturating_add(1)
        } else {
            self.state_machine
        };
        if last_sm > 3 {
            return Err(Error::InvalidPins);
        }
        Ok(())
    }
}
