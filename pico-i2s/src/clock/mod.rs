//! Sample-rate clocking.
//!
//! [`ClockConfigurator`] turns a sample rate and a [`ClockMode`] into PIO
//! clock dividers and, for the integer-divider modes, a system clock
//! target. It owns the "48 kHz family" flag: the system clock is only
//! re-targeted when a rate change crosses between the 44.1 kHz and 48 kHz
//! families, because relocking the PLL glitches the output.
//!
//! ## Lifecycle
//!
//! ```text
//! new(mode) ──prepare()──► start(rate) ──► change_rate(rate) ...
//! ```
//!
//! `prepare` must run before any peripheral sharing `clk_peri` is set up.
//! Calls must be serialized by the caller.

pub mod presets;

use crate::config::ClockMode;
use crate::constants::{MAX_SAMPLE_RATE, MIN_SAMPLE_RATE, PIO_CYCLES_PER_FRAME};
use crate::error::{Error, Result};
use crate::hal::{ClockDivider, ClockTree, CoreVoltage};

pub use presets::is_48k_family;

/// Dividers to program after a rate change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateChange {
    /// New data state machine divider.
    pub data: ClockDivider,
    /// New master clock divider, if it changed.
    pub mclk: Option<ClockDivider>,
    /// Whether `clk_sys` was switched to another source.
    pub system_retargeted: bool,
}

/// Check `rate` against `MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE`.
pub fn validate_rate(rate: u32) -> Result<()> {
    if (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
        Ok(())
    } else {
        Err(Error::InvalidSampleRate(rate))
    }
}

/// Clock state for one output session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfigurator {
    mode: ClockMode,
    rate: u32,
    family_48k: bool,
    data: ClockDivider,
    mclk: ClockDivider,
}

impl ClockConfigurator {
    pub const fn new(mode: ClockMode) -> Self {
        ClockConfigurator {
            mode,
            rate: 0,
            family_48k: true,
            data: ClockDivider::integer(1),
            mclk: ClockDivider::integer(1),
        }
    }

    pub fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Current sample rate, `0` before [`start`](Self::start).
    pub fn sample_rate(&self) -> u32 {
        self.rate
    }

    pub fn is_48k_family(&self) -> bool {
        self.family_48k
    }

    pub fn data_divider(&self) -> ClockDivider {
        self.data
    }

    pub fn mclk_divider(&self) -> ClockDivider {
        self.mclk
    }

    /// One-time clock tree setup for the selected mode.
    ///
    /// The overclocked mode raises the core voltage; every integer-divider
    /// mode moves `clk_peri` off `clk_sys` so later retargets do not
    /// disturb other peripherals.
    pub fn prepare<C: ClockTree>(&self, clocks: &mut C) {
        if self.mode == ClockMode::LowJitterOverclock {
            clocks.set_core_voltage(CoreVoltage::V1_20);
        }
        if self.mode != ClockMode::Default {
            clocks.detach_peripheral_clock();
        }
    }

    /// Set up clocks for the first rate of a session.
    ///
    /// Integer-divider modes always switch the system clock here.
    pub fn start<C: ClockTree>(&mut self, clocks: &mut C, rate: u32) -> Result<()> {
        validate_rate(rate)?;
        let family_48k = is_48k_family(rate);
        let (data, mclk) = self.dividers(clocks, rate, family_48k)?;

        if let Some(source) = presets::system_clock(self.mode, family_48k) {
            debug!("clk_sys -> {} Hz", source.frequency_hz());
            clocks.switch_system_clock(source);
        }

        self.rate = rate;
        self.family_48k = family_48k;
        self.data = data;
        self.mclk = mclk;
        Ok(())
    }

    /// Move to a new rate within the running session.
    ///
    /// Only a family crossing switches the system clock (integer modes) or
    /// the master clock divider (default mode). On error nothing changes.
    pub fn change_rate<C: ClockTree>(&mut self, clocks: &mut C, rate: u32) -> Result<RateChange> {
        validate_rate(rate)?;
        let family_48k = is_48k_family(rate);
        let crossed = family_48k != self.family_48k;
        let (data, mclk) = self.dividers(clocks, rate, family_48k)?;

        let mut system_retargeted = false;
        if crossed {
            if let Some(source) = presets::system_clock(self.mode, family_48k) {
                debug!("family change, clk_sys -> {} Hz", source.frequency_hz());
                clocks.switch_system_clock(source);
                system_retargeted = true;
            }
        }

        let mclk_changed = mclk != self.mclk;
        self.rate = rate;
        self.family_48k = family_48k;
        self.data = data;
        self.mclk = mclk;

        Ok(RateChange {
            data,
            mclk: mclk_changed.then_some(mclk),
            system_retargeted,
        })
    }

    /// Data and master clock dividers for `rate`.
    fn dividers<C: ClockTree>(
        &self,
        clocks: &C,
        rate: u32,
        family_48k: bool,
    ) -> Result<(ClockDivider, ClockDivider)> {
        match self.mode {
            ClockMode::Default => {
                let sys_hz = clocks.system_clock_hz() as u64;
                let data = ClockDivider::from_ratio(sys_hz, rate as u64 * PIO_CYCLES_PER_FRAME as u64);
                let mclk = ClockDivider::from_ratio(sys_hz, presets::family_mclk_hz(family_48k) as u64);
                Ok((data, mclk))
            }
            mode => {
                let numerator = presets::divider_multiplier(mode) * presets::family_base(family_48k);
                if numerator % rate != 0 {
                    return Err(Error::UnreachableSampleRate(rate));
                }
                let div = u16::try_from(numerator / rate)
                    .map_err(|_| Error::UnreachableSampleRate(rate))?;
                Ok((
                    ClockDivider::integer(div),
                    ClockDivider::integer(presets::mclk_divider(mode)),
                ))
            }
        }
    }
}
