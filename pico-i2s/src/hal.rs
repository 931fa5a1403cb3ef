//! Hardware capabilities the engine programs.
//!
//! The engine never touches registers directly. A board support layer
//! implements these three traits over its PAC or HAL of choice (for the
//! RP2040: `CLOCKS`/`PLL_SYS`/`VREG`, one PIO block, one DMA channel), and
//! the tests implement them over plain structs.
//!
//! Launching the second core is the application's job: it moves a
//! [`SecondCoreDrain`](crate::playback::SecondCoreDrain) onto core 1 and
//! calls `run()` there.

// ── Clock tree ─────────────────────────────────────────────────────────────

/// Core regulator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoreVoltage {
    /// Reset default.
    V1_10,
    /// Required above ~250 MHz system clock.
    V1_20,
}

/// Where `clk_sys` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemClockSource {
    /// System PLL: `12 MHz ref -> vco_hz -> / post_div1 / post_div2 -> / sys_div`.
    Pll {
        vco_hz: u32,
        post_div1: u8,
        post_div2: u8,
        sys_div: u8,
    },
    /// External oscillator on a clock input pin, used undivided.
    Gpin { pin: u8, hz: u32 },
}

impl SystemClockSource {
    /// Resulting `clk_sys` frequency.
    pub const fn frequency_hz(&self) -> u32 {
        match *self {
            SystemClockSource::Pll {
                vco_hz,
                post_div1,
                post_div2,
                sys_div,
            } => vco_hz / post_div1 as u32 / post_div2 as u32 / sys_div as u32,
            SystemClockSource::Gpin { hz, .. } => hz,
        }
    }
}

/// System clock, peripheral clock and core regulator.
pub trait ClockTree {
    /// Current `clk_sys` frequency.
    fn system_clock_hz(&self) -> u32;

    /// Set the core regulator output.
    fn set_core_voltage(&mut self, voltage: CoreVoltage);

    /// Re-parent `clk_peri` onto the 48 MHz USB PLL so that later system
    /// clock changes leave UART/SPI baud rates alone.
    fn detach_peripheral_clock(&mut self);

    /// Switch `clk_sys` to `source`.
    fn switch_system_clock(&mut self, source: SystemClockSource);
}

// ── PIO ────────────────────────────────────────────────────────────────────

/// PIO programs the engine loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PioProgram {
    /// Philips I2S, 32-bit slots, one data pin.
    I2sData,
    /// PT8211 16-bit LSB-justified, one data pin.
    Pt8211,
    /// Bit-multiplexed pair on two data pins with side-set MCLK.
    Exdf,
    /// I2S on two data pins, second polarity-inverted.
    I2sDataDual,
    /// PT8211 on two data pins, second polarity-inverted.
    Pt8211Dual,
    /// Square wave master clock on one pin.
    MasterClock,
}

/// Pins a program drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProgramPins {
    /// First `out` pin.
    pub out_base: u8,
    pub out_count: u8,
    /// First side-set pin.
    pub sideset_base: u8,
    pub sideset_count: u8,
}

/// PIO clock divider in 16.8 fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockDivider {
    pub int: u16,
    pub frac: u8,
}

impl ClockDivider {
    /// Nearest 16.8 divider for `source_hz / target_hz`.
    ///
    /// Clamps to the hardware range `1.0..=65535 + 255/256`.
    pub const fn from_ratio(source_hz: u64, target_hz: u64) -> Self {
        if target_hz == 0 {
            return Self::MAX;
        }
        let fixed = (source_hz * 256 + target_hz / 2) / target_hz;
        if fixed < 256 {
            ClockDivider { int: 1, frac: 0 }
        } else if fixed > 0xFF_FFFF {
            Self::MAX
        } else {
            ClockDivider {
                int: (fixed >> 8) as u16,
                frac: fixed as u8,
            }
        }
    }

    /// An integer divider.
    pub const fn integer(int: u16) -> Self {
        ClockDivider { int, frac: 0 }
    }

    /// Slowest divider the hardware supports.
    pub const MAX: Self = ClockDivider {
        int: u16::MAX,
        frac: u8::MAX,
    };

    /// Output frequency for `source_hz`, truncated.
    pub const fn output_hz(&self, source_hz: u64) -> u64 {
        source_hz * 256 / ((self.int as u64) << 8 | self.frac as u64)
    }
}

/// One PIO block.
pub trait PioBackend {
    /// Claim state machine `sm`. Returns `false` if it is already in use.
    fn claim_state_machine(&mut self, sm: u8) -> bool;

    /// Stop and free state machine `sm` and any program it loaded.
    fn release_state_machine(&mut self, sm: u8);

    /// Load `program` into instruction memory and point `sm` at it with
    /// `pins` as outputs. Returns `false` if instruction memory is full.
    fn install(&mut self, sm: u8, program: PioProgram, pins: ProgramPins) -> bool;

    /// Program the clock divider of `sm`. Takes effect immediately, also
    /// while running.
    fn set_clock_divider(&mut self, sm: u8, divider: ClockDivider);

    /// Start or stop `sm`. Stopping also drains its TX FIFO.
    fn set_enabled(&mut self, sm: u8, enabled: bool);

    /// DREQ number pacing DMA into the TX FIFO of `sm`.
    fn tx_dreq(&self, sm: u8) -> u8;

    /// Address of the TX FIFO of `sm`.
    fn tx_fifo(&self, sm: u8) -> *mut u32;
}

// ── DMA ────────────────────────────────────────────────────────────────────

/// One DMA channel feeding a PIO TX FIFO.
///
/// Transfers are 32-bit words, read-incrementing, write-fixed, paced by
/// the DREQ given to [`configure`](DmaChannel::configure).
pub trait DmaChannel {
    /// Channel number, for diagnostics.
    fn number(&self) -> u8;

    /// Claim the channel. Returns `false` if it is already in use.
    fn claim(&mut self) -> bool;

    /// Free the channel.
    fn release(&mut self);

    /// Set the destination and pacing of later transfers.
    fn configure(&mut self, dest: *mut u32, dreq: u8);

    /// Route the transfer-complete interrupt to this core's NVIC.
    fn set_irq_enabled(&mut self, enabled: bool);

    /// Start a transfer of `words` words from `src`.
    ///
    /// # Safety
    ///
    /// `src..src + words` must stay valid and unmodified until the transfer
    /// completes or is aborted.
    unsafe fn start(&mut self, src: *const i32, words: usize);

    /// Whether a transfer is in flight.
    fn is_busy(&self) -> bool;

    /// Clear the transfer-complete interrupt flag.
    fn acknowledge_irq(&mut self);

    /// Stop any transfer in flight.
    fn abort(&mut self);

    /// Spin until the current transfer has finished.
    fn wait_for_finish(&mut self) {
        while self.is_busy() {
            core::hint::spin_loop();
        }
    }
}
