//! The output engine: configuration, lifecycle and the producer side.
//!
//! State shared with the drain lives in an [`I2sShared`], normally a
//! `static`. [`I2sEngine`] owns the PIO block and clock tree and is the
//! ring's single producer; a drain created from it is the single consumer.
//!
//! ```text
//!            configure_pins / configure
//!                      │
//!  Configured ──initialize(rate)──► Running ──shutdown()──► Shutdown
//!                                     │  ▲                    │
//!                    change_sample_rate  │                     │
//!                                        └────initialize(rate)─┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! static SHARED: I2sShared = I2sShared::new();
//!
//! let mut engine = I2sEngine::new(&SHARED, pio0, clocks);
//! engine.configure_pins(18, 20, 22)?;
//! engine.configure(OutputFormat::I2s, ClockMode::LowJitter, DrainMode::Interrupt)?;
//! engine.initialize(48_000)?;
//! let drain = engine.interrupt_drain(dma_ch0, StatusLed::new(led))?;
//!
//! // Producer loop (USB callback, tone generator, ...)
//! while !engine.enqueue(&packet, 16)? {
//!     // full: back off and retry
//! }
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{self, ClockConfigurator};
use crate::config::{ClockMode, Config, DrainMode, OutputFormat, PinConfig};
use crate::constants::{DATA_LEN, RING_SLOTS};
use crate::dsp::volume::{Channel, Volume};
use crate::error::{Error, Resource, Result};
use crate::hal::{ClockTree, DmaChannel, PioBackend, PioProgram, ProgramPins};
use crate::io::pack::{datums_per_frame, pack_block};
use crate::io::ring::SampleRing;
use crate::io::unpack::{frames, BitDepth};
use crate::playback::{DmaBuffers, InterruptDrain, PlaybackHandler, SecondCoreDrain};

// ── Shared state ───────────────────────────────────────────────────────────

/// State shared by the engine, the drain and volume callers.
///
/// Everything here is usable through `&self` from any context, so one
/// `static` can serve both cores and the DMA interrupt.
pub struct I2sShared<const SLOTS: usize = RING_SLOTS, const LEN: usize = DATA_LEN> {
    ring: SampleRing<SLOTS, LEN>,
    volume: Volume,
    running: AtomicBool,
    drain_attached: AtomicBool,
}

impl<const SLOTS: usize, const LEN: usize> I2sShared<SLOTS, LEN> {
    pub const fn new() -> Self {
        I2sShared {
            ring: SampleRing::new(),
            volume: Volume::new(),
            running: AtomicBool::new(false),
            drain_attached: AtomicBool::new(false),
        }
    }

    pub fn ring(&self) -> &SampleRing<SLOTS, LEN> {
        &self.ring
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Whether the state machines are running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    /// Mark a drain as attached. Returns `false` if one already is.
    pub(crate) fn attach_drain(&self) -> bool {
        !self.drain_attached.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn detach_drain(&self) {
        self.drain_attached.store(false, Ordering::Release);
        if !self.is_running() {
            self.ring.clear();
        }
    }

    fn has_drain(&self) -> bool {
        self.drain_attached.load(Ordering::Acquire)
    }
}

impl<const SLOTS: usize, const LEN: usize> Default for I2sShared<SLOTS, LEN> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Engine ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Lifecycle {
    Configured,
    Running,
    Shutdown,
}

/// PIO program emitting `format`.
const fn data_program(format: OutputFormat) -> PioProgram {
    match format {
        OutputFormat::I2s => PioProgram::I2sData,
        OutputFormat::Pt8211 => PioProgram::Pt8211,
        OutputFormat::Exdf => PioProgram::Exdf,
        OutputFormat::I2sDual => PioProgram::I2sDataDual,
        OutputFormat::Pt8211Dual => PioProgram::Pt8211Dual,
    }
}

/// Single-owner I2S output engine.
///
/// Generic over the PIO block and clock tree it programs. The DMA channel
/// belongs to the drain, see [`interrupt_drain`](Self::interrupt_drain)
/// and [`second_core_drain`](Self::second_core_drain).
pub struct I2sEngine<'s, P, C, const SLOTS: usize = RING_SLOTS, const LEN: usize = DATA_LEN>
where
    P: PioBackend,
    C: ClockTree,
{
    shared: &'s I2sShared<SLOTS, LEN>,
    pio: P,
    clocks: C,
    config: Config,
    clock: ClockConfigurator,
    state: Lifecycle,
}

impl<'s, P, C, const SLOTS: usize, const LEN: usize> I2sEngine<'s, P, C, SLOTS, LEN>
where
    P: PioBackend,
    C: ClockTree,
{
    /// Engine with the default [`Config`].
    pub fn new(shared: &'s I2sShared<SLOTS, LEN>, pio: P, clocks: C) -> Self {
        Self::with_config(shared, pio, clocks, Config::default())
    }

    /// Engine with `config`, running the clock mode's preparation.
    pub fn with_config(shared: &'s I2sShared<SLOTS, LEN>, pio: P, mut clocks: C, config: Config) -> Self {
        let clock = ClockConfigurator::new(config.clock_mode);
        clock.prepare(&mut clocks);
        I2sEngine {
            shared,
            pio,
            clocks,
            config,
            clock,
            state: Lifecycle::Configured,
        }
    }

    // ── Configuration ──────────────────────────────────────────────────

    /// Assign GPIOs. Checked against the format at [`initialize`](Self::initialize).
    pub fn configure_pins(&mut self, data_pin: u8, clock_pin_base: u8, mclk_pin: u8) -> Result<()> {
        self.ensure_stopped()?;
        self.config.pins = PinConfig {
            data_pin,
            clock_pin_base,
            mclk_pin,
        };
        Ok(())
    }

    /// Select wire format, clock mode and drain strategy.
    ///
    /// A non-default clock mode detaches `clk_peri` from `clk_sys` right
    /// away, so call this before configuring UART, SPI or I2C.
    pub fn configure(&mut self, format: OutputFormat, clock_mode: ClockMode, drain: DrainMode) -> Result<()> {
        self.ensure_stopped()?;
        self.config.format = format;
        self.config.drain = drain;
        if clock_mode != self.clock.mode() {
            self.config.clock_mode = clock_mode;
            self.clock = ClockConfigurator::new(clock_mode);
            self.clock.prepare(&mut self.clocks);
        }
        Ok(())
    }

    /// Select the data state machine. Formats with a master clock also
    /// use the next one.
    pub fn configure_state_machine(&mut self, state_machine: u8) -> Result<()> {
        self.ensure_stopped()?;
        self.config.state_machine = state_machine;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn ensure_stopped(&self) -> Result<()> {
        if self.state == Lifecycle::Running {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Claim the state machines, set up clocks and start output at `rate`.
    ///
    /// On error nothing stays claimed and the engine is unchanged.
    pub fn initialize(&mut self, rate: u32) -> Result<()> {
        self.ensure_stopped()?;
        if self.shared.has_drain() {
            return Err(Error::DrainTaken);
        }
        clock::validate_rate(rate)?;
        self.config.validate()?;

        let cfg = self.config;
        let sm = cfg.state_machine;
        let mclk_sm = cfg.format.uses_mclk_state_machine().then(|| sm + 1);

        self.claim_state_machines(sm, mclk_sm)?;
        if let Err(e) = self.install_programs(sm, mclk_sm) {
            self.release_state_machines(sm, mclk_sm);
            return Err(e);
        }
        if let Err(e) = self.clock.start(&mut self.clocks, rate) {
            self.release_state_machines(sm, mclk_sm);
            return Err(e);
        }

        self.shared.ring.clear();
        if let Some(mclk_sm) = mclk_sm {
            self.pio.set_clock_divider(mclk_sm, self.clock.mclk_divider());
            self.pio.set_enabled(mclk_sm, true);
        }
        self.pio.set_clock_divider(sm, self.clock.data_divider());
        self.pio.set_enabled(sm, true);

        self.shared.set_running(true);
        self.state = Lifecycle::Running;
        info!(
            "i2s running: {} Hz, sm {}, sys {} Hz",
            rate,
            sm,
            self.clocks.system_clock_hz()
        );
        Ok(())
    }

    fn claim_state_machines(&mut self, sm: u8, mclk_sm: Option<u8>) -> Result<()> {
        if !self.pio.claim_state_machine(sm) {
            warn!("state machine {} busy", sm);
            return Err(Error::ResourceBusy(Resource::DataStateMachine(sm)));
        }
        if let Some(mclk_sm) = mclk_sm {
            if !self.pio.claim_state_machine(mclk_sm) {
                warn!("state machine {} busy", mclk_sm);
                self.pio.release_state_machine(sm);
                return Err(Error::ResourceBusy(Resource::MclkStateMachine(mclk_sm)));
            }
        }
        Ok(())
    }

    fn install_programs(&mut self, sm: u8, mclk_sm: Option<u8>) -> Result<()> {
        let pins = self.config.pins;
        let format = self.config.format;
        let data_pins = ProgramPins {
            out_base: pins.data_pin,
            out_count: format.data_pins(),
            sideset_base: pins.clock_pin_base,
            sideset_count: format.clock_pins(),
        };
        if !self.pio.install(sm, data_program(format), data_pins) {
            return Err(Error::ResourceBusy(Resource::InstructionMemory));
        }
        if let Some(mclk_sm) = mclk_sm {
            let mclk_pins = ProgramPins {
                out_base: pins.mclk_pin,
                out_count: 1,
                sideset_base: pins.mclk_pin,
                sideset_count: 0,
            };
            if !self.pio.install(mclk_sm, PioProgram::MasterClock, mclk_pins) {
                return Err(Error::ResourceBusy(Resource::InstructionMemory));
            }
        }
        Ok(())
    }

    fn release_state_machines(&mut self, sm: u8, mclk_sm: Option<u8>) {
        self.pio.release_state_machine(sm);
        if let Some(mclk_sm) = mclk_sm {
            self.pio.release_state_machine(mclk_sm);
        }
    }

    /// Switch to a new sample rate while playing.
    ///
    /// Queued blocks keep draining at the new rate; the ring is not
    /// flushed. On error the old rate stays in effect.
    pub fn change_sample_rate(&mut self, rate: u32) -> Result<()> {
        if self.state != Lifecycle::Running {
            return Err(Error::NotInitialized);
        }
        let change = self.clock.change_rate(&mut self.clocks, rate)?;

        let sm = self.config.state_machine;
        self.pio.set_clock_divider(sm, change.data);
        if let Some(mclk) = change.mclk {
            if self.config.format.uses_mclk_state_machine() {
                self.pio.set_clock_divider(sm + 1, mclk);
            }
        }
        debug!(
            "rate -> {} Hz (48k family: {}, retarget: {})",
            rate,
            self.clock.is_48k_family(),
            change.system_retargeted
        );
        Ok(())
    }

    /// Stop output and release the state machines. Idempotent.
    ///
    /// The state machines stop before anything else so no transfer lands
    /// in a reused block. Queued blocks are dropped once no drain is
    /// attached (immediately, or when the drain is dropped).
    pub fn shutdown(&mut self) {
        if self.state != Lifecycle::Running {
            return;
        }
        self.shared.set_running(false);

        let sm = self.config.state_machine;
        let mclk_sm = self.config.format.uses_mclk_state_machine().then(|| sm + 1);
        self.pio.set_enabled(sm, false);
        if let Some(mclk_sm) = mclk_sm {
            self.pio.set_enabled(mclk_sm, false);
        }
        self.release_state_machines(sm, mclk_sm);

        if !self.shared.has_drain() {
            self.shared.ring.clear();
        }
        self.state = Lifecycle::Shutdown;
        info!("i2s stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state == Lifecycle::Running
    }

    /// Current sample rate, `0` before the first [`initialize`](Self::initialize).
    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    pub fn is_48khz_family(&self) -> bool {
        self.clock.is_48k_family()
    }

    // ── Producer side ──────────────────────────────────────────────────

    /// Queue interleaved little-endian PCM at `bit_depth` (16, 24 or 32).
    ///
    /// Returns `Ok(false)` when the ring is full; back off and retry.
    /// One call fills one block: frames past
    /// [`frames_per_block`](Self::frames_per_block) are dropped and a
    /// trailing partial frame is ignored. Fails with
    /// [`Error::NotInitialized`] outside `initialize`..`shutdown`.
    pub fn enqueue(&mut self, bytes: &[u8], bit_depth: u8) -> Result<bool> {
        let depth = BitDepth::try_from(bit_depth)?;
        self.enqueue_frames(frames(bytes, depth))
    }

    /// Queue left-justified `(left, right)` frames as one block.
    ///
    /// Volume and the format's packing are applied here, so drains only
    /// move finished blocks. An empty block is accepted and dropped. The
    /// same block limit and lifecycle rule as [`enqueue`](Self::enqueue)
    /// apply.
    pub fn enqueue_frames<I>(&mut self, frames: I) -> Result<bool>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        if self.state != Lifecycle::Running {
            return Err(Error::NotInitialized);
        }
        let mut frames = frames.into_iter().peekable();
        if frames.peek().is_none() {
            return Ok(true);
        }
        let packing = self.config.format.packing();
        let gains = self.shared.volume.gains();
        let queued = self
            .shared
            .ring
            .enqueue_with(|slot| pack_block(slot, packing, gains, frames));
        Ok(queued)
    }

    /// Frames one block holds in the configured format.
    pub fn frames_per_block(&self) -> usize {
        LEN / datums_per_frame(self.config.format.packing())
    }

    /// Queued blocks.
    pub fn occupancy(&self) -> usize {
        self.shared.ring.occupancy()
    }

    /// Blocks the ring can hold.
    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    // ── Volume ─────────────────────────────────────────────────────────

    /// Attenuate `channel` by `db` whole dB, clamped to `-100..=0`.
    pub fn set_volume(&self, db: i16, channel: Channel) {
        self.shared.volume.set_db(db, channel);
    }

    /// Attenuate `channel` from a USB audio class volume (signed 8.8 dB).
    pub fn set_volume_usb(&self, raw: i16, channel: Channel) {
        self.shared.volume.set_usb(raw, channel);
    }

    // ── Drains ─────────────────────────────────────────────────────────

    /// Attach the interrupt drain on `dma` and start the first transfer.
    ///
    /// Call [`InterruptDrain::on_dma_complete`] from the channel's IRQ.
    /// `handler` is usually a [`StatusLed`](crate::playback::StatusLed) on
    /// the board LED, or [`NoopHandler`](crate::playback::NoopHandler).
    pub fn interrupt_drain<D, H>(&mut self, dma: D, handler: H) -> Result<InterruptDrain<'s, D, H, SLOTS, LEN>>
    where
        D: DmaChannel,
        H: PlaybackHandler,
    {
        let dma = self.attach_dma(DrainMode::Interrupt, dma)?;
        Ok(InterruptDrain::new(self.shared, dma, handler))
    }

    /// Attach the second-core drain on `dma`. `handler` is chosen as for
    /// [`interrupt_drain`](Self::interrupt_drain).
    ///
    /// Move the result to core 1 and call
    /// [`SecondCoreDrain::run`] there.
    pub fn second_core_drain<D, H>(
        &mut self,
        dma: D,
        handler: H,
        buffers: &'s mut DmaBuffers<LEN>,
    ) -> Result<SecondCoreDrain<'s, D, H, SLOTS, LEN>>
    where
        D: DmaChannel,
        H: PlaybackHandler,
    {
        let dma = self.attach_dma(DrainMode::SecondCore, dma)?;
        Ok(SecondCoreDrain::new(self.shared, dma, handler, buffers))
    }

    fn attach_dma<D: DmaChannel>(&mut self, mode: DrainMode, mut dma: D) -> Result<D> {
        if self.state != Lifecycle::Running {
            return Err(Error::NotInitialized);
        }
        if self.config.drain != mode {
            return Err(Error::StrategyMismatch);
        }
        if !self.shared.attach_drain() {
            return Err(Error::DrainTaken);
        }
        if !dma.claim() {
            self.shared.drain_attached.store(false, Ordering::Release);
            warn!("dma channel {} busy", dma.number());
            return Err(Error::ResourceBusy(Resource::DmaChannel(dma.number())));
        }

        let sm = self.config.state_machine;
        dma.configure(self.pio.tx_fifo(sm), self.pio.tx_dreq(sm));
        dma.set_irq_enabled(mode == DrainMode::Interrupt);
        debug!("dma channel {} attached", dma.number());
        Ok(dma)
    }
}

impl<P, C, const SLOTS: usize, const LEN: usize> Drop for I2sEngine<'_, P, C, SLOTS, LEN>
where
    P: PioBackend,
    C: ClockTree,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
