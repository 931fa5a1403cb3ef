//! In-memory hardware for host tests.

extern crate std;

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};
use std::vec::Vec;

use crate::hal::{
    ClockDivider, ClockTree, CoreVoltage, DmaChannel, PioBackend, PioProgram, ProgramPins,
    SystemClockSource,
};

// ── Clocks ─────────────────────────────────────────────────────────────────

pub struct MockClocks {
    hz: u32,
    pub voltage: Option<CoreVoltage>,
    pub peri_detached: bool,
    pub switches: Vec<SystemClockSource>,
}

impl MockClocks {
    pub fn new(hz: u32) -> Self {
        MockClocks {
            hz,
            voltage: None,
            peri_detached: false,
            switches: Vec::new(),
        }
    }
}

impl ClockTree for MockClocks {
    fn system_clock_hz(&self) -> u32 {
        self.hz
    }

    fn set_core_voltage(&mut self, voltage: CoreVoltage) {
        self.voltage = Some(voltage);
    }

    fn detach_peripheral_clock(&mut self) {
        self.peri_detached = true;
    }

    fn switch_system_clock(&mut self, source: SystemClockSource) {
        self.hz = source.frequency_hz();
        self.switches.push(source);
    }
}

// ── PIO ────────────────────────────────────────────────────────────────────

#[derive(Default, Clone, Copy)]
struct SmState {
    claimed: bool,
    enabled: bool,
    program: Option<(PioProgram, ProgramPins)>,
    divider: Option<ClockDivider>,
}

pub struct MockPio {
    sms: [SmState; 4],
    memory_full: bool,
    fifos: [u32; 4],
}

impl MockPio {
    pub fn new() -> Self {
        MockPio {
            sms: [SmState::default(); 4],
            memory_full: false,
            fifos: [0; 4],
        }
    }

    /// Claim `sm` on behalf of someone else.
    pub fn hold(&mut self, sm: u8) {
        self.sms[sm as usize].claimed = true;
    }

    pub fn fill_instruction_memory(&mut self) {
        self.memory_full = true;
    }

    pub fn claimed(&self, sm: u8) -> bool {
        self.sms[sm as usize].claimed
    }

    pub fn enabled(&self, sm: u8) -> bool {
        self.sms[sm as usize].enabled
    }

    pub fn program(&self, sm: u8) -> Option<PioProgram> {
        self.sms[sm as usize].program.map(|(p, _)| p)
    }

    pub fn pins(&self, sm: u8) -> Option<ProgramPins> {
        self.sms[sm as usize].program.map(|(_, pins)| pins)
    }

    pub fn divider(&self, sm: u8) -> Option<ClockDivider> {
        self.sms[sm as usize].divider
    }
}

impl PioBackend for MockPio {
    fn claim_state_machine(&mut self, sm: u8) -> bool {
        let state = &mut self.sms[sm as usize];
        !core::mem::replace(&mut state.claimed, true)
    }

    fn release_state_machine(&mut self, sm: u8) {
        self.sms[sm as usize] = SmState::default();
    }

    fn install(&mut self, sm: u8, program: PioProgram, pins: ProgramPins) -> bool {
        if self.memory_full {
            return false;
        }
        self.sms[sm as usize].program = Some((program, pins));
        true
    }

    fn set_clock_divider(&mut self, sm: u8, divider: ClockDivider) {
        self.sms[sm as usize].divider = Some(divider);
    }

    fn set_enabled(&mut self, sm: u8, enabled: bool) {
        self.sms[sm as usize].enabled = enabled;
    }

    fn tx_dreq(&self, sm: u8) -> u8 {
        sm
    }

    fn tx_fifo(&self, sm: u8) -> *mut u32 {
        &self.fifos[sm as usize] as *const u32 as *mut u32
    }
}

// ── DMA ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct DmaState {
    claimed: bool,
    irq_enabled: bool,
    aborted: bool,
    dest: Option<usize>,
    dreq: u8,
    acks: usize,
    waits: usize,
    /// `(src, copy of the words at start)` per transfer.
    transfers: Vec<(usize, Vec<i32>)>,
}

/// Shared view of a [`MockDma`] that outlives it.
#[derive(Clone)]
pub struct DmaLog(Rc<RefCell<DmaState>>);

impl DmaLog {
    /// Claim the channel on behalf of someone else.
    pub fn hold(&self) {
        self.0.borrow_mut().claimed = true;
    }

    pub fn claimed(&self) -> bool {
        self.0.borrow().claimed
    }

    pub fn aborted(&self) -> bool {
        self.0.borrow().aborted
    }

    pub fn irq_enabled(&self) -> bool {
        self.0.borrow().irq_enabled
    }

    pub fn dest(&self) -> *mut u32 {
        self.0.borrow().dest.unwrap_or(0) as *mut u32
    }

    pub fn dreq(&self) -> u8 {
        self.0.borrow().dreq
    }

    pub fn transfers(&self) -> usize {
        self.0.borrow().transfers.len()
    }

    pub fn last_data(&self) -> Vec<i32> {
        self.0
            .borrow()
            .transfers
            .last()
            .map(|(_, data)| data.clone())
            .unwrap_or_default()
    }

    pub fn last_src(&self) -> usize {
        self.0.borrow().transfers.last().map_or(0, |(src, _)| *src)
    }
}

pub struct MockDma {
    number: u8,
    log: DmaLog,
}

impl MockDma {
    pub fn new(number: u8) -> Self {
        MockDma {
            number,
            log: DmaLog(Rc::new(RefCell::new(DmaState::default()))),
        }
    }

    /// A channel that has already been claimed by its drain.
    pub fn claimed(number: u8) -> Self {
        let dma = Self::new(number);
        dma.log.hold();
        dma
    }

    pub fn log(&self) -> DmaLog {
        self.log.clone()
    }

    pub fn transfers(&self) -> usize {
        self.log.transfers()
    }

    pub fn last_data(&self) -> Vec<i32> {
        self.log.last_data()
    }

    pub fn last_len(&self) -> usize {
        self.last_data().len()
    }

    pub fn last_src(&self) -> usize {
        self.log.last_src()
    }

    pub fn last_is_silent(&self) -> bool {
        let data = self.last_data();
        !data.is_empty() && data.iter().all(|&d| d == 0)
    }

    pub fn acks(&self) -> usize {
        self.log.0.borrow().acks
    }

    pub fn waits(&self) -> usize {
        self.log.0.borrow().waits
    }
}

impl DmaChannel for MockDma {
    fn number(&self) -> u8 {
        self.number
    }

    fn claim(&mut self) -> bool {
        let mut state = self.log.0.borrow_mut();
        !core::mem::replace(&mut state.claimed, true)
    }

    fn release(&mut self) {
        self.log.0.borrow_mut().claimed = false;
    }

    fn configure(&mut self, dest: *mut u32, dreq: u8) {
        let mut state = self.log.0.borrow_mut();
        state.dest = Some(dest as usize);
        state.dreq = dreq;
    }

    fn set_irq_enabled(&mut self, enabled: bool) {
        self.log.0.borrow_mut().irq_enabled = enabled;
    }

    unsafe fn start(&mut self, src: *const i32, words: usize) {
        // SAFETY: the caller guarantees `src..src + words` is valid.
        let data = unsafe { core::slice::from_raw_parts(src, words) }.to_vec();
        self.log.0.borrow_mut().transfers.push((src as usize, data));
    }

    fn is_busy(&self) -> bool {
        false
    }

    fn acknowledge_irq(&mut self) {
        self.log.0.borrow_mut().acks += 1;
    }

    fn abort(&mut self) {
        self.log.0.borrow_mut().aborted = true;
    }

    fn wait_for_finish(&mut self) {
        self.log.0.borrow_mut().waits += 1;
    }
}

// ── Playback handler ───────────────────────────────────────────────────────

/// Output pin whose level stays readable through clones.
#[derive(Clone, Default)]
pub struct MockPin(Rc<Cell<bool>>);

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.0.get()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

/// Records playback state notifications.
pub struct Recorder {
    events: RefCell<Vec<bool>>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder {
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn record(&self, playing: bool) {
        self.events.borrow_mut().push(playing);
    }

    pub fn events(&self) -> Vec<bool> {
        self.events.borrow().clone()
    }
}
