/// Number of blocks the sample ring can hold.
pub const BUF_DEPTH: usize = 8;

/// Physical slot count of the engine's ring (one spare slot guards the
/// block the DMA is still reading).
pub const RING_SLOTS: usize = BUF_DEPTH + 1;

/// Occupancy at which a silent drain starts playing again.
pub const START_LEVEL: usize = BUF_DEPTH / 4;

/// Occupancy producers should aim to keep the ring at.
pub const TARGET_LEVEL: usize = BUF_DEPTH / 2;

/// Largest block in 32-bit datums: one USB frame at 384 kHz (+1 frame of
/// slack), stereo, doubled for the dual-mono formats.
pub const DATA_LEN: usize = (384 + 1) * 2 * 2;

/// Length of the all-zero block played while muted.
pub const MUTE_BLOCK_LEN: usize = 96 * 2;

/// Lowest accepted sample rate in Hz.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest accepted sample rate in Hz.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// PIO cycles the data programs spend on one stereo frame.
pub const PIO_CYCLES_PER_FRAME: u32 = 128;
