//! Bounded single-producer single-consumer ring of sample blocks.
//!
//! The producer (application or USB stack) packs blocks into slots; the
//! consumer (DMA interrupt or second core) lends them to the DMA.
//!
//! # Safety Contract
//!
//! - Only ONE context may call [`enqueue()`](SampleRing::enqueue) /
//!   [`enqueue_with()`](SampleRing::enqueue_with) (the "producer").
//! - Only ONE context may call [`dequeue_with()`](SampleRing::dequeue_with)
//!   (the "consumer").
//! - [`clear()`](SampleRing::clear) may only be called while no consumer
//!   is active.
//!
//! ## Synchronization
//!
//! Cursors and the occupancy counter are committed together inside a
//! `critical_section`, which on the RP2040 is a hardware spinlock plus
//! interrupt masking, so it is sound across both cores. The critical
//! sections only touch three words; block copies happen outside them.
//! [`occupancy_relaxed()`](SampleRing::occupancy_relaxed) is the lock-free
//! fast path and may lag by one operation.
//!
//! ## Spare slot
//!
//! Usable capacity is `SLOTS - 1`. The block most recently lent by
//! [`dequeue_with()`](SampleRing::dequeue_with) is therefore never
//! overwritten before the consumer's next dequeue, so a DMA transfer
//! started from it stays valid until the next transfer-complete event.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

struct Slot<const LEN: usize> {
    data: [i32; LEN],
    len: usize,
}

/// A bounded SPSC ring of `SLOTS` blocks of up to `LEN` datums.
///
/// # Type Parameters
///
/// - `SLOTS`: physical slot count. Usable capacity is `SLOTS - 1`. Must be ≥ 2.
/// - `LEN`: maximum datums per block.
pub struct SampleRing<const SLOTS: usize, const LEN: usize> {
    slots: [UnsafeCell<Slot<LEN>>; SLOTS],
    /// Write position (only modified by the producer).
    head: AtomicUsize,
    /// Read position (only modified by the consumer).
    tail: AtomicUsize,
    /// Committed blocks, updated together with `head`/`tail`.
    occupancy: AtomicUsize,
}

// SAFETY: slots only hold `i32`s. The SPSC contract means a slot is
// written by the producer only while it is outside `tail..head` and read
// by the consumer only while inside it; the locked commit publishes the
// slot contents before the cursor moves.
unsafe impl<const SLOTS: usize, const LEN: usize> Sync for SampleRing<SLOTS, LEN> {}

impl<const SLOTS: usize, const LEN: usize> SampleRing<SLOTS, LEN> {
    /// Blocks the ring can hold at once.
    pub const CAPACITY: usize = SLOTS - 1;

    /// Create an empty ring.
    ///
    /// # Panics
    ///
    /// Compile-time assertion: `SLOTS` must be at least 2.
    pub const fn new() -> Self {
        assert!(SLOTS >= 2, "sample ring needs at least 2 slots (1 usable)");

        SampleRing {
            slots: [const {
                UnsafeCell::new(Slot {
                    data: [0; LEN],
                    len: 0,
                })
            }; SLOTS],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            occupancy: AtomicUsize::new(0),
        }
    }

    /// Blocks the ring can hold at once.
    pub const fn capacity(&self) -> usize {
        Self::CAPACITY
    }

    /// Fill the next free slot in place (producer side).
    ///
    /// `fill` receives the whole slot and returns the number of datums it
    /// wrote (clamped to `LEN`). Returns `false` without calling `fill`
    /// when the ring is full.
    pub fn enqueue_with<F>(&self, fill: F) -> bool
    where
        F: FnOnce(&mut [i32; LEN]) -> usize,
    {
        if self.occupancy_relaxed() >= Self::CAPACITY || self.occupancy() >= Self::CAPACITY {
            return false;
        }

        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: we are the sole producer and the locked occupancy read
        // is below CAPACITY, so
        // `head` is neither a committed slot nor the spare slot the
        // consumer last lent out.
        let slot = unsafe { &mut *self.slots[head].get() };
        slot.len = fill(&mut slot.data).min(LEN);

        critical_section::with(|_| {
            self.head.store((head + 1) % SLOTS, Ordering::Release);
            let occupancy = self.occupancy.load(Ordering::Relaxed);
            self.occupancy.store(occupancy + 1, Ordering::Release);
        });
        true
    }

    /// Copy `block` into the next free slot (producer side).
    ///
    /// Datums beyond `LEN` are dropped. Returns `false` when full.
    pub fn enqueue(&self, block: &[i32]) -> bool {
        self.enqueue_with(|slot| {
            let n = block.len().min(LEN);
            slot[..n].copy_from_slice(&block[..n]);
            n
        })
    }

    /// Lend the oldest block to `read` and retire it (consumer side).
    ///
    /// Returns `None` without calling `read` when the ring is empty.
    pub fn dequeue_with<R, F>(&self, read: F) -> Option<R>
    where
        F: FnOnce(&[i32]) -> R,
    {
        if self.occupancy_relaxed() == 0 || self.occupancy() == 0 {
            return None;
        }

        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: we are the sole consumer and the locked occupancy read
        // is ordered after the producer's commit, so `tail` holds a
        // finished block the producer will not touch until the cursor has
        // moved past it twice.
        let slot = unsafe { &*self.slots[tail].get() };
        let out = read(&slot.data[..slot.len]);

        critical_section::with(|_| {
            self.tail.store((tail + 1) % SLOTS, Ordering::Release);
            let occupancy = self.occupancy.load(Ordering::Relaxed);
            self.occupancy.store(occupancy - 1, Ordering::Release);
        });
        Some(out)
    }

    /// Committed blocks, read under the lock.
    pub fn occupancy(&self) -> usize {
        critical_section::with(|_| self.occupancy.load(Ordering::Acquire))
    }

    /// Committed blocks without taking the lock; may lag by one operation.
    #[inline(always)]
    pub fn occupancy_relaxed(&self) -> usize {
        self.occupancy.load(Ordering::Relaxed)
    }

    /// Check if the ring is empty.
    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    /// Check if the ring is full.
    pub fn is_full(&self) -> bool {
        self.occupancy() >= Self::CAPACITY
    }

    /// Drop every queued block.
    pub fn clear(&self) {
        critical_section::with(|_| {
            self.head.store(0, Ordering::Relaxed);
            self.tail.store(0, Ordering::Relaxed);
            self.occupancy.store(0, Ordering::Release);
        });
    }
}

impl<const SLOTS: usize, const LEN: usize> Default for SampleRing<SLOTS, LEN> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pop<const S: usize, const L: usize>(ring: &SampleRing<S, L>) -> Option<[i32; L]> {
        ring.dequeue_with(|block| {
            let mut out = [0; L];
            out[..block.len()].copy_from_slice(block);
            out
        })
    }

    #[test]
    fn enqueue_and_dequeue() {
        let ring: SampleRing<4, 2> = SampleRing::new(); // capacity 3
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 3);

        assert!(ring.enqueue(&[1, 2]));
        assert!(ring.enqueue(&[3, 4]));
        assert!(ring.enqueue(&[5, 6]));
        assert_eq!(ring.occupancy(), 3);
        assert!(ring.is_full());

        // Full: enqueue fails and does not run the closure.
        assert!(!ring.enqueue_with(|_| panic!("filled a full ring")));
        assert_eq!(ring.occupancy(), 3);

        assert_eq!(pop(&ring), Some([1, 2]));
        assert_eq!(pop(&ring), Some([3, 4]));
        assert_eq!(pop(&ring), Some([5, 6]));
        assert_eq!(pop(&ring), None);
        assert!(ring.is_empty());
    }

    #[test]
    fn empty_dequeue_does_not_call_reader() {
        let ring: SampleRing<3, 1> = SampleRing::new();
        assert_eq!(ring.dequeue_with(|_| panic!("read an empty ring")), None::<()>);
    }

    #[test]
    fn block_lengths_are_kept() {
        let ring: SampleRing<3, 4> = SampleRing::new();
        assert!(ring.enqueue(&[7]));
        assert!(ring.enqueue(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(ring.dequeue_with(|b| b.len()), Some(1));
        assert_eq!(ring.dequeue_with(|b| b.len()), Some(4));
    }

    #[test]
    fn wraparound() {
        let ring: SampleRing<3, 1> = SampleRing::new(); // capacity 2

        for round in 0..10 {
            let base = round * 100;
            assert!(ring.enqueue(&[base + 1]));
            assert!(ring.enqueue(&[base + 2]));
            assert!(ring.is_full());

            assert_eq!(pop(&ring), Some([base + 1]));
            assert_eq!(pop(&ring), Some([base + 2]));
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn lent_block_survives_until_next_dequeue() {
        let ring: SampleRing<3, 1> = SampleRing::new(); // capacity 2
        assert!(ring.enqueue(&[10]));
        let lent = ring.dequeue_with(|b| b.as_ptr()).unwrap();

        // Refill to capacity; none of these may land on the lent slot.
        assert!(ring.enqueue(&[20]));
        assert!(ring.enqueue(&[30]));
        assert!(!ring.enqueue(&[40]));
        // SAFETY: the ring outlives this read and the slot is the spare one.
        assert_eq!(unsafe { *lent }, 10);
    }

    #[test]
    fn concurrent_producer_and_consumer_keep_order() {
        extern crate std;
        use std::thread;

        const BLOCKS: i32 = 20_000;
        let ring: SampleRing<4, 8> = SampleRing::new();

        thread::scope(|s| {
            s.spawn(|| {
                for tag in 0..BLOCKS {
                    let len = (tag % 8) as usize + 1;
                    let block = [tag; 8];
                    while !ring.enqueue(&block[..len]) {
                        thread::yield_now();
                    }
                }
            });
            s.spawn(|| {
                let mut expected = 0;
                while expected < BLOCKS {
                    let got = ring.dequeue_with(|b| {
                        let len = (expected % 8) as usize + 1;
                        assert_eq!(b.len(), len, "block {expected}");
                        assert!(b.iter().all(|&d| d == expected), "block {expected}");
                    });
                    match got {
                        Some(()) => expected += 1,
                        None => thread::yield_now(),
                    }
                    assert!(ring.occupancy_relaxed() <= ring.capacity());
                }
            });
        });
        assert!(ring.is_empty());
    }

    #[test]
    fn clear_resets() {
        let ring: SampleRing<4, 1> = SampleRing::new();
        ring.enqueue(&[1]);
        ring.enqueue(&[2]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(pop(&ring), None);
        assert!(ring.enqueue(&[3]));
        assert_eq!(pop(&ring), Some([3]));
    }
}
