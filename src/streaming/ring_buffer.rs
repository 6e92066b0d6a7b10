//! Bounded single-producer single-consumer sample ring
//!
//! Storage sits behind a `parking_lot::Mutex`; the read and write counters are
//! atomics so the fill level can be polled without taking the lock. Counters
//! only ever increase, and `write - read` is the number of queued samples.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::{Result, SynthError};

/// Largest ring accepted, 512 MiB of `f32`.
const MAX_CAPACITY: usize = 512 * 1024 * 1024 / std::mem::size_of::<f32>();

/// Fixed-size ring of `f32` samples.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Mutex<Vec<f32>>,
    written: AtomicUsize,
    read: AtomicUsize,
    mask: usize,
}

impl RingBuffer {
    /// Ring holding at least `capacity` samples, rounded up to a power of two.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SynthError::ConfigError(
                "ring buffer capacity must be greater than 0".into(),
            ));
        }
        let capacity = capacity.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(SynthError::ConfigError(format!(
                "ring buffer capacity {capacity} exceeds maximum {MAX_CAPACITY}"
            )));
        }
        Ok(RingBuffer {
            storage: Mutex::new(vec![0.0; capacity]),
            written: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            mask: capacity - 1,
        })
    }

    /// Slots in the ring.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Samples queued for the consumer.
    pub fn available_read(&self) -> usize {
        let read = self.read.load(Ordering::Acquire);
        self.written.load(Ordering::Acquire).wrapping_sub(read)
    }

    /// Free slots for the producer.
    pub fn available_write(&self) -> usize {
        self.capacity() - self.available_read()
    }

    /// Queue as many of `samples` as fit, returning how many did.
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut storage = self.storage.lock();
        let written = self.written.load(Ordering::Acquire);
        let n = samples.len().min(self.available_write());
        if n == 0 {
            return 0;
        }
        let start = written & self.mask;
        let first = n.min(self.capacity() - start);
        storage[start..start + first].copy_from_slice(&samples[..first]);
        storage[..n - first].copy_from_slice(&samples[first..n]);
        drop(storage);
        self.written
            .store(written.wrapping_add(n), Ordering::Release);
        n
    }

    /// Dequeue into `dest`, returning how many samples were copied.
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let storage = self.storage.lock();
        let read = self.read.load(Ordering::Acquire);
        let n = dest.len().min(self.available_read());
        if n == 0 {
            return 0;
        }
        let start = read & self.mask;
        let first = n.min(self.capacity() - start);
        dest[..first].copy_from_slice(&storage[start..start + first]);
        dest[first..n].copy_from_slice(&storage[..n - first]);
        drop(storage);
        self.read.store(read.wrapping_add(n), Ordering::Release);
        n
    }

    /// Drop everything queued.
    pub fn clear(&self) {
        let _storage = self.storage.lock();
        let written = self.written.load(Ordering::Acquire);
        self.read.store(written, Ordering::Release);
    }

    /// Nothing queued.
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    /// Fraction of the ring in use, 0.0 to 1.0.
    pub fn fill_percentage(&self) -> f32 {
        self.available_read() as f32 / self.capacity() as f32
    }
}
