//! Fixed-capacity single-producer/single-consumer byte ring buffer.
//!
//! Capacity is a compile-time power of two so wraparound is a bitmask
//! instead of a modulo. One side (`push`) is meant to be called from the
//! producer context, the other (`pop`/`peek`/`consume`) from the consumer
//! context; both may be interrupt or callback contexts, so index updates
//! go through [`critical_section::with`] and use acquire/release ordering
//! rather than relying on any notion of `volatile`.

use core::sync::atomic::{AtomicUsize, Ordering};

/// A fixed-capacity byte ring buffer.
///
/// `N` must be a power of two; [`RingBuffer::new`] panics otherwise.
pub struct RingBuffer<const N: usize> {
    buf: core::cell::UnsafeCell<[u8; N]>,
    head: AtomicUsize,
    tail: AtomicUsize,
}

// SAFETY: `buf` is only ever accessed from within `critical_section::with`,
// which on every backend serializes with any other critical section on the
// same instance. `head`/`tail` are plain atomics.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = N - 1;

    /// Creates an empty ring buffer.
    ///
    /// # Panics
    /// Panics if `N` is zero or not a power of two.
    pub const fn new() -> Self {
        assert!(N > 0 && N & (N - 1) == 0, "RingBuffer capacity must be a power of two");
        RingBuffer {
            buf: core::cell::UnsafeCell::new([0u8; N]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes currently buffered.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Space available before the producer would need to overwrite or be
    /// rejected.
    pub fn free(&self) -> usize {
        N - self.len()
    }

    /// Copies `bytes` into the buffer.
    ///
    /// If `overwrite` is false and `bytes` doesn't fit in the free space,
    /// nothing is written and `0` is returned. If `overwrite` is true and
    /// `bytes` is longer than the free space, the oldest bytes are
    /// discarded (`tail` advances) to make room, and the full slice is
    /// written; at most `N` bytes of `bytes` are retained (a slice longer
    /// than the whole capacity only keeps its last `N` bytes).
    pub fn push(&self, bytes: &[u8], overwrite: bool) -> usize {
        if bytes.is_empty() {
            return 0;
        }
        critical_section::with(|_| {
            let free = self.free();
            let to_write = if bytes.len() > free {
                if !overwrite {
                    return 0;
                }
                bytes.len().min(N)
            } else {
                bytes.len()
            };
            let src = &bytes[bytes.len() - to_write..];

            let head = self.head.load(Ordering::Acquire);
            // SAFETY: sole writer inside this critical section.
            let buf = unsafe { &mut *self.buf.get() };
            for (i, b) in src.iter().enumerate() {
                buf[(head.wrapping_add(i)) & Self::MASK] = *b;
            }
            let new_head = head.wrapping_add(to_write);
            let overflow = to_write.saturating_sub(free);
            if overflow > 0 {
                let tail = self.tail.load(Ordering::Acquire);
                self.tail.store(tail.wrapping_add(overflow), Ordering::Release);
            }
            self.head.store(new_head, Ordering::Release);
            to_write
        })
    }

    /// Copies up to `dst.len()` bytes into `dst` without consuming them.
    /// Returns the number of bytes copied.
    pub fn peek(&self, dst: &mut [u8]) -> usize {
        critical_section::with(|_| {
            let len = self.len();
            let n = dst.len().min(len);
            let tail = self.tail.load(Ordering::Acquire);
            // SAFETY: read-only view, producer cannot shrink past `len`
            // while we hold the critical section.
            let buf = unsafe { &*self.buf.get() };
            for (i, slot) in dst.iter_mut().take(n).enumerate() {
                *slot = buf[(tail.wrapping_add(i)) & Self::MASK];
            }
            n
        })
    }

    /// Advances the read position by `n` bytes (capped at the current
    /// length). When the buffer becomes empty, both indices are reset to
    /// zero.
    pub fn consume(&self, n: usize) {
        critical_section::with(|_| {
            let len = self.len();
            let n = n.min(len);
            let tail = self.tail.load(Ordering::Acquire);
            let new_tail = tail.wrapping_add(n);
            if new_tail == self.head.load(Ordering::Acquire) {
                self.tail.store(0, Ordering::Release);
                self.head.store(0, Ordering::Release);
            } else {
                self.tail.store(new_tail, Ordering::Release);
            }
        })
    }

    /// `peek` followed by `consume` of exactly the bytes copied.
    pub fn pop(&self, dst: &mut [u8]) -> usize {
        let n = self.peek(dst);
        self.consume(n);
        n
    }

    /// Discards every buffered byte and resets both indices to zero.
    pub fn clear(&self) {
        critical_section::with(|_| {
            self.head.store(0, Ordering::Release);
            self.tail.store(0, Ordering::Release);
        })
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_round_trips_zero_bytes() {
        let rb: RingBuffer<16> = RingBuffer::new();
        let mut dst = [0u8; 4];
        assert_eq!(rb.pop(&mut dst), 0);
        assert!(rb.is_empty());
    }

    #[test]
    fn push_then_pop_preserves_order() {
        let rb: RingBuffer<16> = RingBuffer::new();
        assert_eq!(rb.push(b"hello", false), 5);
        let mut dst = [0u8; 5];
        assert_eq!(rb.pop(&mut dst), 5);
        assert_eq!(&dst, b"hello");
        assert!(rb.is_empty());
    }

    #[test]
    fn reject_on_full_without_overwrite() {
        let rb: RingBuffer<8> = RingBuffer::new();
        assert_eq!(rb.push(&[1; 8], false), 8);
        assert_eq!(rb.push(&[2; 1], false), 0);
        assert_eq!(rb.len(), 8);
    }

    #[test]
    fn overwrite_advances_tail_and_caps_at_capacity() {
        let rb: RingBuffer<4> = RingBuffer::new();
        assert_eq!(rb.push(&[1, 2, 3, 4], false), 4);
        // Push 3 more with overwrite: oldest 3 bytes (1,2,3) get dropped.
        assert_eq!(rb.push(&[5, 6, 7], true), 3);
        assert_eq!(rb.len(), 4);
        let mut dst = [0u8; 4];
        rb.pop(&mut dst);
        assert_eq!(dst, [4, 5, 6, 7]);
    }

    #[test]
    fn empty_after_drain_resets_indices_to_zero() {
        let rb: RingBuffer<8> = RingBuffer::new();
        rb.push(b"x", false);
        let mut dst = [0u8; 1];
        rb.pop(&mut dst);
        assert_eq!(rb.head.load(Ordering::Acquire), 0);
        assert_eq!(rb.tail.load(Ordering::Acquire), 0);
    }

    #[test]
    fn wraparound_preserves_fifo_order() {
        let rb: RingBuffer<4> = RingBuffer::new();
        let mut dst = [0u8; 2];
        for round in 0..10u8 {
            assert_eq!(rb.push(&[round, round.wrapping_add(1)], false), 2);
            assert_eq!(rb.pop(&mut dst), 2);
            assert_eq!(dst, [round, round.wrapping_add(1)]);
        }
    }

    proptest::proptest! {
        #[test]
        fn fifo_preserved_for_random_non_overwriting_writes(
            chunks in proptest::collection::vec(proptest::collection::vec(proptest::prelude::any::<u8>(), 0..17), 0..20)
        ) {
            let rb: RingBuffer<64> = RingBuffer::new();
            let mut expected: std::vec::Vec<u8> = std::vec::Vec::new();
            for chunk in &chunks {
                if expected.len() + chunk.len() <= 64 {
                    let written = rb.push(chunk, false);
                    proptest::prop_assert_eq!(written, chunk.len());
                    expected.extend_from_slice(chunk);
                }
            }
            let mut got = [0u8; 64];
            let n = rb.peek(&mut got[..expected.len()]);
            proptest::prop_assert_eq!(n, expected.len());
            proptest::prop_assert_eq!(&got[..n], expected.as_slice());
            rb.consume(n);
            proptest::prop_assert!(rb.is_empty());
        }

        #[test]
        fn overwrite_never_exceeds_capacity(
            chunks in proptest::collection::vec(proptest::collection::vec(proptest::prelude::any::<u8>(), 1..9), 1..40)
        ) {
            let rb: RingBuffer<32> = RingBuffer::new();
            for chunk in &chunks {
                rb.push(chunk, true);
                proptest::prop_assert!(rb.len() <= 32);
            }
        }
    }
}
