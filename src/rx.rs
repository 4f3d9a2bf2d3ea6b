//! The host-stack write callback sink: appends inbound bytes into the rx
//! ring and reports drops.

use crate::events::EventSink;
use crate::ring::RingBuffer;

/// Receives inbound GATT writes and funnels them into an rx ring.
///
/// `N` is the rx ring's capacity, kept as a separate const generic from
/// the tx side so the two directions can be sized independently (the
/// default crate-level choice is 4096 bytes each).
pub struct RxPath<const N: usize> {
    ring: RingBuffer<N>,
    rx_drops: u64,
}

impl<const N: usize> RxPath<N> {
    pub const fn new() -> Self {
        RxPath {
            ring: RingBuffer::new(),
            rx_drops: 0,
        }
    }

    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    pub fn drops(&self) -> u64 {
        self.rx_drops
    }

    /// Copies up to `dst.len()` bytes out of the rx ring for the consumer.
    pub fn read(&self, dst: &mut [u8]) -> usize {
        self.ring.pop(dst)
    }

    /// Called from the host stack's write-callback context. Appends
    /// `payload` to the rx ring; on overflow increments `rx_drops` by the
    /// full payload length rather than discarding the overflow bytes
    /// silently, and still invokes `on_data_received` so a consumer that
    /// buffers externally doesn't lose the bytes entirely.
    pub fn on_write(&mut self, payload: &[u8], events: &mut EventSink) {
        let written = self.ring.push(payload, false);
        if written < payload.len() {
            self.rx_drops += (payload.len() - written) as u64;
        }
        // Synchronous: consumers are contractually obliged to return
        // quickly from this callback.
        if let Some(cb) = &events.on_data_received {
            cb.call(payload);
        }
    }

    pub fn clear(&self) {
        let mut scratch = [0u8; 64];
        while self.ring.len() > 0 {
            self.ring.pop(&mut scratch);
        }
    }
}

impl<const N: usize> Default for RxPath<N> {
    fn default() -> Self {
        Self::new()
    }
}
