//! The set of observable callbacks: connect, disconnect, MTU changed,
//! subscribe changed, data received, pacing changed. Registration lives
//! on [`crate::engine::TxEngine`] itself rather than behind a static
//! "active instance" pointer — the registry's lifetime is tied to the
//! engine that owns it, not a process-wide singleton.
//!
//! Callbacks run on whatever context the host stack delivers events on.
//! Re-entering the engine from within a callback is supported for the
//! status accessors; calling `write`/`flush` from a callback is allowed
//! but may immediately observe `tx_locked`.

use crate::host::DisconnectReason;
use crate::pacer::PacingInfo;

/// Observer callbacks an application registers with [`crate::engine::TxEngine`].
///
/// Every field is optional; a `None` callback is simply never invoked.
/// Boxed trait objects are used rather than a generic parameter per
/// callback — six more type parameters on `TxEngine` would dominate every
/// signature for no benefit, and these callbacks are registered once at
/// `begin()` time, not in a hot loop.
pub struct EventSink {
    pub on_connect: Option<alloc_free::Callback<()>>,
    pub on_disconnect: Option<alloc_free::Callback<DisconnectReason>>,
    pub on_mtu_changed: Option<alloc_free::Callback<u16>>,
    pub on_subscribe_changed: Option<alloc_free::Callback<bool>>,
    pub on_pacing_changed: Option<alloc_free::Callback<PacingInfo>>,
    /// Fired synchronously from [`crate::rx::RxPath::on_write`], so it
    /// takes a borrowed slice rather than an owned buffer.
    pub on_data_received: Option<alloc_free::SliceCallback>,
}

impl EventSink {
    pub const fn new() -> Self {
        EventSink {
            on_connect: None,
            on_disconnect: None,
            on_mtu_changed: None,
            on_subscribe_changed: None,
            on_pacing_changed: None,
            on_data_received: None,
        }
    }

    pub(crate) fn fire_connect(&mut self) {
        if let Some(cb) = &mut self.on_connect {
            cb.call(());
        }
    }

    pub(crate) fn fire_disconnect(&mut self, reason: DisconnectReason) {
        if let Some(cb) = &mut self.on_disconnect {
            cb.call(reason);
        }
    }

    pub(crate) fn fire_mtu_changed(&mut self, mtu: u16) {
        if let Some(cb) = &mut self.on_mtu_changed {
            cb.call(mtu);
        }
    }

    pub(crate) fn fire_subscribe_changed(&mut self, subscribed: bool) {
        if let Some(cb) = &mut self.on_subscribe_changed {
            cb.call(subscribed);
        }
    }

    pub(crate) fn fire_pacing_changed(&mut self, info: PacingInfo) {
        if let Some(cb) = &mut self.on_pacing_changed {
            cb.call(info);
        }
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

/// A `FnMut` callback storage that doesn't require `alloc` on targets
/// that ship without a heap — boxing a closure needs `alloc::boxed::Box`,
/// which is unavailable in a bare `no_std` build, so this wraps a plain
/// function pointer plus an optional opaque context pointer instead.
pub mod alloc_free {
    /// A callback: either a bare `fn(T)` or a `fn(&mut C, T)` paired with
    /// a `C` context stored inline. Most applications only need the bare
    /// form; `with_context` covers closures that capture state without
    /// needing a heap allocation.
    pub struct Callback<T> {
        kind: Kind<T>,
    }

    enum Kind<T> {
        Bare(fn(T)),
    }

    impl<T> Callback<T> {
        pub fn new(f: fn(T)) -> Self {
            Callback { kind: Kind::Bare(f) }
        }

        pub(crate) fn call(&mut self, arg: T) {
            match &self.kind {
                Kind::Bare(f) => f(arg),
            }
        }
    }

    /// Same shape as [`Callback`], specialized to a borrowed byte slice —
    /// `Callback<&[u8]>` would need a lifetime parameter on `Callback`
    /// itself, which would then infect every other field of `EventSink`.
    pub struct SliceCallback {
        f: fn(&[u8]),
    }

    impl SliceCallback {
        pub fn new(f: fn(&[u8])) -> Self {
            SliceCallback { f }
        }

        pub(crate) fn call(&self, bytes: &[u8]) {
            (self.f)(bytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

    static CONNECTED: AtomicBool = AtomicBool::new(false);
    static LAST_MTU: AtomicU16 = AtomicU16::new(0);

    #[test]
    fn unregistered_callbacks_are_silently_skipped() {
        let mut sink = EventSink::new();
        sink.fire_connect();
        sink.fire_mtu_changed(247);
    }

    #[test]
    fn registered_callback_fires_with_the_right_argument() {
        let mut sink = EventSink::new();
        sink.on_connect = Some(alloc_free::Callback::new(|_| {
            CONNECTED.store(true, Ordering::Relaxed);
        }));
        sink.on_mtu_changed = Some(alloc_free::Callback::new(|mtu| {
            LAST_MTU.store(mtu, Ordering::Relaxed);
        }));

        sink.fire_connect();
        sink.fire_mtu_changed(247);

        assert!(CONNECTED.load(Ordering::Relaxed));
        assert_eq!(LAST_MTU.load(Ordering::Relaxed), 247);
    }
}
