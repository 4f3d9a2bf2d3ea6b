//! The capability interface the concrete BLE host stack (GAP/GATT,
//! advertising, pairing) is reached through.
//!
//! Modeled as a trait rather than a global "active instance" pointer: a
//! generic parameter on [`crate::engine::TxEngine`] holds the host stack
//! directly and forwards events to it, so the callback target's lifetime
//! is tied to whichever engine owns it instead of living in static mutable
//! state.
//!
//! No concrete implementation ships in this crate — GAP/GATT plumbing is
//! out of scope here, same as the codecs and line parser layered on top
//! of this transport. Test code provides a `MockHostStack`.

use crate::gatt::AdvConfig;
use crate::link_params::{CodedScheme, Phy};
use crate::profile::ConnParams;

/// Why a notification dispatch didn't immediately succeed or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Accepted into the controller's notification queue. Completion
    /// (ack or timeout) arrives later as an event, not as a return value.
    Queued,
    /// The controller's queue is full right now; treat as a soft/transient
    /// failure per the pump algorithm (bytes stay staged, pacer sees a
    /// `Timeout`-equivalent signal on the next tick).
    QueueFull,
}

/// Why the link went down, as reported by the host stack. Delivered to
/// applications through the `on_disconnect` event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    RemoteUserTerminated,
    LocalHostTerminated,
    ConnectionTimeout,
    SupervisionTimeout,
    Other(u8),
}

/// The set of operations [`crate::engine::TxEngine`] needs from the
/// concrete GAP/GATT host stack. Every method may block briefly on the
/// controller's own command queue, but must not block on notification
/// completion — that always arrives later through the event surface.
pub trait HostStack {
    type Error: core::fmt::Debug;

    /// Queue `chunk` as the payload of the next TX-characteristic
    /// notification. Must never be called while holding a ring buffer
    /// critical section.
    fn notify(&mut self, chunk: &[u8]) -> Result<NotifyOutcome, Self::Error>;

    /// Request a new ATT MTU. `mtu` is already validated to be in
    /// `23..=517` by the caller.
    fn request_mtu(&mut self, mtu: u16) -> Result<(), Self::Error>;

    /// Request a PHY change. `scheme` is `Some` only when `phy` is
    /// [`Phy::Coded`]. Advisory: the engine waits for the host stack's
    /// PHY-updated event before trusting the change happened.
    fn request_phy(&mut self, phy: Phy, scheme: Option<CodedScheme>) -> Result<(), Self::Error>;

    /// Request new connection parameters (interval/latency/timeout).
    /// Advisory in the same sense as `request_phy`.
    fn request_conn_params(&mut self, params: ConnParams) -> Result<(), Self::Error>;

    fn start_advertising(&mut self, adv: &AdvConfig) -> Result<(), Self::Error>;

    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    /// Request a higher TX power level, in response to
    /// [`crate::link_adapter::LinkAction::RequestHigherTxPower`].
    /// Advisory, like `request_phy`.
    fn request_tx_power(&mut self, level_dbm: i8) -> Result<(), Self::Error>;

    /// Most recent RSSI sample in dBm, for [`crate::link_adapter::LinkAdapter`].
    fn read_rssi(&mut self) -> Result<i8, Self::Error>;
}
