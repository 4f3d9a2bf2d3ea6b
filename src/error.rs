//! The error taxonomy the public API can surface. Recoverable conditions
//! (a full controller queue, a disconnect, a malformed MTU request) are
//! reported through their own dedicated channels instead — `tx_drops`,
//! the `on_disconnect` event callback, and a `bool` return, respectively
//! — since none of them are exceptional enough to warrant unwinding a
//! call site with `?`. What's left here is the one failure that really is
//! exceptional: a configuration the engine cannot satisfy at construction
//! or teardown time.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TxError {
    /// `begin()` was called with a configuration the engine cannot
    /// satisfy (e.g. `PumpMode::Task` without the `std` feature, or a
    /// device name too long to advertise), or the host stack rejected
    /// starting/stopping advertising. No partial initialization is left
    /// behind.
    #[error("begin() configuration rejected: {0}")]
    ConfigMismatch(&'static str),
}
