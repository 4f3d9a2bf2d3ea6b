//! Monotonic microsecond clock abstraction.
//!
//! The pacer and link adapter only ever need "how many microseconds since
//! some fixed origin", never wall-clock time, so the engine is generic
//! over a small [`Clock`] trait instead of depending on a specific timer
//! backend. [`crate::std_clock::StdClock`] and
//! [`crate::embassy_clock::EmbassyClock`] are the two backends this crate
//! ships, selected by Cargo feature rather than hardcoded, so an
//! application picks whichever backend matches its target.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin. Must be monotonic
    /// and must not wrap within the lifetime of a connection (a `u64` of
    /// microseconds covers >580,000 years, so this is a non-issue).
    fn now_us(&self) -> u64;
}
