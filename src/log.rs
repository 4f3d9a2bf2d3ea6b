//! Tiny internal tracing facade over the `log` crate, keyed by the
//! `log_level: 0..=5` knob from [`crate::config::BeginConfig`].
//!
//! The engine itself always calls `log::trace!`/`debug!`/`info!`/`warn!`
//! directly (re-exported below so callers don't need their own `use
//! log::*`); this module only turns the numeric knob into the
//! `log::LevelFilter` that decides which of those calls actually produce
//! output. Without a registered `log` implementation all of this compiles
//! to a no-op, which is correct for a bare target that never installs one.

pub(crate) use log::{debug, error, info, trace, warn};

/// Translates a `0..=5` verbosity knob into a `log::LevelFilter`.
///
/// | level | meaning |
/// |---|---|
/// | 0 | Off |
/// | 1 | Error |
/// | 2 | Warn |
/// | 3 | Info |
/// | 4 | Debug |
/// | 5+ | Trace |
pub fn level_filter(log_level: u8) -> log::LevelFilter {
    match log_level {
        0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Applies `log_level` as the process-wide max level filter.
///
/// This affects every `log` consumer in the process, not just this crate
/// — call it only from `begin()`, and only if the embedding application
/// hasn't already set its own filter (callers who want finer control
/// should skip this and configure their logger directly instead).
pub fn apply_max_level(log_level: u8) {
    log::set_max_level(level_filter(log_level));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_is_off() {
        assert_eq!(level_filter(0), log::LevelFilter::Off);
    }

    #[test]
    fn level_above_five_saturates_to_trace() {
        assert_eq!(level_filter(9), log::LevelFilter::Trace);
    }

    #[test]
    fn levels_are_monotonically_more_verbose() {
        let mut prev = level_filter(0);
        for level in 1..=5u8 {
            let cur = level_filter(level);
            assert!(cur >= prev);
            prev = cur;
        }
    }
}
