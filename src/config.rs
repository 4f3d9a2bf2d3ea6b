//! The configuration knobs passed to `begin()`.

use crate::gatt::heapless_name::Name;
use crate::link_params::Mode;

/// How the transmit pump is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpMode {
    /// The producer's main loop calls [`crate::engine::TxEngine::update`]
    /// at its own cadence; the pump never blocks.
    Polling,
    /// A dedicated background task blocks on a condition variable with a
    /// timeout equal to the pacer's current sleep target, woken early by
    /// a ring push, a notify completion, or a disconnect. Requires the
    /// `std` feature.
    Task,
}

impl Default for PumpMode {
    fn default() -> Self {
        PumpMode::Polling
    }
}

/// Configuration passed to `begin()`.
#[derive(Debug, Clone)]
pub struct BeginConfig {
    /// Connection-parameter profile and PHY preference. Defaults to
    /// [`Mode::Balanced`].
    pub mode: Mode,
    /// Advertised device name, capped at
    /// [`crate::gatt::heapless_name::MAX_NAME_LEN`] bytes.
    pub device_name: Name,
    /// Enables pairing/encryption. Adds
    /// [`crate::gatt::ENCRYPT_OVERHEAD`] bytes of link-layer overhead to
    /// every chunk-size computation. Defaults to `false`.
    pub secure: bool,
    /// Diagnostic verbosity, `0` (silent) to `5` (trace). See
    /// [`crate::log::level_filter`]. Defaults to `2` (warnings only).
    pub log_level: u8,
    /// Transmit pump scheduling. Defaults to [`PumpMode::Polling`], which
    /// works with or without the `std` feature.
    pub pump_mode: PumpMode,
    /// Initial TX power level advertised in the scan response, in dBm.
    /// Defaults to `0`.
    pub tx_power_dbm: i8,
}

impl BeginConfig {
    /// A `BeginConfig` with every field at its documented default except
    /// `device_name`, which has no sensible default and must be supplied.
    pub fn new(device_name: Name) -> Self {
        BeginConfig {
            mode: Mode::default(),
            device_name,
            secure: false,
            log_level: 2,
            pump_mode: PumpMode::default(),
            tx_power_dbm: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fills_documented_defaults() {
        let name = Name::new("dev").unwrap();
        let cfg = BeginConfig::new(name);
        assert_eq!(cfg.mode, Mode::Balanced);
        assert!(!cfg.secure);
        assert_eq!(cfg.log_level, 2);
        assert_eq!(cfg.pump_mode, PumpMode::Polling);
        assert_eq!(cfg.tx_power_dbm, 0);
    }
}
