//! Connection-parameter targets and PHY preferences for each of the four
//! operating modes, as data the [`crate::engine::TxEngine`] can hand
//! straight to [`crate::host::HostStack::request_conn_params`].

use crate::link_params::{CodedScheme, Mode, Phy};

/// Connection interval bounds (1.25ms units), slave latency (events), and
/// supervision timeout (10ms units), as GAP expects them on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    pub min_interval_1_25ms: u16,
    pub max_interval_1_25ms: u16,
    pub slave_latency: u16,
    pub supervision_timeout_10ms: u16,
}

/// The full profile for one [`Mode`]: its connection-parameter target and
/// its preferred/fallback PHY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub mode: Mode,
    pub conn_params: ConnParams,
    pub preferred_phy: Phy,
    pub fallback_phy: Phy,
}

/// Returns the fixed profile for `mode`. There is nothing to register or
/// mutate at runtime — the "registry" is this lookup, kept as a function
/// rather than a `HashMap` because the domain is a closed four-way enum.
pub fn profile_for(mode: Mode) -> Profile {
    match mode {
        Mode::Fast => Profile {
            mode,
            conn_params: ConnParams {
                min_interval_1_25ms: 6,  // 7.5ms
                max_interval_1_25ms: 8,  // 10ms
                slave_latency: 0,
                supervision_timeout_10ms: 400, // 4s
            },
            preferred_phy: Phy::TwoM,
            fallback_phy: Phy::OneM,
        },
        Mode::Balanced => Profile {
            mode,
            conn_params: ConnParams {
                min_interval_1_25ms: 12, // 15ms
                max_interval_1_25ms: 24, // 30ms
                slave_latency: 2,
                supervision_timeout_10ms: 500, // 5s
            },
            preferred_phy: Phy::OneM,
            fallback_phy: Phy::OneM,
        },
        Mode::LowPower => Profile {
            mode,
            conn_params: ConnParams {
                min_interval_1_25ms: 48,  // 60ms
                max_interval_1_25ms: 96,  // 120ms
                slave_latency: 8,
                supervision_timeout_10ms: 600, // 6s
            },
            preferred_phy: Phy::OneM,
            fallback_phy: Phy::OneM,
        },
        Mode::LongRange => Profile {
            mode,
            conn_params: ConnParams {
                min_interval_1_25ms: 24, // 30ms
                max_interval_1_25ms: 48, // 60ms
                slave_latency: 2,
                supervision_timeout_10ms: 600, // 6s
            },
            preferred_phy: Phy::Coded(CodedScheme::S2),
            fallback_phy: Phy::OneM,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_prefers_2m_with_1m_fallback() {
        let p = profile_for(Mode::Fast);
        assert_eq!(p.preferred_phy, Phy::TwoM);
        assert_eq!(p.fallback_phy, Phy::OneM);
        assert_eq!(p.conn_params.slave_latency, 0);
    }

    #[test]
    fn low_power_has_longest_interval_and_latency() {
        let lp = profile_for(Mode::LowPower);
        for other in [Mode::Fast, Mode::Balanced, Mode::LongRange] {
            let p = profile_for(other);
            assert!(lp.conn_params.min_interval_1_25ms >= p.conn_params.min_interval_1_25ms);
        }
    }

    #[test]
    fn long_range_prefers_coded_s2() {
        let p = profile_for(Mode::LongRange);
        assert_eq!(p.preferred_phy, Phy::Coded(CodedScheme::S2));
    }
}
