//! The adaptive backoff + probing state machine that decides when the
//! next chunk may be sent, and continuously searches for the shortest
//! interval the link sustains without loss.
//!
//! `TxPacer` is pure state plus a tick function — it never touches the
//! ring, the host stack, or a clock directly. [`crate::engine::TxEngine`]
//! feeds it `now_us()` and [`SendOutcome`]s and reacts to the
//! [`PacingInfo`] snapshots it emits.

use crate::link_params::Mode;

/// After this many consecutive clean sends at `current_interval >=
/// lkg_interval`, the pacer starts probing a shorter interval.
pub const PROBE_AFTER_SUCCESSES: u32 = 64;
/// Absolute floor on a probe step, in microseconds.
pub const PROBE_STEP_US: u32 = 10;
/// Relative probe step, as a percentage of `current_interval`. The pacer
/// uses whichever of `PROBE_STEP_US` or this percentage is larger; at
/// small `current_interval` values that's always the absolute step.
pub const PROBE_STEP_PCT: u32 = 2;
/// Consecutive clean sends at the probed interval required to accept it
/// as the new last-known-good interval.
pub const PROBE_CONFIRM_SUCCESSES: u32 = 48;
/// Consecutive probe failures (timeout or hard failure) before the pacer
/// relaxes its last-known-good interval instead of just retrying.
pub const LKG_ESCALATE_AFTER_FAILS: u32 = 3;
/// Minimum time between two LKG-escalation steps.
pub const ESCALATE_COOLDOWN_US: u64 = 1_000_000;
/// Multiplier applied to `current_interval` on a timeout (x1.2).
pub const BACKOFF_NUMERATOR: u32 = 6;
pub const BACKOFF_DENOMINATOR: u32 = 5;
/// Multiplier applied to `lkg_interval` on an escalation (x1.03).
pub const ESCALATE_NUMERATOR: u32 = 103;
pub const ESCALATE_DENOMINATOR: u32 = 100;
/// Ceiling on `current_interval` after any number of backoffs.
pub const MAX_SEND_INTERVAL_US: u32 = 1_000_000;
/// Consecutive successes required while `BackedOff` before probing may
/// resume.
pub const COOL_SUCCESS_REQUIRED: u32 = 64;

/// The outcome of one attempted send, as observed by the pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Success,
    Timeout,
    HardFailure,
}

/// The reason attached to a [`PacingInfo`] snapshot, used to coalesce
/// multiple pacing changes within one pump tick down to the single
/// strongest one. Ranked `DisconnectReset > Backoff > Escalate >
/// ChunkShrink > MsgSizeFallback > ProbeStart > ProbeAccepted > Recompute`;
/// the `Ord` derive below matches that order because variants are listed
/// from strongest (lowest ordinal, since we want `min` to pick it — see
/// [`PacingReason::strongest`]) to weakest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PacingReason {
    DisconnectReset,
    Backoff,
    Escalate,
    ChunkShrink,
    MsgSizeFallback,
    ProbeStart,
    ProbeAccepted,
    Recompute,
}

impl PacingReason {
    /// Picks the higher-priority (lower ordinal) of two reasons seen
    /// within the same coalescing window.
    pub fn strongest(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }
}

/// Immutable snapshot emitted on every pacing change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingInfo {
    pub send_interval_us: u32,
    pub min_send_interval_us: u32,
    pub lkg_interval_us: u32,
    pub tx_chunk_size: usize,
    pub mtu: u16,
    pub ll_octets: u16,
    pub ll_time_us: u32,
    pub probing: bool,
    pub reason: PacingReason,
}

/// The pacer's own terminal-state view, derived from its fields rather
/// than stored separately (storing it twice would let them disagree).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacerPhase {
    Idle,
    Steady,
    Probing,
    BackedOff,
}

/// Mutable pacer state. `TxPacer` wraps this with the transition logic;
/// the struct itself is plain data so tests can construct and inspect it
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxPacerState {
    pub current_interval: u32,
    pub lkg_interval: u32,
    pub min_interval: u32,
    pub probe_active: bool,
    pub probe_successes: u32,
    pub probe_failures: u32,
    pub lkg_fail_streak: u32,
    pub success_streak: u32,
    pub cooldown_remaining: u32,
    pub cooldown_successes: u32,
    pub last_escalate_time_us: u64,
    pub last_tx_us: u64,
    pub connected: bool,
    pub subscribed: bool,
}

impl TxPacerState {
    pub fn new(min_interval: u32) -> Self {
        TxPacerState {
            current_interval: min_interval,
            lkg_interval: min_interval,
            min_interval,
            probe_active: false,
            probe_successes: 0,
            probe_failures: 0,
            lkg_fail_streak: 0,
            success_streak: 0,
            cooldown_remaining: 0,
            cooldown_successes: 0,
            last_escalate_time_us: 0,
            last_tx_us: 0,
            connected: false,
            subscribed: false,
        }
    }

    pub fn phase(&self) -> PacerPhase {
        if !(self.connected && self.subscribed) {
            PacerPhase::Idle
        } else if self.cooldown_remaining > 0 {
            PacerPhase::BackedOff
        } else if self.probe_active {
            PacerPhase::Probing
        } else {
            PacerPhase::Steady
        }
    }
}

/// The state machine itself. Holds a [`TxPacerState`] plus the link's
/// current `min_send_interval_us`, which [`crate::engine::TxEngine`]
/// updates via [`TxPacer::set_min_interval`] whenever link parameters
/// change.
#[derive(Debug, Clone)]
pub struct TxPacer {
    state: TxPacerState,
}

impl TxPacer {
    pub fn new(min_interval_us: u32) -> Self {
        TxPacer {
            state: TxPacerState::new(min_interval_us),
        }
    }

    pub fn state(&self) -> &TxPacerState {
        &self.state
    }

    pub fn phase(&self) -> PacerPhase {
        self.state.phase()
    }

    /// `ready_now(now) := connected && subscribed && (now - last_tx_us >=
    /// current_interval)`.
    pub fn ready_now(&self, now_us: u64) -> bool {
        self.state.connected
            && self.state.subscribed
            && now_us.saturating_sub(self.state.last_tx_us) >= self.state.current_interval as u64
    }

    /// Microseconds until the next send would become ready, `0` if
    /// already ready.
    pub fn sleep_target(&self, now_us: u64) -> u64 {
        let elapsed = now_us.saturating_sub(self.state.last_tx_us);
        (self.state.current_interval as u64).saturating_sub(elapsed)
    }

    pub fn record_tx(&mut self, now_us: u64) {
        self.state.last_tx_us = now_us;
    }

    /// Called whenever MTU/LL octets/PHY change and
    /// `min_send_interval_us` is recomputed. Clamps `current_interval`
    /// and `lkg_interval` up if the new floor rose above them; never
    /// lowers them (a lower floor doesn't mean the link is already safe
    /// at that speed — probing still has to earn it).
    pub fn set_min_interval(&mut self, min_interval_us: u32) -> PacingReason {
        self.state.min_interval = min_interval_us;
        let mut reason = PacingReason::Recompute;
        if self.state.current_interval < min_interval_us {
            self.state.current_interval = min_interval_us;
            reason = PacingReason::ChunkShrink;
        }
        if self.state.lkg_interval < min_interval_us {
            self.state.lkg_interval = min_interval_us;
            reason = PacingReason::ChunkShrink;
        }
        reason
    }

    pub fn on_connect(&mut self) {
        self.state.connected = true;
    }

    pub fn on_subscribe(&mut self) {
        self.state.subscribed = true;
    }

    /// Resets to conservative defaults: `current_interval = lkg_interval
    /// = min_send_interval_us`, all flags cleared. Retains nothing about
    /// prior probing history.
    pub fn on_disconnect(&mut self) -> PacingInfo {
        let min_interval = self.state.min_interval;
        self.state = TxPacerState::new(min_interval);
        self.snapshot(PacingReason::DisconnectReset)
    }

    /// Advances the state machine in response to one [`SendOutcome`].
    /// Returns the resulting [`PacingInfo`] if this outcome caused a
    /// transition worth reporting, `None` if nothing observable changed
    /// (e.g. a plain success outside of a probe/escalate window).
    pub fn on_outcome(&mut self, outcome: SendOutcome, now_us: u64) -> Option<PacingInfo> {
        match outcome {
            SendOutcome::Success => self.on_success(now_us),
            SendOutcome::Timeout => Some(self.on_timeout(now_us)),
            SendOutcome::HardFailure => Some(self.on_timeout(now_us)),
        }
    }

    fn on_success(&mut self, now_us: u64) -> Option<PacingInfo> {
        self.state.success_streak += 1;

        match self.phase() {
            PacerPhase::BackedOff => {
                self.state.cooldown_successes += 1;
                if self.state.cooldown_successes >= COOL_SUCCESS_REQUIRED {
                    self.state.cooldown_remaining = 0;
                    self.state.cooldown_successes = 0;
                    self.state.success_streak = 0;
                }
                None
            }
            PacerPhase::Probing => {
                self.state.probe_successes += 1;
                if self.state.probe_successes >= PROBE_CONFIRM_SUCCESSES {
                    self.state.lkg_interval = self.state.current_interval;
                    self.state.probe_active = false;
                    self.state.probe_successes = 0;
                    self.state.success_streak = 0;
                    Some(self.snapshot(PacingReason::ProbeAccepted))
                } else {
                    None
                }
            }
            PacerPhase::Steady => {
                if self.state.current_interval >= self.state.lkg_interval
                    && self.state.success_streak >= PROBE_AFTER_SUCCESSES
                {
                    let step = self.probe_step();
                    let new_interval = self
                        .state
                        .current_interval
                        .saturating_sub(step)
                        .max(self.state.min_interval);
                    self.state.current_interval = new_interval;
                    self.state.probe_active = new_interval < self.state.lkg_interval;
                    self.state.probe_successes = 0;
                    self.state.success_streak = 0;
                    if self.state.probe_active {
                        Some(self.snapshot(PacingReason::ProbeStart))
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            PacerPhase::Idle => None,
        }
    }

    fn on_timeout(&mut self, now_us: u64) -> PacingInfo {
        self.state.success_streak = 0;

        let was_probing = self.phase() == PacerPhase::Probing;
        if was_probing {
            self.state.current_interval = self.state.lkg_interval;
            self.state.probe_active = false;
            self.state.probe_successes = 0;
            self.state.lkg_fail_streak += 1;

            if self.state.lkg_fail_streak >= LKG_ESCALATE_AFTER_FAILS
                && now_us.saturating_sub(self.state.last_escalate_time_us) >= ESCALATE_COOLDOWN_US
            {
                self.state.lkg_interval = ((self.state.lkg_interval as u64
                    * ESCALATE_NUMERATOR as u64)
                    / ESCALATE_DENOMINATOR as u64) as u32;
                self.state.lkg_fail_streak = 0;
                self.state.last_escalate_time_us = now_us;
                return self.snapshot(PacingReason::Escalate);
            }
        }

        let backed_off = ((self.state.current_interval as u64 * BACKOFF_NUMERATOR as u64)
            / BACKOFF_DENOMINATOR as u64)
            .min(MAX_SEND_INTERVAL_US as u64) as u32;
        self.state.current_interval = backed_off.max(self.state.min_interval);
        self.state.cooldown_remaining = COOL_SUCCESS_REQUIRED;
        self.state.cooldown_successes = 0;
        self.snapshot(PacingReason::Backoff)
    }

    /// `max(PROBE_STEP_US, 2% * current_interval)`, never below
    /// `min_interval` after subtraction (callers clamp that separately).
    pub fn probe_step(&self) -> u32 {
        let pct = (self.state.current_interval as u64 * PROBE_STEP_PCT as u64) / 100;
        (pct as u32).max(PROBE_STEP_US)
    }

    pub fn snapshot(&self, reason: PacingReason) -> PacingInfo {
        PacingInfo {
            send_interval_us: self.state.current_interval,
            min_send_interval_us: self.state.min_interval,
            lkg_interval_us: self.state.lkg_interval,
            tx_chunk_size: 0,
            mtu: 0,
            ll_octets: 0,
            ll_time_us: 0,
            probing: self.state.probe_active,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_successes(pacer: &mut TxPacer, n: u32, now_us: &mut u64) -> Option<PacingInfo> {
        let mut last = None;
        for _ in 0..n {
            *now_us += 1000;
            if let Some(info) = pacer.on_outcome(SendOutcome::Success, *now_us) {
                last = Some(info);
            }
        }
        last
    }

    #[test]
    fn idle_until_connected_and_subscribed() {
        let pacer = TxPacer::new(200);
        assert!(!pacer.ready_now(10_000));
    }

    #[test]
    fn ready_once_connected_subscribed_and_interval_elapsed() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        assert!(!pacer.ready_now(100));
        assert!(pacer.ready_now(200));
    }

    #[test]
    fn probing_starts_after_64_successes_at_or_above_lkg() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        let mut now = 0u64;
        let info = drive_successes(&mut pacer, PROBE_AFTER_SUCCESSES, &mut now);
        let info = info.expect("probing should have started");
        assert_eq!(info.reason, PacingReason::ProbeStart);
        assert!(info.send_interval_us < 200);
        assert_eq!(pacer.phase(), PacerPhase::Probing);
    }

    #[test]
    fn probe_accepted_after_48_confirm_successes() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        let mut now = 0u64;
        drive_successes(&mut pacer, PROBE_AFTER_SUCCESSES, &mut now);
        let probed_interval = pacer.state().current_interval;
        let info = drive_successes(&mut pacer, PROBE_CONFIRM_SUCCESSES, &mut now)
            .expect("probe should be accepted");
        assert_eq!(info.reason, PacingReason::ProbeAccepted);
        assert_eq!(pacer.state().lkg_interval, probed_interval);
        assert_eq!(pacer.phase(), PacerPhase::Steady);
    }

    #[test]
    fn timeout_during_probe_restores_lkg_and_counts_failure() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        let mut now = 0u64;
        drive_successes(&mut pacer, PROBE_AFTER_SUCCESSES, &mut now);
        assert_eq!(pacer.phase(), PacerPhase::Probing);
        let lkg = pacer.state().lkg_interval;
        now += 1000;
        let info = pacer.on_outcome(SendOutcome::Timeout, now).unwrap();
        assert_eq!(info.reason, PacingReason::Backoff);
        assert_eq!(pacer.state().lkg_fail_streak, 1);
        // current_interval is restored to lkg then backed off by x1.2.
        assert_eq!(pacer.state().current_interval, (lkg * 6) / 5);
    }

    #[test]
    fn three_probe_failures_with_cooldown_elapsed_escalate_lkg() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        let mut now = 0u64;
        let starting_lkg = pacer.state().lkg_interval;

        for i in 0..LKG_ESCALATE_AFTER_FAILS {
            if pacer.phase() == PacerPhase::BackedOff {
                drive_successes(&mut pacer, COOL_SUCCESS_REQUIRED, &mut now);
            }
            drive_successes(&mut pacer, PROBE_AFTER_SUCCESSES, &mut now);
            assert_eq!(pacer.phase(), PacerPhase::Probing);
            now += ESCALATE_COOLDOWN_US;
            let info = pacer.on_outcome(SendOutcome::Timeout, now).unwrap();
            if i + 1 == LKG_ESCALATE_AFTER_FAILS {
                assert_eq!(info.reason, PacingReason::Escalate);
            } else {
                assert_eq!(info.reason, PacingReason::Backoff);
            }
        }
        assert!(pacer.state().lkg_interval > starting_lkg);
    }

    #[test]
    fn timeout_backs_off_interval_by_1_2x_and_clamps_below_max() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        let info = pacer.on_outcome(SendOutcome::Timeout, 1000).unwrap();
        assert_eq!(info.send_interval_us, 240);
        assert!(info.send_interval_us <= MAX_SEND_INTERVAL_US);
    }

    #[test]
    fn backed_off_requires_64_successes_before_steady() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        pacer.on_outcome(SendOutcome::Timeout, 1000);
        assert_eq!(pacer.phase(), PacerPhase::BackedOff);
        let mut now = 1000u64;
        for _ in 0..COOL_SUCCESS_REQUIRED - 1 {
            now += 1000;
            pacer.on_outcome(SendOutcome::Success, now);
            assert_eq!(pacer.phase(), PacerPhase::BackedOff);
        }
        now += 1000;
        pacer.on_outcome(SendOutcome::Success, now);
        assert_eq!(pacer.phase(), PacerPhase::Steady);
    }

    #[test]
    fn disconnect_resets_to_conservative_defaults() {
        let mut pacer = TxPacer::new(200);
        pacer.on_connect();
        pacer.on_subscribe();
        pacer.on_outcome(SendOutcome::Timeout, 1000);
        let info = pacer.on_disconnect();
        assert_eq!(info.reason, PacingReason::DisconnectReset);
        assert_eq!(pacer.state().current_interval, 200);
        assert_eq!(pacer.state().lkg_interval, 200);
        assert!(!pacer.state().connected);
    }

    #[test]
    fn pacing_reason_priority_picks_disconnect_reset_over_backoff() {
        assert_eq!(
            PacingReason::DisconnectReset.strongest(PacingReason::Backoff),
            PacingReason::DisconnectReset
        );
        assert_eq!(
            PacingReason::ProbeStart.strongest(PacingReason::Recompute),
            PacingReason::ProbeStart
        );
    }

    #[test]
    fn probe_step_uses_larger_of_absolute_and_percent() {
        let small = TxPacer::new(200);
        // 2% of 200 = 4, less than the 10us floor.
        assert_eq!(small.probe_step(), PROBE_STEP_US);

        let mut large = TxPacer::new(200);
        large.state.current_interval = 10_000;
        // 2% of 10_000 = 200, greater than the 10us floor.
        assert_eq!(large.probe_step(), 200);
    }

    proptest::proptest! {
        #[test]
        fn next_interval_strictly_less_after_k_successes_unless_at_floor(
            min_interval in 50u32..500,
        ) {
            let mut pacer = TxPacer::new(min_interval);
            pacer.on_connect();
            pacer.on_subscribe();
            let mut now = 0u64;
            let before = pacer.state().current_interval;
            drive_successes(&mut pacer, PROBE_AFTER_SUCCESSES, &mut now);
            let after = pacer.state().current_interval;
            if before > min_interval {
                proptest::prop_assert!(after < before);
            } else {
                proptest::prop_assert_eq!(after, before);
            }
        }

        #[test]
        fn next_interval_strictly_greater_after_timeout(
            min_interval in 50u32..500,
        ) {
            let mut pacer = TxPacer::new(min_interval);
            pacer.on_connect();
            pacer.on_subscribe();
            let before = pacer.state().current_interval;
            pacer.on_outcome(SendOutcome::Timeout, 1_000_000);
            let after = pacer.state().current_interval;
            proptest::prop_assert!(after > before);
        }
    }
}
