//! The orchestrator: owns the tx/rx rings, the pending-notification
//! staging buffer, `TxPacer`, `LinkState`, and `LinkAdapter`, and drives
//! the non-blocking pump tick that stages, dispatches, and retires one
//! notification per ready tick without ever blocking on completion.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::clock::Clock;
use crate::config::{BeginConfig, PumpMode};
use crate::error::TxError;
use crate::events::EventSink;
use crate::gatt::{AdvConfig, MAX_MTU, MIN_MTU};
use crate::host::{DisconnectReason, HostStack, NotifyOutcome};
use crate::link_adapter::{LinkAction, LinkAdapter};
use crate::link_params::{CodedScheme, LinkState, Mode, Phy};
use crate::pacer::{PacingInfo, PacingReason, SendOutcome, TxPacer};
use crate::profile::{profile_for, Profile};
use crate::ring::RingBuffer;
use crate::rx::RxPath;

/// Default capacity for both rings; a few kilobytes comfortably absorbs
/// several notification intervals' worth of data without costing much
/// memory. `RingBuffer`/`RxPath` stay generic over their capacity;
/// `TxEngine` just picks this one concretely rather than threading a
/// second const generic parameter through every public signature for a
/// knob nothing in this crate's test or scenario corpus needs to vary.
const RING_CAPACITY: usize = 4096;

/// Upper bound on a staged chunk. The real ceiling is `min(mtu − 3,
/// ll_octets − 4 − encrypt_overhead)`, which across the legal MTU/DLE
/// ranges never exceeds ~247 bytes; this leaves headroom.
const PENDING_CAP: usize = 256;

/// Timeout floor below which a pending notification is never considered
/// stalled, even at a very small `current_interval`.
const MIN_TIMEOUT_US: u64 = 50_000;

/// `{ connected, subscribed, conn_handle, peer_mac }`. `TxPacer` tracks
/// its own `connected`/`subscribed` copies
/// (it needs them for `ready_now`); this is the engine's superset,
/// carrying the connection handle and peer address GAP hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub subscribed: bool,
    pub conn_handle: Option<u16>,
    pub peer_mac: Option<[u8; 6]>,
}

#[derive(Clone, Copy)]
struct Pending {
    buf: [u8; PENDING_CAP],
    len: usize,
    dispatched_us: u64,
    acked: bool,
    hard_failed: bool,
}

#[cfg(feature = "std")]
pub struct PumpWaker {
    inner: std::sync::Mutex<()>,
    condvar: std::sync::Condvar,
}

#[cfg(feature = "std")]
impl PumpWaker {
    pub fn new() -> Self {
        PumpWaker {
            inner: std::sync::Mutex::new(()),
            condvar: std::sync::Condvar::new(),
        }
    }

    pub fn wake(&self) {
        let _guard = self.inner.lock().unwrap();
        self.condvar.notify_all();
    }

    pub fn wait_for(&self, timeout: std::time::Duration) {
        let guard = self.inner.lock().unwrap();
        let _ = self.condvar.wait_timeout(guard, timeout);
    }
}

#[cfg(feature = "std")]
impl Default for PumpWaker {
    fn default() -> Self {
        Self::new()
    }
}

/// The adaptive transmit/receive transport. Generic over the concrete
/// [`HostStack`] (GAP/GATT) and [`crate::clock::Clock`] implementations
/// so it never depends on a specific BLE host stack or timer backend.
pub struct TxEngine<H: HostStack, C: Clock> {
    host: H,
    clock: C,
    tx: RingBuffer<RING_CAPACITY>,
    rx: RxPath<RING_CAPACITY>,
    pacer: TxPacer,
    link: LinkState,
    link_adapter: LinkAdapter,
    profile: Profile,
    mode: Mode,
    secure: bool,
    tx_power_dbm: i8,
    device_name: crate::gatt::heapless_name::Name,
    pump_mode: PumpMode,
    conn: ConnectionState,
    events: EventSink,
    pending: Option<Pending>,
    tx_locked: AtomicBool,
    bytes_tx: u64,
    bytes_rx: u64,
    tx_drops: u64,
    bad_data_retries: u32,
    pending_mtu_request: Option<u16>,
    mtu_retries: u8,
    ended: bool,
    #[cfg(feature = "std")]
    waker: std::sync::Arc<PumpWaker>,
}

impl<H: HostStack, C: Clock> TxEngine<H, C> {
    /// Constructs the engine from a fully-formed configuration.
    /// `start_advertising` is a separate step rather than part of
    /// construction, since starting advertising can itself fail and the
    /// constructor shouldn't have to unwind a partially-built engine on
    /// that failure.
    pub fn new(host: H, clock: C, config: BeginConfig) -> Result<Self, TxError> {
        #[cfg(not(feature = "std"))]
        if matches!(config.pump_mode, PumpMode::Task) {
            return Err(TxError::ConfigMismatch(
                "PumpMode::Task requires the `std` feature",
            ));
        }

        let mode = config.mode;
        let profile = profile_for(mode);
        let link = LinkState::conservative_default(mode);
        let pacer = TxPacer::new(link.min_send_interval_us);
        let link_adapter = LinkAdapter::new(mode, profile.preferred_phy);

        crate::log::apply_max_level(config.log_level);

        Ok(TxEngine {
            host,
            clock,
            tx: RingBuffer::new(),
            rx: RxPath::new(),
            pacer,
            link,
            link_adapter,
            profile,
            mode,
            secure: config.secure,
            tx_power_dbm: config.tx_power_dbm,
            device_name: config.device_name,
            pump_mode: config.pump_mode,
            conn: ConnectionState::default(),
            events: EventSink::new(),
            pending: None,
            tx_locked: AtomicBool::new(false),
            bytes_tx: 0,
            bytes_rx: 0,
            tx_drops: 0,
            bad_data_retries: 0,
            pending_mtu_request: None,
            mtu_retries: 0,
            ended: false,
            #[cfg(feature = "std")]
            waker: std::sync::Arc::new(PumpWaker::new()),
        })
    }

    pub fn events_mut(&mut self) -> &mut EventSink {
        &mut self.events
    }

    /// Starts advertising the NUS service under the configured name.
    pub fn start_advertising(&mut self) -> Result<(), TxError> {
        let adv = AdvConfig::new(self.device_name, self.tx_power_dbm);
        self.host.start_advertising(&adv).map_err(|e| {
            crate::log::error!("start_advertising rejected by host stack: {:?}", e);
            TxError::ConfigMismatch("host stack rejected advertising")
        })
    }

    // ---- GAP event hooks -------------------------------------------------
    // These are called by whichever concrete HostStack integration wires
    // host-stack callbacks into the engine's registration-and-dispatch
    // layer; no concrete wiring ships here.

    pub fn on_connect(&mut self, conn_handle: u16, peer_mac: [u8; 6]) {
        self.conn.connected = true;
        self.conn.conn_handle = Some(conn_handle);
        self.conn.peer_mac = Some(peer_mac);
        self.pacer.on_connect();
        let _ = self.host.request_conn_params(self.profile.conn_params);
        let _ = self
            .host
            .request_phy(self.profile.preferred_phy, match self.profile.preferred_phy {
                Phy::Coded(s) => Some(s),
                _ => None,
            });
        self.events.fire_connect();
        self.wake();
    }

    pub fn on_disconnect(&mut self, reason: DisconnectReason) {
        if let Some(pending) = self.pending.take() {
            self.tx_drops += pending.len as u64;
        }
        self.conn = ConnectionState::default();
        self.link = LinkState::conservative_default(self.mode);
        let info = self.pacer.on_disconnect();
        self.events.fire_disconnect(reason);
        self.report(self.fill_info(info));
        self.wake();
    }

    pub fn on_mtu_changed(&mut self, mtu: u16) {
        self.pending_mtu_request = None;
        self.mtu_retries = 0;
        self.link.recompute(
            mtu,
            self.link.ll_octets,
            self.link.ll_time_us,
            self.link.phy,
            self.secure,
            self.mode,
        );
        let reason = self.pacer.set_min_interval(self.link.min_send_interval_us);
        self.events.fire_mtu_changed(mtu);
        self.emit(reason);
        self.wake();
    }

    pub fn on_subscribe_changed(&mut self, subscribed: bool) {
        self.conn.subscribed = subscribed;
        if subscribed {
            self.pacer.on_subscribe();
        }
        self.events.fire_subscribe_changed(subscribed);
        self.wake();
    }

    /// The host stack's ATT "MTU request rejected" event. Retries up to
    /// three times, after which the MTU stays at the last negotiated
    /// value.
    pub fn on_mtu_rejected(&mut self) {
        if let Some(mtu) = self.pending_mtu_request {
            if self.mtu_retries < 3 {
                self.mtu_retries += 1;
                let _ = self.host.request_mtu(mtu);
            } else {
                self.pending_mtu_request = None;
            }
        }
    }

    pub fn on_phy_updated(&mut self, phy: Phy, ll_octets: u16, ll_time_us: u32) {
        self.link
            .recompute(self.link.mtu, ll_octets, ll_time_us, phy, self.secure, self.mode);
        self.link_adapter.note_phy_updated(phy);
        let reason = self.pacer.set_min_interval(self.link.min_send_interval_us);
        self.emit(reason);
        self.wake();
    }

    /// Marks the currently pending notification acknowledged. Called
    /// from the host stack's notification-sent event.
    pub fn on_notify_ack(&mut self) {
        if let Some(p) = &mut self.pending {
            p.acked = true;
        }
        self.wake();
    }

    pub fn on_notify_hard_failure(&mut self) {
        if let Some(p) = &mut self.pending {
            p.hard_failed = true;
        }
        self.wake();
    }

    /// Inbound GATT write. Forwards to [`RxPath::on_write`].
    pub fn on_write(&mut self, payload: &[u8]) {
        self.bytes_rx += payload.len() as u64;
        self.rx.on_write(payload, &mut self.events);
    }

    /// Feeds one RSSI sample to the link adapter and forwards any
    /// resulting request to the host stack, falling back to the
    /// alternate PHY if the preferred one is rejected outright.
    pub fn on_rssi_sample(&mut self, rssi_dbm: i8, now_ms: u64) {
        let Some(action) = self.link_adapter.on_rssi_sample(rssi_dbm, now_ms) else {
            return;
        };
        match action {
            LinkAction::RequestHigherTxPower => {
                self.tx_power_dbm = (self.tx_power_dbm + 4).min(8);
                let _ = self.host.request_tx_power(self.tx_power_dbm);
            }
            LinkAction::RequestPhy { phy, fallback } => {
                let scheme = |p: Phy| match p {
                    Phy::Coded(s) => Some(s),
                    _ => None,
                };
                if self.host.request_phy(phy, scheme(phy)).is_err() {
                    let _ = self.host.request_phy(fallback, scheme(fallback));
                }
            }
        }
    }

    // ---- Public transport API --------------------------------------------

    /// Non-blocking enqueue. Returns the number of bytes accepted; `0`
    /// when the producer is locked out at high water.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if self.tx_locked.load(Ordering::Acquire) {
            return 0;
        }
        let written = self.tx.push(bytes, false);
        self.update_backpressure();
        if written > 0 {
            self.wake();
        }
        written
    }

    /// Polling wait up to `deadline_us` (on `self`'s clock), pumping
    /// between attempts so backpressure clears without a separate
    /// caller-driven loop.
    pub fn write_timeout(&mut self, bytes: &[u8], deadline_us: u64) -> usize {
        let mut total = 0;
        while total < bytes.len() {
            let written = self.write(&bytes[total..]);
            total += written;
            if total >= bytes.len() {
                break;
            }
            if self.clock.now_us() >= deadline_us {
                break;
            }
            self.update();
        }
        total
    }

    /// Pumps until the tx ring drains or the link drops. Cooperative: no
    /// implicit suspension, same non-blocking tick repeated.
    pub fn flush(&mut self) {
        while self.tx.len() > 0 && self.conn.connected {
            self.update();
        }
    }

    /// One non-blocking pump tick. Idempotent when nothing is ready.
    pub fn update(&mut self) -> Option<PacingInfo> {
        let now = self.clock.now_us();
        let mut combined: Option<PacingInfo> = None;

        if let Some(pending) = self.pending.take() {
            if pending.acked {
                self.bytes_tx += pending.len as u64;
                if let Some(info) = self.pacer.on_outcome(SendOutcome::Success, now) {
                    combined = Some(self.merge(combined, info));
                }
            } else if pending.hard_failed {
                self.tx_drops += pending.len as u64;
                let info = self.pacer.on_outcome(SendOutcome::HardFailure, now).unwrap();
                combined = Some(self.merge(combined, info));
            } else {
                let timeout_threshold = (self.pacer.state().current_interval as u64 * 4).max(MIN_TIMEOUT_US);
                if now.saturating_sub(pending.dispatched_us) > timeout_threshold {
                    self.tx_drops += pending.len as u64;
                    let info = self.pacer.on_outcome(SendOutcome::Timeout, now).unwrap();
                    combined = Some(self.merge(combined, info));
                } else {
                    self.pending = Some(pending);
                    return self.conclude(combined);
                }
            }
        }

        if !self.pacer.ready_now(now) {
            return self.conclude(combined);
        }

        let chunk_size = self.link.tx_chunk_size.min(PENDING_CAP);
        let mut buf = [0u8; PENDING_CAP];
        let staged = self.tx.peek(&mut buf[..chunk_size]);
        if staged == 0 {
            return self.conclude(combined);
        }

        self.pacer.record_tx(now);
        match self.host.notify(&buf[..staged]) {
            Ok(NotifyOutcome::Queued) => {
                self.tx.consume(staged);
                self.update_backpressure();
                self.pending = Some(Pending {
                    buf,
                    len: staged,
                    dispatched_us: now,
                    acked: false,
                    hard_failed: false,
                });
            }
            Ok(NotifyOutcome::QueueFull) => {
                if let Some(info) = self.pacer.on_outcome(SendOutcome::Timeout, now) {
                    combined = Some(self.merge(combined, info));
                }
            }
            Err(e) => {
                crate::log::warn!("notify failed: {:?}", e);
                self.tx.consume(staged);
                self.update_backpressure();
                self.tx_drops += staged as u64;
                let info = self.pacer.on_outcome(SendOutcome::HardFailure, now).unwrap();
                combined = Some(self.merge(combined, info));
            }
        }

        self.conclude(combined)
    }

    /// Requests a new ATT MTU, validated against `23..=517`.
    pub fn request_mtu(&mut self, mtu: u16) -> bool {
        if !(MIN_MTU..=MAX_MTU).contains(&mtu) {
            self.bad_data_retries += 1;
            return false;
        }
        self.pending_mtu_request = Some(mtu);
        self.mtu_retries = 0;
        self.host.request_mtu(mtu).is_ok()
    }

    /// Tears down advertising, drops any in-flight notification
    /// accounting as `tx_drops`, and clears both rings. The background
    /// pump (if any) observes `ended` on its next wake and exits.
    pub fn end(&mut self) -> Result<(), TxError> {
        if let Some(pending) = self.pending.take() {
            self.tx_drops += pending.len as u64;
        }
        self.tx.clear();
        self.rx.clear();
        self.host.stop_advertising().map_err(|e| {
            crate::log::error!("stop_advertising rejected by host stack: {:?}", e);
            TxError::ConfigMismatch("host stack rejected stop_advertising")
        })?;
        self.ended = true;
        self.wake();
        Ok(())
    }

    // ---- Status accessors --------------------------------------------

    pub fn connected(&self) -> bool {
        self.conn.connected
    }
    pub fn mtu(&self) -> u16 {
        self.link.mtu
    }
    pub fn mode(&self) -> Mode {
        self.mode
    }
    pub fn bytes_rx(&self) -> u64 {
        self.bytes_rx
    }
    pub fn bytes_tx(&self) -> u64 {
        self.bytes_tx
    }
    pub fn rx_drops(&self) -> u64 {
        self.rx.drops()
    }
    pub fn tx_drops(&self) -> u64 {
        self.tx_drops
    }
    pub fn interval_us(&self) -> u32 {
        self.pacer.state().current_interval
    }
    pub fn rssi_dbm(&self) -> i8 {
        self.link_adapter.rssi_dbm()
    }
    pub fn mac(&self) -> Option<[u8; 6]> {
        self.conn.peer_mac
    }
    pub fn tx_buffered(&self) -> usize {
        self.tx.len()
    }
    pub fn rx_buffered(&self) -> usize {
        self.rx.buffered()
    }
    pub fn tx_available(&self) -> bool {
        !self.tx_locked.load(Ordering::Acquire)
    }
    pub fn bad_data_retries(&self) -> u32 {
        self.bad_data_retries
    }
    pub fn pump_mode(&self) -> PumpMode {
        self.pump_mode
    }
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        self.rx.read(dst)
    }

    #[cfg(feature = "std")]
    pub fn waker(&self) -> std::sync::Arc<PumpWaker> {
        self.waker.clone()
    }

    // ---- internals -----------------------------------------------------

    fn update_backpressure(&mut self) {
        let chunk_size = self.link.tx_chunk_size;
        let high_water = self.tx.capacity().saturating_sub(2 * chunk_size);
        let low_water = chunk_size;
        let len = self.tx.len();
        if len >= high_water {
            self.tx_locked.store(true, Ordering::Release);
        } else if len <= low_water {
            self.tx_locked.store(false, Ordering::Release);
        }
    }

    fn merge(&self, into: Option<PacingInfo>, candidate: PacingInfo) -> PacingInfo {
        let candidate = self.fill_info(candidate);
        match into {
            None => candidate,
            Some(existing) => {
                if existing.reason.strongest(candidate.reason) == existing.reason {
                    existing
                } else {
                    candidate
                }
            }
        }
    }

    fn fill_info(&self, mut info: PacingInfo) -> PacingInfo {
        info.tx_chunk_size = self.link.tx_chunk_size;
        info.mtu = self.link.mtu;
        info.ll_octets = self.link.ll_octets;
        info.ll_time_us = self.link.ll_time_us;
        info
    }

    fn emit(&mut self, reason: PacingReason) {
        let info = self.fill_info(self.pacer.snapshot(reason));
        self.report(info);
    }

    fn report(&mut self, info: PacingInfo) {
        self.events.fire_pacing_changed(info);
    }

    fn conclude(&mut self, combined: Option<PacingInfo>) -> Option<PacingInfo> {
        if let Some(info) = combined {
            self.report(info);
        }
        combined
    }

    fn wake(&self) {
        #[cfg(feature = "std")]
        self.waker.wake();
    }
}

/// Runs `engine`'s pump on a dedicated background thread, woken on ring
/// pushes, notify completions, and disconnects.
/// Requires the caller to share the engine through a `Mutex` since the
/// event hooks above and this loop both need `&mut` access.
#[cfg(feature = "std")]
pub fn spawn_task_pump<H, C>(
    engine: std::sync::Arc<std::sync::Mutex<TxEngine<H, C>>>,
) -> std::thread::JoinHandle<()>
where
    H: HostStack + Send + 'static,
    C: Clock + Send + 'static,
{
    std::thread::spawn(move || loop {
        let (waker, sleep_for, ended) = {
            let mut guard = engine.lock().unwrap();
            if guard.ended {
                (guard.waker.clone(), std::time::Duration::ZERO, true)
            } else {
                guard.update();
                let now = guard.clock.now_us();
                let sleep_us = guard.pacer.sleep_target(now).min(50_000);
                (guard.waker.clone(), std::time::Duration::from_micros(sleep_us), false)
            }
        };
        if ended {
            return;
        }
        waker.wait_for(sleep_for);
    })
}
