//! Push-first state synchronizer with polling fallback.
//!
//! The machine is sans-io: every input is a method call that returns the I/O
//! the caller must perform next. Time is an explicit argument, and timers live
//! in a deterministic [`TimerQueue`], so the whole lifecycle can be driven from
//! tests without a runtime.
//!
//! Invariants:
//! - At most one of {push subscription, poll timer or in-flight poll} exists.
//! - At most one poll is in flight; ticks that find one are skipped.
//! - Exactly one retry timer is armed while awaiting retry.
//! - A subscription only counts as alive while it delivers snapshots: the
//!   first within the connect timeout, the rest at most the idle timeout
//!   apart. Otherwise it fails like any other push error.
//! - The current snapshot is only ever replaced, never cleared by a source
//!   switch.

use std::sync::Arc;

use foundation::time::Time;
use runtime::event_bus::{EventBus, ListenerHandle};
use runtime::metrics::Metrics;
use runtime::timers::{TimerId, TimerQueue};
use scene::StateSnapshot;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::FeedError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Push failed; polling until the retry timer fires.
    AwaitingRetry,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::AwaitingRetry => "awaiting-retry",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollId(pub u64);

/// I/O requested by the machine. The caller performs these in order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SyncAction {
    OpenPush(SubscriptionId),
    ClosePush(SubscriptionId),
    Fetch(PollId),
    CancelFetch(PollId),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UpdateSource {
    Push,
    Poll,
}

#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    pub snapshot: Arc<StateSnapshot>,
    pub source: UpdateSource,
    pub at: Time,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TimerKind {
    Retry,
    PollTick,
    ConnectTimeout(SubscriptionId),
    Idle(SubscriptionId),
}

#[derive(Debug, Copy, Clone)]
struct Subscription {
    id: SubscriptionId,
    opened: bool,
    received: bool,
}

#[derive(Debug, Copy, Clone)]
struct InFlight {
    id: PollId,
    issued: Time,
}

#[derive(Debug)]
pub struct Synchronizer {
    config: SyncConfig,
    state: ConnectionState,
    visible: bool,

    subscription: Option<Subscription>,
    next_subscription: u64,

    polling: bool,
    in_flight: Option<InFlight>,
    next_poll: u64,

    timers: TimerQueue<TimerKind>,
    retry_timer: Option<TimerId>,
    poll_timer: Option<TimerId>,
    connect_timer: Option<TimerId>,
    idle_timer: Option<TimerId>,

    current: Option<Arc<StateSnapshot>>,
    last_update: Option<Time>,
    listeners: EventBus<SnapshotUpdate>,
    metrics: Metrics,
}

impl Synchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            visible: false,
            subscription: None,
            next_subscription: 0,
            polling: false,
            in_flight: None,
            next_poll: 0,
            timers: TimerQueue::new(),
            retry_timer: None,
            poll_timer: None,
            connect_timer: None,
            idle_timer: None,
            current: None,
            last_update: None,
            listeners: EventBus::new(),
            metrics: Metrics::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// True only while connected and a payload has arrived on the current
    /// subscription.
    pub fn use_push(&self) -> bool {
        self.state == ConnectionState::Connected
            && self.subscription.is_some_and(|s| s.received)
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn push_active(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn poll_active(&self) -> bool {
        self.poll_timer.is_some() || self.in_flight.is_some()
    }

    pub fn current(&self) -> Option<&Arc<StateSnapshot>> {
        self.current.as_ref()
    }

    /// Milliseconds since the last applied update, if any.
    pub fn staleness(&self, now: Time) -> Option<u64> {
        self.last_update.map(|t| now.since(t))
    }

    /// No data at all is "absent", not stale.
    pub fn is_stale(&self, now: Time) -> bool {
        self.staleness(now)
            .is_some_and(|age| age > self.config.stale_after_ms)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn next_deadline(&self) -> Option<Time> {
        self.timers.next_deadline()
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&SnapshotUpdate) + Send + 'static,
    ) -> ListenerHandle {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.unsubscribe(handle)
    }

    /// Arms or tears down the machine with the owning view's visibility.
    pub fn set_visible(&mut self, visible: bool, now: Time) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        if visible == self.visible {
            return actions;
        }
        self.visible = visible;
        if visible {
            info!("view visible, opening push feed");
            self.open_push(now, &mut actions);
        } else {
            info!("view hidden, tearing down feed");
            self.teardown(&mut actions);
        }
        actions
    }

    pub fn on_push_open(&mut self, id: SubscriptionId, _now: Time) -> Vec<SyncAction> {
        self.mark_open(id);
        Vec::new()
    }

    pub fn on_push_message(&mut self, id: SubscriptionId, payload: &str, now: Time) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        if !self.is_current_subscription(id) {
            return actions;
        }
        match StateSnapshot::from_json(payload) {
            Ok(snapshot) => {
                self.mark_open(id);
                self.mark_received(id, now);
                self.metrics.inc("push.messages");
                self.apply(snapshot, UpdateSource::Push, now);
            }
            Err(err) => {
                warn!("malformed push payload: {err}");
                self.fail_push(now, &mut actions);
            }
        }
        actions
    }

    /// Error or abnormal close on the subscription.
    pub fn on_push_error(&mut self, id: SubscriptionId, now: Time) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        if self.is_current_subscription(id) {
            self.fail_push(now, &mut actions);
        }
        actions
    }

    pub fn on_poll_result(
        &mut self,
        id: PollId,
        result: Result<StateSnapshot, FeedError>,
        now: Time,
    ) -> Vec<SyncAction> {
        let Some(flight) = self.in_flight.filter(|f| f.id == id) else {
            self.metrics.inc("poll.superseded");
            debug!("dropping result of abandoned poll {}", id.0);
            return Vec::new();
        };
        self.in_flight = None;
        self.metrics.record("poll.latency_ms", now.since(flight.issued));

        match result {
            Ok(_) if self.use_push() => {
                self.metrics.inc("poll.superseded");
            }
            Ok(snapshot) => {
                self.metrics.inc("poll.successes");
                self.apply(snapshot, UpdateSource::Poll, now);
            }
            Err(err) => {
                self.metrics.inc("poll.failures");
                warn!("poll failed: {err}");
            }
        }
        Vec::new()
    }

    /// Fires every timer due at or before `now`.
    pub fn advance(&mut self, now: Time) -> Vec<SyncAction> {
        let mut actions = Vec::new();
        while let Some((id, kind)) = self.timers.pop_due(now) {
            match kind {
                TimerKind::Retry => {
                    if self.retry_timer == Some(id) {
                        self.retry_timer = None;
                    }
                    if self.visible && self.state == ConnectionState::AwaitingRetry {
                        info!("retrying push feed");
                        self.open_push(now, &mut actions);
                    }
                }
                TimerKind::PollTick => {
                    if self.poll_timer == Some(id) {
                        self.poll_timer = None;
                    }
                    if self.polling {
                        if self.in_flight.is_some() {
                            self.metrics.inc("poll.skipped");
                        } else {
                            self.fetch(now, &mut actions);
                        }
                        self.poll_timer = Some(
                            self.timers
                                .schedule(now.after(self.config.poll_interval_ms), TimerKind::PollTick),
                        );
                    }
                }
                TimerKind::ConnectTimeout(sub) => {
                    if self.connect_timer == Some(id) {
                        self.connect_timer = None;
                    }
                    let pending = self
                        .subscription
                        .is_some_and(|s| s.id == sub && !s.received);
                    if pending {
                        warn!(
                            "push feed delivered no snapshot within {} ms",
                            self.config.connect_timeout_ms
                        );
                        self.fail_push(now, &mut actions);
                    }
                }
                TimerKind::Idle(sub) => {
                    if self.idle_timer == Some(id) {
                        self.idle_timer = None;
                    }
                    let silent = self
                        .subscription
                        .is_some_and(|s| s.id == sub && s.received);
                    if silent {
                        warn!(
                            "push feed silent for {} ms",
                            self.config.idle_timeout_ms
                        );
                        self.fail_push(now, &mut actions);
                    }
                }
            }
        }
        actions
    }

    fn is_current_subscription(&self, id: SubscriptionId) -> bool {
        self.subscription.is_some_and(|s| s.id == id)
    }

    fn mark_open(&mut self, id: SubscriptionId) {
        let Some(sub) = self.subscription.as_mut().filter(|s| s.id == id) else {
            return;
        };
        if sub.opened {
            return;
        }
        sub.opened = true;
        self.state = ConnectionState::Connected;
        self.metrics.inc("push.opens");
        info!("push feed connected");
    }

    /// A snapshot arrived: the connect timer is done and the idle watchdog
    /// restarts.
    fn mark_received(&mut self, id: SubscriptionId, now: Time) {
        let Some(sub) = self.subscription.as_mut().filter(|s| s.id == id) else {
            return;
        };
        sub.received = true;
        if let Some(timer) = self.connect_timer.take() {
            self.timers.cancel(timer);
        }
        if let Some(timer) = self.idle_timer.take() {
            self.timers.cancel(timer);
        }
        if self.config.idle_timeout_ms > 0 {
            self.idle_timer = Some(
                self.timers
                    .schedule(now.after(self.config.idle_timeout_ms), TimerKind::Idle(id)),
            );
        }
    }

    fn open_push(&mut self, now: Time, actions: &mut Vec<SyncAction>) {
        self.stop_polling(actions);

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscription = Some(Subscription {
            id,
            opened: false,
            received: false,
        });
        self.state = ConnectionState::Connecting;

        if self.config.connect_timeout_ms > 0 {
            self.connect_timer = Some(self.timers.schedule(
                now.after(self.config.connect_timeout_ms),
                TimerKind::ConnectTimeout(id),
            ));
        }
        actions.push(SyncAction::OpenPush(id));
    }

    fn fail_push(&mut self, now: Time, actions: &mut Vec<SyncAction>) {
        if let Some(sub) = self.subscription.take() {
            actions.push(SyncAction::ClosePush(sub.id));
        }
        if let Some(timer) = self.connect_timer.take() {
            self.timers.cancel(timer);
        }
        if let Some(timer) = self.idle_timer.take() {
            self.timers.cancel(timer);
        }
        self.metrics.inc("push.failures");
        self.state = ConnectionState::AwaitingRetry;
        info!(
            "push feed down, polling every {} ms, retry in {} ms",
            self.config.poll_interval_ms, self.config.retry_interval_ms
        );

        if let Some(timer) = self.retry_timer.take() {
            self.timers.cancel(timer);
        }
        self.retry_timer = Some(
            self.timers
                .schedule(now.after(self.config.retry_interval_ms), TimerKind::Retry),
        );
        self.start_polling(now, actions);
    }

    fn start_polling(&mut self, now: Time, actions: &mut Vec<SyncAction>) {
        if self.polling {
            return;
        }
        self.polling = true;
        if self.in_flight.is_none() {
            self.fetch(now, actions);
        }
        self.poll_timer = Some(
            self.timers
                .schedule(now.after(self.config.poll_interval_ms), TimerKind::PollTick),
        );
    }

    fn stop_polling(&mut self, actions: &mut Vec<SyncAction>) {
        self.polling = false;
        if let Some(timer) = self.poll_timer.take() {
            self.timers.cancel(timer);
        }
        if let Some(flight) = self.in_flight.take() {
            actions.push(SyncAction::CancelFetch(flight.id));
        }
    }

    fn fetch(&mut self, now: Time, actions: &mut Vec<SyncAction>) {
        let id = PollId(self.next_poll);
        self.next_poll += 1;
        self.in_flight = Some(InFlight { id, issued: now });
        self.metrics.inc("poll.requests");
        actions.push(SyncAction::Fetch(id));
    }

    fn teardown(&mut self, actions: &mut Vec<SyncAction>) {
        if let Some(sub) = self.subscription.take() {
            actions.push(SyncAction::ClosePush(sub.id));
        }
        self.stop_polling(actions);
        self.timers.clear();
        self.retry_timer = None;
        self.connect_timer = None;
        self.idle_timer = None;
        self.state = ConnectionState::Disconnected;
    }

    fn apply(&mut self, snapshot: StateSnapshot, source: UpdateSource, now: Time) {
        let snapshot = Arc::new(snapshot);
        self.current = Some(Arc::clone(&snapshot));
        self.last_update = Some(now);
        debug!(?source, "snapshot replaced");
        self.listeners.emit(&SnapshotUpdate {
            snapshot,
            source,
            at: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionState, PollId, SubscriptionId, SyncAction, Synchronizer, UpdateSource};
    use crate::config::SyncConfig;
    use crate::error::FeedError;
    use foundation::time::Time;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use scene::StateSnapshot;
    use std::sync::{Arc, Mutex};

    const RETRY: u64 = 60_000;
    const POLL: u64 = 25;

    fn machine() -> Synchronizer {
        Synchronizer::new(SyncConfig {
            connect_timeout_ms: 0,
            idle_timeout_ms: 0,
            ..SyncConfig::default()
        })
    }

    fn t(ms: u64) -> Time {
        Time::from_millis(ms)
    }

    fn paused_snapshot() -> StateSnapshot {
        StateSnapshot {
            paused: true,
            ..StateSnapshot::default()
        }
    }

    fn open(m: &mut Synchronizer, now: Time) -> SubscriptionId {
        let actions = m.set_visible(true, now);
        match actions.as_slice() {
            [SyncAction::OpenPush(id)] => *id,
            other => panic!("expected a single open, got {other:?}"),
        }
    }

    fn assert_exclusive(m: &Synchronizer) {
        assert!(
            !(m.push_active() && m.poll_active()),
            "push and poll active together in {:?}",
            m.state()
        );
    }

    #[test]
    fn visible_view_opens_push() {
        let mut m = machine();
        assert_eq!(m.state(), ConnectionState::Disconnected);
        let sub = open(&mut m, t(0));
        assert_eq!(m.state(), ConnectionState::Connecting);

        m.on_push_open(sub, t(5));
        assert_eq!(m.state(), ConnectionState::Connected);
        assert!(!m.use_push(), "no payload yet");

        m.on_push_message(sub, r#"{"flock": [[1, 2]]}"#, t(10));
        assert!(m.use_push());
        assert_eq!(m.current().unwrap().flock.len(), 1);
    }

    #[test]
    fn failure_starts_polling_in_same_call() {
        let mut m = machine();
        let sub = open(&mut m, t(0));

        let actions = m.on_push_error(sub, t(100));
        assert_eq!(
            actions,
            vec![SyncAction::ClosePush(sub), SyncAction::Fetch(PollId(0))]
        );
        assert_eq!(m.state(), ConnectionState::AwaitingRetry);
        assert!(m.is_polling());
        assert_eq!(m.next_deadline(), Some(t(100 + POLL)));
    }

    #[test]
    fn retry_fires_exactly_after_interval() {
        let mut m = machine();
        let sub = open(&mut m, t(0));
        m.on_push_error(sub, t(1_000));
        let mut poll = 0;

        // Answer every poll immediately and walk the clock tick by tick.
        let mut now = 1_000;
        while now < 1_000 + RETRY - 1 {
            now += POLL.min(1_000 + RETRY - 1 - now);
            m.on_poll_result(PollId(poll), Ok(StateSnapshot::default()), t(now));
            for a in m.advance(t(now)) {
                match a {
                    SyncAction::Fetch(id) => poll = id.0,
                    other => panic!("unexpected {other:?} at {now}"),
                }
            }
            assert_eq!(m.state(), ConnectionState::AwaitingRetry);
        }

        let actions = m.advance(t(1_000 + RETRY));
        assert!(actions.contains(&SyncAction::OpenPush(SubscriptionId(1))));
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(!m.is_polling());
        assert_exclusive(&m);
    }

    #[test]
    fn repeated_failure_uses_same_fixed_interval() {
        let mut m = machine();
        let sub = open(&mut m, t(0));
        m.on_push_error(sub, t(0));
        m.on_poll_result(PollId(0), Ok(StateSnapshot::default()), t(1));
        let actions = m.advance(t(RETRY));
        let second = actions
            .iter()
            .find_map(|a| match a {
                SyncAction::OpenPush(id) => Some(*id),
                _ => None,
            })
            .expect("reopened");

        m.on_push_error(second, t(RETRY + 10));
        assert_eq!(m.state(), ConnectionState::AwaitingRetry);
        let reopened = m.advance(t(2 * RETRY + 10));
        assert!(reopened.contains(&SyncAction::OpenPush(SubscriptionId(2))));
    }

    #[test]
    fn reconnect_abandons_in_flight_poll() {
        let mut m = machine();
        let sub = open(&mut m, t(0));
        m.on_push_error(sub, t(0));

        let actions = m.advance(t(RETRY));
        assert_eq!(
            actions,
            vec![
                SyncAction::CancelFetch(PollId(0)),
                SyncAction::OpenPush(SubscriptionId(1)),
            ]
        );
        // The late answer of the abandoned poll is ignored.
        m.on_poll_result(PollId(0), Ok(paused_snapshot()), t(RETRY + 3));
        assert!(m.current().is_none());
        assert_eq!(m.metrics().counter("poll.superseded"), 1);
    }

    #[test]
    fn no_gap_when_switching_sources() {
        let mut m = machine();
        let sub = open(&mut m, t(0));
        m.on_push_message(sub, r#"{"paused": true}"#, t(1));
        m.on_push_error(sub, t(2));
        assert!(m.current().unwrap().paused, "push data kept while polling");

        m.on_poll_result(PollId(0), Ok(StateSnapshot::default()), t(3));
        assert!(!m.current().unwrap().paused);

        m.advance(t(2 + RETRY));
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(m.current().is_some(), "reconnecting keeps last snapshot");
    }

    #[test]
    fn malformed_payload_counts_as_failure() {
        let mut m = machine();
        let sub = open(&mut m, t(0));
        m.on_push_open(sub, t(1));
        let actions = m.on_push_message(sub, "{not json", t(2));
        assert_eq!(actions[0], SyncAction::ClosePush(sub));
        assert_eq!(m.state(), ConnectionState::AwaitingRetry);
        assert_eq!(m.metrics().counter("push.failures"), 1);
    }

    #[test]
    fn tick_skips_while_poll_in_flight() {
        let mut m = machine();
        let sub = open(&mut m, t(0));
        m.on_push_error(sub, t(0));

        assert!(m.advance(t(POLL)).is_empty());
        assert!(m.advance(t(2 * POLL)).is_empty());
        assert_eq!(m.metrics().counter("poll.skipped"), 2);

        m.on_poll_result(PollId(0), Err(FeedError::Closed), t(2 * POLL + 1));
        assert_eq!(m.metrics().counter("poll.failures"), 1);
        assert_eq!(m.advance(t(3 * POLL)), vec![SyncAction::Fetch(PollId(1))]);
    }

    #[test]
    fn stale_subscription_events_are_ignored() {
        let mut m = machine();
        let first = open(&mut m, t(0));
        m.on_push_error(first, t(1));
        m.advance(t(1 + RETRY));

        assert!(m.on_push_error(first, t(RETRY + 2)).is_empty());
        m.on_push_message(first, r#"{"paused": true}"#, t(RETRY + 3));
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert!(m.current().is_none());
    }

    #[test]
    fn hiding_tears_everything_down() {
        let mut m = machine();
        let sub = open(&mut m, t(0));
        m.on_push_error(sub, t(0));

        let actions = m.set_visible(false, t(5));
        assert_eq!(actions, vec![SyncAction::CancelFetch(PollId(0))]);
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.next_deadline(), None);
        assert!(m.advance(t(10 * RETRY)).is_empty());

        let reopen = m.set_visible(true, t(10 * RETRY));
        assert_eq!(reopen, vec![SyncAction::OpenPush(SubscriptionId(1))]);
    }

    #[test]
    fn connect_timeout_falls_back() {
        let mut m = Synchronizer::new(SyncConfig {
            connect_timeout_ms: 500,
            ..SyncConfig::default()
        });
        let sub = open(&mut m, t(0));
        assert!(m.advance(t(499)).is_empty());
        let actions = m.advance(t(500));
        assert_eq!(
            actions,
            vec![SyncAction::ClosePush(sub), SyncAction::Fetch(PollId(0))]
        );
    }

    #[test]
    fn open_feed_without_snapshot_still_times_out() {
        let mut m = Synchronizer::new(SyncConfig::default());
        let sub = open(&mut m, t(0));
        m.on_push_open(sub, t(5));
        assert_eq!(m.state(), ConnectionState::Connected);
        assert!(m.advance(t(9_999)).is_empty());

        let actions = m.advance(t(10_000));
        assert_eq!(
            actions,
            vec![SyncAction::ClosePush(sub), SyncAction::Fetch(PollId(0))]
        );
        assert_eq!(m.state(), ConnectionState::AwaitingRetry);
        assert!(m.is_polling());

        m.on_poll_result(PollId(0), Ok(paused_snapshot()), t(10_010));
        assert!(m.current().unwrap().paused);
    }

    #[test]
    fn first_snapshot_disarms_connect_timeout() {
        let mut m = Synchronizer::new(SyncConfig {
            connect_timeout_ms: 500,
            idle_timeout_ms: 0,
            ..SyncConfig::default()
        });
        let sub = open(&mut m, t(0));
        m.on_push_message(sub, "{}", t(100));
        assert!(m.advance(t(10_000)).is_empty());
        assert!(m.use_push());
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn silent_feed_fails_after_idle_timeout() {
        let mut m = Synchronizer::new(SyncConfig {
            connect_timeout_ms: 500,
            idle_timeout_ms: 1_000,
            ..SyncConfig::default()
        });
        let sub = open(&mut m, t(0));
        m.on_push_message(sub, "{}", t(100));
        m.on_push_message(sub, "{}", t(1_000));
        m.on_push_message(sub, "{}", t(1_900));
        assert!(m.advance(t(2_899)).is_empty());
        assert!(m.use_push());

        let actions = m.advance(t(2_900));
        assert_eq!(
            actions,
            vec![SyncAction::ClosePush(sub), SyncAction::Fetch(PollId(0))]
        );
        assert!(!m.use_push());
        assert!(m.is_polling());
        assert!(m.current().is_some(), "last pushed snapshot kept");
        assert_eq!(m.metrics().counter("push.failures"), 1);

        // The retry gets a fresh watchdog.
        let reopened = m.advance(t(2_900 + RETRY));
        assert!(reopened.contains(&SyncAction::OpenPush(SubscriptionId(1))));
        m.on_push_message(SubscriptionId(1), "{}", t(2_950 + RETRY));
        assert!(m.use_push());
        assert!(!m.is_polling());
    }

    #[test]
    fn staleness_tracks_last_update() {
        let mut m = machine();
        assert!(!m.is_stale(t(1_000_000)));
        let sub = open(&mut m, t(0));
        m.on_push_message(sub, "{}", t(100));
        assert_eq!(m.staleness(t(600)), Some(500));
        assert!(!m.is_stale(t(5_100)));
        assert!(m.is_stale(t(5_101)));
    }

    #[test]
    fn listeners_see_every_update_until_unsubscribed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut m = machine();
        let sink = Arc::clone(&seen);
        let handle = m.subscribe(move |u| sink.lock().unwrap().push(u.source));

        let sub = open(&mut m, t(0));
        m.on_push_message(sub, "{}", t(1));
        m.on_push_error(sub, t(2));
        m.on_poll_result(PollId(0), Ok(StateSnapshot::default()), t(3));
        assert!(m.unsubscribe(handle));
        m.advance(t(POLL + 2));
        m.on_poll_result(PollId(1), Ok(StateSnapshot::default()), t(POLL + 3));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![UpdateSource::Push, UpdateSource::Poll]
        );
    }

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Visible(bool),
        Open,
        Message,
        PushError,
        PollOk,
        PollErr,
        Advance,
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            1 => prop::bool::weighted(0.75).prop_map(Step::Visible),
            1 => Just(Step::Open),
            1 => Just(Step::Message),
            1 => Just(Step::PushError),
            1 => Just(Step::PollOk),
            1 => Just(Step::PollErr),
            3 => Just(Step::Advance),
        ]
    }

    proptest! {
        #[test]
        fn push_and_poll_never_overlap(
            script in prop::collection::vec((step(), 0u64..40), 1..300),
        ) {
            let mut m = Synchronizer::new(SyncConfig {
                retry_interval_ms: 200,
                poll_interval_ms: 25,
                connect_timeout_ms: 80,
                idle_timeout_ms: 120,
                ..SyncConfig::default()
            });
            let mut now = 0u64;
            let mut sub = None;
            let mut poll = None;

            for (step, dt) in script {
                now += dt;
                let actions = match step {
                    Step::Visible(v) => m.set_visible(v, t(now)),
                    Step::Open => sub.map_or_else(Vec::new, |s| m.on_push_open(s, t(now))),
                    Step::Message => sub.map_or_else(Vec::new, |s| m.on_push_message(s, "{}", t(now))),
                    Step::PushError => sub.map_or_else(Vec::new, |s| m.on_push_error(s, t(now))),
                    Step::PollOk => poll.map_or_else(Vec::new, |p| {
                        m.on_poll_result(p, Ok(StateSnapshot::default()), t(now))
                    }),
                    Step::PollErr => poll.map_or_else(Vec::new, |p| {
                        m.on_poll_result(p, Err(FeedError::Closed), t(now))
                    }),
                    Step::Advance => m.advance(t(now)),
                };
                for a in actions {
                    match a {
                        SyncAction::OpenPush(id) => sub = Some(id),
                        SyncAction::ClosePush(_) => sub = None,
                        SyncAction::Fetch(id) => poll = Some(id),
                        SyncAction::CancelFetch(_) => poll = None,
                    }
                }

                prop_assert!(
                    !(m.push_active() && m.poll_active()),
                    "push and poll active together in {:?}",
                    m.state()
                );
                if m.state() == ConnectionState::AwaitingRetry {
                    prop_assert!(m.is_polling());
                }
                if m.use_push() {
                    prop_assert!(!m.is_polling());
                }
                if !m.is_visible() {
                    prop_assert_eq!(m.state(), ConnectionState::Disconnected);
                    prop_assert_eq!(m.next_deadline(), None);
                }
            }
        }
    }
}
