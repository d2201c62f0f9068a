//! Tokio driver for the [`Synchronizer`].
//!
//! One task owns the machine and serializes every input through a
//! `select!` loop: caller commands, transport events, and the next timer
//! deadline. Push and poll I/O run in their own tasks; the machine's
//! `ClosePush`/`CancelFetch` actions abort them, and anything they report
//! afterwards carries a stale id and is dropped by the machine.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use foundation::time::Time;
use futures_util::{Stream, StreamExt};
use runtime::metrics::MetricsSnapshot;
use scene::StateSnapshot;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::FeedError;
use crate::sync::{ConnectionState, PollId, SubscriptionId, SyncAction, Synchronizer};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One dispatched server-sent event. An unnamed event is reported as
/// `"message"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub event: String,
    pub data: String,
}

/// Decoded push events; the stream ending counts as an abnormal close.
pub type PushStream = Pin<Box<dyn Stream<Item = Result<PushEvent, FeedError>> + Send>>;

/// Where snapshots come from.
///
/// Methods return boxed futures for dyn-compatibility.
pub trait FeedTransport: Send + Sync + 'static {
    /// One-shot fetch of the full state.
    fn fetch_state(&self) -> BoxFuture<'_, Result<StateSnapshot, FeedError>>;

    /// Opens the push subscription. Resolving `Ok` is the open signal.
    fn open_push(&self) -> BoxFuture<'_, Result<PushStream, FeedError>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    pub state: ConnectionState,
    pub use_push: bool,
    pub polling: bool,
}

impl Default for FeedStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            use_push: false,
            polling: false,
        }
    }
}

/// Point-in-time view of the feed for status displays.
#[derive(Debug, Clone)]
pub struct FeedReport {
    pub status: FeedStatus,
    pub staleness_ms: Option<u64>,
    pub stale: bool,
    pub metrics: MetricsSnapshot,
}

enum Command {
    SetVisible(bool, oneshot::Sender<()>),
    Report(oneshot::Sender<FeedReport>),
    Shutdown,
}

enum TransportEvent {
    PushOpened(SubscriptionId),
    PushMessage(SubscriptionId, String),
    PushFailed(SubscriptionId),
    Polled(PollId, Result<StateSnapshot, FeedError>),
}

/// Handle to a running feed. Dropping it stops the driver task.
pub struct LiveFeed {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Option<Arc<StateSnapshot>>>,
    status: watch::Receiver<FeedStatus>,
    task: Option<JoinHandle<()>>,
}

impl LiveFeed {
    /// Starts the driver. The feed stays idle until [`LiveFeed::set_visible`].
    pub fn spawn<T: FeedTransport>(transport: Arc<T>, config: SyncConfig) -> Result<Self, FeedError> {
        config.validate()?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(FeedStatus::default());

        let event_name = config.event_name.clone();
        let mut machine = Synchronizer::new(config);
        machine.subscribe(move |update| {
            snapshot_tx.send_replace(Some(Arc::clone(&update.snapshot)));
        });

        let driver = Driver {
            machine,
            transport,
            event_name: Arc::from(event_name),
            events_tx,
            status_tx,
            push_task: None,
            poll_task: None,
            origin: Instant::now(),
        };
        let task = tokio::spawn(driver.run(commands_rx, events_rx));

        Ok(Self {
            commands: commands_tx,
            snapshots: snapshot_rx,
            status: status_rx,
            task: Some(task),
        })
    }

    /// Arms (visible) or tears down (hidden) the feed. Returns once the
    /// driver has applied the change.
    pub async fn set_visible(&self, visible: bool) -> Result<(), FeedError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::SetVisible(visible, ack_tx))
            .map_err(|_| FeedError::Closed)?;
        ack_rx.await.map_err(|_| FeedError::Closed)
    }

    pub async fn report(&self) -> Result<FeedReport, FeedError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Report(tx))
            .map_err(|_| FeedError::Closed)?;
        rx.await.map_err(|_| FeedError::Closed)
    }

    pub fn current(&self) -> Option<Arc<StateSnapshot>> {
        self.snapshots.borrow().clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<Option<Arc<StateSnapshot>>> {
        self.snapshots.clone()
    }

    pub fn status(&self) -> watch::Receiver<FeedStatus> {
        self.status.clone()
    }

    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Driver<T> {
    machine: Synchronizer,
    transport: Arc<T>,
    event_name: Arc<str>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    status_tx: watch::Sender<FeedStatus>,
    push_task: Option<(SubscriptionId, JoinHandle<()>)>,
    poll_task: Option<(PollId, JoinHandle<()>)>,
    origin: Instant,
}

impl<T: FeedTransport> Driver<T> {
    fn now(&self) -> Time {
        Time::from_millis(self.origin.elapsed().as_millis() as u64)
    }

    fn instant_at(&self, t: Time) -> Instant {
        self.origin + Duration::from_millis(t.as_millis())
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        loop {
            let deadline = self.machine.next_deadline().map(|t| self.instant_at(t));
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::SetVisible(visible, ack)) => {
                        let now = self.now();
                        let actions = self.machine.set_visible(visible, now);
                        self.perform(actions);
                        let _ = ack.send(());
                    }
                    Some(Command::Report(reply)) => {
                        let _ = reply.send(self.report());
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = events.recv() => {
                    let now = self.now();
                    let actions = match event {
                        TransportEvent::PushOpened(id) => self.machine.on_push_open(id, now),
                        TransportEvent::PushMessage(id, data) => {
                            self.machine.on_push_message(id, &data, now)
                        }
                        TransportEvent::PushFailed(id) => self.machine.on_push_error(id, now),
                        TransportEvent::Polled(id, result) => {
                            self.clear_poll_task(id);
                            self.machine.on_poll_result(id, result, now)
                        }
                    };
                    self.perform(actions);
                }
                _ = sleep_until(deadline) => {
                    let now = self.now();
                    let actions = self.machine.advance(now);
                    self.perform(actions);
                }
            }
        }

        if let Some((_, task)) = self.push_task.take() {
            task.abort();
        }
        if let Some((_, task)) = self.poll_task.take() {
            task.abort();
        }
        debug!("live feed driver stopped");
    }

    fn perform(&mut self, actions: Vec<SyncAction>) {
        for action in actions {
            match action {
                SyncAction::OpenPush(id) => {
                    let task = tokio::spawn(run_push(
                        Arc::clone(&self.transport),
                        id,
                        Arc::clone(&self.event_name),
                        self.events_tx.clone(),
                    ));
                    if let Some((_, old)) = self.push_task.replace((id, task)) {
                        old.abort();
                    }
                }
                SyncAction::ClosePush(id) => {
                    if let Some((current, task)) = self.push_task.take() {
                        if current == id {
                            task.abort();
                        } else {
                            self.push_task = Some((current, task));
                        }
                    }
                }
                SyncAction::Fetch(id) => {
                    let transport = Arc::clone(&self.transport);
                    let events = self.events_tx.clone();
                    let task = tokio::spawn(async move {
                        let result = transport.fetch_state().await;
                        let _ = events.send(TransportEvent::Polled(id, result));
                    });
                    if let Some((_, old)) = self.poll_task.replace((id, task)) {
                        old.abort();
                    }
                }
                SyncAction::CancelFetch(id) => {
                    if let Some((current, task)) = self.poll_task.take() {
                        if current == id {
                            task.abort();
                        } else {
                            self.poll_task = Some((current, task));
                        }
                    }
                }
            }
        }
        self.publish_status();
    }

    fn clear_poll_task(&mut self, id: PollId) {
        if self.poll_task.as_ref().is_some_and(|(current, _)| *current == id) {
            self.poll_task = None;
        }
    }

    fn status(&self) -> FeedStatus {
        FeedStatus {
            state: self.machine.state(),
            use_push: self.machine.use_push(),
            polling: self.machine.is_polling(),
        }
    }

    fn publish_status(&self) {
        let status = self.status();
        self.status_tx.send_if_modified(|slot| {
            if *slot == status {
                false
            } else {
                *slot = status;
                true
            }
        });
    }

    fn report(&self) -> FeedReport {
        let now = self.now();
        FeedReport {
            status: self.status(),
            staleness_ms: self.machine.staleness(now),
            stale: self.machine.is_stale(now),
            metrics: self.machine.metrics().snapshot(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn run_push<T: FeedTransport>(
    transport: Arc<T>,
    id: SubscriptionId,
    event_name: Arc<str>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut stream = match transport.open_push().await {
        Ok(stream) => stream,
        Err(err) => {
            warn!("push feed failed to open: {err}");
            let _ = events.send(TransportEvent::PushFailed(id));
            return;
        }
    };
    let _ = events.send(TransportEvent::PushOpened(id));

    while let Some(item) = stream.next().await {
        match item {
            Ok(event) if event.event == *event_name => {
                if events.send(TransportEvent::PushMessage(id, event.data)).is_err() {
                    return;
                }
            }
            Ok(event) => debug!("ignoring push event {:?}", event.event),
            Err(err) => {
                warn!("push feed error: {err}");
                let _ = events.send(TransportEvent::PushFailed(id));
                return;
            }
        }
    }
    warn!("push feed closed by server");
    let _ = events.send(TransportEvent::PushFailed(id));
}
