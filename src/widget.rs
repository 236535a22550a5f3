//! Client side of the clap button.
//!
//! [`WidgetState`] is the plain state machine: confirmed aggregate from the
//! server, clicks buffered since the last submission and clicks currently in
//! flight. [`ClapWidget`] drives it on a tokio runtime, owning the trailing
//! debounce timer and publishing a [`Snapshot`] after every transition.
//!
//! The server is always trusted: a successful submission replaces the
//! confirmed aggregate, a failed one simply drops the submitted clicks.

use crate::models::Aggregate;
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::warn;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const DEFAULT_REACTION: Duration = Duration::from_millis(600);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("clap limit already reached")]
    LimitReached,

    #[error("counter responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("counter request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The counter endpoint as seen from one widget (page key and visitor are fixed).
#[async_trait]
pub trait CounterApi: Send + Sync {
    async fn read(&self) -> Result<Aggregate, ApiError>;

    async fn increment(&self, score: u64) -> Result<Aggregate, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Interacting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Idle,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy)]
pub struct WidgetOptions {
    pub debounce: Duration,
    pub reaction: Duration,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            reaction: DEFAULT_REACTION,
        }
    }
}

/// What a submission carries when its timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub score: u64,
    /// Confirmed aggregate at the moment the timer fired.
    pub confirmed: Aggregate,
}

#[derive(Debug, Clone)]
pub struct WidgetState {
    loading: bool,
    confirmed: Aggregate,
    buffered: u64,
    in_flight: u64,
    ticket: u64,
}

impl Default for WidgetState {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetState {
    pub fn new() -> Self {
        Self {
            loading: true,
            confirmed: Aggregate::default(),
            buffered: 0,
            in_flight: 0,
            ticket: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.buffered + self.in_flight > 0 {
            Phase::Interacting
        } else {
            Phase::Ready
        }
    }

    pub fn confirmed(&self) -> Aggregate {
        self.confirmed
    }

    pub fn buffered(&self) -> u64 {
        self.buffered
    }

    pub fn in_flight(&self) -> u64 {
        self.in_flight
    }

    /// Confirmed total plus every click not yet confirmed.
    pub fn display_total(&self) -> u64 {
        self.confirmed.total_score + self.in_flight + self.buffered
    }

    pub fn display_user_score(&self) -> u64 {
        self.confirmed.user_score + self.in_flight + self.buffered
    }

    /// Initial read finished. A failed read leaves zeros on display.
    pub fn loaded(&mut self, aggregate: Option<Aggregate>) {
        if let Some(aggregate) = aggregate {
            self.confirmed = aggregate;
        }
        self.loading = false;
    }

    /// Buffers a click and returns the ticket the debounce timer must present.
    /// Every click restarts the window, so only the latest ticket submits.
    pub fn click(&mut self) -> Option<u64> {
        if self.loading {
            return None;
        }
        if self.display_user_score() < self.confirmed.max_score {
            self.buffered += 1;
        }
        self.ticket += 1;
        Some(self.ticket)
    }

    /// Timer for `ticket` expired. Stale tickets are ignored.
    pub fn due(&mut self, ticket: u64) -> Option<Submission> {
        if ticket != self.ticket {
            return None;
        }
        let submission = Submission {
            score: self.buffered,
            confirmed: self.confirmed,
        };
        self.in_flight += self.buffered;
        self.buffered = 0;
        Some(submission)
    }

    /// Applies the server's answer to `submission`.
    pub fn settle(&mut self, submission: &Submission, outcome: Option<Aggregate>) -> Reaction {
        self.in_flight = self.in_flight.saturating_sub(submission.score);
        match outcome {
            Some(aggregate) => {
                self.confirmed = aggregate;
                Reaction::Accepted
            }
            None => Reaction::Rejected,
        }
    }
}

/// What a renderer needs to draw the button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: Phase,
    pub total_score: u64,
    pub user_score: u64,
    pub total_users: u64,
    /// Clicks not yet confirmed, buffered or in flight.
    pub pending: u64,
    pub reaction: Reaction,
}

struct Inner {
    machine: WidgetState,
    reaction: Reaction,
    pulse: u64,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        let confirmed = self.machine.confirmed();
        Snapshot {
            phase: self.machine.phase(),
            total_score: self.machine.display_total(),
            user_score: self.machine.display_user_score(),
            total_users: confirmed.total_users,
            pending: self.machine.buffered() + self.machine.in_flight(),
            reaction: self.reaction,
        }
    }
}

struct Shared<A> {
    api: A,
    options: WidgetOptions,
    inner: Mutex<Inner>,
    updates: watch::Sender<Snapshot>,
    mounted: AtomicBool,
}

impl<A: CounterApi + 'static> Shared<A> {
    fn publish(&self, inner: &Inner) {
        self.updates.send_replace(inner.snapshot());
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    async fn load(&self) {
        let aggregate = match self.api.read().await {
            Ok(aggregate) => Some(aggregate),
            Err(err) => {
                warn!("failed to load claps: {err}");
                None
            }
        };
        if !self.is_mounted() {
            return;
        }
        let mut inner = self.inner.lock().await;
        inner.machine.loaded(aggregate);
        self.publish(&inner);
    }

    async fn fire(self: Arc<Self>, ticket: u64) {
        if !self.is_mounted() {
            return;
        }
        let submission = {
            let mut inner = self.inner.lock().await;
            let submission = inner.machine.due(ticket);
            self.publish(&inner);
            submission
        };
        let Some(submission) = submission else {
            return;
        };

        // Nothing buffered means every click hit the cap; the server has nothing to add.
        let at_cap = submission.confirmed.user_score >= submission.confirmed.max_score;
        let outcome = if submission.score == 0 || at_cap {
            Err(ApiError::LimitReached)
        } else {
            self.api.increment(submission.score).await
        };
        let aggregate = match outcome {
            Ok(aggregate) => Some(aggregate),
            Err(err) => {
                warn!("clap submission of {} rejected: {err}", submission.score);
                None
            }
        };

        // Results of requests that outlive the widget are dropped.
        if !self.is_mounted() {
            return;
        }
        let pulse = {
            let mut inner = self.inner.lock().await;
            inner.reaction = inner.machine.settle(&submission, aggregate);
            inner.pulse += 1;
            self.publish(&inner);
            inner.pulse
        };

        sleep(self.options.reaction).await;
        let mut inner = self.inner.lock().await;
        if inner.pulse == pulse {
            inner.reaction = Reaction::Idle;
            self.publish(&inner);
        }
    }
}

/// A mounted clap button. Must be created inside a tokio runtime.
pub struct ClapWidget<A> {
    shared: Arc<Shared<A>>,
}

impl<A: CounterApi + 'static> ClapWidget<A> {
    /// Starts in `Loading` and issues the initial read in the background.
    pub fn mount(api: A, options: WidgetOptions) -> Self {
        let state = Inner {
            machine: WidgetState::new(),
            reaction: Reaction::Idle,
            pulse: 0,
        };
        let (updates, _) = watch::channel(state.snapshot());
        let shared = Arc::new(Shared {
            api,
            options,
            inner: Mutex::new(state),
            updates,
            mounted: AtomicBool::new(true),
        });

        let loader = Arc::clone(&shared);
        tokio::spawn(async move { loader.load().await });

        Self { shared }
    }

    pub fn snapshot(&self) -> Snapshot {
        *self.shared.updates.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.updates.subscribe()
    }

    /// Waits for the initial read to finish, successfully or not.
    pub async fn ready(&self) -> Snapshot {
        let mut updates = self.subscribe();
        match updates
            .wait_for(|snapshot| snapshot.phase != Phase::Loading)
            .await
        {
            Ok(snapshot) => *snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Ignored while loading. Otherwise buffers one clap and (re)starts the debounce window.
    pub async fn click(&self) {
        let ticket = {
            let mut inner = self.shared.inner.lock().await;
            let ticket = inner.machine.click();
            self.shared.publish(&inner);
            ticket
        };
        let Some(ticket) = ticket else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            sleep(shared.options.debounce).await;
            shared.fire(ticket).await;
        });
    }

    /// Tears the widget down. Pending timers no longer submit; requests already
    /// in flight complete but their results are discarded. Dropping the widget
    /// does the same.
    pub fn unmount(self) {
        drop(self);
    }
}

impl<A> Drop for ClapWidget<A> {
    fn drop(&mut self) {
        self.shared.mounted.store(false, Ordering::SeqCst);
    }
}
