use async_trait::async_trait;
use claps::widget::{ApiError, Phase, Reaction};
use claps::{
    Aggregate, ClapWidget, CounterApi, CounterError, CounterService, MemoryStore, WidgetOptions,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const PAGE: &str = "CLAP:https://example.com/post";

/// Widget-side view of an in-process counter, recording every submitted delta.
struct InProcessApi {
    counter: Arc<CounterService>,
    visitor: String,
    latency: Duration,
    submitted: Arc<Mutex<Vec<u64>>>,
}

#[async_trait]
impl CounterApi for InProcessApi {
    async fn read(&self) -> Result<Aggregate, ApiError> {
        self.counter.read(PAGE, &self.visitor).await.map_err(to_api)
    }

    async fn increment(&self, score: u64) -> Result<Aggregate, ApiError> {
        self.submitted.lock().unwrap().push(score);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        self.counter
            .increment(PAGE, &self.visitor, score)
            .await
            .map_err(to_api)
    }
}

fn to_api(err: CounterError) -> ApiError {
    let status = match err {
        CounterError::InvalidRequest(_) => 400,
        CounterError::LimitExceeded { .. } => 403,
        CounterError::ServiceUnavailable(_) => 500,
    };
    ApiError::Status {
        status,
        message: err.to_string(),
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    counter: Arc<CounterService>,
    submitted: Arc<Mutex<Vec<u64>>>,
}

impl Harness {
    fn new(max_score: u64) -> Self {
        let store = Arc::new(MemoryStore::new());
        let counter = Arc::new(CounterService::new(store.clone(), max_score));
        Self {
            store,
            counter,
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn mount(&self, latency: Duration) -> ClapWidget<InProcessApi> {
        let api = InProcessApi {
            counter: Arc::clone(&self.counter),
            visitor: "me".to_string(),
            latency,
            submitted: Arc::clone(&self.submitted),
        };
        ClapWidget::mount(api, WidgetOptions::default())
    }

    fn submitted(&self) -> Vec<u64> {
        self.submitted.lock().unwrap().clone()
    }
}

async fn burst(widget: &ClapWidget<InProcessApi>, clicks: usize) {
    for _ in 0..clicks {
        widget.click().await;
        sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn mount_loads_the_confirmed_aggregate() {
    let harness = Harness::new(30);
    harness.counter.increment(PAGE, "someone", 7).await.unwrap();

    let widget = harness.mount(Duration::ZERO);
    assert_eq!(widget.snapshot().phase, Phase::Loading);

    let snapshot = widget.ready().await;
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.total_score, 7);
    assert_eq!(snapshot.total_users, 1);
    assert_eq!(snapshot.user_score, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_load_shows_zeros() {
    let harness = Harness::new(30);
    harness.store.set_unavailable(true);

    let snapshot = harness.mount(Duration::ZERO).ready().await;
    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.total_score, 0);
}

#[tokio::test(start_paused = true)]
async fn burst_is_one_submission() {
    let harness = Harness::new(30);
    let widget = harness.mount(Duration::ZERO);
    widget.ready().await;

    burst(&widget, 5).await;
    let optimistic = widget.snapshot();
    assert_eq!(optimistic.phase, Phase::Interacting);
    assert_eq!(optimistic.total_score, 5);
    assert!(harness.submitted().is_empty());

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(harness.submitted(), vec![5]);
    let confirmed = widget.snapshot();
    assert_eq!(confirmed.phase, Phase::Ready);
    assert_eq!(confirmed.user_score, 5);
    assert_eq!(confirmed.reaction, Reaction::Accepted);

    sleep(Duration::from_millis(600)).await;
    assert_eq!(widget.snapshot().reaction, Reaction::Idle);
}

#[tokio::test(start_paused = true)]
async fn cap_scenario_ends_rejected_at_thirty() {
    let harness = Harness::new(30);
    let widget = harness.mount(Duration::ZERO);
    widget.ready().await;

    burst(&widget, 5).await;
    sleep(Duration::from_millis(1700)).await;
    assert_eq!(widget.snapshot().user_score, 5);

    burst(&widget, 40).await;
    assert_eq!(widget.snapshot().user_score, 30);
    sleep(Duration::from_millis(1700)).await;
    let full = widget.snapshot();
    assert_eq!(full.user_score, 30);
    assert_eq!(full.total_score, 30);

    widget.click().await;
    sleep(Duration::from_millis(1100)).await;
    let rejected = widget.snapshot();
    assert_eq!(rejected.reaction, Reaction::Rejected);
    assert_eq!(rejected.total_score, 30);
    assert_eq!(rejected.pending, 0);

    assert_eq!(harness.submitted(), vec![5, 25]);
    let stored = harness.counter.read(PAGE, "me").await.unwrap();
    assert_eq!(stored.user_score, 30);
}

#[tokio::test(start_paused = true)]
async fn server_rejection_reverts_optimistic_claps() {
    let harness = Harness::new(30);
    let widget = harness.mount(Duration::ZERO);
    widget.ready().await;

    // Someone else already used this visitor's allowance behind the widget's back.
    harness.counter.increment(PAGE, "me", 30).await.unwrap();

    burst(&widget, 3).await;
    assert_eq!(widget.snapshot().total_score, 3);
    sleep(Duration::from_millis(1000)).await;

    let snapshot = widget.snapshot();
    assert_eq!(harness.submitted(), vec![3]);
    assert_eq!(snapshot.reaction, Reaction::Rejected);
    assert_eq!(snapshot.total_score, 0);
    assert_eq!(snapshot.pending, 0);
}

#[tokio::test(start_paused = true)]
async fn outage_reverts_optimistic_claps() {
    let harness = Harness::new(30);
    let widget = harness.mount(Duration::ZERO);
    widget.ready().await;

    burst(&widget, 2).await;
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(widget.snapshot().user_score, 2);

    harness.store.set_unavailable(true);
    burst(&widget, 4).await;
    sleep(Duration::from_millis(1000)).await;

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.reaction, Reaction::Rejected);
    assert_eq!(snapshot.user_score, 2);
    assert_eq!(snapshot.total_score, 2);
}

#[tokio::test(start_paused = true)]
async fn unmount_cancels_pending_submission() {
    let harness = Harness::new(30);
    let widget = harness.mount(Duration::ZERO);
    widget.ready().await;

    burst(&widget, 3).await;
    widget.unmount();
    sleep(Duration::from_millis(2000)).await;

    assert!(harness.submitted().is_empty());
    assert_eq!(harness.counter.read(PAGE, "me").await.unwrap().user_score, 0);
}

#[tokio::test(start_paused = true)]
async fn unmount_discards_in_flight_result() {
    let harness = Harness::new(30);
    let widget = harness.mount(Duration::from_millis(500));
    widget.ready().await;
    let updates = widget.subscribe();

    burst(&widget, 4).await;
    // Timer fires at 1000ms after the last click; the request then takes 500ms.
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(harness.submitted(), vec![4]);
    widget.unmount();

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(harness.counter.read(PAGE, "me").await.unwrap().user_score, 4);
    let last = *updates.borrow();
    assert_eq!(last.reaction, Reaction::Idle);
    assert_eq!(last.pending, 4);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_widget_cancels_pending_submission() {
    let harness = Harness::new(30);
    let widget = harness.mount(Duration::ZERO);
    widget.ready().await;

    burst(&widget, 3).await;
    drop(widget);
    sleep(Duration::from_millis(2000)).await;

    assert!(harness.submitted().is_empty());
    assert_eq!(harness.counter.read(PAGE, "me").await.unwrap().user_score, 0);
}

#[tokio::test(start_paused = true)]
async fn click_past_cap_during_flight_stays_local() {
    let harness = Harness::new(30);
    harness.counter.increment(PAGE, "me", 29).await.unwrap();
    let widget = harness.mount(Duration::from_millis(1500));
    widget.ready().await;

    widget.click().await;
    // Timer fires at 1000ms; the request is in flight until 2500ms.
    sleep(Duration::from_millis(1100)).await;
    widget.click().await;
    assert_eq!(widget.snapshot().user_score, 30);

    // Second timer fires at 2100ms with nothing buffered.
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(harness.submitted(), vec![1]);
    assert_eq!(widget.snapshot().reaction, Reaction::Rejected);

    sleep(Duration::from_millis(500)).await;
    let settled = widget.snapshot();
    assert_eq!(settled.reaction, Reaction::Accepted);
    assert_eq!(settled.user_score, 30);
    assert_eq!(settled.pending, 0);
    assert_eq!(harness.submitted(), vec![1]);
}
