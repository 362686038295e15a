//! Handover between the periodic job, the foreground loop and external push.

use crate::helpers::{EMPTY_FEED, Harness, RecordingRenderer, ScriptedFeed};
use notification_master::ActiveService;
use notification_master::host::ErrorCode;
use notification_master::platform::JobHost;
use notification_master::registry::ServiceMechanism;
use notification_master::scheduler::{POLLING_JOB_NAME, SessionState};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const POLL_URL: &str = "https://poll.example.com/pending";
const FG_URL: &str = "https://fg.example.com/pending";
const FG_URL_B: &str = "https://fg-b.example.com/pending";

fn start_polling(h: &Harness, url: &str, minutes: u32) {
    let started = h
        .plugin
        .invoke(
            "startNotificationPolling",
            &json!({"pollingUrl": url, "intervalMinutes": minutes}),
        )
        .expect("start polling");
    assert_eq!(started, json!(true));
}

fn start_foreground(h: &Harness, url: &str, minutes: u32) {
    let started = h
        .plugin
        .invoke(
            "startForegroundService",
            &json!({"pollingUrl": url, "intervalMinutes": minutes}),
        )
        .expect("start foreground");
    assert_eq!(started, json!(true));
}

fn active(h: &Harness) -> Value {
    h.plugin
        .invoke("getActiveNotificationService", &Value::Null)
        .expect("active service")
}

#[tokio::test(start_paused = true)]
async fn switching_to_foreground_cancels_periodic_job() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    start_polling(&h, POLL_URL, 15);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.feed.fetches_of(POLL_URL), 1);

    start_foreground(&h, FG_URL, 5);
    assert!(!h.jobs.is_scheduled(POLLING_JOB_NAME));
    assert_eq!(active(&h), json!("foreground"));

    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
    assert_eq!(h.feed.fetches_of(POLL_URL), 1);
    assert!(h.feed.fetches_of(FG_URL) >= 24);
}

#[tokio::test(start_paused = true)]
async fn switching_to_polling_stops_foreground_loop() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    start_foreground(&h, FG_URL, 1);
    tokio::time::sleep(Duration::from_secs(1)).await;

    start_polling(&h, POLL_URL, 15);
    let foreground_fetches = h.feed.fetches_of(FG_URL);
    assert_eq!(h.plugin.session().state(), SessionState::Stopped);
    assert!(
        h.renderer
            .cleared
            .lock()
            .expect("lock cleared")
            .contains(&1001)
    );

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(h.feed.fetches_of(FG_URL), foreground_fetches);
    assert!(h.feed.fetches_of(POLL_URL) >= 4);
}

struct CountingMechanism(AtomicUsize);

impl ServiceMechanism for CountingMechanism {
    fn deactivate(&self) -> notification_master::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn selecting_the_same_service_twice_deactivates_once() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let registry = h.plugin.registry();
    registry.set_active(ActiveService::ExternalPush).unwrap();

    let counter = Arc::new(CountingMechanism(AtomicUsize::new(0)));
    let hook: Arc<dyn ServiceMechanism> = counter.clone();
    registry.attach(ActiveService::ExternalPush, Arc::downgrade(&hook));

    assert!(registry.set_active(ActiveService::ForegroundSession).unwrap());
    assert!(!registry.set_active(ActiveService::ForegroundSession).unwrap());
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn second_foreground_start_supersedes_first() {
    let h = Harness::new(ScriptedFeed::slow(EMPTY_FEED, Duration::from_secs(30)));
    start_foreground(&h, FG_URL, 1);
    tokio::time::sleep(Duration::from_secs(1)).await;
    start_foreground(&h, FG_URL_B, 1);

    tokio::time::sleep(Duration::from_secs(600)).await;

    let fetched = h.feed.fetched();
    assert_eq!(fetched[0], FG_URL);
    assert!(fetched[1..].iter().all(|url| url == FG_URL_B));
    assert!(fetched.len() > 2);
    assert_eq!(h.feed.max_in_flight.load(Ordering::SeqCst), 1);

    let persisted = h.persisted().load_config().unwrap().unwrap();
    assert_eq!(persisted.feed_url.as_str(), FG_URL_B);
    assert_eq!(
        h.plugin.session().current_config().unwrap().feed_url.as_str(),
        FG_URL_B
    );
}

#[tokio::test]
async fn stopping_an_inactive_mechanism_leaves_the_active_one() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    start_foreground(&h, FG_URL, 15);

    h.plugin
        .invoke("stopNotificationPolling", &Value::Null)
        .unwrap();
    assert_eq!(active(&h), json!("foreground"));
    assert_eq!(h.plugin.session().state(), SessionState::Active);

    h.plugin
        .invoke("setFirebaseAsActiveService", &Value::Null)
        .unwrap();
    assert_eq!(h.plugin.session().state(), SessionState::Stopped);
    h.plugin
        .invoke("stopForegroundService", &Value::Null)
        .unwrap();
    assert_eq!(active(&h), json!("firebase"));
}

#[tokio::test(start_paused = true)]
async fn restart_resumes_periodic_polling() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    start_polling(&h, POLL_URL, 30);
    let Harness {
        dir,
        feed,
        renderer,
        ..
    } = h;

    let restarted = Harness::in_dir(dir, feed, renderer);
    assert_eq!(restarted.plugin.restore(), ActiveService::Polling);
    assert!(restarted.jobs.is_scheduled(POLLING_JOB_NAME));

    let persisted = restarted.persisted();
    assert!(persisted.polling_enabled().unwrap());
    assert_eq!(persisted.load_config().unwrap().unwrap().interval_minutes, 30);
}

#[tokio::test(start_paused = true)]
async fn restart_resumes_foreground_session() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    start_foreground(&h, FG_URL, 10);
    let Harness {
        dir,
        feed,
        renderer,
        ..
    } = h;

    let restarted = Harness::in_dir(dir, feed, renderer);
    assert_eq!(restarted.plugin.restore(), ActiveService::ForegroundSession);
    assert_eq!(restarted.plugin.session().state(), SessionState::Active);
    assert!(!restarted.jobs.is_scheduled(POLLING_JOB_NAME));
    assert_eq!(restarted.renderer.statuses.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_after_stopping_inactive_foreground_resumes_polling() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    start_polling(&h, POLL_URL, 15);
    h.plugin
        .invoke("stopForegroundService", &Value::Null)
        .unwrap();
    assert_eq!(active(&h), json!("polling"));
    assert!(h.persisted().polling_enabled().unwrap());

    let Harness {
        dir,
        feed,
        renderer,
        ..
    } = h;
    let restarted = Harness::in_dir(dir, feed, renderer);
    assert_eq!(restarted.plugin.restore(), ActiveService::Polling);
    assert!(restarted.jobs.is_scheduled(POLLING_JOB_NAME));
}

#[tokio::test(start_paused = true)]
async fn failed_foreground_start_keeps_polling_active() {
    let h = Harness::with_renderer(
        ScriptedFeed::new(EMPTY_FEED),
        RecordingRenderer::failing_status(),
    );
    start_polling(&h, POLL_URL, 15);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let err = h
        .plugin
        .invoke(
            "startForegroundService",
            &json!({"pollingUrl": FG_URL, "intervalMinutes": 5}),
        )
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ServiceError);
    assert_eq!(active(&h), json!("polling"));
    assert!(h.jobs.is_scheduled(POLLING_JOB_NAME));
    assert_eq!(h.plugin.session().state(), SessionState::Stopped);

    let persisted = h.persisted().load_config().unwrap().unwrap();
    assert_eq!(persisted.feed_url.as_str(), POLL_URL);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.feed.fetches_of(FG_URL), 0);
}

#[tokio::test]
async fn restart_after_stop_resumes_nothing() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    start_polling(&h, POLL_URL, 15);
    h.plugin
        .invoke("stopNotificationPolling", &Value::Null)
        .unwrap();
    let Harness {
        dir,
        feed,
        renderer,
        ..
    } = h;

    let restarted = Harness::in_dir(dir, feed, renderer);
    assert_eq!(restarted.plugin.restore(), ActiveService::None);
    assert!(!restarted.jobs.is_scheduled(POLLING_JOB_NAME));
}
