//! The method surface as the host application sees it.

use crate::helpers::{EMPTY_FEED, Harness, RecordingRenderer, ScriptedFeed};
use notification_master::host::channel::SERVICE_CHANGED_EVENT;
use notification_master::host::{ErrorCode, MethodClient, MethodName, method_channel};
use notification_master::platform::JobHost;
use notification_master::scheduler::POLLING_JOB_NAME;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

fn serve(h: &Harness) -> (MethodClient, JoinHandle<()>) {
    let (client, server) = method_channel(8, 8, h.plugin.clone());
    (client, tokio::spawn(server.run()))
}

async fn active(client: &MethodClient) -> Value {
    client
        .invoke(MethodName::GetActiveNotificationService, Value::Null)
        .await
        .unwrap()
        .result
}

#[tokio::test]
async fn empty_polling_url_is_rejected_without_side_effects() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let (client, _server) = serve(&h);

    let resp = client
        .invoke(
            MethodName::StartNotificationPolling,
            json!({"pollingUrl": "", "intervalMinutes": 15}),
        )
        .await
        .unwrap();

    assert!(!resp.ok);
    assert_eq!(resp.error_code(), Some(ErrorCode::InvalidUrl));
    assert!(!h.jobs.is_scheduled(POLLING_JOB_NAME));
    assert!(!h.settings_path().exists());
    assert_eq!(h.persisted().load_config().unwrap(), None);
}

#[tokio::test]
async fn missing_polling_url_is_invalid_url_too() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let (client, _server) = serve(&h);

    for method in [
        MethodName::StartNotificationPolling,
        MethodName::StartForegroundService,
    ] {
        let resp = client.invoke(method, json!({})).await.unwrap();
        assert_eq!(resp.error_code(), Some(ErrorCode::InvalidUrl), "{method:?}");
    }
    assert!(h.feed.fetched().is_empty());
}

#[tokio::test]
async fn empty_image_url_issues_no_render() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let (client, _server) = serve(&h);

    let resp = client
        .invoke(
            MethodName::ShowImageNotification,
            json!({"title": "t", "message": "m", "imageUrl": ""}),
        )
        .await
        .unwrap();

    assert_eq!(resp.error_code(), Some(ErrorCode::InvalidUrl));
    assert!(h.renderer.renders().is_empty());
}

#[tokio::test]
async fn show_returns_distinct_positive_ids() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let (client, _server) = serve(&h);

    let mut ids = Vec::new();
    for method in [
        MethodName::ShowNotification,
        MethodName::ShowBigTextNotification,
    ] {
        let resp = client
            .invoke(method, json!({"title": "t", "message": "m", "bigText": "long"}))
            .await
            .unwrap();
        assert!(resp.ok);
        ids.push(resp.result.as_i64().unwrap());
    }
    assert!(ids.iter().all(|id| *id > 0));
    assert_ne!(ids[0], ids[1]);
    assert_eq!(h.renderer.titles(), ["t", "t"]);
}

#[tokio::test]
async fn denied_permission_surfaces_notification_error() {
    let h = Harness::with_renderer(ScriptedFeed::new(EMPTY_FEED), RecordingRenderer::denying());
    let (client, _server) = serve(&h);

    let granted = client
        .invoke(MethodName::CheckNotificationPermission, Value::Null)
        .await
        .unwrap();
    assert_eq!(granted.result, json!(false));

    let resp = client
        .invoke(MethodName::ShowNotification, json!({"title": "t"}))
        .await
        .unwrap();
    assert_eq!(resp.error_code(), Some(ErrorCode::NotificationError));
}

#[tokio::test]
async fn active_service_follows_start_and_stop_calls() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let (client, _server) = serve(&h);
    let mut events = client.subscribe_events();

    assert_eq!(active(&client).await, json!("none"));

    let args = json!({"pollingUrl": "https://feed.example.com/pending", "intervalMinutes": 20});
    assert!(client.invoke(MethodName::StartNotificationPolling, args.clone()).await.unwrap().ok);
    assert_eq!(active(&client).await, json!("polling"));
    let event = events.recv().await.unwrap();
    assert_eq!(event.event, SERVICE_CHANGED_EVENT);
    assert_eq!(event.payload["service"], "polling");

    assert!(client.invoke(MethodName::StartForegroundService, args).await.unwrap().ok);
    assert_eq!(active(&client).await, json!("foreground"));

    assert!(client.invoke(MethodName::StopForegroundService, Value::Null).await.unwrap().ok);
    assert_eq!(active(&client).await, json!("none"));
    assert!(!h.persisted().polling_enabled().unwrap());
}

#[tokio::test]
async fn unknown_method_is_not_implemented() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let (client, _server) = serve(&h);

    let call = notification_master::host::MethodCall {
        v: 1,
        request_id: "r-1".to_owned(),
        method: "scheduleAlarm".to_owned(),
        args: Value::Null,
    };
    let resp = client.send(call).await.unwrap();
    assert_eq!(resp.request_id, "r-1");
    assert_eq!(resp.error_code(), Some(ErrorCode::NotImplemented));
}

#[tokio::test]
async fn platform_version_is_reported() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let (client, _server) = serve(&h);

    let resp = client
        .invoke(MethodName::GetPlatformVersion, Value::Null)
        .await
        .unwrap();
    assert!(resp.ok);
    assert!(resp.result.as_str().unwrap().contains(std::env::consts::OS));
}
