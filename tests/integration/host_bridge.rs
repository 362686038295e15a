//! Newline-delimited JSON bridge driving a real plugin.

use crate::helpers::{EMPTY_FEED, Harness, ScriptedFeed};
use notification_master::host::stdio::run_bridge;
use serde_json::Value;
use tokio::io::AsyncReadExt;

async fn exchange(h: &Harness, input: String) -> Vec<Value> {
    let (out_tx, mut out_rx) = tokio::io::duplex(256 * 1024);
    run_bridge(h.plugin.clone(), input.as_bytes(), out_tx)
        .await
        .expect("bridge run");

    let mut raw = String::new();
    out_rx.read_to_string(&mut raw).await.expect("read output");
    raw.lines()
        .map(|line| serde_json::from_str(line).expect("output line is json"))
        .collect()
}

fn responses(lines: &[Value]) -> Vec<&Value> {
    lines.iter().filter(|l| l.get("request_id").is_some()).collect()
}

#[tokio::test]
async fn calls_are_answered_in_order() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let input = [
        r#"{"v":1,"request_id":"1","method":"showNotification","args":{"title":"hello","message":"world"}}"#,
        r#"{"v":1,"request_id":"2","method":"showImageNotification","args":{"title":"pic","imageUrl":"  "}}"#,
        r#"{"v":1,"request_id":"3","method":"createCustomChannel","args":{"channelId":"news","channelName":"News","importance":1}}"#,
        r#"{"v":1,"request_id":"4","method":"getActiveNotificationService"}"#,
    ]
    .join("\n");

    let lines = exchange(&h, input).await;
    let resp = responses(&lines);
    assert_eq!(resp.len(), 4);

    assert_eq!(resp[0]["ok"], true);
    assert!(resp[0]["result"].as_i64().unwrap() > 0);

    assert_eq!(resp[1]["ok"], false);
    assert_eq!(resp[1]["error"]["code"], "INVALID_URL");

    assert_eq!(resp[2]["result"], true);
    assert_eq!(resp[3]["result"], "none");
    assert_eq!(h.renderer.titles(), ["hello"]);
}

#[tokio::test]
async fn polling_start_emits_service_event() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let input = concat!(
        r#"{"v":1,"request_id":"a","method":"startNotificationPolling","args":{"pollingUrl":"https://feed.example.com/pending"}}"#,
        "\n",
        r#"{"v":1,"request_id":"b","method":"stopNotificationPolling"}"#,
        "\n",
    )
    .to_owned();

    let lines = exchange(&h, input).await;
    let events: Vec<&Value> = lines
        .iter()
        .filter(|l| l.get("event").is_some())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["payload"]["service"], "polling");
    assert_eq!(events[1]["payload"]["service"], "none");
    assert_eq!(responses(&lines).len(), 2);
}

#[tokio::test]
async fn garbage_line_gets_parse_error_and_bridge_continues() {
    let h = Harness::new(ScriptedFeed::new(EMPTY_FEED));
    let input = "garbage\n{\"v\":1,\"request_id\":\"ok\",\"method\":\"checkNotificationPermission\"}\n"
        .to_owned();

    let lines = exchange(&h, input).await;
    let resp = responses(&lines);
    assert_eq!(resp.len(), 2);
    assert_eq!(resp[0]["request_id"], "parse-error");
    assert_eq!(resp[1]["request_id"], "ok");
    assert_eq!(resp[1]["result"], true);
}
