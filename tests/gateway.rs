//! End-to-end tests for request routing, forwarding and request logging.

use std::time::Duration;

use futures_util::StreamExt;
use gateway_sdk::AdminClient;
use serde_json::Value;

mod common;
use common::*;

fn admin(gateway: &TestGateway) -> AdminClient {
    AdminClient::new(
        &gateway.url(""),
        "bff_admin_token",
        "change_me_in_production",
    )
}

#[tokio::test]
async fn test_rewrite_and_query_passthrough() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_echo_backend().await;

    let mut r = rule("users", "/api", backend);
    r.target = format!("http://{}/", backend);
    r.rewrite_path = "/v1".into();
    let gateway = start_gateway(config_in(dir.path(), vec![r])).await;

    let res = client()
        .get(gateway.url("/api/users?id=5&tag=a%20b"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let echoed = res.text().await.unwrap();
    assert!(
        echoed.starts_with("GET /v1/users?id=5&tag=a%20b HTTP/1.1"),
        "unexpected request line: {}",
        echoed
    );

    gateway.stop().await;
}

#[tokio::test]
async fn test_first_matching_rule_wins() {
    let dir = tempfile::tempdir().unwrap();
    let first = start_mock_backend("200 OK", "{\"from\":\"first\"}").await;
    let second = start_mock_backend("200 OK", "{\"from\":\"second\"}").await;

    let rules = vec![rule("broad", "/api", first), rule("narrow", "/api/users", second)];
    let gateway = start_gateway(config_in(dir.path(), rules)).await;

    let body: Value = client()
        .get(gateway.url("/api/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["from"], "first");

    let logs = admin(&gateway).logs(10).await.unwrap();
    assert_eq!(logs[0]["rule_name"], "broad");

    gateway.stop().await;
}

#[tokio::test]
async fn test_body_and_header_conditions() {
    let dir = tempfile::tempdir().unwrap();
    let premium = start_mock_backend("200 OK", "{\"tier\":\"premium\"}").await;
    let fallback = start_mock_backend("200 OK", "{\"tier\":\"basic\"}").await;

    let mut strict = rule("premium", "/orders", premium);
    strict.match_condition.method = "post".into();
    strict.match_condition.headers.insert("X-Tenant".into(), "acme".into());
    strict.match_condition.body.insert("type".into(), "premium".into());
    strict.match_condition.body.insert("qty".into(), "5".into());
    let rules = vec![strict, rule("basic", "/orders", fallback)];
    let gateway = start_gateway(config_in(dir.path(), rules)).await;
    let client = client();

    let body: Value = client
        .post(gateway.url("/orders"))
        .header("X-Tenant", "acme")
        .json(&serde_json::json!({ "type": "premium", "qty": 5.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["tier"], "premium");

    // Missing header: falls through to the next rule.
    let body: Value = client
        .post(gateway.url("/orders"))
        .json(&serde_json::json!({ "type": "premium", "qty": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["tier"], "basic");

    // Non-JSON body never satisfies a body condition.
    let body: Value = client
        .post(gateway.url("/orders"))
        .header("X-Tenant", "acme")
        .body("type=premium")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["tier"], "basic");

    gateway.stop().await;
}

#[tokio::test]
async fn test_no_match_is_404_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_mock_backend("200 OK", "{}").await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("api", "/api", backend)])).await;

    let res = client().get(gateway.url("/other?x=1")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.text().await.unwrap(), "404 page not found");

    let logs = admin(&gateway).logs(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status_code"], 404);
    assert_eq!(logs[0]["path"], "/other");
    assert_eq!(logs[0]["query"], "x=1");
    assert_eq!(logs[0]["rule_name"], "");
    assert!(logs[0]["error"].is_string());

    gateway.stop().await;
}

#[tokio::test]
async fn test_unreachable_backend_is_502() {
    let dir = tempfile::tempdir().unwrap();
    let dead = unused_addr().await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("dead", "/", dead)])).await;

    let res = client().get(gateway.url("/anything")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "error": "upstream request failed" }));

    let logs = admin(&gateway).logs(10).await.unwrap();
    assert_eq!(logs[0]["status_code"], 502);
    assert_eq!(logs[0]["rule_name"], "dead");
    assert_eq!(logs[0]["target"], format!("http://{}", dead));
    assert!(logs[0]["error"].as_str().unwrap().contains("upstream request failed"));

    gateway.stop().await;
}

#[tokio::test]
async fn test_rule_timeout_is_502() {
    let dir = tempfile::tempdir().unwrap();
    let slow = start_slow_backend(Duration::from_secs(3)).await;

    let mut r = rule("slow", "/", slow);
    r.timeout_secs = 1;
    let gateway = start_gateway(config_in(dir.path(), vec![r])).await;

    let started = std::time::Instant::now();
    let res = client().get(gateway.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    assert!(started.elapsed() < Duration::from_secs(3));

    let logs = admin(&gateway).logs(1).await.unwrap();
    assert!(logs[0]["error"].as_str().unwrap().contains("timed out"));

    gateway.stop().await;
}

#[tokio::test]
async fn test_rule_headers_overwrite_inbound() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_echo_backend().await;

    let mut r = rule("hdr", "/", backend);
    r.extra_headers.insert("X-Source".into(), "gateway".into());
    r.extra_headers.insert("X-Added".into(), "1".into());
    let gateway = start_gateway(config_in(dir.path(), vec![r])).await;

    let echoed = client()
        .post(gateway.url("/submit"))
        .header("X-Source", "browser")
        .body("payload")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
        .to_ascii_lowercase();

    assert!(echoed.contains("x-source: gateway"));
    assert!(!echoed.contains("x-source: browser"));
    assert!(echoed.contains("x-added: 1"));
    assert!(echoed.ends_with("payload"));

    gateway.stop().await;
}

#[tokio::test]
async fn test_backend_status_and_body_relayed_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_mock_backend("503 Service Unavailable", "{\"down\":true}").await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("svc", "/", backend)])).await;

    let res = client()
        .put(gateway.url("/items/1"))
        .body("{\"name\":\"x\"}")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(res.text().await.unwrap(), "{\"down\":true}");

    let logs = admin(&gateway).logs(1).await.unwrap();
    assert_eq!(logs[0]["method"], "PUT");
    assert_eq!(logs[0]["body"], "{\"name\":\"x\"}");
    assert_eq!(logs[0]["response_body"], "{\"down\":true}");
    assert!(logs[0].get("error").is_none());

    gateway.stop().await;
}

#[tokio::test]
async fn test_oversized_body_is_413() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_mock_backend("200 OK", "{}").await;
    let mut config = config_in(dir.path(), vec![rule("any", "/", backend)]);
    config.server.max_body_bytes = 16;
    let gateway = start_gateway(config).await;

    let res = client()
        .post(gateway.url("/upload"))
        .body(vec![b'x'; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 413);

    let logs = admin(&gateway).logs(1).await.unwrap();
    assert_eq!(logs[0]["status_code"], 413);

    gateway.stop().await;
}

#[tokio::test]
async fn test_sse_passthrough_is_incremental_and_logged_once() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_sse_backend(vec!["one", "two", "three"], Duration::from_millis(200)).await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("events", "/events", backend)])).await;

    let res = client()
        .get(gateway.url("/events"))
        .header("Accept", "text/event-stream")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut stream = res.bytes_stream();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"data: one\n\n");

    let mut received = first.to_vec();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(
        String::from_utf8(received).unwrap(),
        "data: one\n\ndata: two\n\ndata: three\n\n"
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    let logs = admin(&gateway).logs(10).await.unwrap();
    let streamed: Vec<_> = logs.iter().filter(|r| r["path"] == "/events").collect();
    assert_eq!(streamed.len(), 1);
    assert_eq!(streamed[0]["response_body"], "[SSE Stream]");
    assert_eq!(streamed[0]["status_code"], 200);

    gateway.stop().await;
}

#[tokio::test]
async fn test_sse_client_disconnect_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_sse_backend(vec!["a"; 50], Duration::from_millis(100)).await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("events", "/", backend)])).await;

    let res = client()
        .get(gateway.url("/feed"))
        .header("Accept", "text/event-stream")
        .send()
        .await
        .unwrap();
    let mut stream = res.bytes_stream();
    stream.next().await.unwrap().unwrap();
    drop(stream);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let logs = admin(&gateway).logs(10).await.unwrap();
    let feed: Vec<_> = logs.iter().filter(|r| r["path"] == "/feed").collect();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["response_body"], "[SSE Stream]");
    assert_eq!(
        feed[0]["error"],
        "client disconnected before end of stream"
    );

    gateway.stop().await;
}

#[tokio::test]
async fn test_sse_backend_failure_mid_stream_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_broken_sse_backend().await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("events", "/", backend)])).await;

    let res = client()
        .get(gateway.url("/broken"))
        .header("Accept", "text/event-stream")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let mut stream = res.bytes_stream();
    let mut failed = false;
    while let Some(chunk) = stream.next().await {
        if chunk.is_err() {
            failed = true;
            break;
        }
    }
    assert!(failed, "client should see the body end in an error");

    tokio::time::sleep(Duration::from_millis(100)).await;
    let logs = admin(&gateway).logs(10).await.unwrap();
    let broken: Vec<_> = logs
        .iter()
        .filter(|r| r["response_body"] == "[SSE Stream]")
        .collect();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0]["path"], "/broken");
    assert_eq!(broken[0]["status_code"], 200);
    assert!(!broken[0]["error"].as_str().unwrap_or_default().is_empty());

    gateway.stop().await;
}

#[tokio::test]
async fn test_shutdown_cuts_open_stream_and_logs_it() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_sse_backend(vec!["tick"; 100], Duration::from_millis(100)).await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("events", "/", backend)])).await;

    let res = client()
        .get(gateway.url("/live"))
        .header("Accept", "text/event-stream")
        .send()
        .await
        .unwrap();
    let mut stream = res.bytes_stream();
    stream.next().await.unwrap().unwrap();

    gateway.shutdown.trigger();
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = stream.next().await {
            if chunk.is_err() {
                break;
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "stream should end once the drain window expires");
    gateway.handle.await.unwrap().unwrap();

    let contents = std::fs::read_to_string(dir.path().join("requests.log")).unwrap();
    let live: Vec<Value> = contents
        .lines()
        .map(|l| serde_json::from_str::<Value>(l).unwrap())
        .filter(|r| r["path"] == "/live")
        .collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["response_body"], "[SSE Stream]");
    assert_eq!(live[0]["error"], "stream cut off by gateway shutdown");
}

#[tokio::test]
async fn test_file_reload_swaps_rules() {
    let dir = tempfile::tempdir().unwrap();
    let old = start_mock_backend("200 OK", "{\"v\":1}").await;
    let new = start_mock_backend("200 OK", "{\"v\":2}").await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("r", "/", old)])).await;
    let client = client();

    let body: Value = client.get(gateway.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["v"], 1);

    gateway
        .config_updates
        .send(config_in(dir.path(), vec![rule("r", "/", new)]))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let body: Value = client.get(gateway.url("/")).send().await.unwrap().json().await.unwrap();
    assert_eq!(body["v"], 2);

    gateway.stop().await;
}

#[tokio::test]
async fn test_shutdown_flushes_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let backend = start_mock_backend("200 OK", "{}").await;
    let gateway = start_gateway(config_in(dir.path(), vec![rule("r", "/", backend)])).await;

    for _ in 0..3 {
        client().get(gateway.url("/ping")).send().await.unwrap();
    }
    gateway.stop().await;

    let contents = std::fs::read_to_string(dir.path().join("requests.log")).unwrap();
    let lines: Vec<Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|r| r["path"] == "/ping"));
}
