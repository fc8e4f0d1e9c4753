//! End-to-end tests against real listeners using a `WebSocket` client and
//! an HTTP client.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use fov_core::{GridBounds, Point, Trajectory};
use fov_server::server::{FovServer, ListenHandle};
use fov_server::errors::ServerError;
use fov_settings::FovSettings;

const TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

fn test_settings() -> FovSettings {
    let mut settings = FovSettings::default();
    settings.server.host = "127.0.0.1".into();
    settings.server.stream_port = 0;
    settings.server.http_port = 0;
    settings
}

async fn boot_with(settings: FovSettings) -> (Arc<FovServer>, ListenHandle) {
    let server = Arc::new(FovServer::new(settings));
    let handle = server.listen().await.unwrap();
    (server, handle)
}

async fn boot() -> (Arc<FovServer>, ListenHandle) {
    boot_with(test_settings()).await
}

async fn connect(handle: &ListenHandle) -> WsStream {
    let url = format!("ws://{}/", handle.stream_addr);
    let (ws, _) = timeout(TIMEOUT, connect_async(url.as_str()))
        .await
        .expect("connect timed out")
        .expect("connect failed");
    ws
}

/// Next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut WsStream) -> Value {
    loop {
        let msg = timeout(TIMEOUT, ws.next())
            .await
            .expect("read timed out")
            .expect("stream ended")
            .expect("read failed");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(_) | Message::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

fn point_of(frame: &Value) -> Point {
    assert_eq!(frame["type"], "pos");
    Point::new(
        frame["x"].as_u64().unwrap() as u32,
        frame["y"].as_u64().unwrap() as u32,
    )
}

async fn active_sessions(handle: &ListenHandle) -> u64 {
    let url = format!("http://{}/health", handle.http_addr);
    let body: Value = reqwest::get(url).await.unwrap().json().await.unwrap();
    body["active_sessions"].as_u64().unwrap()
}

async fn wait_for_sessions(handle: &ListenHandle, expected: u64) {
    timeout(TIMEOUT, async {
        while active_sessions(handle).await != expected {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("active_sessions never reached {expected}"));
}

#[tokio::test]
async fn hello_then_trajectory_positions() {
    let (server, handle) = boot().await;
    let mut ws = connect(&handle).await;

    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "hello");
    assert_eq!(hello["version"], 1);
    assert_eq!(hello["name"], "fig8-demo");
    assert_eq!(hello["sport"], "football");
    assert_eq!(hello["grid"]["max_x"], 102);
    assert_eq!(hello["grid"]["max_y"], 65);
    assert_eq!(hello["fps"], 5);

    let trajectory = Trajectory::figure8(GridBounds::default());
    for i in 0..6 {
        let frame = next_json(&mut ws).await;
        assert_eq!(point_of(&frame), trajectory.point_at(i), "frame {i}");
        assert!(frame["t"].as_f64().unwrap() > 1.6e9);
    }

    server.shutdown();
}

#[tokio::test]
async fn five_positions_per_second() {
    let (server, handle) = boot().await;
    let mut ws = connect(&handle).await;
    let _ = next_json(&mut ws).await;

    let first = next_json(&mut ws).await;
    for _ in 0..4 {
        let _ = next_json(&mut ws).await;
    }
    let last = next_json(&mut ws).await;
    let elapsed = last["t"].as_f64().unwrap() - first["t"].as_f64().unwrap();
    assert!((0.9..1.5).contains(&elapsed), "5 intervals took {elapsed}s");

    server.shutdown();
}

#[tokio::test]
async fn sessions_are_independent() {
    let (server, handle) = boot().await;
    let trajectory = server.trajectory().clone();

    let mut a = connect(&handle).await;
    let _ = next_json(&mut a).await;
    let _ = next_json(&mut a).await;
    let _ = next_json(&mut a).await;

    let mut b = connect(&handle).await;
    let _ = next_json(&mut b).await;
    assert_eq!(point_of(&next_json(&mut b).await), trajectory.point_at(0));
    assert_eq!(point_of(&next_json(&mut a).await), trajectory.point_at(2));

    server.shutdown();
}

#[tokio::test]
async fn directory_document_and_headers() {
    let (server, handle) = boot().await;
    let url = format!("http://{}/api/streams.json", handle.http_addr);
    let resp = reqwest::get(url).await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["cache-control"],
        "public, max-age=5, stale-while-revalidate=30"
    );
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");

    let body: Value = resp.json().await.unwrap();
    let updated_at = body["updated_at"].as_str().unwrap();
    assert_eq!(updated_at.len(), "2024-01-01T00:00:00Z".len());
    assert!(updated_at.ends_with('Z'));

    let stream = &body["streams"][0];
    assert_eq!(stream["url"], "wss://stream.fov.ie/");
    assert_eq!(stream["fps"], 5);
    assert_eq!(stream["grid"]["max_x"], 102);
    assert_eq!(stream["grid"]["max_y"], 65);

    server.shutdown();
}

#[tokio::test]
async fn public_host_override_reaches_directory() {
    let mut settings = test_settings();
    settings.server.public_host = "live.example.test".into();
    let (server, handle) = boot_with(settings).await;

    let url = format!("http://{}/api/streams.json", handle.http_addr);
    let body: Value = reqwest::get(url).await.unwrap().json().await.unwrap();
    assert_eq!(body["streams"][0]["url"], "wss://live.example.test/");

    let page = reqwest::get(format!("http://{}/", handle.http_addr))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("wss://live.example.test/"));

    server.shutdown();
}

#[tokio::test]
async fn status_page_is_html() {
    let (server, handle) = boot().await;
    let resp = reqwest::get(format!("http://{}/", handle.http_addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    let page = resp.text().await.unwrap();
    assert!(page.contains("server is alive"));
    assert!(page.contains("/api/streams.json"));

    server.shutdown();
}

#[tokio::test]
async fn disconnect_releases_session() {
    let (server, handle) = boot().await;
    let mut ws = connect(&handle).await;
    let _ = next_json(&mut ws).await;
    wait_for_sessions(&handle, 1).await;

    ws.close(None).await.unwrap();
    drop(ws);
    wait_for_sessions(&handle, 0).await;

    server.shutdown();
}

#[tokio::test]
async fn keepalive_probes_arrive() {
    let mut settings = test_settings();
    settings.keepalive.interval_secs = 1;
    settings.keepalive.timeout_secs = 3;
    let (server, handle) = boot_with(settings).await;
    let mut ws = connect(&handle).await;

    let got_ping = timeout(TIMEOUT, async {
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Ping(_)) {
                return true;
            }
        }
        false
    })
    .await
    .expect("no ping within timeout");
    assert!(got_ping);

    // The client answers pings while reading, so the session stays up.
    let _ = next_json(&mut ws).await;
    assert_eq!(active_sessions(&handle).await, 1);

    server.shutdown();
}

#[tokio::test]
async fn shutdown_ends_streams_and_listeners() {
    let (server, handle) = boot().await;
    let mut ws = connect(&handle).await;
    let _ = next_json(&mut ws).await;

    let stream_addr = handle.stream_addr;
    server.shutdown_and_wait(handle).await;

    let ended = timeout(TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "stream kept running after shutdown");

    let reconnect = connect_async(format!("ws://{stream_addr}/").as_str()).await;
    assert!(reconnect.is_err());
}

#[tokio::test]
async fn bind_conflict_is_fatal() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let mut settings = test_settings();
    settings.server.http_port = port;
    let server = FovServer::new(settings);

    let err = server.listen().await.unwrap_err();
    assert_matches!(err, ServerError::Bind { listener: "http", .. });
}
