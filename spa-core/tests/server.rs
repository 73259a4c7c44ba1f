use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::routing::get;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn raw_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

async fn local_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn serves_until_signal_then_stops() {
    let (listener, addr) = local_listener().await;
    let app = Router::new().route("/ping", get(|| async { "pong" }));
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(spa_core::serve_with_shutdown(
        listener,
        app,
        Duration::from_secs(5),
        async {
            let _ = rx.await;
        },
    ));

    let response = raw_get(addr, "/ping").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("pong"), "{response}");

    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn drain_is_bounded_by_wait() {
    let (listener, addr) = local_listener().await;
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "late"
        }),
    );
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(spa_core::serve_with_shutdown(
        listener,
        app,
        Duration::from_millis(200),
        async {
            let _ = rx.await;
        },
    ));

    let client = tokio::spawn(async move { raw_get(addr, "/slow").await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    tx.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert!(start.elapsed() < Duration::from_secs(5));
    client.abort();
}

#[tokio::test]
async fn bind_ephemeral_port() {
    let listener = spa_core::bind(0).await.unwrap();
    let addr = listener.local_addr().unwrap();
    assert!(addr.ip().is_unspecified());
    assert_ne!(addr.port(), 0);
}
