//! End-to-end probe flow against a local HTTP endpoint.
//!
//! An IPv4 host conveniently splits into the four expected hostname labels,
//! so a loopback listener can stand in for a cluster endpoint without DNS.

use clusterprobe::{
    ClientSettings, HttpProbeClient, Location, ProbeRegistry, ProbeSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::sleep;

async fn serve_status(status_line: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let response = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\n\r\n");
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });
    port
}

fn fast_registry() -> ProbeRegistry {
    let client = HttpProbeClient::new(ClientSettings {
        request_timeout: Duration::from_millis(500),
        max_attempts: 2,
        retry_deadline: Duration::from_secs(2),
    })
    .unwrap();

    let settings = ProbeSettings {
        http_history_size: 1000,
        check_delay: Duration::from_millis(10),
        connect_timeout: Duration::from_millis(200),
    };

    ProbeRegistry::new(Arc::new(client), settings, None)
}

fn loopback_location() -> Location {
    Location::from_host("127.0.0.1").unwrap()
}

#[tokio::test]
async fn healthy_endpoint_stays_clean() {
    let port = serve_status("200 OK").await;
    let registry = fast_registry();
    registry
        .register(&format!("http://127.0.0.1:{port}/probe"))
        .unwrap();

    sleep(Duration::from_millis(200)).await;

    let health = registry.lookup(&loopback_location()).unwrap();
    assert!(health.http_samples > 0, "no http cycles ran");
    assert_eq!(health.http_failures, 0);
}

#[tokio::test]
async fn failing_endpoint_fills_history_with_failures() {
    let port = serve_status("500 Internal Server Error").await;
    let registry = fast_registry();
    registry
        .register(&format!("http://127.0.0.1:{port}/probe"))
        .unwrap();

    sleep(Duration::from_millis(200)).await;

    let health = registry.lookup(&loopback_location()).unwrap();
    assert!(health.http_samples > 0, "no http cycles ran");
    assert_eq!(health.http_failures, health.http_samples);
}

#[tokio::test]
async fn unregister_halts_probing() {
    let port = serve_status("200 OK").await;
    let registry = fast_registry();
    let probe = registry
        .register(&format!("http://127.0.0.1:{port}/probe"))
        .unwrap();

    sleep(Duration::from_millis(100)).await;
    assert!(registry.unregister(&loopback_location()));
    assert!(!probe.is_active());

    // Let any in-flight cycle drain, then verify the histories froze.
    sleep(Duration::from_millis(50)).await;
    let before = probe.health();
    sleep(Duration::from_millis(100)).await;
    let after = probe.health();

    assert_eq!(before.http_samples, after.http_samples);
    assert!(registry.lookup(&loopback_location()).is_none());
}
