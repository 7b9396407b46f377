//! Serve over a real socket and shut down gracefully.

mod common;

use std::time::Duration;

use tokio::net::TcpListener;

use image_router::{HttpServer, ServerConfig, Shutdown};

use common::image_table;

#[tokio::test]
async fn test_serve_and_shutdown() {
    let config = ServerConfig::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, image_table(&config));
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let client = reqwest::Client::new();
    let base = format!("http://{addr}/v1.40");

    let pull = client
        .post(format!("{base}/images/create?fromImage=alpine"))
        .send()
        .await
        .unwrap();
    assert_eq!(pull.status(), 200);
    assert!(pull.headers().contains_key("x-request-id"));
    let _ = pull.text().await.unwrap();

    let images: serde_json::Value = client
        .get(format!("{base}/libpod/images/json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(images[0]["Names"][0], "alpine:latest");

    let miss = client
        .get(format!("http://{addr}/_ping"))
        .send()
        .await
        .unwrap();
    assert_eq!(miss.status(), 404);
    assert_eq!(miss.headers()["x-route-miss"], "1");

    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
