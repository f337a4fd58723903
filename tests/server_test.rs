//! Integration tests for the frame server

#[cfg(feature = "server")]
mod server_tests {
    use simviz_stream::server::{run, ServerConfig};
    use simviz_stream::FrameCodec;
    use std::time::Duration;

    async fn start() -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
        let mut config = ServerConfig::new(0);
        config.smoothing_constant = 0.0;
        config.shown_duration = 0.5;
        config.kept_duration = 1.0;
        let started = run(config).await.expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;
        started
    }

    async fn register(client: &reqwest::Client, addr: std::net::SocketAddr, dimensions: usize) -> u64 {
        let response = client
            .post(format!("http://{}/components", addr))
            .json(&serde_json::json!({ "label": "ensemble", "dimensions": dimensions }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        body["uid"].as_u64().expect("uid in response")
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_frames_window_and_latest() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();
        let uid = register(&client, addr, 1).await;

        let codec = FrameCodec::new(1);
        let body: Vec<u8> = [0.25, 0.5, 0.75, 1.0, 1.25]
            .iter()
            .flat_map(|&t| codec.encode(t, &[t * 2.0]).unwrap())
            .collect();

        let response = client
            .post(format!("http://{}/components/{}/frames", addr, uid))
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());
        let ingested: serde_json::Value = response.json().await.unwrap();
        assert_eq!(ingested["ingested"], 5);

        // Live slider: last_time 1.25, shown 0.5 -> window [0.75, 1.25)
        let window: serde_json::Value = client
            .get(format!("http://{}/components/{}/window", addr, uid))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(window["first_shown_index"], 2);
        assert_eq!(window["times"], serde_json::json!([0.75, 1.0]));
        assert_eq!(window["channels"], serde_json::json!([[1.5, 2.0]]));

        let latest: serde_json::Value = client
            .get(format!("http://{}/components/{}/latest", addr, uid))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latest["values"], serde_json::json!([2.0]));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_malformed_frames_and_unknown_component() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();
        let uid = register(&client, addr, 2).await;

        let response = client
            .post(format!("http://{}/components/{}/frames", addr, uid))
            .body(vec![0u8; 10])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["code"], "MALFORMED_FRAMES");

        let response = client
            .get(format!("http://{}/components/{}/window", addr, uid + 100))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        let response = client
            .delete(format!("http://{}/components/{}", addr, uid))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

        let stats: serde_json::Value = client
            .get(format!("http://{}/stats", addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(stats["malformed"], 1);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_register_rejects_zero_dimensions() {
        let (addr, shutdown_tx) = start().await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/components", addr))
            .json(&serde_json::json!({ "label": "empty", "dimensions": 0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_register_rejects_oversized_dimensions() {
        let (addr, shutdown_tx) = start().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{}/components", addr))
            .json(&serde_json::json!({ "label": "huge", "dimensions": 2305843009213693951u64 }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_DIMENSIONS");

        let max = ServerConfig::new(0).max_dimensions;
        let response = client
            .post(format!("http://{}/components", addr))
            .json(&serde_json::json!({ "label": "over", "dimensions": max + 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        // The bound itself is accepted, and the server is still serving.
        register(&client, addr, max).await;
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let (addr, shutdown_tx) = start().await;

        let client = reqwest::Client::new();
        let response = client
            .request(reqwest::Method::OPTIONS, format!("http://{}/components", addr))
            .header("Origin", "http://localhost")
            .header("Access-Control-Request-Method", "POST")
            .send()
            .await
            .expect("Failed to send request");

        assert!(
            response.status().is_success() || response.status() == reqwest::StatusCode::NO_CONTENT,
            "CORS preflight failed: {}",
            response.status()
        );

        let _ = shutdown_tx.send(());
    }
}
