//! Integration test for the health check endpoint

use auth_server::configuration::JwtSettings;
use auth_server::startup::run;
use auth_server::store::{InMemoryStore, KeyValueStore};
use std::net::TcpListener;
use std::sync::Arc;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
    let jwt_config = JwtSettings {
        access_secret: "access-test-secret-at-least-32-characters".to_string(),
        refresh_secret: "refresh-test-secret-at-least-32-characters".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "test".to_string(),
    };
    let server = run(listener, store, jwt_config).expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
}
