use auth_server::configuration::get_configuration;
use auth_server::startup::run;
use auth_server::store::RedisStore;
use auth_server::telemetry::init_telemetry;
use std::net::TcpListener;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Structured logging
    init_telemetry();

    tracing::info!("Starting application");

    // Load configuration
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // Connect the session/revocation store
    tracing::info!("Attempting to connect to Redis");

    let store = RedisStore::connect(&configuration.redis.url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to Redis: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Store connection error")
        })?;

    tracing::info!("Store connection established");

    // Bind the server address
    let address = configuration.application.address();
    tracing::info!("Binding server to address: {}", address);

    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let jwt_config = configuration.jwt.clone();

    // Run the server
    let server = run(listener, Arc::new(store), jwt_config)?;
    tracing::info!("Server started successfully");

    let _ = server.await;

    Ok(())
}
