use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{RevocationRegistry, RotationCoordinator, SessionStore};
use crate::configuration::JwtSettings;
use crate::logger::LoggerMiddleware;
use crate::middleware::AuthGuard;
use crate::routes::{
    federated_signin, get_current_user, health_check, login, logout, refresh, register,
};
use crate::store::KeyValueStore;
use crate::users::UserDirectory;

pub fn run(
    listener: TcpListener,
    store: Arc<dyn KeyValueStore>,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let revocations = RevocationRegistry::new(store.clone());
    let sessions = SessionStore::new(store);
    let coordinator = RotationCoordinator::new(
        sessions,
        revocations.clone(),
        jwt_config.clone(),
    );

    let directory = web::Data::new(UserDirectory::new());
    let coordinator_data = web::Data::new(coordinator);
    let jwt_config_data = web::Data::new(jwt_config.clone());

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())      // Standard logging
            .wrap(LoggerMiddleware)       // Custom logging

            // Shared state
            .app_data(directory.clone())
            .app_data(coordinator_data.clone())
            .app_data(jwt_config_data.clone())

            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/federated", web::post().to(federated_signin))
            .route("/auth/refresh", web::post().to(refresh))
            .route("/auth/logout", web::post().to(logout))

            // Protected routes (require a live access credential)
            .service(
                web::scope("/api")
                    .wrap(AuthGuard::new(jwt_config.clone(), revocations.clone()))
                    .route("/me", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
