/// Middleware module
///
/// Custom middleware for authentication, logging, and other concerns.

mod auth_guard;

pub use auth_guard::AuthGuard;
