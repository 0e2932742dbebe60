/// Authentication module
///
/// Handles the token lifecycle: paired JWT issuance/validation, the
/// revocation registry, the per-principal session record, and the
/// rotation coordinator that ties them together.

mod claims;
mod jwt;
mod revocation;
mod rotation;
mod session;

pub use claims::Claims;
pub use jwt::fingerprint;
pub use jwt::issue_pair;
pub use jwt::validate_access_token;
pub use jwt::validate_refresh_token;
pub use jwt::TokenPair;
pub use revocation::RevocationRegistry;
pub use rotation::RotationCoordinator;
pub use session::SessionStore;
