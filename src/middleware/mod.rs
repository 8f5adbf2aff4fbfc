//! HTTP middleware: authentication extractors, security headers, tracing

pub mod auth;
pub mod security;
pub mod tracing;

pub use auth::{AdminUser, AuthenticatedUser, StaffUser, SESSION_COOKIE};
pub use security::security_headers;
pub use tracing::request_tracing;
