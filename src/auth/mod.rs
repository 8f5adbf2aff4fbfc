//! Authentication: JWT issuance/verification and session management

pub mod jwt;
pub mod service;

pub use jwt::{verify_token, Claims, JwtError};
pub use service::{AuthError, AuthService};
