//! HTTP handlers for the GramLoan API

pub mod auth;
pub mod borrowers;
pub mod collections;
pub mod collectors;
pub mod installments;
pub mod loans;
pub mod reports;

// Re-export the auth extractors for handler use
pub use crate::middleware::auth::{AdminUser, AuthenticatedUser, StaffUser};
