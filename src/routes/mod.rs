//! Route definitions for the GramLoan API

mod auth;
mod borrowers;
mod collections;
mod collectors;
mod installments;
mod loans;
mod reports;

pub use auth::auth_routes;
pub use borrowers::borrower_routes;
pub use collections::collection_routes;
pub use collectors::collector_routes;
pub use installments::installment_routes;
pub use loans::loan_routes;
pub use reports::report_routes;
