//! GramLoan backend library
//!
//! Back office for a village microfinance operation: borrower registry,
//! loan issuance with weekly installment schedules, field payment
//! collection, and dashboard reporting.

pub mod auth;
pub mod borrower_service;
pub mod collection_service;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan_service;
pub mod middleware;
pub mod models;
pub mod ports;
pub mod report_service;
pub mod routes;
pub mod schedule;
pub mod state;
