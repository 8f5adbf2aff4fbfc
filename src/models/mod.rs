//! Data models for the GramLoan back office

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

pub mod auth;
pub use auth::*;

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Supervisor,
    Collector,
}

/// User model (login identity; collectors are users with the COLLECTOR role)
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub assigned_area: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrower model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Borrower {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: String,
    pub village: String,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub photo_url: Option<String>,
    pub id_proof_url: Option<String>,
    pub household_head: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    Active,
    Completed,
    Defaulted,
}

/// Loan model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub loan_number: String,
    pub principal_amount: i64,
    pub disbursed_amount: i64,
    pub term_weeks: i32,
    pub start_date: DateTime<Utc>,
    pub status: LoanStatus,
    pub borrower_id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Installment status enum
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "installment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InstallmentStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

/// Installment model: one scheduled obligation within a loan
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Installment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub installment_number: i32,
    pub due_date: DateTime<Utc>,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub status: InstallmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Collection (payment) model: one payment event against an installment
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Collection {
    pub id: Uuid,
    pub installment_id: Uuid,
    pub collector_id: Uuid,
    pub amount: i64,
    pub payment_date: DateTime<Utc>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request to register a borrower
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBorrowerRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
    pub address: String,
    #[validate(length(min = 2, message = "Village must be at least 2 characters"))]
    pub village: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub gps_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub gps_lng: Option<f64>,
    #[validate(url)]
    pub photo_url: Option<String>,
    #[validate(url)]
    pub id_proof_url: Option<String>,
    pub household_head: Option<String>,
    pub is_active: Option<bool>,
}

/// Partial update of a borrower
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBorrowerRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 5, message = "Address must be at least 5 characters"))]
    pub address: Option<String>,
    #[validate(length(min = 2, message = "Village must be at least 2 characters"))]
    pub village: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub gps_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub gps_lng: Option<f64>,
    #[validate(url)]
    pub photo_url: Option<String>,
    #[validate(url)]
    pub id_proof_url: Option<String>,
    pub household_head: Option<String>,
    pub is_active: Option<bool>,
}

/// Query for listing borrowers
#[derive(Debug, Deserialize)]
pub struct BorrowerListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

/// Per-borrower loan summary
#[derive(Debug, Serialize)]
pub struct BorrowerSummary {
    pub borrower_id: Uuid,
    pub loan_count: i64,
    pub total_outstanding: i64,
}

/// Request to issue a new loan
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLoanRequest {
    #[validate(range(min = 1, message = "Principal amount must be positive"))]
    pub principal_amount: i64,
    #[validate(range(min = 1, message = "Disbursed amount must be positive"))]
    pub disbursed_amount: i64,
    #[validate(range(min = 1, message = "Term must be at least 1 week"))]
    pub term_weeks: i32,
    pub start_date: DateTime<Utc>,
    pub borrower_id: Uuid,
}

/// Partial update of a loan
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLoanRequest {
    #[validate(range(min = 1, message = "Principal amount must be positive"))]
    pub principal_amount: Option<i64>,
    #[validate(range(min = 1, message = "Disbursed amount must be positive"))]
    pub disbursed_amount: Option<i64>,
    pub status: Option<LoanStatus>,
}

/// Loan list item with computed repayment totals
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LoanListItem {
    pub id: Uuid,
    pub loan_number: String,
    pub principal_amount: i64,
    pub disbursed_amount: i64,
    pub total_paid: i64,
    pub outstanding_amount: i64,
    pub status: LoanStatus,
    pub borrower_id: Uuid,
    pub borrower_name: String,
    pub created_at: DateTime<Utc>,
}

/// Loan with populated borrower and installment schedule
#[derive(Debug, Serialize)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub borrower_name: String,
    pub borrower_village: String,
    pub total_paid: i64,
    pub outstanding_amount: i64,
    pub installments: Vec<Installment>,
}

/// One payment in a loan's payment history
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LoanPayment {
    pub id: Uuid,
    pub installment_id: Uuid,
    pub installment_number: i32,
    pub amount: i64,
    pub payment_date: DateTime<Utc>,
    pub collector_id: Uuid,
    pub collector_name: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request to record a payment against an installment
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCollectionRequest {
    pub installment_id: Uuid,
    pub collector_id: Uuid,
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: i64,
    pub payment_date: Option<DateTime<Utc>>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub gps_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub gps_lng: Option<f64>,
    #[validate(length(max = 500, message = "Notes must be less than 500 characters"))]
    pub notes: Option<String>,
}

/// Administrative edit of a collection record
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCollectionRequest {
    #[validate(range(min = 1, message = "Amount must be positive"))]
    pub amount: Option<i64>,
    pub payment_date: Option<DateTime<Utc>>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub gps_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub gps_lng: Option<f64>,
    #[validate(length(max = 500, message = "Notes must be less than 500 characters"))]
    pub notes: Option<String>,
}

/// Query for listing collections
#[derive(Debug, Deserialize)]
pub struct CollectionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub collector_id: Option<Uuid>,
    pub installment_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Collection enriched with installment, loan and collector context
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CollectionDetail {
    pub id: Uuid,
    pub amount: i64,
    pub payment_date: DateTime<Utc>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub notes: Option<String>,
    pub installment_id: Uuid,
    pub installment_number: i32,
    pub installment_status: InstallmentStatus,
    pub amount_due: i64,
    pub due_date: DateTime<Utc>,
    pub loan_id: Uuid,
    pub loan_number: String,
    pub borrower_name: String,
    pub collector_id: Uuid,
    pub collector_name: String,
    pub created_at: DateTime<Utc>,
}

/// Query for listing installments
#[derive(Debug, Deserialize)]
pub struct InstallmentListQuery {
    pub status: Option<InstallmentStatus>,
    pub loan_id: Option<Uuid>,
}

/// Installment enriched with loan and borrower context
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct InstallmentDetail {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub loan_number: String,
    pub borrower_name: String,
    pub installment_number: i32,
    pub due_date: DateTime<Utc>,
    pub amount_due: i64,
    pub amount_paid: i64,
    pub status: InstallmentStatus,
}

/// Request to provision a collector user
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCollectorRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub assigned_area: Option<String>,
    pub is_active: Option<bool>,
}

/// Partial update of a collector profile (password changes excluded)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCollectorRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,
    pub phone: Option<String>,
    pub assigned_area: Option<String>,
    pub is_active: Option<bool>,
}

/// Pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Paginated response
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// SQL OFFSET for a 1-based page. Saturates so an absurd page number
/// yields an empty page rather than arithmetic overflow.
pub fn page_offset(page: i64, limit: i64) -> i64 {
    page.saturating_sub(1).saturating_mul(limit)
}

// ============================================================================
// Reporting models
// ============================================================================

/// Aggregate collection activity within one time window
#[derive(Debug, Serialize, Default, sqlx::FromRow)]
pub struct CollectionWindow {
    pub amount: i64,
    pub count: i64,
}

/// One entry in the collector leaderboard
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CollectorLeader {
    pub collector_id: Uuid,
    pub collector_name: String,
    pub total_amount: i64,
    pub payment_count: i64,
}

/// One recent payment for the dashboard feed
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentPayment {
    pub id: Uuid,
    pub amount: i64,
    pub payment_date: DateTime<Utc>,
    pub loan_number: String,
    pub borrower_name: String,
    pub collector_name: String,
}

/// Dashboard statistics snapshot
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_borrowers: i64,
    pub total_loans: i64,
    pub active_loans: i64,
    pub total_principal: i64,
    pub total_paid: i64,
    pub outstanding_amount: i64,
    pub collected_today: CollectionWindow,
    pub collected_this_week: CollectionWindow,
    pub collected_this_month: CollectionWindow,
    pub top_collectors: Vec<CollectorLeader>,
    pub recent_payments: Vec<RecentPayment>,
}

/// Per-collector totals in the daily summary
#[derive(Debug, Serialize, Clone)]
pub struct CollectorDailyTotal {
    pub name: String,
    pub collections: i64,
    pub amount: i64,
}

/// One itemized payment line in the daily summary
#[derive(Debug, Serialize, Clone)]
pub struct DailyPaymentLine {
    pub loan_number: String,
    pub borrower_name: String,
    pub amount: i64,
    pub collector_name: String,
    pub time: String,
    pub notes: Option<String>,
}

/// Daily collection summary handed to the spreadsheet-backup service
#[derive(Debug, Serialize, Clone)]
pub struct DailySummary {
    pub date: String,
    pub total_collected: i64,
    pub total_payments: i64,
    pub total_outstanding: i64,
    pub collectors: Vec<CollectorDailyTotal>,
    pub payments: Vec<DailyPaymentLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset_basics() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(2, 10), 10);
        assert_eq!(page_offset(5, 25), 100);
    }

    #[test]
    fn test_page_offset_saturates_on_huge_page() {
        assert_eq!(page_offset(i64::MAX, 100), i64::MAX);
        assert!(page_offset(i64::MAX, 100) >= 0);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let resp: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 21, 1, 10);
        assert_eq!(resp.total_pages, 3);
        let resp: PaginatedResponse<i32> = PaginatedResponse::new(vec![], 20, 1, 10);
        assert_eq!(resp.total_pages, 2);
    }
}
