//! Loan lifecycle tests
//!
//! Schedule and classification tests run standalone. Tests that exercise
//! issuance, payment recording and reconciliation against Postgres are
//! marked `#[ignore]` and need TEST_DATABASE_URL with migrations applied.

use chrono::{TimeZone, Utc};
use validator::Validate;

use gramloan_server::models::{CreateCollectionRequest, CreateLoanRequest, InstallmentStatus};
use gramloan_server::schedule::{build_schedule, classify_installment, generate_loan_number};

// ============================================================================
// Schedule construction
// ============================================================================

#[test]
fn test_schedule_for_asha_scenario() {
    // 10,000 over 10 weeks starting 2024-01-01
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let drafts = build_schedule(10_000, 10, start);

    assert_eq!(drafts.len(), 10);
    assert!(drafts.iter().all(|d| d.amount_due == 1_000));
    assert_eq!(
        drafts[0].due_date,
        Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
    );
    assert_eq!(
        drafts[9].due_date,
        Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_schedule_remainder_goes_to_last_installment() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let drafts = build_schedule(10_003, 3, start);

    assert_eq!(drafts[0].amount_due, 3_334);
    assert_eq!(drafts[1].amount_due, 3_334);
    assert_eq!(drafts[2].amount_due, 3_335);
    assert_eq!(drafts.iter().map(|d| d.amount_due).sum::<i64>(), 10_003);
}

#[test]
fn test_schedule_single_week_term() {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    let drafts = build_schedule(5_000, 1, start);

    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].installment_number, 1);
    assert_eq!(drafts[0].amount_due, 5_000);
    assert_eq!(
        drafts[0].due_date,
        Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap()
    );
}

// ============================================================================
// Status classification
// ============================================================================

#[test]
fn test_full_payment_classifies_paid() {
    assert_eq!(classify_installment(1_000, 1_000), InstallmentStatus::Paid);
}

#[test]
fn test_partial_payment_classifies_partial() {
    assert_eq!(classify_installment(1_000, 500), InstallmentStatus::Partial);
}

#[test]
fn test_no_payment_classifies_pending() {
    assert_eq!(classify_installment(1_000, 0), InstallmentStatus::Pending);
}

#[test]
fn test_cumulative_partials_reach_paid() {
    // Two partials of 500 against a 1,000 installment
    let after_first = 500;
    let after_second = after_first + 500;
    assert_eq!(
        classify_installment(1_000, after_first),
        InstallmentStatus::Partial
    );
    assert_eq!(
        classify_installment(1_000, after_second),
        InstallmentStatus::Paid
    );
}

// ============================================================================
// Loan numbers
// ============================================================================

#[test]
fn test_loan_number_shape() {
    let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
    let number = generate_loan_number(now);

    assert!(number.starts_with("LOAN-20240115-"));
    let suffix = number.rsplit('-').next().unwrap();
    assert_eq!(suffix.len(), 6);
}

#[test]
fn test_loan_numbers_vary() {
    let now = Utc::now();
    let a = generate_loan_number(now);
    let b = generate_loan_number(now);
    // Same date prefix, random suffixes; a collision here is vanishingly rare
    assert_eq!(&a[..14], &b[..14]);
    assert_ne!(a, b);
}

// ============================================================================
// Request validation
// ============================================================================

#[test]
fn test_loan_request_rejects_zero_term() {
    let request = CreateLoanRequest {
        principal_amount: 10_000,
        disbursed_amount: 10_000,
        term_weeks: 0,
        start_date: Utc::now(),
        borrower_id: uuid::Uuid::new_v4(),
    };
    assert!(request.validate().is_err());
}

#[test]
fn test_loan_request_rejects_negative_principal() {
    let request = CreateLoanRequest {
        principal_amount: -500,
        disbursed_amount: 500,
        term_weeks: 10,
        start_date: Utc::now(),
        borrower_id: uuid::Uuid::new_v4(),
    };
    assert!(request.validate().is_err());
}

#[test]
fn test_collection_request_rejects_zero_amount() {
    let request = CreateCollectionRequest {
        installment_id: uuid::Uuid::new_v4(),
        collector_id: uuid::Uuid::new_v4(),
        amount: 0,
        payment_date: None,
        gps_lat: None,
        gps_lng: None,
        notes: None,
    };
    assert!(request.validate().is_err());
}

#[test]
fn test_collection_request_rejects_out_of_range_gps() {
    let request = CreateCollectionRequest {
        installment_id: uuid::Uuid::new_v4(),
        collector_id: uuid::Uuid::new_v4(),
        amount: 500,
        payment_date: None,
        gps_lat: Some(123.0),
        gps_lng: None,
        notes: None,
    };
    assert!(request.validate().is_err());
}

// ============================================================================
// Database-backed lifecycle tests
// ============================================================================

mod db_tests {
    use super::*;

    use sqlx::PgPool;
    use uuid::Uuid;

    use gramloan_server::collection_service::{CollectionError, CollectionService};
    use gramloan_server::loan_service::LoanService;
    use gramloan_server::models::{LoanStatus, UserRole};

    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/gramloan_test".to_string());

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database")
    }

    async fn seed_user(pool: &PgPool, role: UserRole) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, name, role, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, 'x', 'Test User', $4, TRUE, NOW(), NOW())
            "#,
        )
        .bind(id)
        .bind(format!("{}@test.local", id))
        .bind(id.to_string())
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to seed user");
        id
    }

    async fn seed_borrower(pool: &PgPool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO borrowers (id, name, address, village, is_active, created_at, updated_at)
            VALUES ($1, 'Asha', 'Main Road', 'Ramapuram', TRUE, NOW(), NOW())
            "#,
        )
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to seed borrower");
        id
    }

    fn asha_loan_request(borrower_id: Uuid) -> CreateLoanRequest {
        CreateLoanRequest {
            principal_amount: 10_000,
            disbursed_amount: 10_000,
            term_weeks: 10,
            start_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            borrower_id,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_issue_loan_creates_full_schedule() {
        let pool = setup_test_db().await;
        let admin = seed_user(&pool, UserRole::Admin).await;
        let borrower = seed_borrower(&pool).await;

        let service = LoanService::new(pool.clone());
        let (loan, installments) = service
            .issue_loan(asha_loan_request(borrower), admin)
            .await
            .expect("Loan issuance should succeed");

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(installments.len(), 10);
        assert!(installments.iter().all(|i| i.amount_due == 1_000));
        assert!(installments
            .iter()
            .all(|i| i.status == InstallmentStatus::Pending && i.amount_paid == 0));

        let detail = service
            .get_loan_detail(loan.id)
            .await
            .expect("Detail query should succeed")
            .expect("Loan should exist");
        assert_eq!(detail.total_paid, 0);
        assert_eq!(detail.outstanding_amount, 10_000);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_full_then_partial_payment_updates_outstanding() {
        let pool = setup_test_db().await;
        let admin = seed_user(&pool, UserRole::Admin).await;
        let collector = seed_user(&pool, UserRole::Collector).await;
        let borrower = seed_borrower(&pool).await;

        let loans = LoanService::new(pool.clone());
        let collections = CollectionService::new(pool.clone());

        let (loan, installments) = loans
            .issue_loan(asha_loan_request(borrower), admin)
            .await
            .expect("Loan issuance should succeed");

        // Full payment on installment 1
        let paid = collections
            .record_payment(CreateCollectionRequest {
                installment_id: installments[0].id,
                collector_id: collector,
                amount: 1_000,
                payment_date: None,
                gps_lat: None,
                gps_lng: None,
                notes: None,
            })
            .await
            .expect("Payment should succeed");
        assert_eq!(paid.installment_status, InstallmentStatus::Paid);

        // Partial payment on installment 2
        let partial = collections
            .record_payment(CreateCollectionRequest {
                installment_id: installments[1].id,
                collector_id: collector,
                amount: 500,
                payment_date: None,
                gps_lat: None,
                gps_lng: None,
                notes: Some("first half".to_string()),
            })
            .await
            .expect("Partial payment should succeed");
        assert_eq!(partial.installment_status, InstallmentStatus::Partial);

        let detail = loans
            .get_loan_detail(loan.id)
            .await
            .expect("Detail query should succeed")
            .expect("Loan should exist");
        assert_eq!(detail.total_paid, 1_500);
        assert_eq!(detail.outstanding_amount, 8_500);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_overpayment_is_rejected_and_state_untouched() {
        let pool = setup_test_db().await;
        let admin = seed_user(&pool, UserRole::Admin).await;
        let collector = seed_user(&pool, UserRole::Collector).await;
        let borrower = seed_borrower(&pool).await;

        let loans = LoanService::new(pool.clone());
        let collections = CollectionService::new(pool.clone());

        let (loan, installments) = loans
            .issue_loan(asha_loan_request(borrower), admin)
            .await
            .expect("Loan issuance should succeed");

        let result = collections
            .record_payment(CreateCollectionRequest {
                installment_id: installments[0].id,
                collector_id: collector,
                amount: 1_500,
                payment_date: None,
                gps_lat: None,
                gps_lng: None,
                notes: None,
            })
            .await;

        assert!(matches!(
            result,
            Err(CollectionError::Overpayment { remaining: 1_000, .. })
        ));

        let detail = loans
            .get_loan_detail(loan.id)
            .await
            .expect("Detail query should succeed")
            .expect("Loan should exist");
        assert_eq!(detail.total_paid, 0);
        assert_eq!(detail.installments[0].status, InstallmentStatus::Pending);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_deleting_collection_restores_installment_state() {
        let pool = setup_test_db().await;
        let admin = seed_user(&pool, UserRole::Admin).await;
        let collector = seed_user(&pool, UserRole::Collector).await;
        let borrower = seed_borrower(&pool).await;

        let loans = LoanService::new(pool.clone());
        let collections = CollectionService::new(pool.clone());

        let (_, installments) = loans
            .issue_loan(asha_loan_request(borrower), admin)
            .await
            .expect("Loan issuance should succeed");

        let recorded = collections
            .record_payment(CreateCollectionRequest {
                installment_id: installments[0].id,
                collector_id: collector,
                amount: 1_000,
                payment_date: None,
                gps_lat: None,
                gps_lng: None,
                notes: None,
            })
            .await
            .expect("Payment should succeed");

        let deleted = collections
            .delete_collection(recorded.id)
            .await
            .expect("Delete should succeed");
        assert!(deleted);

        let installment = loans
            .get_installment(installments[0].id)
            .await
            .expect("Installment query should succeed")
            .expect("Installment should exist");
        assert_eq!(installment.amount_paid, 0);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_overdue_sweep_marks_past_due_pending() {
        let pool = setup_test_db().await;
        let admin = seed_user(&pool, UserRole::Admin).await;
        let borrower = seed_borrower(&pool).await;

        let loans = LoanService::new(pool.clone());

        // Start date far in the past so every installment is past due
        let request = CreateLoanRequest {
            principal_amount: 2_000,
            disbursed_amount: 2_000,
            term_weeks: 2,
            start_date: Utc.with_ymd_and_hms(2020, 1, 6, 0, 0, 0).unwrap(),
            borrower_id: borrower,
        };
        let (loan, _) = loans
            .issue_loan(request, admin)
            .await
            .expect("Loan issuance should succeed");

        let marked = loans
            .mark_overdue_installments()
            .await
            .expect("Sweep should succeed");
        assert!(marked >= 2);

        let detail = loans
            .get_loan_detail(loan.id)
            .await
            .expect("Detail query should succeed")
            .expect("Loan should exist");
        assert!(detail
            .installments
            .iter()
            .all(|i| i.status == InstallmentStatus::Overdue));
    }
}
