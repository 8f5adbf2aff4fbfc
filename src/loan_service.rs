//! Loan service layer - issuance, schedule queries, and the overdue sweep
//!
//! Loan issuance writes the loan and its full installment schedule in one
//! transaction, so a crash can never leave a loan without a schedule.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    page_offset, CreateLoanRequest, Installment, InstallmentDetail, InstallmentListQuery, Loan,
    LoanDetail, LoanListItem, LoanPayment, LoanStatus, PaginatedResponse, PaginationParams,
    UpdateLoanRequest,
};
use crate::schedule::{build_schedule, generate_loan_number};

/// Loan service errors
#[derive(Error, Debug)]
pub enum LoanError {
    #[error("Borrower not found")]
    BorrowerNotFound,

    #[error("Loan not found")]
    LoanNotFound,

    #[error("Loan number already exists")]
    DuplicateLoanNumber,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LoanError {
    fn from(e: sqlx::Error) -> Self {
        LoanError::DatabaseError(e.to_string())
    }
}

impl From<LoanError> for crate::error::ApiError {
    fn from(e: LoanError) -> Self {
        use crate::error::ApiError;
        match e {
            LoanError::BorrowerNotFound | LoanError::LoanNotFound => {
                ApiError::NotFound(e.to_string())
            }
            LoanError::DuplicateLoanNumber => ApiError::Conflict(e.to_string()),
            LoanError::DatabaseError(msg) => ApiError::DatabaseError(msg),
        }
    }
}

/// Loan service for managing the loan and installment lifecycle
#[derive(Clone)]
pub struct LoanService {
    db_pool: PgPool,
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Issue a new loan: persist the loan and exactly `term_weeks`
    /// installments in a single transaction.
    pub async fn issue_loan(
        &self,
        request: CreateLoanRequest,
        created_by: Uuid,
    ) -> Result<(Loan, Vec<Installment>), LoanError> {
        let mut tx = self.db_pool.begin().await?;

        let borrower: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM borrowers WHERE id = $1")
            .bind(request.borrower_id)
            .fetch_optional(&mut *tx)
            .await?;
        if borrower.is_none() {
            return Err(LoanError::BorrowerNotFound);
        }

        let now = Utc::now();
        let loan_number = generate_loan_number(now);

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                id, loan_number, principal_amount, disbursed_amount,
                term_weeks, start_date, status, borrower_id, created_by,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&loan_number)
        .bind(request.principal_amount)
        .bind(request.disbursed_amount)
        .bind(request.term_weeks)
        .bind(request.start_date)
        .bind(LoanStatus::Active)
        .bind(request.borrower_id)
        .bind(created_by)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                LoanError::DuplicateLoanNumber
            }
            _ => LoanError::DatabaseError(e.to_string()),
        })?;

        let drafts = build_schedule(
            request.principal_amount,
            request.term_weeks,
            request.start_date,
        );

        let mut installments = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let installment = sqlx::query_as::<_, Installment>(
                r#"
                INSERT INTO installments (
                    id, loan_id, installment_number, due_date, amount_due,
                    amount_paid, status, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, 0, 'PENDING', $6, $6)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(loan.id)
            .bind(draft.installment_number)
            .bind(draft.due_date)
            .bind(draft.amount_due)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            installments.push(installment);
        }

        tx.commit().await?;

        tracing::info!(
            loan_number = %loan.loan_number,
            borrower_id = %loan.borrower_id,
            principal = loan.principal_amount,
            term_weeks = loan.term_weeks,
            "Loan issued"
        );

        Ok((loan, installments))
    }

    /// Loan with populated borrower and ordered installment schedule
    pub async fn get_loan_detail(&self, id: Uuid) -> Result<Option<LoanDetail>, LoanError> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;

        let Some(loan) = loan else {
            return Ok(None);
        };

        let (borrower_name, borrower_village): (String, String) =
            sqlx::query_as("SELECT name, village FROM borrowers WHERE id = $1")
                .bind(loan.borrower_id)
                .fetch_one(&self.db_pool)
                .await?;

        let installments = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installments WHERE loan_id = $1 ORDER BY installment_number ASC",
        )
        .bind(id)
        .fetch_all(&self.db_pool)
        .await?;

        let total_paid: i64 = installments.iter().map(|i| i.amount_paid).sum();
        let outstanding_amount = loan.principal_amount - total_paid;

        Ok(Some(LoanDetail {
            loan,
            borrower_name,
            borrower_village,
            total_paid,
            outstanding_amount,
            installments,
        }))
    }

    /// List loans with computed outstanding, newest first
    pub async fn list_loans(
        &self,
        params: PaginationParams,
    ) -> Result<PaginatedResponse<LoanListItem>, LoanError> {
        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(20).clamp(1, 100);
        let offset = page_offset(page, limit);

        let loans = sqlx::query_as::<_, LoanListItem>(
            r#"
            SELECT
                l.id,
                l.loan_number,
                l.principal_amount,
                l.disbursed_amount,
                COALESCE(p.paid, 0) AS total_paid,
                l.principal_amount - COALESCE(p.paid, 0) AS outstanding_amount,
                l.status,
                l.borrower_id,
                b.name AS borrower_name,
                l.created_at
            FROM loans l
            JOIN borrowers b ON b.id = l.borrower_id
            LEFT JOIN (
                SELECT loan_id, SUM(amount_paid) AS paid
                FROM installments
                GROUP BY loan_id
            ) p ON p.loan_id = l.id
            ORDER BY l.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM loans")
            .fetch_one(&self.db_pool)
            .await?;

        Ok(PaginatedResponse::new(loans, total, page, limit))
    }

    /// Partially update a loan's amounts or status
    pub async fn update_loan(
        &self,
        id: Uuid,
        request: UpdateLoanRequest,
    ) -> Result<Option<Loan>, LoanError> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                principal_amount = COALESCE($2, principal_amount),
                disbursed_amount = COALESCE($3, disbursed_amount),
                status = COALESCE($4, status),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.principal_amount)
        .bind(request.disbursed_amount)
        .bind(request.status)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(loan)
    }

    /// Delete a loan and all of its installments in one transaction
    pub async fn delete_loan(&self, id: Uuid) -> Result<bool, LoanError> {
        let mut tx = self.db_pool.begin().await?;

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        sqlx::query(
            "DELETE FROM collections WHERE installment_id IN (SELECT id FROM installments WHERE loan_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM installments WHERE loan_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Payment history for one loan, newest first
    pub async fn loan_payments(&self, id: Uuid) -> Result<Option<Vec<LoanPayment>>, LoanError> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let payments = sqlx::query_as::<_, LoanPayment>(
            r#"
            SELECT
                c.id,
                c.installment_id,
                i.installment_number,
                c.amount,
                c.payment_date,
                c.collector_id,
                u.name AS collector_name,
                c.notes,
                c.created_at
            FROM collections c
            JOIN installments i ON i.id = c.installment_id
            JOIN users u ON u.id = c.collector_id
            WHERE i.loan_id = $1
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(Some(payments))
    }

    /// List installments with loan/borrower context, earliest due first
    pub async fn list_installments(
        &self,
        query: InstallmentListQuery,
    ) -> Result<Vec<InstallmentDetail>, LoanError> {
        let installments = sqlx::query_as::<_, InstallmentDetail>(
            r#"
            SELECT
                i.id,
                i.loan_id,
                l.loan_number,
                b.name AS borrower_name,
                i.installment_number,
                i.due_date,
                i.amount_due,
                i.amount_paid,
                i.status
            FROM installments i
            JOIN loans l ON l.id = i.loan_id
            JOIN borrowers b ON b.id = l.borrower_id
            WHERE ($1::installment_status IS NULL OR i.status = $1)
              AND ($2::UUID IS NULL OR i.loan_id = $2)
            ORDER BY i.due_date ASC
            "#,
        )
        .bind(query.status)
        .bind(query.loan_id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(installments)
    }

    /// Single installment with loan context
    pub async fn get_installment(&self, id: Uuid) -> Result<Option<InstallmentDetail>, LoanError> {
        let installment = sqlx::query_as::<_, InstallmentDetail>(
            r#"
            SELECT
                i.id,
                i.loan_id,
                l.loan_number,
                b.name AS borrower_name,
                i.installment_number,
                i.due_date,
                i.amount_due,
                i.amount_paid,
                i.status
            FROM installments i
            JOIN loans l ON l.id = i.loan_id
            JOIN borrowers b ON b.id = l.borrower_id
            WHERE i.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(installment)
    }

    /// Mark past-due pending/partial installments as overdue.
    /// Called on startup and periodically by the background sweep.
    pub async fn mark_overdue_installments(&self) -> Result<u64, LoanError> {
        let result = sqlx::query(
            r#"
            UPDATE installments
            SET status = 'OVERDUE', updated_at = $1
            WHERE status IN ('PENDING', 'PARTIAL') AND due_date < $1
            "#,
        )
        .bind(Utc::now())
        .execute(&self.db_pool)
        .await?;

        let marked = result.rows_affected();
        if marked > 0 {
            tracing::info!(count = marked, "Marked installments overdue");
        }
        Ok(marked)
    }
}
