//! Collection service layer - payment recording and reconciliation
//!
//! Every mutation locks the parent installment row and updates the
//! `amount_paid` accumulator in the same transaction as the collection
//! write, so concurrent partial payments serialize instead of losing
//! updates.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    page_offset, Collection, CollectionDetail, CollectionListQuery, CreateCollectionRequest,
    Installment, PaginatedResponse, UpdateCollectionRequest,
};
use crate::schedule::classify_installment;

/// Collection service errors
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Installment not found")]
    InstallmentNotFound,

    #[error("Collector not found")]
    CollectorNotFound,

    #[error("Collection not found")]
    CollectionNotFound,

    #[error("Payment of {amount} exceeds remaining due of {remaining}")]
    Overpayment { amount: i64, remaining: i64 },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CollectionError {
    fn from(e: sqlx::Error) -> Self {
        CollectionError::DatabaseError(e.to_string())
    }
}

impl From<CollectionError> for crate::error::ApiError {
    fn from(e: CollectionError) -> Self {
        use crate::error::ApiError;
        match e {
            CollectionError::InstallmentNotFound
            | CollectionError::CollectorNotFound
            | CollectionError::CollectionNotFound => ApiError::NotFound(e.to_string()),
            CollectionError::Overpayment { .. } => ApiError::ValidationError(e.to_string()),
            CollectionError::DatabaseError(msg) => ApiError::DatabaseError(msg),
        }
    }
}

/// Collection service for recording and administering payments
#[derive(Clone)]
pub struct CollectionService {
    db_pool: PgPool,
}

impl CollectionService {
    /// Create a new collection service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Record a payment against an installment and update its status
    pub async fn record_payment(
        &self,
        request: CreateCollectionRequest,
    ) -> Result<CollectionDetail, CollectionError> {
        let mut tx = self.db_pool.begin().await?;

        let installment = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installments WHERE id = $1 FOR UPDATE",
        )
        .bind(request.installment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(CollectionError::InstallmentNotFound)?;

        let collector: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
            .bind(request.collector_id)
            .fetch_optional(&mut *tx)
            .await?;
        if collector.is_none() {
            return Err(CollectionError::CollectorNotFound);
        }

        let remaining = installment.amount_due - installment.amount_paid;
        if request.amount > remaining {
            return Err(CollectionError::Overpayment {
                amount: request.amount,
                remaining,
            });
        }

        let now = Utc::now();
        let payment_date = request.payment_date.unwrap_or(now);

        let collection_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO collections (
                id, installment_id, collector_id, amount, payment_date,
                gps_lat, gps_lng, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(collection_id)
        .bind(request.installment_id)
        .bind(request.collector_id)
        .bind(request.amount)
        .bind(payment_date)
        .bind(request.gps_lat)
        .bind(request.gps_lng)
        .bind(&request.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let new_paid = installment.amount_paid + request.amount;
        self.apply_installment_totals(&mut tx, &installment, new_paid, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            collection_id = %collection_id,
            installment_id = %request.installment_id,
            amount = request.amount,
            "Payment recorded"
        );

        self.get_collection(collection_id)
            .await?
            .ok_or(CollectionError::CollectionNotFound)
    }

    /// List collections with filters, newest payment first
    pub async fn list_collections(
        &self,
        query: CollectionListQuery,
    ) -> Result<PaginatedResponse<CollectionDetail>, CollectionError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = page_offset(page, limit);

        let collections = sqlx::query_as::<_, CollectionDetail>(&format!(
            "{} \
             WHERE ($1::UUID IS NULL OR c.collector_id = $1) \
               AND ($2::UUID IS NULL OR c.installment_id = $2) \
               AND ($3::TIMESTAMPTZ IS NULL OR c.payment_date >= $3) \
               AND ($4::TIMESTAMPTZ IS NULL OR c.payment_date <= $4) \
             ORDER BY c.payment_date DESC \
             LIMIT $5 OFFSET $6",
            DETAIL_SELECT
        ))
        .bind(query.collector_id)
        .bind(query.installment_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM collections c
            WHERE ($1::UUID IS NULL OR c.collector_id = $1)
              AND ($2::UUID IS NULL OR c.installment_id = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR c.payment_date >= $3)
              AND ($4::TIMESTAMPTZ IS NULL OR c.payment_date <= $4)
            "#,
        )
        .bind(query.collector_id)
        .bind(query.installment_id)
        .bind(query.start_date)
        .bind(query.end_date)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(PaginatedResponse::new(collections, total, page, limit))
    }

    /// Single collection with installment, loan and collector context
    pub async fn get_collection(
        &self,
        id: Uuid,
    ) -> Result<Option<CollectionDetail>, CollectionError> {
        let collection =
            sqlx::query_as::<_, CollectionDetail>(&format!("{} WHERE c.id = $1", DETAIL_SELECT))
                .bind(id)
                .fetch_optional(&self.db_pool)
                .await?;

        Ok(collection)
    }

    /// Administrative edit of a payment record.
    /// The parent installment's accumulator and status are re-derived from
    /// the surviving rows in the same transaction.
    pub async fn update_collection(
        &self,
        id: Uuid,
        request: UpdateCollectionRequest,
    ) -> Result<Option<CollectionDetail>, CollectionError> {
        let mut tx = self.db_pool.begin().await?;

        let existing = sqlx::query_as::<_, Collection>(
            "SELECT * FROM collections WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(existing) = existing else {
            return Ok(None);
        };

        let installment = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installments WHERE id = $1 FOR UPDATE",
        )
        .bind(existing.installment_id)
        .fetch_one(&mut *tx)
        .await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE collections SET
                amount = COALESCE($2, amount),
                payment_date = COALESCE($3, payment_date),
                gps_lat = COALESCE($4, gps_lat),
                gps_lng = COALESCE($5, gps_lng),
                notes = COALESCE($6, notes),
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(request.amount)
        .bind(request.payment_date)
        .bind(request.gps_lat)
        .bind(request.gps_lng)
        .bind(&request.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let new_paid = self.sum_payments(&mut tx, existing.installment_id).await?;
        if new_paid > installment.amount_due {
            return Err(CollectionError::Overpayment {
                amount: new_paid,
                remaining: installment.amount_due,
            });
        }
        self.apply_installment_totals(&mut tx, &installment, new_paid, now)
            .await?;

        tx.commit().await?;

        self.get_collection(id).await
    }

    /// Delete a payment record and restore the installment's derived state
    pub async fn delete_collection(&self, id: Uuid) -> Result<bool, CollectionError> {
        let mut tx = self.db_pool.begin().await?;

        let existing: Option<(Uuid,)> =
            sqlx::query_as("SELECT installment_id FROM collections WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((installment_id,)) = existing else {
            return Ok(false);
        };

        let installment = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installments WHERE id = $1 FOR UPDATE",
        )
        .bind(installment_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let new_paid = self.sum_payments(&mut tx, installment_id).await?;
        self.apply_installment_totals(&mut tx, &installment, new_paid, now)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn sum_payments(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        installment_id: Uuid,
    ) -> Result<i64, CollectionError> {
        let (sum,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount), 0) FROM collections WHERE installment_id = $1",
        )
        .bind(installment_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(sum)
    }

    /// Write the accumulator and the status derived from it. An installment
    /// past its due date that is not fully paid stays overdue.
    async fn apply_installment_totals(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        installment: &Installment,
        new_paid: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CollectionError> {
        let mut status = classify_installment(installment.amount_due, new_paid);
        if status != crate::models::InstallmentStatus::Paid && installment.due_date < now {
            status = crate::models::InstallmentStatus::Overdue;
        }

        sqlx::query(
            "UPDATE installments SET amount_paid = $2, status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(installment.id)
        .bind(new_paid)
        .bind(status)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

/// Shared SELECT for the enriched collection view
const DETAIL_SELECT: &str = r#"
    SELECT
        c.id,
        c.amount,
        c.payment_date,
        c.gps_lat,
        c.gps_lng,
        c.notes,
        c.installment_id,
        i.installment_number,
        i.status AS installment_status,
        i.amount_due,
        i.due_date,
        l.id AS loan_id,
        l.loan_number,
        b.name AS borrower_name,
        c.collector_id,
        u.name AS collector_name,
        c.created_at
    FROM collections c
    JOIN installments i ON i.id = c.installment_id
    JOIN loans l ON l.id = i.loan_id
    JOIN borrowers b ON b.id = l.borrower_id
    JOIN users u ON u.id = c.collector_id
"#;
