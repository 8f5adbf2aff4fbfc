//! Borrower registry service - CRUD and per-borrower loan summaries

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    page_offset, Borrower, BorrowerListQuery, BorrowerSummary, CreateBorrowerRequest,
    PaginatedResponse, UpdateBorrowerRequest,
};

/// Borrower registry service
#[derive(Clone)]
pub struct BorrowerService {
    db_pool: PgPool,
}

impl BorrowerService {
    /// Create a new borrower service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Register a new borrower
    pub async fn create_borrower(&self, request: CreateBorrowerRequest) -> Result<Borrower> {
        let borrower = sqlx::query_as::<_, Borrower>(
            r#"
            INSERT INTO borrowers (
                id, name, phone, address, village, gps_lat, gps_lng,
                photo_url, id_proof_url, household_head, is_active,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.village)
        .bind(request.gps_lat)
        .bind(request.gps_lng)
        .bind(&request.photo_url)
        .bind(&request.id_proof_url)
        .bind(&request.household_head)
        .bind(request.is_active.unwrap_or(true))
        .bind(Utc::now())
        .fetch_one(&self.db_pool)
        .await
        .context("Failed to insert borrower")?;

        Ok(borrower)
    }

    /// List borrowers with optional name/village/phone search, newest first
    pub async fn list_borrowers(
        &self,
        query: BorrowerListQuery,
    ) -> Result<PaginatedResponse<Borrower>> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = page_offset(page, limit);
        let search = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let borrowers = sqlx::query_as::<_, Borrower>(
            r#"
            SELECT * FROM borrowers
            WHERE $1::TEXT IS NULL
               OR name ILIKE $1 OR village ILIKE $1 OR phone ILIKE $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM borrowers
            WHERE $1::TEXT IS NULL
               OR name ILIKE $1 OR village ILIKE $1 OR phone ILIKE $1
            "#,
        )
        .bind(&search)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(PaginatedResponse::new(borrowers, total, page, limit))
    }

    /// Get a borrower by ID
    pub async fn get_borrower(&self, id: Uuid) -> Result<Option<Borrower>> {
        let borrower = sqlx::query_as::<_, Borrower>("SELECT * FROM borrowers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(borrower)
    }

    /// Partially update a borrower; returns None if absent
    pub async fn update_borrower(
        &self,
        id: Uuid,
        request: UpdateBorrowerRequest,
    ) -> Result<Option<Borrower>> {
        let borrower = sqlx::query_as::<_, Borrower>(
            r#"
            UPDATE borrowers SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                address = COALESCE($4, address),
                village = COALESCE($5, village),
                gps_lat = COALESCE($6, gps_lat),
                gps_lng = COALESCE($7, gps_lng),
                photo_url = COALESCE($8, photo_url),
                id_proof_url = COALESCE($9, id_proof_url),
                household_head = COALESCE($10, household_head),
                is_active = COALESCE($11, is_active),
                updated_at = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.address)
        .bind(&request.village)
        .bind(request.gps_lat)
        .bind(request.gps_lng)
        .bind(&request.photo_url)
        .bind(&request.id_proof_url)
        .bind(&request.household_head)
        .bind(request.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(borrower)
    }

    /// Hard-delete a borrower; returns false if absent
    pub async fn delete_borrower(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM borrowers WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Loan count and aggregate outstanding across a borrower's loans.
    /// A borrower with zero loans yields zeros, not an error.
    pub async fn borrower_summary(&self, id: Uuid) -> Result<Option<BorrowerSummary>> {
        if self.get_borrower(id).await?.is_none() {
            return Ok(None);
        }

        let (loan_count, total_outstanding): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(l.principal_amount - COALESCE(p.paid, 0)), 0)
            FROM loans l
            LEFT JOIN (
                SELECT loan_id, SUM(amount_paid) AS paid
                FROM installments
                GROUP BY loan_id
            ) p ON p.loan_id = l.id
            WHERE l.borrower_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(Some(BorrowerSummary {
            borrower_id: id,
            loan_count,
            total_outstanding,
        }))
    }
}
