//! Reporting service - dashboard statistics and daily summaries
//!
//! All windows are computed in UTC. Weeks start on Monday.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{
    CollectionWindow, CollectorDailyTotal, CollectorLeader, DailyPaymentLine, DailySummary,
    DashboardStats, RecentPayment,
};

/// Report service errors
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ReportError {
    fn from(e: sqlx::Error) -> Self {
        ReportError::DatabaseError(e.to_string())
    }
}

impl From<ReportError> for crate::error::ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::DatabaseError(msg) => crate::error::ApiError::DatabaseError(msg),
        }
    }
}

/// Reporting service over the loan and collection tables
#[derive(Clone)]
pub struct ReportService {
    db_pool: PgPool,
}

impl ReportService {
    /// Create a new report service instance
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Aggregate dashboard snapshot: portfolio totals, collection windows,
    /// collector leaderboard, and the recent payment feed.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ReportError> {
        let now = Utc::now();
        let today = now.date_naive();
        let today_start = start_of_day(today);
        let week_start = start_of_day(today.week(Weekday::Mon).first_day());
        let month_start = start_of_day(today.with_day(1).unwrap_or(today));

        let (total_borrowers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM borrowers")
            .fetch_one(&self.db_pool)
            .await?;

        let (total_loans, active_loans, total_principal): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'ACTIVE'),
                COALESCE(SUM(principal_amount), 0)
            FROM loans
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        let (total_paid,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(amount_paid), 0) FROM installments")
                .fetch_one(&self.db_pool)
                .await?;

        let collected_today = self.collection_window(today_start, now).await?;
        let collected_this_week = self.collection_window(week_start, now).await?;
        let collected_this_month = self.collection_window(month_start, now).await?;

        let top_collectors = sqlx::query_as::<_, CollectorLeader>(
            r#"
            SELECT
                u.id AS collector_id,
                u.name AS collector_name,
                COALESCE(SUM(c.amount), 0) AS total_amount,
                COUNT(c.id) AS payment_count
            FROM collections c
            JOIN users u ON u.id = c.collector_id
            GROUP BY u.id, u.name
            ORDER BY total_amount DESC
            LIMIT 5
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let recent_payments = sqlx::query_as::<_, RecentPayment>(
            r#"
            SELECT
                c.id,
                c.amount,
                c.payment_date,
                l.loan_number,
                b.name AS borrower_name,
                u.name AS collector_name
            FROM collections c
            JOIN installments i ON i.id = c.installment_id
            JOIN loans l ON l.id = i.loan_id
            JOIN borrowers b ON b.id = l.borrower_id
            JOIN users u ON u.id = c.collector_id
            ORDER BY c.payment_date DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        Ok(DashboardStats {
            total_borrowers,
            total_loans,
            active_loans,
            total_principal,
            total_paid,
            outstanding_amount: total_principal - total_paid,
            collected_today,
            collected_this_week,
            collected_this_month,
            top_collectors,
            recent_payments,
        })
    }

    /// Itemized summary of one calendar day, as handed to the
    /// spreadsheet-backup service.
    pub async fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary, ReportError> {
        let day_start = start_of_day(date);
        let day_end = day_start + Duration::days(1);

        let window = self.collection_window(day_start, day_end).await?;

        let (total_principal, total_paid): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(l.principal_amount), 0),
                COALESCE(SUM(p.paid), 0)
            FROM loans l
            LEFT JOIN (
                SELECT loan_id, SUM(amount_paid) AS paid
                FROM installments
                GROUP BY loan_id
            ) p ON p.loan_id = l.id
            "#,
        )
        .fetch_one(&self.db_pool)
        .await?;

        let collector_rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT u.name, COUNT(c.id), COALESCE(SUM(c.amount), 0)
            FROM collections c
            JOIN users u ON u.id = c.collector_id
            WHERE c.payment_date >= $1 AND c.payment_date < $2
            GROUP BY u.name
            ORDER BY SUM(c.amount) DESC
            "#,
        )
        .bind(day_start)
        .bind(day_end)
        .fetch_all(&self.db_pool)
        .await?;

        let payment_rows: Vec<(String, String, i64, String, DateTime<Utc>, Option<String>)> =
            sqlx::query_as(
                r#"
                SELECT
                    l.loan_number,
                    b.name,
                    c.amount,
                    u.name,
                    c.payment_date,
                    c.notes
                FROM collections c
                JOIN installments i ON i.id = c.installment_id
                JOIN loans l ON l.id = i.loan_id
                JOIN borrowers b ON b.id = l.borrower_id
                JOIN users u ON u.id = c.collector_id
                WHERE c.payment_date >= $1 AND c.payment_date < $2
                ORDER BY c.payment_date ASC
                "#,
            )
            .bind(day_start)
            .bind(day_end)
            .fetch_all(&self.db_pool)
            .await?;

        Ok(DailySummary {
            date: date.format("%Y-%m-%d").to_string(),
            total_collected: window.amount,
            total_payments: window.count,
            total_outstanding: total_principal - total_paid,
            collectors: collector_rows
                .into_iter()
                .map(|(name, collections, amount)| CollectorDailyTotal {
                    name,
                    collections,
                    amount,
                })
                .collect(),
            payments: payment_rows
                .into_iter()
                .map(
                    |(loan_number, borrower_name, amount, collector_name, at, notes)| {
                        DailyPaymentLine {
                            loan_number,
                            borrower_name,
                            amount,
                            collector_name,
                            time: at.format("%H:%M").to_string(),
                            notes,
                        }
                    },
                )
                .collect(),
        })
    }

    async fn collection_window(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CollectionWindow, ReportError> {
        let window = sqlx::query_as::<_, CollectionWindow>(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS amount, COUNT(*) AS count
            FROM collections
            WHERE payment_date >= $1 AND payment_date < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(window)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_starts_on_monday() {
        // 2024-01-10 is a Wednesday
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let monday = date.week(Weekday::Mon).first_day();
        assert_eq!(monday, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(monday.weekday(), Weekday::Mon);
    }

    #[test]
    fn test_start_of_day_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let start = start_of_day(date);
        assert_eq!(start.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }
}
