//! Installment schedule generation and payment reconciliation rules
//!
//! Pure functions shared by the loan and collection services. Keeping the
//! arithmetic out of the storage layer lets the schedule invariants be
//! tested without a database.

use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;

use crate::models::InstallmentStatus;

/// One installment produced by schedule generation, before persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentDraft {
    pub installment_number: i32,
    pub due_date: DateTime<Utc>,
    pub amount_due: i64,
}

/// Split a principal into `term_weeks` weekly installments.
///
/// Amounts are integer `principal / term` with the division remainder
/// folded into the final installment, so the drafts always sum to the
/// principal exactly. Due dates are `start_date + (i+1) weeks`, numbers
/// one-indexed.
pub fn build_schedule(
    principal_amount: i64,
    term_weeks: i32,
    start_date: DateTime<Utc>,
) -> Vec<InstallmentDraft> {
    let term = i64::from(term_weeks);
    let base_amount = principal_amount / term;
    let remainder = principal_amount - base_amount * term;

    (1..=term_weeks)
        .map(|n| {
            let amount_due = if n == term_weeks {
                base_amount + remainder
            } else {
                base_amount
            };
            InstallmentDraft {
                installment_number: n,
                due_date: start_date + Duration::weeks(i64::from(n)),
                amount_due,
            }
        })
        .collect()
}

/// Classify an installment from its accumulated paid total.
///
/// The rule is cumulative: paid when the running total covers the amount
/// due, partial for any nonzero total below it, pending otherwise.
/// Overdue is a time-derived state handled by the sweep, not by payment
/// reconciliation.
pub fn classify_installment(amount_due: i64, amount_paid: i64) -> InstallmentStatus {
    if amount_paid >= amount_due {
        InstallmentStatus::Paid
    } else if amount_paid > 0 {
        InstallmentStatus::Partial
    } else {
        InstallmentStatus::Pending
    }
}

/// Generate a human-readable loan number: `LOAN-YYYYMMDD-XXXXXX`.
///
/// The random suffix plus the unique constraint on `loan_number` replace
/// the timestamp-only scheme that could collide under concurrent issuance.
pub fn generate_loan_number(now: DateTime<Utc>) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!(
        "LOAN-{:04}{:02}{:02}-{}",
        now.year(),
        now.month(),
        now.day(),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_schedule_length_and_numbering() {
        let schedule = build_schedule(10_000, 10, start());
        assert_eq!(schedule.len(), 10);
        for (i, draft) in schedule.iter().enumerate() {
            assert_eq!(draft.installment_number, i as i32 + 1);
        }
    }

    #[test]
    fn test_schedule_even_split() {
        let schedule = build_schedule(10_000, 10, start());
        assert!(schedule.iter().all(|d| d.amount_due == 1_000));
    }

    #[test]
    fn test_schedule_remainder_folds_into_last() {
        let schedule = build_schedule(10_000, 3, start());
        assert_eq!(schedule[0].amount_due, 3_333);
        assert_eq!(schedule[1].amount_due, 3_333);
        assert_eq!(schedule[2].amount_due, 3_334);
        let total: i64 = schedule.iter().map(|d| d.amount_due).sum();
        assert_eq!(total, 10_000);
    }

    #[test]
    fn test_schedule_due_dates_are_weekly() {
        let schedule = build_schedule(10_000, 10, start());
        assert_eq!(
            schedule[0].due_date,
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
        );
        assert_eq!(
            schedule[1].due_date,
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            schedule[9].due_date,
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_single_week_term() {
        let schedule = build_schedule(5_000, 1, start());
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].amount_due, 5_000);
        assert_eq!(
            schedule[0].due_date,
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_classify_installment() {
        assert_eq!(classify_installment(1_000, 0), InstallmentStatus::Pending);
        assert_eq!(classify_installment(1_000, 500), InstallmentStatus::Partial);
        assert_eq!(classify_installment(1_000, 1_000), InstallmentStatus::Paid);
        assert_eq!(classify_installment(1_000, 1_500), InstallmentStatus::Paid);
    }

    #[test]
    fn test_loan_number_format() {
        let number = generate_loan_number(start());
        assert!(number.starts_with("LOAN-20240101-"));
        assert_eq!(number.len(), "LOAN-20240101-".len() + 6);
    }

    #[test]
    fn test_loan_numbers_vary() {
        let a = generate_loan_number(start());
        let b = generate_loan_number(start());
        // Collision odds are 1 in 32^6 per pair
        assert_ne!(a, b);
    }
}
