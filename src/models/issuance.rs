//! Issuance (book lent to a user) model and overdue computation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Issuance row joined with book title and borrower username
#[derive(Debug, Clone, FromRow)]
pub struct IssuanceRow {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub book_title: String,
    pub user_name: String,
}

impl IssuanceRow {
    /// A return after the due date, or no return and the due date has passed
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        is_overdue(self.due_date, self.return_date, now)
    }

    pub fn into_details(self, now: DateTime<Utc>) -> Issuance {
        let is_overdue = self.is_overdue_at(now);
        Issuance {
            id: self.id,
            book: self.book_id,
            user: self.user_id,
            issue_date: self.issue_date,
            due_date: self.due_date,
            return_date: self.return_date,
            book_title: self.book_title,
            user_name: self.user_name,
            is_overdue,
        }
    }
}

pub fn is_overdue(
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    match return_date {
        Some(returned) => returned > due_date,
        None => now > due_date,
    }
}

/// Issuance as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Issuance {
    pub id: i32,
    /// Book ID
    pub book: i32,
    /// Borrower user ID
    pub user: i32,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub book_title: String,
    pub user_name: String,
    pub is_overdue: bool,
}

/// Issuance list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct IssuanceQuery {
    /// `true`: not yet returned, `false`: returned
    pub active: Option<bool>,
    /// `true`: overdue only, `false`: not overdue only
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create issuance request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateIssuanceRequest {
    pub book: i32,
    /// Borrower; required for staff, ignored for members
    pub user: Option<i32>,
    /// Defaults to the configured loan length from now
    pub due_date: Option<DateTime<Utc>>,
    pub return_date: Option<DateTime<Utc>>,
}

/// Issuance ready to be inserted, borrower resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssuance {
    pub book_id: i32,
    pub user_id: i32,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

/// Partial issuance update; `return_date: null` clears a recorded return
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateIssuanceRequest {
    pub book: Option<i32>,
    pub user: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub return_date: Option<Option<DateTime<Utc>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn row(due: DateTime<Utc>, returned: Option<DateTime<Utc>>) -> IssuanceRow {
        IssuanceRow {
            id: 1,
            book_id: 10,
            user_id: 20,
            issue_date: due - Duration::days(14),
            due_date: due,
            return_date: returned,
            book_title: "Dune".into(),
            user_name: "alice".into(),
        }
    }

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn unreturned_is_overdue_only_after_due_date() {
        let issuance = row(due(), None);
        assert!(!issuance.is_overdue_at(due() - Duration::hours(1)));
        assert!(!issuance.is_overdue_at(due()));
        assert!(issuance.is_overdue_at(due() + Duration::seconds(1)));
    }

    #[test]
    fn returned_late_stays_overdue() {
        let issuance = row(due(), Some(due() + Duration::days(2)));
        assert!(issuance.is_overdue_at(due() - Duration::days(30)));
    }

    #[test]
    fn returned_on_time_is_never_overdue() {
        let on_time = row(due(), Some(due()));
        assert!(!on_time.is_overdue_at(due() + Duration::days(365)));

        let early = row(due(), Some(due() - Duration::days(3)));
        assert!(!early.is_overdue_at(due() + Duration::days(365)));
    }

    #[test]
    fn details_carry_overdue_flag_and_ids() {
        let details = row(due(), None).into_details(due() + Duration::days(1));
        assert!(details.is_overdue);
        assert_eq!(details.book, 10);
        assert_eq!(details.user, 20);
    }

    #[test]
    fn update_request_distinguishes_cleared_return_date() {
        let cleared: UpdateIssuanceRequest = serde_json::from_str(r#"{"return_date": null}"#).unwrap();
        assert_eq!(cleared.return_date, Some(None));

        let untouched: UpdateIssuanceRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(untouched.return_date, None);
    }
}
