//! Issuance service: borrower resolution, visibility and return tracking

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        issuance::{
            CreateIssuanceRequest, Issuance, IssuanceQuery, IssuanceRow, NewIssuance,
            UpdateIssuanceRequest,
        },
        user::UserClaims,
    },
    repository::Repository,
};

pub const USER_REQUIRED: &str = crate::error::FIELD_REQUIRED;

/// Rows the caller may see: staff see everything, members only their own
pub fn visible_borrower(claims: &UserClaims) -> Option<i32> {
    if claims.is_staff() {
        None
    } else {
        Some(claims.user_id)
    }
}

/// Members always borrow for themselves; staff must name the borrower
pub fn resolve_borrower(claims: &UserClaims, requested: Option<i32>) -> AppResult<i32> {
    if claims.is_member() {
        return Ok(claims.user_id);
    }
    requested.ok_or_else(|| AppError::field("user", USER_REQUIRED))
}

/// Build the row to insert, before existence checks
pub fn prepare_issuance(
    claims: &UserClaims,
    request: CreateIssuanceRequest,
    now: DateTime<Utc>,
    default_loan_days: i64,
) -> AppResult<NewIssuance> {
    let user_id = resolve_borrower(claims, request.user)?;
    Ok(NewIssuance {
        book_id: request.book,
        user_id,
        due_date: request
            .due_date
            .unwrap_or_else(|| now + Duration::days(default_loan_days)),
        return_date: request.return_date,
    })
}

/// Overlay an update; a member's issuance always stays theirs
pub fn apply_update(row: &mut IssuanceRow, claims: &UserClaims, update: UpdateIssuanceRequest) {
    if let Some(book) = update.book {
        row.book_id = book;
    }
    if claims.is_member() {
        row.user_id = claims.user_id;
    } else if let Some(user) = update.user {
        row.user_id = user;
    }
    if let Some(due) = update.due_date {
        row.due_date = due;
    }
    if let Some(returned) = update.return_date {
        row.return_date = returned;
    }
}

#[derive(Clone)]
pub struct IssuancesService {
    repository: Repository,
    config: LoansConfig,
}

impl IssuancesService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    pub async fn list(
        &self,
        claims: &UserClaims,
        query: &IssuanceQuery,
    ) -> AppResult<(Vec<Issuance>, i64)> {
        let now = Utc::now();
        let (rows, total) = self
            .repository
            .issuances
            .search(visible_borrower(claims), query, now)
            .await?;
        Ok((rows.into_iter().map(|r| r.into_details(now)).collect(), total))
    }

    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<Issuance> {
        let row = self
            .repository
            .issuances
            .get_visible(id, visible_borrower(claims))
            .await?;
        Ok(row.into_details(Utc::now()))
    }

    pub async fn create(
        &self,
        claims: &UserClaims,
        request: CreateIssuanceRequest,
    ) -> AppResult<Issuance> {
        let now = Utc::now();
        let issuance = prepare_issuance(claims, request, now, self.config.default_loan_days)?;
        self.check_book(issuance.book_id).await?;
        self.check_user(issuance.user_id).await?;

        let row = self.repository.issuances.create(&issuance).await?;
        tracing::info!(
            "Issuance {} created: book {} to user {} by {}",
            row.id,
            row.book_id,
            row.user_id,
            claims.sub
        );
        Ok(row.into_details(now))
    }

    pub async fn update(
        &self,
        claims: &UserClaims,
        id: i32,
        update: UpdateIssuanceRequest,
    ) -> AppResult<Issuance> {
        let mut row = self
            .repository
            .issuances
            .get_visible(id, visible_borrower(claims))
            .await?;

        let (book_before, user_before) = (row.book_id, row.user_id);
        apply_update(&mut row, claims, update);
        if row.book_id != book_before {
            self.check_book(row.book_id).await?;
        }
        if row.user_id != user_before {
            self.check_user(row.user_id).await?;
        }

        let row = self.repository.issuances.update(&row).await?;
        tracing::info!(
            "Issuance {} updated by {} (returned: {})",
            row.id,
            claims.sub,
            row.return_date.is_some()
        );
        Ok(row.into_details(Utc::now()))
    }

    async fn check_book(&self, book_id: i32) -> AppResult<()> {
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::missing_reference("book", book_id));
        }
        Ok(())
    }

    async fn check_user(&self, user_id: i32) -> AppResult<()> {
        if !self.repository.users.exists(user_id).await? {
            return Err(AppError::missing_reference("user", user_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::TimeZone;
    use tokio_test::{assert_err, assert_ok};

    fn claims(user_id: i32, role: Role) -> UserClaims {
        UserClaims::new(user_id, "someone", role, 1)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 30, 0).unwrap()
    }

    fn request(user: Option<i32>) -> CreateIssuanceRequest {
        CreateIssuanceRequest {
            book: 4,
            user,
            due_date: None,
            return_date: None,
        }
    }

    #[test]
    fn member_is_forced_as_borrower() {
        let member = claims(12, Role::Member);
        assert_eq!(assert_ok!(resolve_borrower(&member, Some(99))), 12);
        assert_eq!(assert_ok!(resolve_borrower(&member, None)), 12);
    }

    #[test]
    fn staff_must_name_the_borrower() {
        for role in [Role::Librarian, Role::Admin] {
            let staff = claims(1, role);
            assert_eq!(assert_ok!(resolve_borrower(&staff, Some(99))), 99);

            match assert_err!(resolve_borrower(&staff, None)) {
                AppError::InvalidFields(fields) => {
                    assert_eq!(fields["user"], vec![USER_REQUIRED.to_string()])
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn members_only_see_their_own_rows() {
        assert_eq!(visible_borrower(&claims(12, Role::Member)), Some(12));
        assert_eq!(visible_borrower(&claims(1, Role::Librarian)), None);
        assert_eq!(visible_borrower(&claims(1, Role::Admin)), None);
    }

    #[test]
    fn due_date_defaults_to_loan_length() {
        let member = claims(12, Role::Member);
        let issuance = assert_ok!(prepare_issuance(&member, request(Some(3)), now(), 14));
        assert_eq!(
            issuance,
            NewIssuance {
                book_id: 4,
                user_id: 12,
                due_date: now() + Duration::days(14),
                return_date: None,
            }
        );
    }

    #[test]
    fn explicit_due_date_is_kept() {
        let librarian = claims(1, Role::Librarian);
        let due = now() + Duration::days(3);
        let issuance = assert_ok!(prepare_issuance(
            &librarian,
            CreateIssuanceRequest {
                due_date: Some(due),
                ..request(Some(7))
            },
            now(),
            14,
        ));
        assert_eq!(issuance.user_id, 7);
        assert_eq!(issuance.due_date, due);
    }

    fn row() -> IssuanceRow {
        IssuanceRow {
            id: 1,
            book_id: 4,
            user_id: 12,
            issue_date: now(),
            due_date: now() + Duration::days(14),
            return_date: None,
            book_title: "Dune".into(),
            user_name: "reader".into(),
        }
    }

    #[test]
    fn member_update_marks_return_but_keeps_borrower() {
        let mut issuance = row();
        let returned = now() + Duration::days(2);
        apply_update(
            &mut issuance,
            &claims(12, Role::Member),
            UpdateIssuanceRequest {
                user: Some(99),
                return_date: Some(Some(returned)),
                ..Default::default()
            },
        );
        assert_eq!(issuance.user_id, 12);
        assert_eq!(issuance.return_date, Some(returned));
    }

    #[test]
    fn staff_update_can_reassign_and_clear_return() {
        let mut issuance = row();
        issuance.return_date = Some(now());
        apply_update(
            &mut issuance,
            &claims(1, Role::Librarian),
            UpdateIssuanceRequest {
                user: Some(30),
                return_date: Some(None),
                ..Default::default()
            },
        );
        assert_eq!(issuance.user_id, 30);
        assert_eq!(issuance.return_date, None);
    }
}
