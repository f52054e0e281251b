//! Follow edges between users, and user reports for admins to review.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use tripshare_db::models::{FollowRow, ReportRow};
use tripshare_db::{FollowInsert, ReportInsert};
use tripshare_types::api::{FollowRequest, Page, PageQuery, ReportRequest, UserSummary};
use tripshare_types::models::Role;

use crate::error::{ApiError, ApiResult};
use crate::pagination::{DEFAULT_PAGE_SIZE, fetch_page};
use crate::permissions::{Identity, require_owner, require_role};
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::views::{follow_view, report_view, summary_from_row};

const MAX_REPORT_LEN: usize = 1000;

pub fn follow(s: &AppStateInner, follower: &Identity, target: Uuid) -> ApiResult<FollowRow> {
    if follower.user_id == target {
        return Err(ApiError::validation("You cannot follow yourself"));
    }
    let outcome = s.db.insert_follow(
        &Uuid::new_v4().to_string(),
        &follower.user_id.to_string(),
        &target.to_string(),
    )?;
    match outcome {
        FollowInsert::Created(row) => {
            info!("User {} followed {}", follower.username, target);
            Ok(row)
        }
        FollowInsert::Duplicate => Err(ApiError::validation("You already follow this user")),
        FollowInsert::UserNotFound => Err(ApiError::NotFound("User")),
    }
}

pub fn unfollow(s: &AppStateInner, requester: &Identity, follow_id: Uuid) -> ApiResult<()> {
    let row = s
        .db
        .get_follow(&follow_id.to_string())?
        .ok_or(ApiError::NotFound("Follow"))?;
    require_owner(requester, &row)?;
    s.db.delete_follow(&row.id)?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Followers,
    Following,
}

pub fn edges(
    s: &AppStateInner,
    user_id: Uuid,
    direction: Direction,
    page: Option<u32>,
) -> ApiResult<Page<UserSummary>> {
    let uid = user_id.to_string();
    if !s.db.user_exists(&uid)? {
        return Err(ApiError::NotFound("User"));
    }
    let rows = match direction {
        Direction::Followers => fetch_page(
            page,
            DEFAULT_PAGE_SIZE,
            || s.db.count_followers(&uid),
            |limit, offset| s.db.list_followers(&uid, limit, offset),
        )?,
        Direction::Following => fetch_page(
            page,
            DEFAULT_PAGE_SIZE,
            || s.db.count_following(&uid),
            |limit, offset| s.db.list_following(&uid, limit, offset),
        )?,
    };
    Ok(rows.map(|row| summary_from_row(&row, &s.media)))
}

pub fn report(
    s: &AppStateInner,
    reporter: &Identity,
    reported: Uuid,
    content: &str,
) -> ApiResult<ReportRow> {
    if reporter.user_id == reported {
        return Err(ApiError::validation("You cannot report yourself"));
    }
    let content = content.trim();
    if content.is_empty() || content.chars().count() > MAX_REPORT_LEN {
        return Err(ApiError::validation(format!(
            "Report content must be 1 to {} characters",
            MAX_REPORT_LEN
        )));
    }

    let outcome = s.db.insert_report(
        &Uuid::new_v4().to_string(),
        &reporter.user_id.to_string(),
        &reported.to_string(),
        content,
    )?;
    match outcome {
        ReportInsert::Created(row) => {
            info!("User {} reported {}", reporter.username, reported);
            Ok(row)
        }
        ReportInsert::Duplicate => Err(ApiError::validation("You have already reported this user")),
        ReportInsert::UserNotFound => Err(ApiError::NotFound("User")),
    }
}

// -- Handlers --

pub async fn create_follow(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<FollowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_blocking(&state, move |s| follow(s, &identity, req.user_id)).await?;
    Ok((StatusCode::CREATED, Json(follow_view(&row))))
}

pub async fn delete_follow(
    State(state): State<AppState>,
    Path(follow_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| unfollow(s, &identity, follow_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page =
        run_blocking(&state, move |s| edges(s, user_id, Direction::Followers, query.page)).await?;
    Ok(Json(page))
}

pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page =
        run_blocking(&state, move |s| edges(s, user_id, Direction::Following, query.page)).await?;
    Ok(Json(page))
}

pub async fn create_report(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<ReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_blocking(&state, move |s| {
        report(s, &identity, req.reported_user_id, &req.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(report_view(row))))
}

pub async fn list_reports(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = run_blocking(&state, move |s| {
        require_role(&identity, Role::Admin)?;
        fetch_page(
            query.page,
            DEFAULT_PAGE_SIZE,
            || s.db.count_reports(),
            |limit, offset| s.db.list_reports(limit, offset),
        )
    })
    .await?;
    Ok(Json(page.map(report_view)))
}

pub async fn dismiss_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| {
        require_role(&identity, Role::Admin)?;
        if !s.db.delete_report(&report_id.to_string())? {
            return Err(ApiError::NotFound("Report"));
        }
        info!("Admin {} dismissed report {}", identity.username, report_id);
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;

    #[test]
    fn self_and_duplicate_follows_are_rejected() {
        let s = testing::state();
        let a = testing::user(&s, "an");
        let b = testing::user(&s, "binh");

        assert!(matches!(follow(&s, &a, a.user_id), Err(ApiError::Validation(_))));
        follow(&s, &a, b.user_id).unwrap();
        assert!(matches!(follow(&s, &a, b.user_id), Err(ApiError::Validation(_))));
        assert!(matches!(follow(&s, &a, Uuid::new_v4()), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn follower_lists_and_owner_only_unfollow() {
        let s = testing::state();
        let a = testing::user(&s, "an");
        let b = testing::user(&s, "binh");
        let c = testing::user(&s, "chi");

        let edge = follow(&s, &a, c.user_id).unwrap();
        follow(&s, &b, c.user_id).unwrap();

        let followers = edges(&s, c.user_id, Direction::Followers, None).unwrap();
        assert_eq!(followers.total_count, 2);
        assert_eq!(followers.items[0].username, "binh");
        let following = edges(&s, a.user_id, Direction::Following, None).unwrap();
        assert_eq!(following.items[0].id, c.user_id);

        let edge_id: Uuid = edge.id.parse().unwrap();
        assert!(matches!(unfollow(&s, &c, edge_id), Err(ApiError::Forbidden)));
        unfollow(&s, &a, edge_id).unwrap();
        assert_eq!(edges(&s, c.user_id, Direction::Followers, None).unwrap().total_count, 1);
    }

    #[test]
    fn reports_count_against_the_reported_user() {
        let s = testing::state();
        let a = testing::user(&s, "an");
        let b = testing::user(&s, "binh");

        assert!(matches!(report(&s, &a, a.user_id, "me"), Err(ApiError::Validation(_))));
        assert!(matches!(report(&s, &a, b.user_id, "  "), Err(ApiError::Validation(_))));
        report(&s, &a, b.user_id, "spam").unwrap();
        assert!(matches!(report(&s, &a, b.user_id, "again"), Err(ApiError::Validation(_))));

        let reported = s.db.get_user_by_id(&b.user_id.to_string()).unwrap().unwrap();
        assert_eq!(reported.report_count, 1);
    }
}
