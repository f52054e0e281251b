//! Travel groups. A post has at most one group; its owner opens it and
//! other users join while the post is open.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use tripshare_db::GroupInsert;
use tripshare_db::models::GroupRow;
use tripshare_types::api::{CreateGroupRequest, GroupView};

use crate::error::{ApiError, ApiResult};
use crate::permissions::{Identity, require_owner, require_owner_or_admin};
use crate::posts::load_post;
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::views::{parse_id, parse_timestamp, summary_from_row, user_summary};

fn load_group(s: &AppStateInner, post_id: Uuid) -> ApiResult<GroupRow> {
    s.db
        .get_group(&post_id.to_string())?
        .ok_or(ApiError::NotFound("Group"))
}

fn group_view(s: &AppStateInner, row: GroupRow) -> ApiResult<GroupView> {
    let members = s
        .db
        .group_members(&row.post_id)?
        .iter()
        .map(|m| summary_from_row(m, &s.media))
        .collect();
    Ok(GroupView {
        post_id: parse_id(&row.post_id, "post id"),
        creator: user_summary(
            &row.creator_id,
            &row.creator_username,
            row.creator_avatar.as_deref(),
            &s.media,
        ),
        members,
        created_at: parse_timestamp(&row.created_at),
    })
}

pub fn create(s: &AppStateInner, owner: &Identity, post_id: Uuid) -> ApiResult<GroupView> {
    let post = load_post(s, post_id)?;
    require_owner(owner, &post)?;

    match s.db.create_group(&post.id, &owner.user_id.to_string())? {
        GroupInsert::Created => {
            info!("User {} opened a group for post {}", owner.username, post.id);
            group_view(s, load_group(s, post_id)?)
        }
        GroupInsert::AlreadyExists => Err(ApiError::validation("This post already has a group")),
    }
}

pub fn join(s: &AppStateInner, user: &Identity, post_id: Uuid) -> ApiResult<GroupView> {
    let post = load_post(s, post_id)?;
    let group = load_group(s, post_id)?;
    if !post.status {
        return Err(ApiError::validation("This trip is closed for joining"));
    }
    if !s.db.add_group_member(&group.post_id, &user.user_id.to_string())? {
        return Err(ApiError::validation("You are already a member of this group"));
    }
    info!("User {} joined group {}", user.username, group.post_id);
    group_view(s, group)
}

pub fn leave(s: &AppStateInner, user: &Identity, post_id: Uuid) -> ApiResult<()> {
    let group = load_group(s, post_id)?;
    if group.creator_id == user.user_id.to_string() {
        return Err(ApiError::validation(
            "The creator cannot leave; delete the group instead",
        ));
    }
    if !s.db.remove_group_member(&group.post_id, &user.user_id.to_string())? {
        return Err(ApiError::NotFound("Membership"));
    }
    Ok(())
}

pub fn delete(s: &AppStateInner, requester: &Identity, post_id: Uuid) -> ApiResult<()> {
    let group = load_group(s, post_id)?;
    require_owner_or_admin(requester, &group)?;
    s.db.delete_group(&group.post_id)?;
    info!("User {} deleted group {}", requester.username, group.post_id);
    Ok(())
}

// -- Handlers --

pub async fn create_group(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = run_blocking(&state, move |s| create(s, &identity, req.post_id)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let group = run_blocking(&state, move |s| {
        let row = load_group(s, post_id)?;
        group_view(s, row)
    })
    .await?;
    Ok(Json(group))
}

pub async fn join_group(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let group = run_blocking(&state, move |s| join(s, &identity, post_id)).await?;
    Ok(Json(group))
}

pub async fn leave_group(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| leave(s, &identity, post_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| delete(s, &identity, post_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
