use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use tripshare_db::CommentInsert;
use tripshare_db::models::CommentRow;
use tripshare_types::api::{
    CommentView, CreateCommentRequest, Page, PageQuery, UpdateCommentRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::middleware::MaybeIdentity;
use crate::pagination::{COMMENT_PAGE_SIZE, fetch_page};
use crate::permissions::{Identity, require_authenticated, require_owner};
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::thread::{CommentArena, MAX_THREAD_DEPTH, comment_view, render_tree};

pub const MAX_COMMENT_LEN: usize = 1000;

fn validate_content(raw: &str) -> ApiResult<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ApiError::validation("Comment content must not be blank"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::validation(format!(
            "Comment content must be at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(content.to_string())
}

/// Add a comment to a post, optionally as a reply to `parent`.
pub fn create_comment(
    s: &AppStateInner,
    post_id: Uuid,
    author: Option<&Identity>,
    content: &str,
    parent: Option<Uuid>,
) -> ApiResult<CommentRow> {
    let author = require_authenticated(author)?;
    let content = validate_content(content)?;

    let id = Uuid::new_v4().to_string();
    let parent = parent.map(|p| p.to_string());
    let outcome = s.db.insert_comment(
        &id,
        &post_id.to_string(),
        &author.user_id.to_string(),
        parent.as_deref(),
        &content,
    )?;

    match outcome {
        CommentInsert::Inserted(row) => {
            info!(
                "User {} commented on post {}{}",
                author.username,
                post_id,
                parent.map(|p| format!(" in reply to {}", p)).unwrap_or_default()
            );
            Ok(row)
        }
        CommentInsert::PostNotFound => Err(ApiError::NotFound("Post")),
        CommentInsert::ParentNotFound => Err(ApiError::NotFound("Comment")),
        CommentInsert::ParentInOtherPost => Err(ApiError::validation(
            "Parent comment belongs to a different post",
        )),
        CommentInsert::TooDeep => Err(ApiError::validation(format!(
            "Replies can nest at most {} levels deep",
            MAX_THREAD_DEPTH
        ))),
    }
}

/// Top-level comments of a post, newest first, each with its reply tree.
pub fn list_top_level(
    s: &AppStateInner,
    post_id: Uuid,
    page: Option<u32>,
    page_size: u32,
) -> ApiResult<Page<CommentView>> {
    let pid = post_id.to_string();
    s.db
        .get_post(&pid)?
        .filter(|p| p.active)
        .ok_or(ApiError::NotFound("Post"))?;

    let roots = fetch_page(
        page,
        page_size,
        || s.db.count_top_level_comments(&pid),
        |limit, offset| s.db.list_top_level_comments(&pid, limit, offset),
    )?;
    if roots.items.is_empty() {
        return Ok(roots.map(|row| comment_view(&row, &s.media)));
    }

    let arena = CommentArena::build(s.db.comments_for_post(&pid)?);
    Ok(roots.map(|row| render_tree(&arena, &row, &s.media)))
}

/// One comment with every reply below it.
pub fn comment_tree(s: &AppStateInner, comment_id: Uuid) -> ApiResult<CommentView> {
    let root = s
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or(ApiError::NotFound("Comment"))?;
    let arena = CommentArena::build(s.db.comments_for_post(&root.post_id)?);
    Ok(render_tree(&arena, &root, &s.media))
}

pub fn update_comment(
    s: &AppStateInner,
    comment_id: Uuid,
    editor: &Identity,
    content: &str,
) -> ApiResult<CommentRow> {
    let cid = comment_id.to_string();
    let existing = s.db.get_comment(&cid)?.ok_or(ApiError::NotFound("Comment"))?;
    require_owner(editor, &existing)?;
    let content = validate_content(content)?;

    s.db
        .update_comment_content(&cid, &content)?
        .ok_or(ApiError::NotFound("Comment"))
}

/// Delete a comment and, through the foreign-key cascade, all of its
/// replies. Returns how many comments were removed.
pub fn delete_comment(s: &AppStateInner, comment_id: Uuid, requester: &Identity) -> ApiResult<usize> {
    let cid = comment_id.to_string();
    let existing = s.db.get_comment(&cid)?.ok_or(ApiError::NotFound("Comment"))?;
    require_owner(requester, &existing)?;

    let removed = s.db.delete_comment(&cid)?;
    info!("User {} deleted comment {} ({} removed)", requester.username, cid, removed);
    Ok(removed)
}

// -- Handlers --

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = run_blocking(&state, move |s| {
        list_top_level(s, post_id, query.page, COMMENT_PAGE_SIZE)
    })
    .await?;
    Ok(Json(page))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    MaybeIdentity(identity): MaybeIdentity,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = run_blocking(&state, move |s| {
        let row = create_comment(
            s,
            post_id,
            identity.as_ref(),
            &req.content,
            req.parent_comment_id,
        )?;
        Ok(comment_view(&row, &s.media))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = run_blocking(&state, move |s| comment_tree(s, comment_id)).await?;
    Ok(Json(view))
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = run_blocking(&state, move |s| {
        let row = update_comment(s, comment_id, &identity, &req.content)?;
        Ok(comment_view(&row, &s.media))
    })
    .await?;
    Ok(Json(view))
}

pub async fn remove_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| delete_comment(s, comment_id, &identity)).await?;
    Ok(StatusCode::NO_CONTENT)
}
