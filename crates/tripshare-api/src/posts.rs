//! Posts and the interactions hanging off them: likes, ratings and
//! hashtag links. Handlers stay thin; each operation is a plain function
//! over the state so it can be tested without HTTP.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

use tripshare_db::RatingUpsert;
use tripshare_db::models::{HashtagRow, PostRow};
use tripshare_types::api::{
    CreatePostRequest, HashtagRequest, LikeResponse, Page, PostDetail, PostSummary, RateRequest,
    SearchQuery, UpdatePostRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::hashtags::{get_or_create, search_term};
use crate::pagination::{POST_PAGE_SIZE, fetch_page};
use crate::permissions::{Identity, require_owner, require_owner_or_admin};
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::views::{
    hashtag_view, hashtags_by_post, parse_timestamp, post_detail, post_summary, rating_view,
    user_summary,
};

const MAX_TITLE_LEN: usize = 255;
const MAX_PLACE_LEN: usize = 255;

/// Validated post fields, shared by create and update.
struct PostDraft {
    title: String,
    description: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    cost: Option<f64>,
    starting_point: String,
    end_point: String,
}

impl PostDraft {
    fn validate(mut self) -> ApiResult<Self> {
        self.title = required("title", &self.title, MAX_TITLE_LEN)?;
        self.starting_point = required("starting_point", &self.starting_point, MAX_PLACE_LEN)?;
        self.end_point = required("end_point", &self.end_point, MAX_PLACE_LEN)?;

        if self.start_time >= self.end_time {
            return Err(ApiError::validation("start_time must be before end_time"));
        }
        if let Some(cost) = self.cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ApiError::validation("cost must be a non-negative number"));
            }
        }
        Ok(self)
    }
}

fn required(field: &str, value: &str, max: usize) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{} must not be blank", field)));
    }
    if value.chars().count() > max {
        return Err(ApiError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

fn stored_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// An active post, or `NotFound`.
pub fn load_post(s: &AppStateInner, post_id: Uuid) -> ApiResult<PostRow> {
    s.db
        .get_post(&post_id.to_string())?
        .filter(|p| p.active)
        .ok_or(ApiError::NotFound("Post"))
}

fn detail(s: &AppStateInner, row: PostRow) -> ApiResult<PostDetail> {
    let owner = s
        .db
        .get_user_by_id(&row.user_id)?
        .map(|u| user_summary(&u.id, &u.username, u.avatar.as_deref(), &s.media))
        .ok_or_else(|| anyhow::anyhow!("Post {} has no owner row", row.id))?;
    let hashtags = hashtags_by_post(s.db.hashtags_for_posts(std::slice::from_ref(&row.id))?)
        .remove(&row.id)
        .unwrap_or_default();
    let stats = s.db.post_stats(&row.id)?;
    Ok(post_detail(row, owner, hashtags, stats))
}

pub fn list(s: &AppStateInner, q: Option<&str>, page: Option<u32>) -> ApiResult<Page<PostSummary>> {
    let rows = fetch_page(
        page,
        POST_PAGE_SIZE,
        || s.db.count_posts(q),
        |limit, offset| s.db.list_posts(q, limit, offset),
    )?;

    let ids: Vec<String> = rows.items.iter().map(|p| p.id.clone()).collect();
    let mut tags = hashtags_by_post(s.db.hashtags_for_posts(&ids)?);
    Ok(rows.map(|row| {
        let hashtags = tags.remove(&row.id).unwrap_or_default();
        post_summary(row, hashtags)
    }))
}

pub fn create(s: &AppStateInner, owner: &Identity, req: CreatePostRequest) -> ApiResult<PostDetail> {
    let draft = PostDraft {
        title: req.title,
        description: req.description,
        start_time: req.start_time,
        end_time: req.end_time,
        cost: req.cost,
        starting_point: req.starting_point,
        end_point: req.end_point,
    }
    .validate()?;

    let now = tripshare_db::timestamp();
    let row = PostRow {
        id: Uuid::new_v4().to_string(),
        user_id: owner.user_id.to_string(),
        title: draft.title,
        description: draft.description,
        start_time: stored_time(&draft.start_time),
        end_time: stored_time(&draft.end_time),
        cost: draft.cost,
        starting_point: draft.starting_point,
        end_point: draft.end_point,
        status: true,
        active: true,
        created_at: now.clone(),
        updated_at: now,
    };
    s.db.insert_post(&row)?;
    info!("User {} created post {} '{}'", owner.username, row.id, row.title);

    detail(s, row)
}

pub fn update(
    s: &AppStateInner,
    post_id: Uuid,
    editor: &Identity,
    req: UpdatePostRequest,
) -> ApiResult<PostDetail> {
    let mut row = load_post(s, post_id)?;
    require_owner(editor, &row)?;

    let draft = PostDraft {
        title: req.title.unwrap_or(row.title),
        description: req.description.unwrap_or(row.description),
        start_time: req
            .start_time
            .unwrap_or_else(|| parse_timestamp(&row.start_time)),
        end_time: req.end_time.unwrap_or_else(|| parse_timestamp(&row.end_time)),
        cost: req.cost.unwrap_or(row.cost),
        starting_point: req.starting_point.unwrap_or(row.starting_point),
        end_point: req.end_point.unwrap_or(row.end_point),
    }
    .validate()?;

    row.title = draft.title;
    row.description = draft.description;
    row.start_time = stored_time(&draft.start_time);
    row.end_time = stored_time(&draft.end_time);
    row.cost = draft.cost;
    row.starting_point = draft.starting_point;
    row.end_point = draft.end_point;
    if let Some(status) = req.status {
        row.status = status;
    }
    row.updated_at = tripshare_db::timestamp();

    if !s.db.update_post(&row)? {
        return Err(ApiError::NotFound("Post"));
    }
    detail(s, row)
}

pub fn delete(s: &AppStateInner, post_id: Uuid, requester: &Identity) -> ApiResult<()> {
    let row = load_post(s, post_id)?;
    require_owner_or_admin(requester, &row)?;
    if !s.db.delete_post(&row.id)? {
        return Err(ApiError::NotFound("Post"));
    }
    info!("User {} deleted post {}", requester.username, row.id);
    Ok(())
}

/// Flip the caller's like on a post.
pub fn toggle_like(s: &AppStateInner, post_id: Uuid, user: &Identity) -> ApiResult<LikeResponse> {
    let post = load_post(s, post_id)?;
    let active = s.db.toggle_like(
        &Uuid::new_v4().to_string(),
        &user.user_id.to_string(),
        &post.id,
    )?;
    let like_count = s.db.count_likes(&post.id)?;
    Ok(LikeResponse { active, like_count })
}

pub fn validate_stars(stars: i64) -> ApiResult<i64> {
    if (1..=5).contains(&stars) {
        Ok(stars)
    } else {
        Err(ApiError::validation("stars must be between 1 and 5"))
    }
}

/// Rate a post 1–5. A second rating by the same user overwrites the first.
pub fn rate(s: &AppStateInner, post_id: Uuid, user: &Identity, stars: i64) -> ApiResult<RatingUpsert> {
    let stars = validate_stars(stars)?;
    let post = load_post(s, post_id)?;
    Ok(s.db.upsert_rating(
        &Uuid::new_v4().to_string(),
        &user.user_id.to_string(),
        &post.id,
        stars,
    )?)
}

/// Link a hashtag to a post, creating the hashtag if needed.
/// Returns the hashtag and whether a new link was made.
pub fn attach_hashtag(
    s: &AppStateInner,
    post_id: Uuid,
    owner: &Identity,
    label: &str,
) -> ApiResult<(HashtagRow, bool)> {
    let post = load_post(s, post_id)?;
    require_owner(owner, &post)?;
    let tag = get_or_create(s, label)?;
    let linked = s.db.attach_hashtag(&post.id, &tag.id)?;
    Ok((tag, linked))
}

// -- Handlers --

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = search_term(query.q);
    let page = run_blocking(&state, move |s| list(s, q.as_deref(), query.page)).await?;
    Ok(Json(page))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = run_blocking(&state, move |s| {
        let row = load_post(s, post_id)?;
        detail(s, row)
    })
    .await?;
    Ok(Json(post))
}

pub async fn create_post(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = run_blocking(&state, move |s| create(s, &identity, req)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = run_blocking(&state, move |s| update(s, post_id, &identity, req)).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| delete(s, post_id, &identity)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let like = run_blocking(&state, move |s| toggle_like(s, post_id, &identity)).await?;
    Ok(Json(like))
}

pub async fn rate_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<RateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = run_blocking(&state, move |s| rate(s, post_id, &identity, req.stars)).await?;
    Ok(match outcome {
        RatingUpsert::Created(row) => (StatusCode::CREATED, Json(rating_view(&row))),
        RatingUpsert::Updated(row) => (StatusCode::OK, Json(rating_view(&row))),
    })
}

pub async fn add_hashtag(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<HashtagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (tag, linked) =
        run_blocking(&state, move |s| attach_hashtag(s, post_id, &identity, &req.hashtag)).await?;
    let status = if linked { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(hashtag_view(&tag))))
}
