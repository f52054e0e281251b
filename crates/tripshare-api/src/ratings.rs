use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use tripshare_db::models::RatingRow;
use tripshare_types::api::RateRequest;

use crate::error::{ApiError, ApiResult};
use crate::permissions::{Identity, require_owner};
use crate::posts::validate_stars;
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::views::rating_view;

fn load(s: &AppStateInner, rating_id: Uuid) -> ApiResult<RatingRow> {
    s.db
        .get_rating(&rating_id.to_string())?
        .ok_or(ApiError::NotFound("Rating"))
}

pub async fn get_rating(
    State(state): State<AppState>,
    Path(rating_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_blocking(&state, move |s| load(s, rating_id)).await?;
    Ok(Json(rating_view(&row)))
}

pub async fn update_rating(
    State(state): State<AppState>,
    Path(rating_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<RateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_blocking(&state, move |s| {
        let existing = load(s, rating_id)?;
        require_owner(&identity, &existing)?;
        let stars = validate_stars(req.stars)?;
        s.db
            .update_rating_stars(&existing.id, stars)?
            .ok_or(ApiError::NotFound("Rating"))
    })
    .await?;
    Ok(Json(rating_view(&row)))
}

pub async fn delete_rating(
    State(state): State<AppState>,
    Path(rating_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| {
        let existing = load(s, rating_id)?;
        require_owner(&identity, &existing)?;
        s.db.delete_rating(&existing.id)?;
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
