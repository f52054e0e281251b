use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use tripshare_db::models::{ImageRow, PostRow};
use tripshare_types::api::{AddImageRequest, ImageView, Page, PageQuery};

use crate::error::{ApiError, ApiResult};
use crate::pagination::{DEFAULT_PAGE_SIZE, fetch_page};
use crate::permissions::{Identity, require_owner, require_owner_or_admin};
use crate::posts::load_post;
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::views::image_view;

pub fn add(
    s: &AppStateInner,
    owner: &Identity,
    post_id: Uuid,
    req: AddImageRequest,
) -> ApiResult<ImageRow> {
    let post = load_post(s, post_id)?;
    require_owner(owner, &post)?;

    let reference = req.reference.trim();
    if reference.is_empty() {
        return Err(ApiError::validation("Image reference must not be blank"));
    }

    let row = ImageRow {
        id: Uuid::new_v4().to_string(),
        post_id: post.id,
        reference: reference.to_string(),
        name: req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        created_at: tripshare_db::timestamp(),
    };
    s.db.insert_image(&row)?;
    info!("User {} added image {} to post {}", owner.username, row.id, row.post_id);
    Ok(row)
}

pub fn list(s: &AppStateInner, post_id: Uuid, page: Option<u32>) -> ApiResult<Page<ImageView>> {
    let post = load_post(s, post_id)?;
    let rows = fetch_page(
        page,
        DEFAULT_PAGE_SIZE,
        || s.db.count_images(&post.id),
        |limit, offset| s.db.list_images(&post.id, limit, offset),
    )?;
    Ok(rows.map(|row| image_view(row, &s.media)))
}

/// The image and the post it hangs off. Images of removed posts are gone.
fn load(s: &AppStateInner, image_id: Uuid) -> ApiResult<(ImageRow, PostRow)> {
    let image = s
        .db
        .get_image(&image_id.to_string())?
        .ok_or(ApiError::NotFound("Image"))?;
    let post = s
        .db
        .get_post(&image.post_id)?
        .filter(|p| p.active)
        .ok_or(ApiError::NotFound("Image"))?;
    Ok((image, post))
}

pub fn delete(s: &AppStateInner, requester: &Identity, image_id: Uuid) -> ApiResult<()> {
    let (image, post) = load(s, image_id)?;
    require_owner_or_admin(requester, &post)?;
    s.db.delete_image(&image.id)?;
    Ok(())
}

// -- Handlers --

pub async fn add_image(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<AddImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let view = run_blocking(&state, move |s| {
        let row = add(s, &identity, post_id, req)?;
        Ok(image_view(row, &s.media))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_images(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = run_blocking(&state, move |s| list(s, post_id, query.page)).await?;
    Ok(Json(page))
}

pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = run_blocking(&state, move |s| {
        let (image, _) = load(s, image_id)?;
        Ok(image_view(image, &s.media))
    })
    .await?;
    Ok(Json(view))
}

pub async fn delete_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| delete(s, &identity, image_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;

    fn upload(reference: &str) -> AddImageRequest {
        AddImageRequest {
            reference: reference.into(),
            name: Some("sunrise".into()),
        }
    }

    #[test]
    fn images_list_newest_first_with_absolute_urls() {
        let s = testing::state();
        let a = testing::user(&s, "an");
        let p = testing::post(&s, &a, "Trip");

        add(&s, &a, p, upload("trips/one.jpg")).unwrap();
        add(&s, &a, p, upload("https://cdn.example.org/two.jpg")).unwrap();

        let page = list(&s, p, None).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items[0].url, "https://cdn.example.org/two.jpg");
        assert_eq!(page.items[1].url, "https://media.example.com/trips/one.jpg");
    }

    #[test]
    fn only_post_owner_adds_owner_or_admin_deletes() {
        let s = testing::state();
        let a = testing::user(&s, "an");
        let b = testing::user(&s, "binh");
        let admin = testing::admin(&s, "root");
        let p = testing::post(&s, &a, "Trip");

        assert!(matches!(add(&s, &b, p, upload("x.jpg")), Err(ApiError::Forbidden)));
        assert!(matches!(add(&s, &a, p, upload("  ")), Err(ApiError::Validation(_))));

        let img = add(&s, &a, p, upload("x.jpg")).unwrap();
        let id: Uuid = img.id.parse().unwrap();
        assert!(matches!(delete(&s, &b, id), Err(ApiError::Forbidden)));
        delete(&s, &admin, id).unwrap();
        assert!(matches!(load(&s, id), Err(ApiError::NotFound(_))));
    }
}
