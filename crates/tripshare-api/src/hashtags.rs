use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use tripshare_db::models::HashtagRow;
use tripshare_types::api::{HashtagRequest, SearchQuery};

use crate::error::{ApiError, ApiResult};
use crate::pagination::{DEFAULT_PAGE_SIZE, fetch_page};
use crate::permissions::Identity;
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::views::hashtag_view;

pub const MAX_HASHTAG_LEN: usize = 255;

/// Canonical label: trimmed, without leading `#`, lowercase.
pub fn normalize_hashtag(raw: &str) -> ApiResult<String> {
    let label = raw.trim().trim_start_matches('#').trim().to_lowercase();
    if label.is_empty() {
        return Err(ApiError::validation("Hashtag must not be blank"));
    }
    if label.chars().count() > MAX_HASHTAG_LEN {
        return Err(ApiError::validation(format!(
            "Hashtag must be at most {} characters",
            MAX_HASHTAG_LEN
        )));
    }
    if label.chars().any(char::is_whitespace) {
        return Err(ApiError::validation("Hashtag must be a single word"));
    }
    Ok(label)
}

/// Return the hashtag with this label, creating it on first use.
pub fn get_or_create(s: &AppStateInner, raw: &str) -> ApiResult<HashtagRow> {
    let label = normalize_hashtag(raw)?;
    let row = s.db.get_or_create_hashtag(&Uuid::new_v4().to_string(), &label)?;
    debug!("Hashtag '{}' resolved to {}", row.label, row.id);
    Ok(row)
}

/// Blank `q` means no filter.
pub(crate) fn search_term(q: Option<String>) -> Option<String> {
    q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty())
}

pub async fn list_hashtags(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = search_term(query.q).map(|q| q.trim_start_matches('#').to_lowercase());
    let page = run_blocking(&state, move |s| {
        fetch_page(
            query.page,
            DEFAULT_PAGE_SIZE,
            || s.db.count_hashtags(q.as_deref()),
            |limit, offset| s.db.list_hashtags(q.as_deref(), limit, offset),
        )
    })
    .await?;
    Ok(Json(page.map(|row| hashtag_view(&row))))
}

pub async fn create_hashtag(
    State(state): State<AppState>,
    _identity: Identity,
    Json(req): Json<HashtagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_blocking(&state, move |s| get_or_create(s, &req.hashtag)).await?;
    Ok((StatusCode::CREATED, Json(hashtag_view(&row))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;

    #[test]
    fn labels_are_normalized() {
        assert_eq!(normalize_hashtag("  #Beach ").unwrap(), "beach");
        assert_eq!(normalize_hashtag("##Sapa").unwrap(), "sapa");
        assert!(matches!(normalize_hashtag(" # "), Err(ApiError::Validation(_))));
        assert!(matches!(normalize_hashtag("two words"), Err(ApiError::Validation(_))));
        assert!(matches!(
            normalize_hashtag(&"a".repeat(MAX_HASHTAG_LEN + 1)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn same_label_resolves_to_same_row() {
        let s = testing::state();
        let first = get_or_create(&s, "#Mountains").unwrap();
        let second = get_or_create(&s, "mountains").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(s.db.count_hashtags(None).unwrap(), 1);
    }

    #[test]
    fn blank_search_is_no_filter() {
        assert_eq!(search_term(Some("   ".into())), None);
        assert_eq!(search_term(Some(" sea ".into())), Some("sea".into()));
        assert_eq!(search_term(None), None);
    }
}
