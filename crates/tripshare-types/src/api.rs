use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Gender, Role};

// -- JWT Claims --

/// Bearer token claims. `jti` identifies the token so logout can revoke it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub jti: Uuid,
    pub exp: usize,
}

// -- Pagination --

/// One window over an ordered collection. Page numbers are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page: self.next_page,
            previous_page: self.previous_page,
            total_count: self.total_count,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub page: Option<u32>,
    pub q: Option<String>,
}

// -- Auth / users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub address: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Compact author record embedded in posts, comments and groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    pub address: String,
    pub avatar: Option<String>,
    pub role: Role,
    pub active: bool,
    pub report_count: i64,
    pub created_at: DateTime<Utc>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cost: Option<f64>,
    pub starting_point: String,
    pub end_point: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Absent leaves the cost alone; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub cost: Option<Option<f64>>,
    pub starting_point: Option<String>,
    pub end_point: Option<String>,
    pub status: Option<bool>,
}

/// Present fields land in `Some`, even when they are `null`. Paired with
/// `#[serde(default)]` so a missing field stays `None`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub starting_point: String,
    pub end_point: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub hashtags: Vec<HashtagView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: Uuid,
    pub user: UserSummary,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cost: Option<f64>,
    pub starting_point: String,
    pub end_point: String,
    pub status: bool,
    pub hashtags: Vec<HashtagView>,
    pub like_count: i64,
    pub rating_count: i64,
    pub average_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Hashtags --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashtagRequest {
    pub hashtag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashtagView {
    pub id: Uuid,
    pub hashtag: String,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub content: String,
}

/// A comment with its reply tree. Replies have the same shape as the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user: UserSummary,
    pub content: String,
    pub parent_comment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub replies: Vec<CommentView>,
}

// -- Likes & ratings --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeResponse {
    pub active: bool,
    pub like_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateRequest {
    pub stars: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub stars: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Follows --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowView {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportRequest {
    pub reported_user_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportView {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupView {
    pub post_id: Uuid,
    pub creator: UserSummary,
    pub members: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
}

// -- Images --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddImageRequest {
    /// Media-host reference (public id or path) or an absolute URL.
    pub reference: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub url: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}
