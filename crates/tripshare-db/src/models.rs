/// Database row types. These map directly to SQLite rows.
/// Distinct from tripshare-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub address: String,
    pub avatar: Option<String>,
    pub role: String,
    pub active: bool,
    pub report_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Id, username and avatar of a user, joined onto other rows.
#[derive(Debug, Clone)]
pub struct UserSummaryRow {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
    pub cost: Option<f64>,
    pub starting_point: String,
    pub end_point: String,
    pub status: bool,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct PostStats {
    pub like_count: i64,
    pub rating_count: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub parent_comment_id: Option<String>,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct HashtagRow {
    pub id: String,
    pub label: String,
    pub created_at: String,
}

/// A hashtag as linked to one post.
#[derive(Debug, Clone)]
pub struct PostHashtagRow {
    pub post_id: String,
    pub hashtag_id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct RatingRow {
    pub id: String,
    pub user_id: String,
    pub post_id: String,
    pub stars: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct FollowRow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub id: String,
    pub reporter_id: String,
    pub reported_user_id: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct GroupRow {
    pub post_id: String,
    pub creator_id: String,
    pub creator_username: String,
    pub creator_avatar: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ImageRow {
    pub id: String,
    pub post_id: String,
    pub reference: String,
    pub name: Option<String>,
    pub created_at: String,
}
