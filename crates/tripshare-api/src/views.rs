//! Row → response conversions. Corrupt ids or timestamps in storage are
//! logged and replaced with defaults rather than failing the whole response.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use tripshare_db::models::{
    FollowRow, HashtagRow, ImageRow, PostHashtagRow, PostRow, PostStats, RatingRow, ReportRow,
    UserRow, UserSummaryRow,
};
use tripshare_types::api::{
    FollowView, HashtagView, ImageView, PostDetail, PostSummary, RatingView, ReportView,
    UserProfile, UserSummary,
};
use tripshare_types::models::{Gender, Role};

use crate::media::MediaUrls;

pub fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through sqlite3 use "YYYY-MM-DD HH:MM:SS".
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn user_summary(id: &str, username: &str, avatar: Option<&str>, media: &MediaUrls) -> UserSummary {
    UserSummary {
        id: parse_id(id, "user id"),
        username: username.to_string(),
        avatar: media.resolve_opt(avatar),
    }
}

pub fn summary_from_row(row: &UserSummaryRow, media: &MediaUrls) -> UserSummary {
    user_summary(&row.id, &row.username, row.avatar.as_deref(), media)
}

pub fn user_profile(row: UserRow, media: &MediaUrls) -> UserProfile {
    let gender = row.gender.as_deref().and_then(|g| {
        g.parse::<Gender>()
            .map_err(|e| warn!("Corrupt gender on user '{}': {}", row.id, e))
            .ok()
    });
    let role = row.role.parse::<Role>().unwrap_or_else(|e| {
        warn!("Corrupt role on user '{}': {}", row.id, e);
        Role::User
    });

    UserProfile {
        id: parse_id(&row.id, "user id"),
        avatar: media.resolve_opt(row.avatar.as_deref()),
        created_at: parse_timestamp(&row.created_at),
        username: row.username,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        phone_number: row.phone_number,
        gender,
        address: row.address,
        role,
        active: row.active,
        report_count: row.report_count,
    }
}

pub fn hashtag_view(row: &HashtagRow) -> HashtagView {
    HashtagView {
        id: parse_id(&row.id, "hashtag id"),
        hashtag: row.label.clone(),
    }
}

/// Group batch-fetched hashtag links by post id.
pub fn hashtags_by_post(rows: Vec<PostHashtagRow>) -> HashMap<String, Vec<HashtagView>> {
    let mut map: HashMap<String, Vec<HashtagView>> = HashMap::new();
    for r in rows {
        map.entry(r.post_id).or_default().push(HashtagView {
            id: parse_id(&r.hashtag_id, "hashtag id"),
            hashtag: r.label,
        });
    }
    map
}

pub fn post_summary(row: PostRow, hashtags: Vec<HashtagView>) -> PostSummary {
    PostSummary {
        id: parse_id(&row.id, "post id"),
        start_time: parse_timestamp(&row.start_time),
        end_time: parse_timestamp(&row.end_time),
        title: row.title,
        starting_point: row.starting_point,
        end_point: row.end_point,
        hashtags,
    }
}

pub fn post_detail(
    row: PostRow,
    owner: UserSummary,
    hashtags: Vec<HashtagView>,
    stats: PostStats,
) -> PostDetail {
    PostDetail {
        id: parse_id(&row.id, "post id"),
        user: owner,
        start_time: parse_timestamp(&row.start_time),
        end_time: parse_timestamp(&row.end_time),
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
        title: row.title,
        description: row.description,
        cost: row.cost,
        starting_point: row.starting_point,
        end_point: row.end_point,
        status: row.status,
        hashtags,
        like_count: stats.like_count,
        rating_count: stats.rating_count,
        average_rating: stats.average_rating,
    }
}

pub fn rating_view(row: &RatingRow) -> RatingView {
    RatingView {
        id: parse_id(&row.id, "rating id"),
        post_id: parse_id(&row.post_id, "post id"),
        user_id: parse_id(&row.user_id, "user id"),
        stars: row.stars,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

pub fn follow_view(row: &FollowRow) -> FollowView {
    FollowView {
        id: parse_id(&row.id, "follow id"),
        follower_id: parse_id(&row.follower_id, "user id"),
        following_id: parse_id(&row.following_id, "user id"),
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn report_view(row: ReportRow) -> ReportView {
    ReportView {
        id: parse_id(&row.id, "report id"),
        reporter_id: parse_id(&row.reporter_id, "user id"),
        reported_user_id: parse_id(&row.reported_user_id, "user id"),
        created_at: parse_timestamp(&row.created_at),
        content: row.content,
    }
}

pub fn image_view(row: ImageRow, media: &MediaUrls) -> ImageView {
    ImageView {
        id: parse_id(&row.id, "image id"),
        post_id: parse_id(&row.post_id, "post id"),
        url: media.resolve(&row.reference),
        created_at: parse_timestamp(&row.created_at),
        name: row.name,
    }
}
