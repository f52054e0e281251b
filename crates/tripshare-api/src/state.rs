use std::sync::Arc;

use tracing::error;

use tripshare_db::Database;

use crate::error::ApiError;
use crate::media::MediaUrls;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub media: MediaUrls,
}

/// Run blocking DB work off the async runtime.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use tripshare_db::models::PostRow;
    use tripshare_db::{Database, NewUser, UserInsert, timestamp};
    use tripshare_types::models::Role;
    use uuid::Uuid;

    use super::{AppState, AppStateInner};
    use crate::media::MediaUrls;
    use crate::permissions::Identity;

    pub fn state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            token_ttl: chrono::Duration::hours(1),
            media: MediaUrls::new("https://media.example.com/"),
        })
    }

    pub fn user(s: &AppStateInner, username: &str) -> Identity {
        let id = Uuid::new_v4();
        let outcome = s
            .db
            .create_user(&NewUser {
                id: &id.to_string(),
                username,
                password_hash: "unused",
                first_name: "",
                last_name: "",
                email: "",
                phone_number: None,
                gender: None,
                address: "",
                avatar: None,
            })
            .unwrap();
        assert!(matches!(outcome, UserInsert::Created));
        Identity {
            user_id: id,
            username: username.to_string(),
            role: Role::User,
        }
    }

    pub fn admin(s: &AppStateInner, username: &str) -> Identity {
        let mut who = user(s, username);
        s.db.set_user_role(&who.user_id.to_string(), Role::Admin.as_str()).unwrap();
        who.role = Role::Admin;
        who
    }

    pub fn post(s: &AppStateInner, owner: &Identity, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = timestamp();
        s.db.insert_post(&PostRow {
            id: id.to_string(),
            user_id: owner.user_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            start_time: "2026-05-01T07:00:00.000000Z".into(),
            end_time: "2026-05-03T19:00:00.000000Z".into(),
            cost: Some(120.0),
            starting_point: "Da Nang".into(),
            end_point: "Hoi An".into(),
            status: true,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        })
        .unwrap();
        id
    }
}
