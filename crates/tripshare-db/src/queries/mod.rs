pub mod comments;
pub mod groups;
pub mod hashtags;
pub mod images;
pub mod interactions;
pub mod posts;
pub mod social;
pub mod tokens;
pub mod users;

use anyhow::Result;

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// `?1, ?2, …, ?n` for an `IN (…)` clause.
pub(crate) fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::Database;
    use crate::models::PostRow;
    use crate::queries::users::{NewUser, UserInsert};

    pub fn id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn user(db: &Database, username: &str) -> String {
        let id = id();
        let outcome = db
            .create_user(&NewUser {
                id: &id,
                username,
                password_hash: "hash",
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
        id
    }

    pub fn post(db: &Database, owner: &str, title: &str) -> String {
        let id = id();
        let now = crate::timestamp();
        db.insert_post(&PostRow {
            id: id.clone(),
            user_id: owner.to_string(),
            title: title.to_string(),
            description: String::new(),
            start_time: "2026-01-01T08:00:00.000000Z".into(),
            end_time: "2026-01-03T18:00:00.000000Z".into(),
            cost: None,
            starting_point: "Hanoi".into(),
            end_point: "Sapa".into(),
            status: true,
            active: true,
            created_at: now.clone(),
            updated_at: now,
        })
        .unwrap();
        id
    }
}
