use anyhow::Result;
use rusqlite::{Connection, Row, params};

use super::OptionalExt;
use crate::models::UserRow;
use crate::{Database, timestamp};

pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone_number: Option<&'a str>,
    pub gender: Option<&'a str>,
    pub address: &'a str,
    pub avatar: Option<&'a str>,
}

#[derive(Debug)]
pub enum UserInsert {
    Created,
    UsernameTaken,
    PhoneTaken,
}

#[derive(Debug)]
pub enum UserUpdate {
    Updated,
    PhoneTaken,
    NotFound,
}

const USER_COLUMNS: &str = "id, username, password, first_name, last_name, email, phone_number, \
     gender, address, avatar, role, active, report_count, created_at, updated_at";

impl Database {
    /// Insert a user unless the username or phone number is already taken.
    /// The check and the insert run under the same connection lock.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserInsert> {
        self.with_conn(|conn| {
            if exists(conn, "SELECT 1 FROM users WHERE username = ?1", user.username)? {
                return Ok(UserInsert::UsernameTaken);
            }
            if let Some(phone) = user.phone_number {
                if exists(conn, "SELECT 1 FROM users WHERE phone_number = ?1", phone)? {
                    return Ok(UserInsert::PhoneTaken);
                }
            }

            let now = timestamp();
            conn.execute(
                "INSERT INTO users (id, username, password, first_name, last_name, email,
                                    phone_number, gender, address, avatar, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
                params![
                    user.id,
                    user.username,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.phone_number,
                    user.gender,
                    user.address,
                    user.avatar,
                    now,
                ],
            )?;
            Ok(UserInsert::Created)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Write back every mutable profile field of `user`.
    pub fn update_user(&self, user: &UserRow) -> Result<UserUpdate> {
        self.with_conn(|conn| {
            if let Some(phone) = user.phone_number.as_deref() {
                let holder: Option<String> = conn
                    .query_row(
                        "SELECT id FROM users WHERE phone_number = ?1",
                        [phone],
                        |row| row.get(0),
                    )
                    .optional()?;
                if holder.is_some_and(|id| id != user.id) {
                    return Ok(UserUpdate::PhoneTaken);
                }
            }

            let changed = conn.execute(
                "UPDATE users SET password = ?2, first_name = ?3, last_name = ?4, email = ?5,
                                  phone_number = ?6, gender = ?7, address = ?8, avatar = ?9,
                                  updated_at = ?10
                 WHERE id = ?1",
                params![
                    user.id,
                    user.password,
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.phone_number,
                    user.gender,
                    user.address,
                    user.avatar,
                    timestamp(),
                ],
            )?;

            Ok(if changed == 0 {
                UserUpdate::NotFound
            } else {
                UserUpdate::Updated
            })
        })
    }

    /// Soft-disable (or re-enable) a user. Returns false if the id is unknown.
    pub fn set_user_active(&self, id: &str, active: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET active = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, active, timestamp()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_user_role(&self, id: &str, role: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET role = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, role, timestamp()],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn user_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| exists(conn, "SELECT 1 FROM users WHERE id = ?1 AND active = 1", id))
    }
}

pub(crate) fn exists(conn: &Connection, sql: &str, key: &str) -> Result<bool> {
    Ok(conn.query_row(sql, [key], |_| Ok(())).optional()?.is_some())
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        email: row.get(5)?,
        phone_number: row.get(6)?,
        gender: row.get(7)?,
        address: row.get(8)?,
        avatar: row.get(9)?,
        role: row.get(10)?,
        active: row.get(11)?,
        report_count: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;

    fn new_user<'a>(id: &'a str, username: &'a str, phone: Option<&'a str>) -> NewUser<'a> {
        NewUser {
            id,
            username,
            password_hash: "hash",
            first_name: "An",
            last_name: "Nguyen",
            email: "an@example.com",
            phone_number: phone,
            gender: Some("women"),
            address: "Da Nang",
            avatar: None,
        }
    }

    #[test]
    fn duplicate_username_and_phone_are_reported() {
        let db = Database::open_in_memory().unwrap();
        let first = fixtures::id();
        assert!(matches!(
            db.create_user(&new_user(&first, "an", Some("090000001"))).unwrap(),
            UserInsert::Created
        ));

        let second = fixtures::id();
        assert!(matches!(
            db.create_user(&new_user(&second, "an", None)).unwrap(),
            UserInsert::UsernameTaken
        ));
        assert!(matches!(
            db.create_user(&new_user(&second, "binh", Some("090000001"))).unwrap(),
            UserInsert::PhoneTaken
        ));
    }

    #[test]
    fn new_users_default_to_active_user_role() {
        let db = Database::open_in_memory().unwrap();
        let id = fixtures::user(&db, "chi");
        let row = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(row.role, "user");
        assert!(row.active);
        assert_eq!(row.report_count, 0);
        assert!(db.get_user_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn update_keeps_own_phone_but_rejects_anothers() {
        let db = Database::open_in_memory().unwrap();
        let a = fixtures::id();
        let b = fixtures::id();
        db.create_user(&new_user(&a, "a", Some("111"))).unwrap();
        db.create_user(&new_user(&b, "b", Some("222"))).unwrap();

        let mut row = db.get_user_by_id(&a).unwrap().unwrap();
        row.address = "Hue".into();
        assert!(matches!(db.update_user(&row).unwrap(), UserUpdate::Updated));

        row.phone_number = Some("222".into());
        assert!(matches!(db.update_user(&row).unwrap(), UserUpdate::PhoneTaken));

        let stored = db.get_user_by_id(&a).unwrap().unwrap();
        assert_eq!(stored.address, "Hue");
        assert_eq!(stored.phone_number.as_deref(), Some("111"));
    }

    #[test]
    fn deactivate_and_promote() {
        let db = Database::open_in_memory().unwrap();
        let id = fixtures::user(&db, "dung");
        assert!(db.set_user_role(&id, "admin").unwrap());
        assert!(db.set_user_active(&id, false).unwrap());
        assert!(!db.user_exists(&id).unwrap());

        let row = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(row.role, "admin");
        assert!(!row.active);
        assert!(!db.set_user_active("missing", false).unwrap());
    }
}
