use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use tripshare_db::{NewUser, UserInsert, UserUpdate};
use tripshare_types::api::{RegisterRequest, SetRoleRequest, UpdateProfileRequest, UserProfile};
use tripshare_types::models::Role;

use crate::auth::hash_password;
use crate::error::{ApiError, ApiResult};
use crate::permissions::{Identity, require_role};
use crate::state::{AppState, AppStateInner, run_blocking};
use crate::views::user_profile;

fn validate_username(username: &str) -> ApiResult<()> {
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::validation("username must be 3 to 32 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ApiError::validation(
            "username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    if password.len() < 8 {
        return Err(ApiError::validation("password must be at least 8 characters"));
    }
    Ok(())
}

/// Blank phone numbers are stored as absent so they never collide.
fn phone(raw: Option<String>) -> Option<String> {
    raw.map(|p| p.trim().to_string()).filter(|p| !p.is_empty())
}

pub fn register(s: &AppStateInner, req: RegisterRequest) -> ApiResult<UserProfile> {
    let username = req.username.trim();
    validate_username(username)?;
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password)?;
    let id = Uuid::new_v4().to_string();
    let phone_number = phone(req.phone_number);

    let outcome = s.db.create_user(&NewUser {
        id: &id,
        username,
        password_hash: &password_hash,
        first_name: req.first_name.trim(),
        last_name: req.last_name.trim(),
        email: req.email.trim(),
        phone_number: phone_number.as_deref(),
        gender: req.gender.map(|g| g.as_str()),
        address: req.address.trim(),
        avatar: req.avatar.as_deref(),
    })?;
    match outcome {
        UserInsert::Created => {}
        UserInsert::UsernameTaken => return Err(ApiError::Conflict("Username already taken".into())),
        UserInsert::PhoneTaken => {
            return Err(ApiError::Conflict("Phone number already registered".into()));
        }
    }

    info!("User {} registered", username);
    profile(s, &id)
}

fn profile(s: &AppStateInner, user_id: &str) -> ApiResult<UserProfile> {
    let row = s
        .db
        .get_user_by_id(user_id)?
        .filter(|u| u.active)
        .ok_or(ApiError::NotFound("User"))?;
    Ok(user_profile(row, &s.media))
}

pub fn update_profile(
    s: &AppStateInner,
    identity: &Identity,
    req: UpdateProfileRequest,
) -> ApiResult<UserProfile> {
    let uid = identity.user_id.to_string();
    let mut row = s.db.get_user_by_id(&uid)?.ok_or(ApiError::NotFound("User"))?;

    if let Some(password) = req.password {
        validate_password(&password)?;
        row.password = hash_password(&password)?;
    }
    if let Some(v) = req.first_name {
        row.first_name = v.trim().to_string();
    }
    if let Some(v) = req.last_name {
        row.last_name = v.trim().to_string();
    }
    if let Some(v) = req.email {
        row.email = v.trim().to_string();
    }
    if req.phone_number.is_some() {
        row.phone_number = phone(req.phone_number);
    }
    if let Some(g) = req.gender {
        row.gender = Some(g.as_str().to_string());
    }
    if let Some(v) = req.address {
        row.address = v.trim().to_string();
    }
    if req.avatar.is_some() {
        row.avatar = req.avatar;
    }

    match s.db.update_user(&row)? {
        UserUpdate::Updated => profile(s, &uid),
        UserUpdate::PhoneTaken => Err(ApiError::Conflict("Phone number already registered".into())),
        UserUpdate::NotFound => Err(ApiError::NotFound("User")),
    }
}

/// Soft-disable a user. Their tokens stop resolving on the next request.
pub fn deactivate(s: &AppStateInner, admin: &Identity, user_id: Uuid) -> ApiResult<()> {
    require_role(admin, Role::Admin)?;
    if !s.db.set_user_active(&user_id.to_string(), false)? {
        return Err(ApiError::NotFound("User"));
    }
    info!("Admin {} deactivated user {}", admin.username, user_id);
    Ok(())
}

pub fn change_role(
    s: &AppStateInner,
    admin: &Identity,
    user_id: Uuid,
    role: Role,
) -> ApiResult<UserProfile> {
    require_role(admin, Role::Admin)?;
    let uid = user_id.to_string();
    if !s.db.set_user_role(&uid, role.as_str())? {
        return Err(ApiError::NotFound("User"));
    }
    info!("Admin {} set role of {} to {}", admin.username, user_id, role);
    profile(s, &uid)
}

// -- Handlers --

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| register(s, req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn current_user(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| profile(s, &identity.user_id.to_string())).await?;
    Ok(Json(user))
}

pub async fn update_current_user(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| update_profile(s, &identity, req)).await?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| profile(s, &user_id.to_string())).await?;
    Ok(Json(user))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(&state, move |s| deactivate(s, &identity, user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    identity: Identity,
    Json(req): Json<SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| change_role(s, &identity, user_id, req.role)).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;
    use tripshare_types::models::Gender;

    fn request(username: &str, phone: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: "long enough".into(),
            first_name: "Lan".into(),
            last_name: "Tran".into(),
            email: "lan@example.com".into(),
            phone_number: phone.map(str::to_string),
            gender: Some(Gender::Women),
            address: String::new(),
            avatar: Some("avatars/lan.jpg".into()),
        }
    }

    #[test]
    fn register_resolves_avatar_and_defaults_role() {
        let s = testing::state();
        let user = register(&s, request("lan", None)).unwrap();
        assert_eq!(user.username, "lan");
        assert_eq!(user.role, Role::User);
        assert!(user.active);
        assert_eq!(user.avatar.as_deref(), Some("https://media.example.com/avatars/lan.jpg"));
    }

    #[test]
    fn duplicate_username_or_phone_conflicts() {
        let s = testing::state();
        register(&s, request("lan", Some("0901"))).unwrap();
        assert!(matches!(register(&s, request("lan", None)), Err(ApiError::Conflict(_))));
        assert!(matches!(
            register(&s, request("minh", Some(" 0901 "))),
            Err(ApiError::Conflict(_))
        ));
        // Blank phones are not unique keys.
        register(&s, request("hoa", Some(" "))).unwrap();
        register(&s, request("tuan", Some(""))).unwrap();
    }

    #[test]
    fn weak_credentials_are_rejected() {
        let s = testing::state();
        assert!(matches!(register(&s, request("ab", None)), Err(ApiError::Validation(_))));
        assert!(matches!(register(&s, request("bad name", None)), Err(ApiError::Validation(_))));
        let mut short = request("lan", None);
        short.password = "short".into();
        assert!(matches!(register(&s, short), Err(ApiError::Validation(_))));
    }

    #[test]
    fn profile_update_keeps_unset_fields() {
        let s = testing::state();
        let who = testing::user(&s, "lan");
        let updated = update_profile(
            &s,
            &who,
            UpdateProfileRequest {
                address: Some(" 12 Le Loi ".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.address, "12 Le Loi");
        assert_eq!(updated.username, "lan");
    }

    #[test]
    fn admin_only_role_change_and_deactivation() {
        let s = testing::state();
        let admin = testing::admin(&s, "root");
        let user = testing::user(&s, "lan");
        let other = testing::user(&s, "minh");

        assert!(matches!(
            change_role(&s, &user, other.user_id, Role::Admin),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(deactivate(&s, &user, other.user_id), Err(ApiError::Forbidden)));

        let promoted = change_role(&s, &admin, user.user_id, Role::Admin).unwrap();
        assert_eq!(promoted.role, Role::Admin);

        deactivate(&s, &admin, other.user_id).unwrap();
        assert!(matches!(
            profile(&s, &other.user_id.to_string()),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            deactivate(&s, &admin, Uuid::new_v4()),
            Err(ApiError::NotFound(_))
        ));
    }
}
