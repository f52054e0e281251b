//! Per-action authorization predicates. The caller's identity is always
//! passed in explicitly; guards run before any write.

use uuid::Uuid;

use tripshare_db::models::{CommentRow, FollowRow, GroupRow, PostRow, RatingRow};
use tripshare_types::models::Role;

use crate::error::ApiError;

/// The authenticated caller, resolved once per request by the auth middleware.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

/// A row that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

impl Owned for PostRow {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for CommentRow {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for RatingRow {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Owned for FollowRow {
    fn owner_id(&self) -> &str {
        &self.follower_id
    }
}

impl Owned for GroupRow {
    fn owner_id(&self) -> &str {
        &self.creator_id
    }
}

pub fn is_authenticated(identity: Option<&Identity>) -> bool {
    identity.is_some()
}

pub fn is_owner(identity: &Identity, resource: &impl Owned) -> bool {
    resource
        .owner_id()
        .parse::<Uuid>()
        .is_ok_and(|owner| owner == identity.user_id)
}

pub fn has_role(identity: &Identity, role: Role) -> bool {
    identity.role == role
}

pub fn require_authenticated(identity: Option<&Identity>) -> Result<&Identity, ApiError> {
    identity.ok_or(ApiError::Unauthenticated)
}

pub fn require_owner(identity: &Identity, resource: &impl Owned) -> Result<(), ApiError> {
    if is_owner(identity, resource) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn require_owner_or_admin(identity: &Identity, resource: &impl Owned) -> Result<(), ApiError> {
    if is_owner(identity, resource) || has_role(identity, Role::Admin) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn require_role(identity: &Identity, role: Role) -> Result<(), ApiError> {
    if has_role(identity, role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: "an".into(),
            role,
        }
    }

    fn rating_by(user_id: &Uuid) -> RatingRow {
        RatingRow {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            post_id: Uuid::new_v4().to_string(),
            stars: 5,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn owner_passes_stranger_is_forbidden() {
        let owner = identity(Role::User);
        let stranger = identity(Role::User);
        let rating = rating_by(&owner.user_id);

        assert!(is_owner(&owner, &rating));
        assert!(require_owner(&owner, &rating).is_ok());
        assert!(matches!(require_owner(&stranger, &rating), Err(ApiError::Forbidden)));
    }

    #[test]
    fn admin_elevation_only_where_allowed() {
        let owner = identity(Role::User);
        let admin = identity(Role::Admin);
        let rating = rating_by(&owner.user_id);

        assert!(matches!(require_owner(&admin, &rating), Err(ApiError::Forbidden)));
        assert!(require_owner_or_admin(&admin, &rating).is_ok());
        assert!(require_role(&admin, Role::Admin).is_ok());
        assert!(matches!(require_role(&owner, Role::Admin), Err(ApiError::Forbidden)));
    }

    #[test]
    fn anonymous_is_unauthenticated() {
        assert!(!is_authenticated(None));
        assert!(matches!(require_authenticated(None), Err(ApiError::Unauthenticated)));
        let who = identity(Role::User);
        assert_eq!(require_authenticated(Some(&who)).unwrap().user_id, who.user_id);
    }

    #[test]
    fn malformed_owner_id_never_matches() {
        let who = identity(Role::User);
        let mut rating = rating_by(&who.user_id);
        rating.user_id = "not-a-uuid".into();
        assert!(!is_owner(&who, &rating));
    }
}
