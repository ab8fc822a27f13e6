//! Capability-bearing identity passed into the workflow engine.
//!
//! Authentication itself (CAS ticket validation) is an external concern;
//! the engine only consumes the resulting principal: a user id, a role,
//! and the set of areas the user may review.

use crate::area::Area;
use crate::error::CoreError;
use crate::types::DbId;

/// Portal role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Reviewer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "client" => Ok(Role::Client),
            "reviewer" => Ok(Role::Reviewer),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::Validation(format!("Unknown role: '{other}'"))),
        }
    }
}

/// An authenticated principal acting on the workflow.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: DbId,
    pub role: Role,
    /// Areas this principal may review. Empty for clients.
    pub areas: Vec<Area>,
}

impl Principal {
    pub fn client(user_id: DbId) -> Self {
        Self {
            user_id,
            role: Role::Client,
            areas: Vec::new(),
        }
    }

    pub fn reviewer(user_id: DbId, areas: Vec<Area>) -> Self {
        Self {
            user_id,
            role: Role::Reviewer,
            areas,
        }
    }

    pub fn admin(user_id: DbId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            areas: Vec::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this principal may act as a reviewer for `area`.
    /// Admins may review any area.
    pub fn can_review(&self, area: Area) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Reviewer => self.areas.contains(&area),
            Role::Client => false,
        }
    }

    /// Authorize a review action on `area`, or fail with `Forbidden`.
    pub fn authorize_review(&self, area: Area) -> Result<(), CoreError> {
        if self.can_review(area) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "user {} ({}) may not review area '{}'",
                self.user_id,
                self.role.as_str(),
                area.as_str()
            )))
        }
    }

    /// Authorize an admin-only action.
    pub fn authorize_admin(&self) -> Result<(), CoreError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "user {} ({}) is not an administrator",
                self.user_id,
                self.role.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn role_round_trip() {
        for role in [Role::Client, Role::Reviewer, Role::Admin] {
            assert_eq!(Role::from_str(role.as_str()).unwrap(), role);
        }
        assert!(Role::from_str("root").is_err());
    }

    #[test]
    fn reviewer_limited_to_own_areas() {
        let p = Principal::reviewer(5, vec![Area::Security]);
        assert!(p.can_review(Area::Security));
        assert!(!p.can_review(Area::Architecture));
        assert!(p.authorize_review(Area::Security).is_ok());
        assert_matches!(
            p.authorize_review(Area::Quality),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn admin_reviews_everything() {
        let p = Principal::admin(1);
        assert!(p.can_review(Area::Architecture));
        assert!(p.can_review(Area::Operations));
        assert!(p.authorize_admin().is_ok());
    }

    #[test]
    fn client_cannot_review() {
        let p = Principal::client(9);
        assert!(!p.can_review(Area::Security));
        assert_matches!(p.authorize_admin(), Err(CoreError::Forbidden(_)));
    }
}
