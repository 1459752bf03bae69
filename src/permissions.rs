// src/permissions.rs

use axum::http::Method;
use sqlx::FromRow;

use crate::{error::AppError, models::user::Role};

/// The authenticated user behind a request, loaded fresh from the database.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl CurrentUser {
    /// Admin role or platform superuser.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    /// May edit or delete any review or comment.
    pub fn is_moderator(&self) -> bool {
        match self.role {
            Role::Admin | Role::Moderator => true,
            Role::User => self.is_superuser,
        }
    }
}

/// Identity of whoever sent the request. Inserted by `auth_middleware`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(CurrentUser),
}

impl Caller {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Caller::Anonymous => None,
            Caller::User(user) => Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// The authenticated user, or 401.
    pub fn require_user(&self) -> Result<&CurrentUser, AppError> {
        self.user()
            .ok_or_else(|| AppError::AuthError("Authentication credentials were not provided".to_string()))
    }
}

/// GET, HEAD and OPTIONS never modify state.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Authorization policies attached to resources.
///
/// `allows` is the whole-resource check; `allows_object` additionally takes the
/// id of the user who owns the target object (review/comment author, or the
/// profile's user).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Anyone reads; staff, superusers and admins write.
    AdminOrReadOnly,
    /// Admins and superusers only, for every method.
    AdminOnly,
    /// Anyone reads; authenticated users create; authors, moderators and admins edit.
    AdminModeratorOrReadOnly,
    /// Anyone reads; only the profile's own user writes.
    UserPermissions,
}

impl Policy {
    pub fn allows(self, caller: &Caller, method: &Method) -> bool {
        match self {
            Policy::AdminOnly => caller.user().is_some_and(CurrentUser::is_admin),
            Policy::AdminOrReadOnly => {
                is_safe_method(method)
                    || caller
                        .user()
                        .is_some_and(|u| u.is_staff || u.is_superuser || u.role == Role::Admin)
            }
            Policy::AdminModeratorOrReadOnly => is_safe_method(method) || caller.is_authenticated(),
            Policy::UserPermissions => is_safe_method(method) || caller.is_authenticated(),
        }
    }

    pub fn allows_object(self, caller: &Caller, method: &Method, owner_id: i64) -> bool {
        if !self.allows(caller, method) {
            return false;
        }
        match self {
            Policy::AdminOnly | Policy::AdminOrReadOnly => true,
            Policy::AdminModeratorOrReadOnly => {
                is_safe_method(method)
                    || caller
                        .user()
                        .is_some_and(|u| u.is_moderator() || u.id == owner_id)
            }
            Policy::UserPermissions => {
                is_safe_method(method) || caller.user().is_some_and(|u| u.id == owner_id)
            }
        }
    }

    /// `allows` as a result: 401 for anonymous callers, 403 otherwise.
    pub fn check(self, caller: &Caller, method: &Method) -> Result<(), AppError> {
        deny_unless(self.allows(caller, method), caller)
    }

    /// `allows_object` as a result: 401 for anonymous callers, 403 otherwise.
    pub fn check_object(self, caller: &Caller, method: &Method, owner_id: i64) -> Result<(), AppError> {
        deny_unless(self.allows_object(caller, method, owner_id), caller)
    }
}

fn deny_unless(allowed: bool, caller: &Caller) -> Result<(), AppError> {
    if allowed {
        return Ok(());
    }
    caller.require_user()?;
    Err(AppError::Forbidden(
        "You do not have permission to perform this action".to_string(),
    ))
}
