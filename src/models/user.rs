// src/models/user.rs

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Username reserved for the self-service `/users/me` routes.
pub const RESERVED_USERNAME: &str = "me";

/// Letters, digits and `@ . + - _`.
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+\z").expect("username pattern is valid"));

/// Columns selected whenever a full `User` is loaded.
pub const USER_COLUMNS: &str = "id, username, email, first_name, last_name, bio, role, \
     is_staff, is_superuser, confirmation_code";

/// Role of a user. Stored as lowercase text in the `role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'users' table in the database.
/// Serializes to the public profile shape; identifiers and secrets are skipped.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    #[serde(skip)]
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address, the confirmation code is sent here.
    pub email: String,

    pub first_name: String,
    pub last_name: String,
    pub bio: String,

    #[sqlx(try_from = "String")]
    pub role: Role,

    #[serde(skip)]
    pub is_staff: bool,

    #[serde(skip)]
    pub is_superuser: bool,

    /// Secret exchanged for an access token. Never serialized.
    #[serde(skip)]
    pub confirmation_code: String,
}

/// Rejects the reserved username and anything outside the allowed alphabet.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username == RESERVED_USERNAME {
        return Err(ValidationError::new("reserved_username")
            .with_message("The username 'me' is not allowed.".into()));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::new("invalid_username").with_message(
            "Username may contain only letters, digits and @/./+/-/_ characters.".into(),
        ));
    }
    Ok(())
}

/// DTO for self-registration.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username length must be between 1 and 150 characters."),
        custom(function = validate_username)
    )]
    pub username: String,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters.")
    )]
    pub email: String,
}

/// Echo returned by a successful signup. The code itself is never included.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub username: String,
    pub email: String,
}

/// DTO for exchanging a confirmation code for an access token.
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub confirmation_code: String,
}

/// DTO for an admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username length must be between 1 and 150 characters."),
        custom(function = validate_username)
    )]
    pub username: String,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters.")
    )]
    pub email: String,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

/// DTO for an admin updating a user. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username length must be between 1 and 150 characters."),
        custom(function = validate_username)
    )]
    pub username: Option<String>,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters.")
    )]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

/// DTO for a user editing their own profile.
/// There is no `role` field: a role sent here is ignored.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username length must be between 1 and 150 characters."),
        custom(function = validate_username)
    )]
    pub username: Option<String>,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Email must be at most 254 characters.")
    )]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl From<UpdateMeRequest> for UpdateUserRequest {
    fn from(me: UpdateMeRequest) -> Self {
        Self {
            username: me.username,
            email: me.email,
            first_name: me.first_name,
            last_name: me.last_name,
            bio: me.bio,
            role: None,
        }
    }
}
