use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::user::{self, Username, model::User};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authority {
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:update")]
    UserUpdate,
    #[serde(rename = "user:create")]
    UserCreate,
    #[serde(rename = "user:delete")]
    UserDelete,
    #[serde(rename = "topic:read")]
    TopicRead,
    #[serde(rename = "topic:create")]
    TopicCreate,
    #[serde(rename = "topic:update")]
    TopicUpdate,
    #[serde(rename = "topic:delete")]
    TopicDelete,
}

impl Authority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UserRead => "user:read",
            Self::UserUpdate => "user:update",
            Self::UserCreate => "user:create",
            Self::UserDelete => "user:delete",
            Self::TopicRead => "topic:read",
            Self::TopicCreate => "topic:create",
            Self::TopicUpdate => "topic:update",
            Self::TopicDelete => "topic:delete",
        }
    }
}

impl Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const USER_AUTHORITIES: &[Authority] = &[
    Authority::UserRead,
    Authority::TopicRead,
    Authority::TopicCreate,
];

const SUPER_ADMIN_AUTHORITIES: &[Authority] = &[
    Authority::UserRead,
    Authority::UserUpdate,
    Authority::UserCreate,
    Authority::UserDelete,
    Authority::TopicRead,
    Authority::TopicUpdate,
    Authority::TopicCreate,
    Authority::TopicDelete,
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_SUPER_ADMIN")]
    SuperAdmin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::SuperAdmin => "ROLE_SUPER_ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ROLE_USER" => Some(Self::User),
            "ROLE_SUPER_ADMIN" => Some(Self::SuperAdmin),
            _ => None,
        }
    }

    pub const fn authorities(&self) -> &'static [Authority] {
        match self {
            Self::User => USER_AUTHORITIES,
            Self::SuperAdmin => SUPER_ADMIN_AUTHORITIES,
        }
    }
}

/// An already authenticated identity. Token verification happens upstream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    username: Username,
    role: Role,
}

impl Principal {
    pub fn new(username: impl Into<Username>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    pub const fn username(&self) -> &Username {
        &self.username
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub fn has(&self, authority: Authority) -> bool {
        self.role.authorities().contains(&authority)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(Principal),
}

impl Caller {
    pub fn user(username: impl Into<Username>) -> Self {
        Self::Authenticated(Principal::new(username, Role::User))
    }

    pub fn super_admin(username: impl Into<Username>) -> Self {
        Self::Authenticated(Principal::new(username, Role::SuperAdmin))
    }
}

pub fn authenticated(caller: &Caller) -> Result<&Principal> {
    match caller {
        Caller::Anonymous => Err(Error::AnonymousCaller),
        Caller::Authenticated(p) => Ok(p),
    }
}

pub fn authorize(caller: &Caller, authority: Authority) -> Result<&Principal> {
    let principal = authenticated(caller)?;

    if !principal.has(authority) {
        return Err(Error::Forbidden(authority));
    }

    Ok(principal)
}

/// Loads the directory entry behind the caller.
pub fn current_user(caller: &Caller, users: &user::Repository) -> Result<User> {
    let principal = authenticated(caller)?;

    users
        .find_by_username(principal.username())?
        .ok_or_else(|| Error::UserNotFound(principal.username().to_string()))
}
