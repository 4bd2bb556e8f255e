use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::group;

use super::{Email, Id, Username};

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    pub(super) id: Id,
    pub(super) username: Username,
    pub(super) email: Email,
    pub(super) first_name: Option<String>,
    pub(super) last_name: Option<String>,
    pub(super) password_hash: String,
    pub(super) avatar_color: String,
    pub(super) role: Role,
    pub(super) active: bool,
    pub(super) not_locked: bool,
    pub(super) created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<Username>,
        email: impl Into<Email>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        let username = username.into();
        let avatar_color = avatar_color(username.as_str());

        Self {
            id: Id::random(),
            username,
            email: email.into(),
            first_name: None,
            last_name: None,
            password_hash: password_hash.into(),
            avatar_color,
            role,
            active: true,
            not_locked: true,
            created_at: Utc::now(),
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn username(&self) -> &Username {
        &self.username
    }

    pub const fn email(&self) -> &Email {
        &self.email
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn avatar_color(&self) -> &str {
        &self.avatar_color
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub const fn active(&self) -> bool {
        self.active
    }

    pub const fn not_locked(&self) -> bool {
        self.not_locked
    }

    pub const fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn with_names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }
}

#[derive(Deserialize)]
pub struct NewUser {
    pub username: Username,
    pub email: Email,
    pub password_hash: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Deserialize)]
pub struct UserUpdate {
    pub id: Id,
    pub username: Username,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub active: bool,
    pub not_locked: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserDto {
    id: Id,
    username: Username,
    email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_name: Option<String>,
    avatar_color: String,
}

impl UserDto {
    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub const fn username(&self) -> &Username {
        &self.username
    }
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            avatar_color: u.avatar_color.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MeetingDto {
    meeting_date: DateTime<Utc>,
    location: group::Location,
    group_name: String,
    group_id: group::Id,
}

impl MeetingDto {
    pub fn new(
        meeting_date: DateTime<Utc>,
        location: group::Location,
        group_name: impl Into<String>,
        group_id: group::Id,
    ) -> Self {
        Self {
            meeting_date,
            location,
            group_name: group_name.into(),
            group_id,
        }
    }

    pub const fn meeting_date(&self) -> &DateTime<Utc> {
        &self.meeting_date
    }

    pub const fn group_id(&self) -> &group::Id {
        &self.group_id
    }
}

/// Derives a stable `#rrggbb` colour from the username.
pub fn avatar_color(username: &str) -> String {
    let hash = username
        .encode_utf16()
        .fold(0i32, |h, c| (c as i32).wrapping_add((h << 5).wrapping_sub(h)));

    let mut color = String::from("#");
    for i in 0..3 {
        let value = (hash >> (i * 8)) & 0xFF;
        color.push_str(&format!("{value:02x}"));
    }
    color
}
