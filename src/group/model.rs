use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topic::{self, model::TopicDto, model::TopicSpec};
use crate::user::{self, model::UserDto};

use super::{Id, Location};

/// Aggregate root. `admin` is always one of `members`, and `members` is
/// never empty while the group exists.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub(super) id: Id,
    pub(super) name: String,
    pub(super) description: String,
    pub(super) location: Location,
    pub(super) created_at: DateTime<Utc>,
    pub(super) admin: user::Id,
    pub(super) members: Vec<user::Id>,
    pub(super) meeting_dates: Vec<DateTime<Utc>>,
    pub(super) topics: Vec<topic::Id>,
    pub(super) version: i32,
}

impl Group {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        location: Location,
        admin: user::Id,
        topics: Vec<topic::Id>,
    ) -> Self {
        Self {
            id: Id::random(),
            name: name.into(),
            description: description.into(),
            location,
            created_at: Utc::now(),
            admin,
            members: vec![admin],
            meeting_dates: vec![],
            topics,
            version: 0,
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn location(&self) -> &Location {
        &self.location
    }

    pub const fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub const fn admin(&self) -> &user::Id {
        &self.admin
    }

    /// In insertion order.
    pub fn members(&self) -> &[user::Id] {
        &self.members
    }

    /// Sorted from the latest date to the earliest.
    pub fn meeting_dates(&self) -> &[DateTime<Utc>] {
        &self.meeting_dates
    }

    pub fn topics(&self) -> &[topic::Id] {
        &self.topics
    }

    /// Zero until the group is first stored.
    pub const fn version(&self) -> i32 {
        self.version
    }

    #[cfg(test)]
    pub(crate) fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    #[cfg(test)]
    pub(crate) fn without_topic(mut self, topic_id: &topic::Id) -> Self {
        self.topics.retain(|t| t.ne(topic_id));
        self
    }

    pub fn is_admin(&self, user_id: &user::Id) -> bool {
        self.admin.eq(user_id)
    }

    pub fn is_member(&self, user_id: &user::Id) -> bool {
        self.members.contains(user_id)
    }

    pub(super) fn update_details(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        location: Location,
    ) {
        self.name = name.into();
        self.description = description.into();
        self.location = location;
    }

    pub(super) fn set_topics(&mut self, topics: Vec<topic::Id>) {
        self.topics = topics;
    }

    pub(super) fn add_member(&mut self, user_id: user::Id) {
        if !self.is_member(&user_id) {
            self.members.push(user_id);
        }
    }

    pub(super) fn remove_member(&mut self, user_id: &user::Id) {
        assert!(!self.is_admin(user_id), "admin must be handed off first");
        self.members.retain(|m| m.ne(user_id));
    }

    /// Makes `user_id` the admin and returns the previous one, who stays a member.
    pub(super) fn promote(&mut self, user_id: user::Id) -> user::Id {
        assert!(self.is_member(&user_id), "only members can be promoted");
        std::mem::replace(&mut self.admin, user_id)
    }

    /// The member that inherits adminship when the admin leaves: the one
    /// joined right after the admin, wrapping around to the oldest member.
    pub fn successor(&self) -> Option<user::Id> {
        if self.members.len() < 2 {
            return None;
        }

        let pos = self.members.iter().position(|m| self.is_admin(m))?;
        Some(self.members[(pos + 1) % self.members.len()])
    }

    pub(super) fn merge_meeting_dates(&mut self, dates: &[DateTime<Utc>]) {
        let merged = self
            .meeting_dates
            .iter()
            .chain(dates)
            .copied()
            .collect::<BTreeSet<_>>();

        self.meeting_dates = merged.into_iter().rev().collect();
    }

    pub(super) fn remove_meeting_dates(&mut self, dates: &[DateTime<Utc>]) {
        self.meeting_dates.retain(|d| !dates.contains(d));
    }

    /// The earliest stored date strictly after `now`.
    pub fn next_meeting_after(&self, now: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.meeting_dates.iter().filter(|d| *d > now).min().copied()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub description: String,
    pub location: Location,
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GroupUpdate {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub location: Location,
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupDto {
    id: Id,
    name: String,
    description: String,
    location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_meeting_date: Option<DateTime<Utc>>,
    topics: Vec<TopicDto>,
}

impl GroupDto {
    pub fn new(
        g: &Group,
        topics: Vec<TopicDto>,
        next_meeting_date: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: g.id,
            name: g.name.clone(),
            description: g.description.clone(),
            location: g.location.clone(),
            next_meeting_date,
            topics,
        }
    }

    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn next_meeting_date(&self) -> Option<&DateTime<Utc>> {
        self.next_meeting_date.as_ref()
    }

    pub fn topics(&self) -> &[TopicDto] {
        &self.topics
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupDetailsDto {
    id: Id,
    name: String,
    description: String,
    location: Location,
    admin: UserDto,
    members: Vec<UserDto>,
    meeting_dates: Vec<DateTime<Utc>>,
    topics: Vec<TopicDto>,
}

impl GroupDetailsDto {
    pub fn new(g: &Group, admin: UserDto, members: Vec<UserDto>, topics: Vec<TopicDto>) -> Self {
        Self {
            id: g.id,
            name: g.name.clone(),
            description: g.description.clone(),
            location: g.location.clone(),
            admin,
            members,
            meeting_dates: g.meeting_dates.clone(),
            topics,
        }
    }

    pub const fn admin(&self) -> &UserDto {
        &self.admin
    }

    pub fn members(&self) -> &[UserDto] {
        &self.members
    }

    pub fn meeting_dates(&self) -> &[DateTime<Utc>] {
        &self.meeting_dates
    }

    pub fn topics(&self) -> &[TopicDto] {
        &self.topics
    }
}
