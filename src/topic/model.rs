use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Id;

#[derive(Clone, Debug, PartialEq)]
pub struct Topic {
    pub(super) id: Id,
    pub(super) name: String,
    pub(super) description: String,
    pub(super) created_at: DateTime<Utc>,
}

impl Topic {
    /// A blank description is replaced with the generated default.
    pub fn new(name: &str, description: Option<&str>) -> Self {
        let name = super::normalize(name);
        let description = describe(&name, description);

        Self {
            id: Id::random(),
            name,
            description,
            created_at: Utc::now(),
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

    pub const fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub(super) fn set_description(&mut self, description: Option<&str>) {
        self.description = describe(&self.name, description);
    }
}

fn describe(name: &str, description: Option<&str>) -> String {
    match description.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_owned(),
        _ => super::default_description(name),
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TopicSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl TopicSpec {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(String::from),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn normalized_name(&self) -> String {
        super::normalize(&self.name)
    }
}

/// Topics named by a group write: every id in request order, plus the topics
/// that are not stored yet and have to be written along with the group.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    pub ids: Vec<Id>,
    pub fresh: Vec<Topic>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopicDto {
    id: Id,
    name: String,
    description: String,
}

impl TopicDto {
    pub const fn id(&self) -> &Id {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl From<&Topic> for TopicDto {
    fn from(t: &Topic) -> Self {
        Self {
            id: t.id,
            name: super::capitalize(&t.name),
            description: t.description.clone(),
        }
    }
}
