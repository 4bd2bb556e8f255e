use std::fmt::Display;
use std::sync::Arc;

use repository::TopicRepository;
use serde::{Deserialize, Serialize};
use service::TopicService;
use uuid::Uuid;

pub mod model;
pub mod repository;
pub mod service;

pub type Repository = Arc<dyn TopicRepository + Send + Sync>;
pub type Service = Arc<dyn TopicService + Send + Sync>;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Hash, PartialEq, Eq)]
pub struct Id(Uuid);

impl Id {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn get(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Id {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Topic identity is the lower-cased name.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn default_description(name: &str) -> String {
    format!(
        "This is the default description for the topic {}.",
        capitalize(name)
    )
}
