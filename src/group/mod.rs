use std::fmt::Display;
use std::sync::Arc;

use meeting::MeetingService;
use repository::GroupRepository;
use serde::{Deserialize, Serialize};
use service::GroupService;
use uuid::Uuid;

pub mod meeting;
pub mod model;
pub mod repository;
pub mod service;

pub type Repository = Arc<dyn GroupRepository + Send + Sync>;
pub type Service = Arc<dyn GroupService + Send + Sync>;
pub type Scheduler = Arc<dyn MeetingService + Send + Sync>;

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

/// Where a group meets: either free text or a named place on the map.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Location {
    Place {
        name: String,
        latitude: f64,
        longitude: f64,
    },
    Text(String),
}

impl Location {
    pub fn name(&self) -> &str {
        match self {
            Self::Place { name, .. } => name,
            Self::Text(text) => text,
        }
    }

    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match self {
            Self::Place {
                latitude,
                longitude,
                ..
            } => Some((*latitude, *longitude)),
            Self::Text(_) => None,
        }
    }

    pub(crate) fn from_parts(name: String, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Self::Place {
                name,
                latitude,
                longitude,
            },
            _ => Self::Text(name),
        }
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}
