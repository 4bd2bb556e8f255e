use std::collections::HashSet;

use log::{debug, warn};

use crate::auth::{self, Authority, Caller};
use crate::{Error, Result};

use super::model::{Resolution, Topic, TopicDto, TopicSpec};
use super::{Id, Repository};

pub trait TopicService {
    /// Returns the topic with the same normalized name, creating it on first reference.
    fn resolve_or_create(&self, spec: &TopicSpec) -> Result<Topic>;

    /// Resolves every spec in order without storing anything. Later specs
    /// whose normalized name was already seen are dropped.
    fn resolve_all(&self, specs: &[TopicSpec]) -> Result<Resolution>;

    fn create(&self, caller: &Caller, spec: &TopicSpec) -> Result<Topic>;

    fn update(&self, caller: &Caller, spec: &TopicSpec) -> Result<Topic>;

    fn delete(&self, caller: &Caller, id: &Id) -> Result<()>;

    fn find_all(&self, caller: &Caller) -> Result<Vec<TopicDto>>;
}

#[derive(Clone)]
pub struct TopicServiceImpl {
    repo: Repository,
}

impl TopicServiceImpl {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

impl TopicService for TopicServiceImpl {
    fn resolve_or_create(&self, spec: &TopicSpec) -> Result<Topic> {
        let name = spec.normalized_name();
        if let Some(t) = self.repo.find_by_name(&name)? {
            return Ok(t);
        }

        let topic = Topic::new(&spec.name, spec.description.as_deref());
        match self.repo.insert(&topic) {
            Ok(()) => {
                debug!("created topic {}", topic.name());
                Ok(topic)
            }
            // lost a race against a concurrent insert of the same name
            Err(Error::TopicAlreadyExists(_)) => self
                .repo
                .find_by_name(&name)?
                .ok_or(Error::TopicNotFound(name)),
            Err(e) => Err(e),
        }
    }

    fn resolve_all(&self, specs: &[TopicSpec]) -> Result<Resolution> {
        let mut seen = HashSet::with_capacity(specs.len());
        let mut resolution = Resolution::default();

        for spec in specs {
            let name = spec.normalized_name();
            if seen.contains(&name) {
                warn!("duplicate topic dropped: {}", spec.name);
                continue;
            }

            match self.repo.find_by_name(&name)? {
                Some(t) => resolution.ids.push(*t.id()),
                None => {
                    let topic = Topic::new(&spec.name, spec.description.as_deref());
                    resolution.ids.push(*topic.id());
                    resolution.fresh.push(topic);
                }
            }
            seen.insert(name);
        }

        Ok(resolution)
    }

    fn create(&self, caller: &Caller, spec: &TopicSpec) -> Result<Topic> {
        auth::authorize(caller, Authority::TopicCreate)?;

        let name = spec.normalized_name();
        if self.repo.find_by_name(&name)?.is_some() {
            return Err(Error::TopicAlreadyExists(name));
        }

        let topic = Topic::new(&spec.name, spec.description.as_deref());
        self.repo.insert(&topic)?;

        debug!("created topic {}", topic.name());
        Ok(topic)
    }

    fn update(&self, caller: &Caller, spec: &TopicSpec) -> Result<Topic> {
        auth::authorize(caller, Authority::TopicUpdate)?;

        let name = spec.normalized_name();
        let mut topic = self
            .repo
            .find_by_name(&name)?
            .ok_or(Error::TopicNotFound(name))?;

        topic.set_description(spec.description.as_deref());
        self.repo.update(&topic)?;

        Ok(topic)
    }

    fn delete(&self, caller: &Caller, id: &Id) -> Result<()> {
        auth::authorize(caller, Authority::TopicDelete)?;

        let topic = self
            .repo
            .find_by_id(id)?
            .ok_or_else(|| Error::TopicNotFound(id.to_string()))?;

        self.repo.delete(topic.id())?;

        debug!("deleted topic {}", topic.name());
        Ok(())
    }

    fn find_all(&self, caller: &Caller) -> Result<Vec<TopicDto>> {
        auth::authorize(caller, Authority::TopicRead)?;

        let topics = self.repo.find_all()?;
        Ok(topics.iter().map(TopicDto::from).collect())
    }
}
