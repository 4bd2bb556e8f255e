use std::sync::{Arc, Mutex, MutexGuard};

use crate::group::{self, model::Group, repository::GroupRepository};
use crate::topic::{self, model::Topic, repository::TopicRepository};
use crate::user::{self, Email, Username, model::User, repository::UserRepository};
use crate::{Error, Result};

#[derive(Default)]
struct State {
    users: Vec<User>,
    groups: Vec<Group>,
    topics: Vec<Topic>,
}

/// Keeps all three stores behind one lock, mirroring the version checks of
/// the Postgres repositories.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store lock is poisoned")
    }
}

impl UserRepository for MemoryStore {
    fn insert(&self, user: &User) -> Result<()> {
        self.state().users.push(user.clone());
        Ok(())
    }

    fn update(&self, user: &User) -> Result<()> {
        let mut state = self.state();
        if let Some(u) = state.users.iter_mut().find(|u| u.id().eq(user.id())) {
            *u = user.clone();
        }
        Ok(())
    }

    fn find_by_id(&self, id: &user::Id) -> Result<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.id().eq(id)).cloned())
    }

    fn find_by_ids(&self, ids: &[user::Id]) -> Result<Vec<User>> {
        let state = self.state();
        Ok(state
            .users
            .iter()
            .filter(|u| ids.contains(u.id()))
            .cloned()
            .collect())
    }

    fn find_by_username(&self, username: &Username) -> Result<Option<User>> {
        let state = self.state();
        Ok(state
            .users
            .iter()
            .find(|u| u.username().eq(username))
            .cloned())
    }

    fn find_by_email(&self, email: &Email) -> Result<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.email().eq(email)).cloned())
    }

    fn find_all(&self) -> Result<Vec<User>> {
        Ok(self.state().users.clone())
    }

    fn delete(&self, id: &user::Id) -> Result<()> {
        self.state().users.retain(|u| u.id().ne(id));
        Ok(())
    }
}

impl GroupRepository for MemoryStore {
    fn find_by_id(&self, id: &group::Id) -> Result<Option<Group>> {
        Ok(self.state().groups.iter().find(|g| g.id().eq(id)).cloned())
    }

    fn find_by_admin(&self, user_id: &user::Id) -> Result<Vec<Group>> {
        let state = self.state();
        Ok(state
            .groups
            .iter()
            .filter(|g| g.is_admin(user_id))
            .cloned()
            .collect())
    }

    fn find_by_member(&self, user_id: &user::Id) -> Result<Vec<Group>> {
        let state = self.state();
        Ok(state
            .groups
            .iter()
            .filter(|g| g.is_member(user_id))
            .cloned()
            .collect())
    }

    fn find_by_topic(&self, topic_id: &topic::Id) -> Result<Vec<Group>> {
        let state = self.state();
        Ok(state
            .groups
            .iter()
            .filter(|g| g.topics().contains(topic_id))
            .cloned()
            .collect())
    }

    fn find_all(&self) -> Result<Vec<Group>> {
        Ok(self.state().groups.clone())
    }

    fn save_with_topics(&self, group: &Group, new_topics: &[Topic]) -> Result<()> {
        let mut state = self.state();
        let pos = state.groups.iter().position(|g| g.id().eq(group.id()));

        let stored = match pos {
            None if group.version() == 0 => group.clone().with_version(1),
            Some(i) if state.groups[i].version() == group.version() => {
                group.clone().with_version(group.version() + 1)
            }
            _ => return Err(Error::Conflict),
        };

        if let Some(taken) = new_topics
            .iter()
            .find(|t| state.topics.iter().any(|s| s.name().eq(t.name())))
        {
            return Err(Error::TopicAlreadyExists(taken.name().to_owned()));
        }

        state.topics.extend_from_slice(new_topics);
        match pos {
            Some(i) => state.groups[i] = stored,
            None => state.groups.push(stored),
        }

        Ok(())
    }

    fn delete(&self, group: &Group) -> Result<()> {
        let mut state = self.state();
        let pos = state
            .groups
            .iter()
            .position(|g| g.id().eq(group.id()) && g.version() == group.version())
            .ok_or(Error::Conflict)?;

        state.groups.remove(pos);
        Ok(())
    }
}

impl TopicRepository for MemoryStore {
    fn insert(&self, topic: &Topic) -> Result<()> {
        let mut state = self.state();
        if state.topics.iter().any(|t| t.name().eq(topic.name())) {
            return Err(Error::TopicAlreadyExists(topic.name().to_owned()));
        }

        state.topics.push(topic.clone());
        Ok(())
    }

    fn update(&self, topic: &Topic) -> Result<()> {
        let mut state = self.state();
        if let Some(t) = state.topics.iter_mut().find(|t| t.id().eq(topic.id())) {
            *t = topic.clone();
        }
        Ok(())
    }

    fn find_by_id(&self, id: &topic::Id) -> Result<Option<Topic>> {
        Ok(self.state().topics.iter().find(|t| t.id().eq(id)).cloned())
    }

    fn find_by_name(&self, normalized_name: &str) -> Result<Option<Topic>> {
        let state = self.state();
        Ok(state
            .topics
            .iter()
            .find(|t| t.name().eq(normalized_name))
            .cloned())
    }

    fn find_by_ids(&self, ids: &[topic::Id]) -> Result<Vec<Topic>> {
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.topics.iter().find(|t| t.id().eq(id)))
            .cloned()
            .collect())
    }

    fn find_all(&self) -> Result<Vec<Topic>> {
        Ok(self.state().topics.clone())
    }

    fn delete(&self, id: &topic::Id) -> Result<()> {
        let mut state = self.state();

        state.groups = std::mem::take(&mut state.groups)
            .into_iter()
            .map(|g| {
                if g.topics().contains(id) {
                    let version = g.version() + 1;
                    g.without_topic(id).with_version(version)
                } else {
                    g
                }
            })
            .collect();
        state.topics.retain(|t| t.id().ne(id));

        Ok(())
    }
}
