use log::debug;

use crate::auth::{self, Authority, Caller};
use crate::group::{self, Location, model::Group};
use crate::{Error, Result};

use super::model::{MeetingDto, NewUser, User, UserDto, UserUpdate};
use super::{Id, Repository};

pub trait UserService {
    /// The password hash is stored as given.
    fn register(&self, new_user: NewUser) -> Result<Id>;

    /// Registration on behalf of someone else.
    fn create(&self, caller: &Caller, new_user: NewUser) -> Result<Id>;

    fn update(&self, caller: &Caller, update: UserUpdate) -> Result<UserDto>;

    /// The user leaves every group first, handing off or deleting the ones
    /// they administer.
    fn delete(&self, caller: &Caller, id: &Id) -> Result<()>;

    fn find_all(&self, caller: &Caller) -> Result<Vec<UserDto>>;

    fn find_by_id(&self, caller: &Caller, id: &Id) -> Result<UserDto>;

    fn find_meetings_where_member(&self, caller: &Caller) -> Result<Vec<MeetingDto>>;

    fn find_meetings_where_admin(&self, caller: &Caller) -> Result<Vec<MeetingDto>>;

    fn find_locations_where_member(&self, caller: &Caller) -> Result<Vec<Location>>;

    fn find_locations_where_admin(&self, caller: &Caller) -> Result<Vec<Location>>;
}

#[derive(Clone)]
pub struct UserServiceImpl {
    repo: Repository,
    group_repo: group::Repository,
}

impl UserServiceImpl {
    pub fn new(repo: Repository, group_repo: group::Repository) -> Self {
        Self { repo, group_repo }
    }
}

fn meetings_of(groups: &[Group]) -> Vec<MeetingDto> {
    groups
        .iter()
        .flat_map(|g| {
            g.meeting_dates()
                .iter()
                .map(|d| MeetingDto::new(*d, g.location().clone(), g.name(), *g.id()))
        })
        .collect()
}

fn locations_of(groups: &[Group]) -> Vec<Location> {
    groups.iter().map(|g| g.location().clone()).collect()
}

impl UserService for UserServiceImpl {
    fn register(&self, new_user: NewUser) -> Result<Id> {
        if self.repo.find_by_username(&new_user.username)?.is_some() {
            return Err(Error::UsernameTaken(new_user.username));
        }

        if self.repo.find_by_email(&new_user.email)?.is_some() {
            return Err(Error::EmailTaken(new_user.email));
        }

        let user = User::new(
            new_user.username,
            new_user.email,
            new_user.password_hash,
            new_user.role,
        )
        .with_names(new_user.first_name, new_user.last_name);
        self.repo.insert(&user)?;

        debug!("registered {}", user.username());
        Ok(*user.id())
    }

    fn create(&self, caller: &Caller, new_user: NewUser) -> Result<Id> {
        auth::authorize(caller, Authority::UserCreate)?;
        self.register(new_user)
    }

    fn update(&self, caller: &Caller, update: UserUpdate) -> Result<UserDto> {
        auth::authorize(caller, Authority::UserUpdate)?;

        let mut user = self
            .repo
            .find_by_id(&update.id)?
            .ok_or_else(|| Error::UserNotFound(update.id.to_string()))?;

        if let Some(other) = self.repo.find_by_username(&update.username)? {
            if other.id().ne(user.id()) {
                return Err(Error::UsernameTaken(update.username));
            }
        }

        if let Some(other) = self.repo.find_by_email(&update.email)? {
            if other.id().ne(user.id()) {
                return Err(Error::EmailTaken(update.email));
            }
        }

        user.username = update.username;
        user.email = update.email;
        user.first_name = update.first_name;
        user.last_name = update.last_name;
        user.active = update.active;
        user.not_locked = update.not_locked;
        self.repo.update(&user)?;

        debug!("updated user {}", user.id());
        Ok(UserDto::from(&user))
    }

    fn delete(&self, caller: &Caller, id: &Id) -> Result<()> {
        auth::authorize(caller, Authority::UserDelete)?;

        let user = self
            .repo
            .find_by_id(id)?
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

        for group in self.group_repo.find_by_member(id)? {
            group::service::withdraw(&self.group_repo, group, id)?;
        }
        self.repo.delete(id)?;

        debug!("deleted user {}", user.username());
        Ok(())
    }

    fn find_all(&self, caller: &Caller) -> Result<Vec<UserDto>> {
        auth::authorize(caller, Authority::UserRead)?;

        let users = self.repo.find_all()?;
        Ok(users.iter().map(UserDto::from).collect())
    }

    fn find_by_id(&self, caller: &Caller, id: &Id) -> Result<UserDto> {
        auth::authorize(caller, Authority::UserRead)?;

        self.repo
            .find_by_id(id)?
            .map(|u| UserDto::from(&u))
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    fn find_meetings_where_member(&self, caller: &Caller) -> Result<Vec<MeetingDto>> {
        let me = auth::current_user(caller, &self.repo)?;
        let groups = self.group_repo.find_by_member(me.id())?;
        Ok(meetings_of(&groups))
    }

    fn find_meetings_where_admin(&self, caller: &Caller) -> Result<Vec<MeetingDto>> {
        let me = auth::current_user(caller, &self.repo)?;
        let groups = self.group_repo.find_by_admin(me.id())?;
        Ok(meetings_of(&groups))
    }

    fn find_locations_where_member(&self, caller: &Caller) -> Result<Vec<Location>> {
        let me = auth::current_user(caller, &self.repo)?;
        let groups = self.group_repo.find_by_member(me.id())?;
        Ok(locations_of(&groups))
    }

    fn find_locations_where_admin(&self, caller: &Caller) -> Result<Vec<Location>> {
        let me = auth::current_user(caller, &self.repo)?;
        let groups = self.group_repo.find_by_admin(me.id())?;
        Ok(locations_of(&groups))
    }
}
