use std::collections::HashMap;

use log::{debug, warn};

use crate::auth::{self, Caller};
use crate::topic::model::{TopicDto, TopicSpec};
use crate::user::model::{User, UserDto};
use crate::{Error, Result, topic, user};

use super::meeting::next_upcoming_meeting;
use super::model::{Group, GroupDetailsDto, GroupDto, GroupSpec, GroupUpdate};
use super::{Id, Repository};

pub trait GroupService {
    /// The caller becomes admin and sole member of the new group.
    fn create(&self, caller: &Caller, spec: &GroupSpec) -> Result<Id>;

    fn update(&self, caller: &Caller, spec: &GroupUpdate) -> Result<()>;

    fn delete(&self, caller: &Caller, id: &Id) -> Result<()>;

    fn join(&self, caller: &Caller, id: &Id) -> Result<()>;

    /// When the admin leaves, adminship passes to [`Group::successor`].
    /// The last member leaving deletes the group.
    fn leave(&self, caller: &Caller, id: &Id) -> Result<()>;

    fn kick(&self, caller: &Caller, id: &Id, target: &user::Id) -> Result<()>;

    fn promote(&self, caller: &Caller, id: &Id, target: &user::Id) -> Result<()>;

    fn find_all(&self) -> Result<Vec<GroupDto>>;

    fn find_details(&self, id: &Id) -> Result<GroupDetailsDto>;

    fn find_where_admin(&self, caller: &Caller) -> Result<Vec<GroupDto>>;

    fn find_where_member(&self, caller: &Caller) -> Result<Vec<GroupDto>>;

    fn find_where_member_by_user(&self, user_id: &user::Id) -> Result<Vec<GroupDto>>;

    /// In joining order.
    fn find_members(&self, id: &Id) -> Result<Vec<UserDto>>;
}

#[derive(Clone)]
pub struct GroupServiceImpl {
    repo: Repository,
    user_repo: user::Repository,
    topic_repo: topic::Repository,
    topic_service: topic::Service,
}

impl GroupServiceImpl {
    pub fn new(
        repo: Repository,
        user_repo: user::Repository,
        topic_repo: topic::Repository,
        topic_service: topic::Service,
    ) -> Self {
        Self {
            repo,
            user_repo,
            topic_repo,
            topic_service,
        }
    }
}

pub(super) fn find_group(repo: &Repository, id: &Id) -> Result<Group> {
    repo.find_by_id(id)?.ok_or(Error::GroupNotFound(*id))
}

/// Resolves the caller and the group, failing unless the caller administers it.
pub(super) fn find_administered(
    repo: &Repository,
    user_repo: &user::Repository,
    caller: &Caller,
    id: &Id,
) -> Result<(User, Group)> {
    let me = auth::current_user(caller, user_repo)?;
    let group = find_group(repo, id)?;

    if !group.is_admin(me.id()) {
        return Err(Error::NotGroupAdmin);
    }

    Ok((me, group))
}

/// Takes `user_id` out of `group`, handing adminship to [`Group::successor`]
/// first. The last member leaving deletes the group.
pub(crate) fn withdraw(repo: &Repository, mut group: Group, user_id: &user::Id) -> Result<()> {
    if group.is_admin(user_id) {
        let Some(successor) = group.successor() else {
            repo.delete(&group)?;
            debug!("last member {user_id} left, group {} deleted", group.id());
            return Ok(());
        };

        group.promote(successor);
        warn!("admin {user_id} left group {}, {successor} takes over", group.id());
    }

    group.remove_member(user_id);
    repo.save(&group)
}

impl GroupServiceImpl {
    fn find_target(&self, group: &Group, target: &user::Id) -> Result<()> {
        if self.user_repo.find_by_id(target)?.is_none() {
            return Err(Error::TargetNotFound(*target));
        }

        if !group.is_member(target) {
            return Err(Error::TargetNotAMember(*target));
        }

        Ok(())
    }

    /// Links the topics named by `specs` and stores `group`, creating unseen
    /// topics in the same transaction. A topic created concurrently under the
    /// same name is picked up on the second attempt.
    fn save_with_topics(&self, group: &mut Group, specs: &[TopicSpec]) -> Result<()> {
        match self.try_save_with_topics(group, specs) {
            Err(Error::TopicAlreadyExists(name)) => {
                debug!("topic {name} was created concurrently, resolving again");
                self.try_save_with_topics(group, specs)
            }
            res => res,
        }
    }

    fn try_save_with_topics(&self, group: &mut Group, specs: &[TopicSpec]) -> Result<()> {
        let resolution = self.topic_service.resolve_all(specs)?;
        group.set_topics(resolution.ids);
        self.repo.save_with_topics(group, &resolution.fresh)
    }

    fn find_topics(&self, group: &Group) -> Result<Vec<TopicDto>> {
        let topics = self.topic_repo.find_by_ids(group.topics())?;
        Ok(topics.iter().map(TopicDto::from).collect())
    }

    fn to_dtos(&self, groups: &[Group]) -> Result<Vec<GroupDto>> {
        groups
            .iter()
            .map(|g| {
                let topics = self.find_topics(g)?;
                Ok(GroupDto::new(g, topics, next_upcoming_meeting(g)))
            })
            .collect()
    }

    fn find_users(&self, ids: &[user::Id]) -> Result<HashMap<user::Id, User>> {
        let users = self.user_repo.find_by_ids(ids)?;
        Ok(users.into_iter().map(|u| (*u.id(), u)).collect())
    }
}

impl GroupService for GroupServiceImpl {
    fn create(&self, caller: &Caller, spec: &GroupSpec) -> Result<Id> {
        let me = auth::current_user(caller, &self.user_repo)?;

        let mut group = Group::new(
            &spec.name,
            &spec.description,
            spec.location.clone(),
            *me.id(),
            vec![],
        );
        self.save_with_topics(&mut group, &spec.topics)?;

        debug!("{} created group {}", me.username(), group.id());
        Ok(*group.id())
    }

    fn update(&self, caller: &Caller, spec: &GroupUpdate) -> Result<()> {
        let (_, mut group) = find_administered(&self.repo, &self.user_repo, caller, &spec.id)?;

        group.update_details(&spec.name, &spec.description, spec.location.clone());
        self.save_with_topics(&mut group, &spec.topics)?;

        debug!("updated group {}", group.id());
        Ok(())
    }

    fn delete(&self, caller: &Caller, id: &Id) -> Result<()> {
        let (me, group) = find_administered(&self.repo, &self.user_repo, caller, id)?;

        self.repo.delete(&group)?;

        debug!("{} deleted group {}", me.username(), group.id());
        Ok(())
    }

    fn join(&self, caller: &Caller, id: &Id) -> Result<()> {
        let me = auth::current_user(caller, &self.user_repo)?;
        let mut group = find_group(&self.repo, id)?;

        if group.is_member(me.id()) {
            return Err(Error::AlreadyMember);
        }

        group.add_member(*me.id());
        self.repo.save(&group)?;

        debug!("{} joined group {}", me.username(), group.id());
        Ok(())
    }

    fn leave(&self, caller: &Caller, id: &Id) -> Result<()> {
        let me = auth::current_user(caller, &self.user_repo)?;
        let group = find_group(&self.repo, id)?;

        if !group.is_member(me.id()) {
            return Err(Error::NotAMember);
        }

        withdraw(&self.repo, group, me.id())?;

        debug!("{} left group {id}", me.username());
        Ok(())
    }

    fn kick(&self, caller: &Caller, id: &Id, target: &user::Id) -> Result<()> {
        let (_, mut group) = find_administered(&self.repo, &self.user_repo, caller, id)?;
        self.find_target(&group, target)?;

        if group.is_admin(target) {
            return Err(Error::CannotKickAdmin);
        }

        group.remove_member(target);
        self.repo.save(&group)?;

        debug!("{target} was kicked from group {}", group.id());
        Ok(())
    }

    fn promote(&self, caller: &Caller, id: &Id, target: &user::Id) -> Result<()> {
        let (_, mut group) = find_administered(&self.repo, &self.user_repo, caller, id)?;
        self.find_target(&group, target)?;

        if group.is_admin(target) {
            return Err(Error::AlreadyAdmin);
        }

        let former = group.promote(*target);
        self.repo.save(&group)?;

        debug!("{target} replaced {former} as admin of group {}", group.id());
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<GroupDto>> {
        let groups = self.repo.find_all()?;
        self.to_dtos(&groups)
    }

    fn find_details(&self, id: &Id) -> Result<GroupDetailsDto> {
        let group = find_group(&self.repo, id)?;
        let mut users = self.find_users(group.members())?;

        let admin = users
            .get(group.admin())
            .map(UserDto::from)
            .ok_or_else(|| Error::UserNotFound(group.admin().to_string()))?;
        let members = group
            .members()
            .iter()
            .filter_map(|m| users.remove(m))
            .map(|u| UserDto::from(&u))
            .collect();

        Ok(GroupDetailsDto::new(
            &group,
            admin,
            members,
            self.find_topics(&group)?,
        ))
    }

    fn find_where_admin(&self, caller: &Caller) -> Result<Vec<GroupDto>> {
        let me = auth::current_user(caller, &self.user_repo)?;
        let groups = self.repo.find_by_admin(me.id())?;
        self.to_dtos(&groups)
    }

    fn find_where_member(&self, caller: &Caller) -> Result<Vec<GroupDto>> {
        let me = auth::current_user(caller, &self.user_repo)?;
        let groups = self.repo.find_by_member(me.id())?;
        self.to_dtos(&groups)
    }

    fn find_where_member_by_user(&self, user_id: &user::Id) -> Result<Vec<GroupDto>> {
        if self.user_repo.find_by_id(user_id)?.is_none() {
            return Err(Error::UserNotFound(user_id.to_string()));
        }

        let groups = self.repo.find_by_member(user_id)?;
        self.to_dtos(&groups)
    }

    fn find_members(&self, id: &Id) -> Result<Vec<UserDto>> {
        let group = find_group(&self.repo, id)?;
        let mut users = self.find_users(group.members())?;

        Ok(group
            .members()
            .iter()
            .filter_map(|m| users.remove(m))
            .map(|u| UserDto::from(&u))
            .collect())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use chrono::{Duration, Utc};

    use crate::auth::Role;
    use crate::group::Location;
    use crate::group::repository::GroupRepository;
    use crate::integration::memory::MemoryStore;
    use crate::topic::model::{Resolution, Topic};
    use crate::topic::repository::TopicRepository;
    use crate::topic::service::{TopicService, TopicServiceImpl};
    use crate::user::repository::UserRepository;

    use super::*;

    fn service(store: &Arc<MemoryStore>) -> GroupServiceImpl {
        let topic_service = TopicServiceImpl::new(store.clone());
        GroupServiceImpl::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(topic_service),
        )
    }

    fn register(store: &MemoryStore, username: &str) -> User {
        let u = User::new(
            username,
            format!("{username}@mail.md"),
            "hash",
            Role::User,
        );
        UserRepository::insert(store, &u).unwrap();
        u
    }

    fn spec(name: &str, topics: &[&str]) -> GroupSpec {
        GroupSpec {
            name: name.into(),
            description: "exam prep".into(),
            location: Location::from("Library"),
            topics: topics.iter().map(|t| TopicSpec::named(*t)).collect(),
        }
    }

    fn load(store: &MemoryStore, id: &Id) -> Option<Group> {
        GroupRepository::find_by_id(store, id).unwrap()
    }

    fn assert_invariants(store: &MemoryStore) {
        for g in GroupRepository::find_all(store).unwrap() {
            assert!(!g.members().is_empty());
            assert!(g.is_member(g.admin()));
        }
    }

    /// jora creates a group and valera, igor join it in that order.
    fn group_of_three(store: &Arc<MemoryStore>) -> (Id, User, User, User) {
        let service = service(store);
        let jora = register(store, "jora");
        let valera = register(store, "valera");
        let igor = register(store, "igor");

        let id = service.create(&Caller::user("jora"), &spec("Rust", &[])).unwrap();
        service.join(&Caller::user("valera"), &id).unwrap();
        service.join(&Caller::user("igor"), &id).unwrap();

        (id, jora, valera, igor)
    }

    #[test]
    fn should_create_group_with_caller_as_sole_admin() {
        let store = Arc::new(MemoryStore::default());
        let jora = register(&store, "jora");

        let id = service(&store)
            .create(&Caller::user("jora"), &spec("Rust", &[]))
            .unwrap();

        let g = load(&store, &id).unwrap();
        assert_eq!(g.admin(), jora.id());
        assert_eq!(g.members(), &[*jora.id()]);
        assert!(g.meeting_dates().is_empty());
    }

    #[test]
    fn should_reject_anonymous_caller_on_create() {
        let store = Arc::new(MemoryStore::default());

        let res = service(&store).create(&Caller::Anonymous, &spec("Rust", &[]));

        assert!(matches!(res, Err(Error::AnonymousCaller)));
        assert!(GroupRepository::find_all(store.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn should_reject_anonymous_caller_before_group_lookup() {
        let store = Arc::new(MemoryStore::default());
        let service = service(&store);
        let missing = Id::random();

        assert!(matches!(
            service.join(&Caller::Anonymous, &missing),
            Err(Error::AnonymousCaller)
        ));
        assert!(matches!(
            service.leave(&Caller::Anonymous, &missing),
            Err(Error::AnonymousCaller)
        ));
        assert!(matches!(
            service.delete(&Caller::Anonymous, &missing),
            Err(Error::AnonymousCaller)
        ));
    }

    #[test]
    fn should_collapse_duplicate_topics_on_create() {
        let store = Arc::new(MemoryStore::default());
        register(&store, "jora");

        let id = service(&store)
            .create(&Caller::user("jora"), &spec("ML study", &["AI", "ai", "ML"]))
            .unwrap();

        let g = load(&store, &id).unwrap();
        let names = TopicRepository::find_by_ids(store.as_ref(), g.topics())
            .unwrap()
            .iter()
            .map(|t| t.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, ["ai", "ml"]);
        assert_eq!(TopicRepository::find_all(store.as_ref()).unwrap().len(), 2);
    }

    #[test]
    fn should_reuse_existing_topic_across_groups() {
        let store = Arc::new(MemoryStore::default());
        register(&store, "jora");
        let service = service(&store);

        let first = service
            .create(&Caller::user("jora"), &spec("A", &["Databases"]))
            .unwrap();
        let second = service
            .create(&Caller::user("jora"), &spec("B", &["databases"]))
            .unwrap();

        let first = load(&store, &first).unwrap();
        let second = load(&store, &second).unwrap();
        assert_eq!(first.topics(), second.topics());
    }

    #[test]
    fn should_fail_to_update_missing_group() {
        let store = Arc::new(MemoryStore::default());
        register(&store, "jora");
        let update = GroupUpdate {
            id: Id::random(),
            name: "Rust".into(),
            description: "".into(),
            location: Location::from("Library"),
            topics: vec![],
        };

        let res = service(&store).update(&Caller::user("jora"), &update);

        assert!(matches!(res, Err(Error::GroupNotFound(_))));
    }

    #[test]
    fn should_forbid_update_by_non_admin() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);
        let update = GroupUpdate {
            id,
            name: "Hijacked".into(),
            description: "".into(),
            location: Location::from("Cafe"),
            topics: vec![],
        };

        let res = service(&store).update(&Caller::user("valera"), &update);

        assert!(matches!(res, Err(Error::NotGroupAdmin)));
        assert_eq!(load(&store, &id).unwrap().name(), "Rust");
    }

    #[test]
    fn should_update_details_and_replace_topics() {
        let store = Arc::new(MemoryStore::default());
        register(&store, "jora");
        let service = service(&store);
        let id = service
            .create(&Caller::user("jora"), &spec("Rust", &["ownership"]))
            .unwrap();
        let update = GroupUpdate {
            id,
            name: "Rust 2".into(),
            description: "async".into(),
            location: Location::Place {
                name: "Campus".into(),
                latitude: 47.02,
                longitude: 28.83,
            },
            topics: vec![TopicSpec::named("Tokio"), TopicSpec::named("tokio")],
        };

        service.update(&Caller::user("jora"), &update).unwrap();

        let details = service.find_details(&id).unwrap();
        assert_eq!(load(&store, &id).unwrap().name(), "Rust 2");
        let names = details
            .topics()
            .iter()
            .map(|t| t.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, ["Tokio"]);
    }

    #[test]
    fn should_fail_to_join_missing_group() {
        let store = Arc::new(MemoryStore::default());
        register(&store, "jora");

        let res = service(&store).join(&Caller::user("jora"), &Id::random());

        assert!(matches!(res, Err(Error::GroupNotFound(_))));
    }

    #[test]
    fn should_reject_second_join() {
        let store = Arc::new(MemoryStore::default());
        let (id, jora, valera, igor) = group_of_three(&store);

        let res = service(&store).join(&Caller::user("valera"), &id);

        assert!(matches!(res, Err(Error::AlreadyMember)));
        let g = load(&store, &id).unwrap();
        assert_eq!(g.members(), &[*jora.id(), *valera.id(), *igor.id()]);
    }

    #[test]
    fn should_fail_to_leave_when_not_a_member() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);
        register(&store, "radu");

        let res = service(&store).leave(&Caller::user("radu"), &id);

        assert!(matches!(res, Err(Error::NotAMember)));
    }

    #[test]
    fn should_leave_as_regular_member() {
        let store = Arc::new(MemoryStore::default());
        let (id, jora, valera, igor) = group_of_three(&store);

        service(&store).leave(&Caller::user("valera"), &id).unwrap();

        let g = load(&store, &id).unwrap();
        assert_eq!(g.admin(), jora.id());
        assert_eq!(g.members(), &[*jora.id(), *igor.id()]);
        assert!(GroupRepository::find_by_member(store.as_ref(), valera.id())
            .unwrap()
            .is_empty());
        assert_invariants(&store);
    }

    #[test]
    fn should_hand_off_admin_when_admin_leaves() {
        let store = Arc::new(MemoryStore::default());
        let (id, jora, valera, igor) = group_of_three(&store);

        service(&store).leave(&Caller::user("jora"), &id).unwrap();

        let g = load(&store, &id).unwrap();
        assert_eq!(g.admin(), valera.id());
        assert_eq!(g.members(), &[*valera.id(), *igor.id()]);
        assert!(GroupRepository::find_by_admin(store.as_ref(), jora.id())
            .unwrap()
            .is_empty());
        assert_eq!(
            GroupRepository::find_by_admin(store.as_ref(), valera.id())
                .unwrap()
                .len(),
            1
        );
        assert_invariants(&store);
    }

    #[test]
    fn should_delete_group_when_sole_member_leaves() {
        let store = Arc::new(MemoryStore::default());
        let jora = register(&store, "jora");
        let service = service(&store);
        let id = service
            .create(&Caller::user("jora"), &spec("Rust", &["ownership"]))
            .unwrap();

        service.leave(&Caller::user("jora"), &id).unwrap();

        assert!(load(&store, &id).is_none());
        assert!(GroupRepository::find_by_member(store.as_ref(), jora.id())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn should_forbid_delete_by_non_admin() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);

        let res = service(&store).delete(&Caller::user("igor"), &id);

        assert!(matches!(res, Err(Error::NotGroupAdmin)));
        assert!(load(&store, &id).is_some());
    }

    #[test]
    fn should_cascade_group_deletion() {
        let store = Arc::new(MemoryStore::default());
        let jora = register(&store, "jora");
        let valera = register(&store, "valera");
        let service = service(&store);
        let id = service
            .create(&Caller::user("jora"), &spec("Rust", &["ownership"]))
            .unwrap();
        service.join(&Caller::user("valera"), &id).unwrap();
        let topic = TopicRepository::find_by_name(store.as_ref(), "ownership")
            .unwrap()
            .unwrap();

        service.delete(&Caller::user("jora"), &id).unwrap();

        assert!(load(&store, &id).is_none());
        for u in [&jora, &valera] {
            assert!(GroupRepository::find_by_member(store.as_ref(), u.id())
                .unwrap()
                .is_empty());
            assert!(GroupRepository::find_by_admin(store.as_ref(), u.id())
                .unwrap()
                .is_empty());
        }
        assert!(GroupRepository::find_by_topic(store.as_ref(), topic.id())
            .unwrap()
            .is_empty());
        assert!(TopicRepository::find_by_id(store.as_ref(), topic.id())
            .unwrap()
            .is_some());
    }

    #[test]
    fn should_forbid_kick_by_non_admin() {
        let store = Arc::new(MemoryStore::default());
        let (id, _, _, igor) = group_of_three(&store);

        let res = service(&store).kick(&Caller::user("valera"), &id, igor.id());

        assert!(matches!(res, Err(Error::NotGroupAdmin)));
    }

    #[test]
    fn should_fail_to_kick_unknown_user() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);
        let ghost = user::Id::random();

        let res = service(&store).kick(&Caller::user("jora"), &id, &ghost);

        assert!(matches!(res, Err(Error::TargetNotFound(t)) if t == ghost));
    }

    #[test]
    fn should_fail_to_kick_non_member() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);
        let radu = register(&store, "radu");

        let res = service(&store).kick(&Caller::user("jora"), &id, radu.id());

        assert!(matches!(res, Err(Error::TargetNotAMember(t)) if t == *radu.id()));
    }

    #[test]
    fn should_not_let_admin_kick_themselves() {
        let store = Arc::new(MemoryStore::default());
        let (id, jora, ..) = group_of_three(&store);

        let res = service(&store).kick(&Caller::user("jora"), &id, jora.id());

        assert!(matches!(res, Err(Error::CannotKickAdmin)));
        assert_invariants(&store);
    }

    #[test]
    fn should_kick_member() {
        let store = Arc::new(MemoryStore::default());
        let (id, jora, valera, igor) = group_of_three(&store);

        service(&store)
            .kick(&Caller::user("jora"), &id, valera.id())
            .unwrap();

        let g = load(&store, &id).unwrap();
        assert_eq!(g.members(), &[*jora.id(), *igor.id()]);
    }

    #[test]
    fn should_promote_member_and_keep_former_admin() {
        let store = Arc::new(MemoryStore::default());
        let (id, jora, valera, _) = group_of_three(&store);

        service(&store)
            .promote(&Caller::user("jora"), &id, valera.id())
            .unwrap();

        let g = load(&store, &id).unwrap();
        assert_eq!(g.admin(), valera.id());
        assert!(g.is_member(jora.id()));
        assert!(GroupRepository::find_by_admin(store.as_ref(), jora.id())
            .unwrap()
            .is_empty());
        assert_eq!(
            GroupRepository::find_by_admin(store.as_ref(), valera.id())
                .unwrap()
                .len(),
            1
        );
        assert_invariants(&store);
    }

    #[test]
    fn should_fail_to_promote_admin() {
        let store = Arc::new(MemoryStore::default());
        let (id, jora, ..) = group_of_three(&store);

        let res = service(&store).promote(&Caller::user("jora"), &id, jora.id());

        assert!(matches!(res, Err(Error::AlreadyAdmin)));
    }

    #[test]
    fn should_list_members_in_joining_order() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);

        let members = service(&store).find_members(&id).unwrap();

        let names = members
            .iter()
            .map(|m| m.username().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["jora", "valera", "igor"]);
    }

    #[test]
    fn should_show_details_with_admin() {
        let store = Arc::new(MemoryStore::default());
        let (id, _, valera, _) = group_of_three(&store);
        let service = service(&store);
        service
            .promote(&Caller::user("jora"), &id, valera.id())
            .unwrap();

        let details = service.find_details(&id).unwrap();

        assert_eq!(details.admin().id(), valera.id());
        assert_eq!(details.members().len(), 3);
    }

    #[test]
    fn should_find_groups_by_role() {
        let store = Arc::new(MemoryStore::default());
        let (id, _, valera, _) = group_of_three(&store);
        let service = service(&store);
        let own = service
            .create(&Caller::user("valera"), &spec("Go", &[]))
            .unwrap();

        let admin_of = service.find_where_admin(&Caller::user("valera")).unwrap();
        let member_of = service.find_where_member(&Caller::user("valera")).unwrap();
        let by_id = service.find_where_member_by_user(valera.id()).unwrap();

        assert_eq!(admin_of.iter().map(|g| *g.id()).collect::<Vec<_>>(), [own]);
        assert_eq!(
            member_of.iter().map(|g| *g.id()).collect::<Vec<_>>(),
            [id, own]
        );
        assert_eq!(by_id, member_of);
    }

    #[test]
    fn should_fail_to_find_groups_of_unknown_user() {
        let store = Arc::new(MemoryStore::default());

        let res = service(&store).find_where_member_by_user(&user::Id::random());

        assert!(matches!(res, Err(Error::UserNotFound(_))));
    }

    #[test]
    fn should_list_groups_with_next_meeting() {
        let store = Arc::new(MemoryStore::default());
        register(&store, "jora");
        let service = service(&store);
        let id = service
            .create(&Caller::user("jora"), &spec("Rust", &[]))
            .unwrap();
        let soon = Utc::now() + Duration::days(1);
        let later = Utc::now() + Duration::days(7);
        let mut g = load(&store, &id).unwrap();
        g.merge_meeting_dates(&[later, soon]);
        GroupRepository::save(store.as_ref(), &g).unwrap();
        service
            .create(&Caller::user("jora"), &spec("Go", &[]))
            .unwrap();

        let groups = service.find_all().unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].next_meeting_date(), Some(&soon));
        assert_eq!(groups[1].next_meeting_date(), None);
    }

    #[test]
    fn should_fail_on_stale_group() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);
        let stale = load(&store, &id).unwrap();
        service(&store).leave(&Caller::user("igor"), &id).unwrap();

        let res = GroupRepository::save(store.as_ref(), &stale);

        assert!(matches!(res, Err(Error::Conflict)));
    }

    #[test]
    fn should_fail_on_stale_delete() {
        let store = Arc::new(MemoryStore::default());
        let jora = register(&store, "jora");
        let valera = register(&store, "valera");
        let service = service(&store);
        let id = service
            .create(&Caller::user("jora"), &spec("Rust", &[]))
            .unwrap();
        let stale = load(&store, &id).unwrap();
        assert_eq!(stale.successor(), None);
        service.join(&Caller::user("valera"), &id).unwrap();

        let res = GroupRepository::delete(store.as_ref(), &stale);

        assert!(matches!(res, Err(Error::Conflict)));
        let g = load(&store, &id).unwrap();
        assert_eq!(g.members(), &[*jora.id(), *valera.id()]);
    }

    #[test]
    fn should_not_delete_group_promoted_in_between() {
        let store = Arc::new(MemoryStore::default());
        let (id, _, valera, _) = group_of_three(&store);
        let stale = load(&store, &id).unwrap();
        service(&store)
            .promote(&Caller::user("jora"), &id, valera.id())
            .unwrap();

        let res = GroupRepository::delete(store.as_ref(), &stale);

        assert!(matches!(res, Err(Error::Conflict)));
        assert_eq!(load(&store, &id).unwrap().admin(), valera.id());
    }

    #[test]
    fn should_not_store_topics_of_stale_group() {
        let store = Arc::new(MemoryStore::default());
        let (id, ..) = group_of_three(&store);
        let stale = load(&store, &id).unwrap();
        service(&store).leave(&Caller::user("igor"), &id).unwrap();

        let res = GroupRepository::save_with_topics(
            store.as_ref(),
            &stale,
            &[Topic::new("tokio", None)],
        );

        assert!(matches!(res, Err(Error::Conflict)));
        assert!(TopicRepository::find_by_name(store.as_ref(), "tokio")
            .unwrap()
            .is_none());
    }

    /// Hands out a fresh `ai` topic once, as if another request stored it
    /// between resolution and save.
    struct RacingTopics {
        inner: TopicServiceImpl,
        raced: AtomicBool,
    }

    impl TopicService for RacingTopics {
        fn resolve_or_create(&self, spec: &TopicSpec) -> Result<Topic> {
            self.inner.resolve_or_create(spec)
        }

        fn resolve_all(&self, specs: &[TopicSpec]) -> Result<Resolution> {
            if self.raced.swap(true, Ordering::SeqCst) {
                return self.inner.resolve_all(specs);
            }

            let ai = Topic::new("ai", None);
            Ok(Resolution {
                ids: vec![*ai.id()],
                fresh: vec![ai],
            })
        }

        fn create(&self, caller: &Caller, spec: &TopicSpec) -> Result<Topic> {
            self.inner.create(caller, spec)
        }

        fn update(&self, caller: &Caller, spec: &TopicSpec) -> Result<Topic> {
            self.inner.update(caller, spec)
        }

        fn delete(&self, caller: &Caller, id: &topic::Id) -> Result<()> {
            self.inner.delete(caller, id)
        }

        fn find_all(&self, caller: &Caller) -> Result<Vec<TopicDto>> {
            self.inner.find_all(caller)
        }
    }

    #[test]
    fn should_reuse_topic_created_concurrently() {
        let store = Arc::new(MemoryStore::default());
        register(&store, "jora");
        let ai = TopicServiceImpl::new(store.clone())
            .resolve_or_create(&TopicSpec::named("AI"))
            .unwrap();
        let racing = RacingTopics {
            inner: TopicServiceImpl::new(store.clone()),
            raced: AtomicBool::new(false),
        };
        let service = GroupServiceImpl::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(racing),
        );

        let id = service
            .create(&Caller::user("jora"), &spec("ML", &["ai"]))
            .unwrap();

        assert_eq!(load(&store, &id).unwrap().topics(), &[*ai.id()]);
        assert_eq!(TopicRepository::find_all(store.as_ref()).unwrap().len(), 1);
    }
}
