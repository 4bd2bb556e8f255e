use std::sync::Arc;

use crate::group::meeting::MeetingServiceImpl;
use crate::group::repository::PgGroupRepository;
use crate::group::service::GroupServiceImpl;
use crate::integration::db::Pool;
use crate::topic::repository::PgTopicRepository;
use crate::topic::service::TopicServiceImpl;
use crate::user::repository::PgUserRepository;
use crate::user::service::UserServiceImpl;
use crate::{group, topic, user};

#[derive(Clone)]
pub struct AppState {
    pub user_service: user::Service,
    pub group_service: group::Service,
    pub meeting_service: group::Scheduler,
    pub topic_service: topic::Service,
}

impl AppState {
    pub fn new(pool: Pool) -> Self {
        let user_repo: user::Repository = Arc::new(PgUserRepository::new(pool.clone()));
        let group_repo: group::Repository = Arc::new(PgGroupRepository::new(pool.clone()));
        let topic_repo: topic::Repository = Arc::new(PgTopicRepository::new(pool));

        let topic_service: topic::Service = Arc::new(TopicServiceImpl::new(topic_repo.clone()));

        Self {
            user_service: Arc::new(UserServiceImpl::new(user_repo.clone(), group_repo.clone())),
            group_service: Arc::new(GroupServiceImpl::new(
                group_repo.clone(),
                user_repo.clone(),
                topic_repo,
                topic_service.clone(),
            )),
            meeting_service: Arc::new(MeetingServiceImpl::new(group_repo, user_repo)),
            topic_service,
        }
    }
}
