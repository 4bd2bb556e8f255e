use chrono::{DateTime, SubsecRound, Utc};
use log::debug;

use crate::auth::Caller;
use crate::{Error, Result, user};

use super::model::Group;
use super::service::find_administered;
use super::{Id, Repository};

pub trait MeetingService {
    /// Rejects the whole batch if any date is not in the future.
    fn add_meeting_dates(&self, caller: &Caller, id: &Id, dates: &[DateTime<Utc>]) -> Result<()>;

    /// Dates that are not scheduled are ignored.
    fn remove_meeting_dates(
        &self,
        caller: &Caller,
        id: &Id,
        dates: &[DateTime<Utc>],
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct MeetingServiceImpl {
    repo: Repository,
    user_repo: user::Repository,
}

impl MeetingServiceImpl {
    pub fn new(repo: Repository, user_repo: user::Repository) -> Self {
        Self { repo, user_repo }
    }
}

/// Dates are stored with microsecond precision, so they are compared at it too.
fn to_stored_precision(dates: &[DateTime<Utc>]) -> Vec<DateTime<Utc>> {
    dates.iter().map(|d| d.trunc_subsecs(6)).collect()
}

impl MeetingService for MeetingServiceImpl {
    fn add_meeting_dates(&self, caller: &Caller, id: &Id, dates: &[DateTime<Utc>]) -> Result<()> {
        let (_, mut group) = find_administered(&self.repo, &self.user_repo, caller, id)?;
        let dates = to_stored_precision(dates);

        let now = Utc::now();
        if let Some(past) = dates.iter().find(|d| **d <= now) {
            return Err(Error::MeetingDateInPast(*past));
        }

        group.merge_meeting_dates(&dates);
        self.repo.save(&group)?;

        debug!("scheduled {} meeting(s) for group {}", dates.len(), group.id());
        Ok(())
    }

    fn remove_meeting_dates(
        &self,
        caller: &Caller,
        id: &Id,
        dates: &[DateTime<Utc>],
    ) -> Result<()> {
        let (_, mut group) = find_administered(&self.repo, &self.user_repo, caller, id)?;

        group.remove_meeting_dates(&to_stored_precision(dates));
        self.repo.save(&group)?;

        debug!("cancelled meeting(s) of group {}", group.id());
        Ok(())
    }
}

/// The earliest scheduled meeting that has not started yet.
pub fn next_upcoming_meeting(group: &Group) -> Option<DateTime<Utc>> {
    group.next_meeting_after(&Utc::now())
}
