use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::debug;
use uuid::Uuid;

use crate::Error;
use crate::integration::db::Pool;
use crate::schema::{groups, groups_meeting_dates, groups_members, groups_topics};
use crate::topic::{self, model::Topic, repository::insert_topic};
use crate::user;

use super::model::Group;
use super::{Id, Location};

pub trait GroupRepository {
    fn find_by_id(&self, id: &Id) -> crate::Result<Option<Group>>;

    fn find_by_admin(&self, user_id: &user::Id) -> crate::Result<Vec<Group>>;

    fn find_by_member(&self, user_id: &user::Id) -> crate::Result<Vec<Group>>;

    fn find_by_topic(&self, topic_id: &topic::Id) -> crate::Result<Vec<Group>>;

    /// Ordered by creation.
    fn find_all(&self) -> crate::Result<Vec<Group>>;

    /// Inserts an unsaved group or replaces a stored one. Fails with
    /// `Conflict` when the stored version moved on since `group` was loaded.
    fn save(&self, group: &Group) -> crate::Result<()> {
        self.save_with_topics(group, &[])
    }

    /// Like `save`, also inserting `new_topics` in the same transaction.
    /// Fails with `TopicAlreadyExists` when one of their names is taken.
    fn save_with_topics(&self, group: &Group, new_topics: &[Topic]) -> crate::Result<()>;

    /// Fails with `Conflict` when the stored version moved on since `group`
    /// was loaded.
    fn delete(&self, group: &Group) -> crate::Result<()>;
}

#[derive(Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
struct GroupRow {
    id: Uuid,
    name: String,
    description: String,
    location_name: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    admin_id: Uuid,
    created_at: DateTime<Utc>,
    version: i32,
}

impl From<&Group> for GroupRow {
    fn from(g: &Group) -> Self {
        let coordinates = g.location.coordinates();

        Self {
            id: *g.id.get(),
            name: g.name.clone(),
            description: g.description.clone(),
            location_name: g.location.name().to_owned(),
            latitude: coordinates.map(|(lat, _)| lat),
            longitude: coordinates.map(|(_, lon)| lon),
            admin_id: *g.admin.get(),
            created_at: g.created_at,
            version: g.version + 1,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = groups_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MemberRow {
    group_id: Uuid,
    user_id: Uuid,
    position: i32,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = groups_meeting_dates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct MeetingDateRow {
    group_id: Uuid,
    meeting_date: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = groups_topics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TopicLinkRow {
    group_id: Uuid,
    topic_id: Uuid,
    position: i32,
}

pub struct PgGroupRepository {
    pool: Pool,
}

impl PgGroupRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Loads members, meeting dates and topics of `rows` in three queries.
fn hydrate(conn: &mut PgConnection, rows: Vec<GroupRow>) -> crate::Result<Vec<Group>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids = rows.iter().map(|r| r.id).collect::<Vec<_>>();

    let mut members = groups_members::table
        .filter(groups_members::group_id.eq_any(ids.clone()))
        .order(groups_members::position.asc())
        .select(MemberRow::as_select())
        .load(conn)?
        .into_iter()
        .fold(HashMap::<Uuid, Vec<user::Id>>::new(), |mut acc, r| {
            acc.entry(r.group_id)
                .or_default()
                .push(user::Id::from(r.user_id));
            acc
        });

    let mut meeting_dates = groups_meeting_dates::table
        .filter(groups_meeting_dates::group_id.eq_any(ids.clone()))
        .order(groups_meeting_dates::meeting_date.desc())
        .select(MeetingDateRow::as_select())
        .load(conn)?
        .into_iter()
        .fold(HashMap::<Uuid, Vec<DateTime<Utc>>>::new(), |mut acc, r| {
            acc.entry(r.group_id).or_default().push(r.meeting_date);
            acc
        });

    let mut topics = groups_topics::table
        .filter(groups_topics::group_id.eq_any(ids))
        .order(groups_topics::position.asc())
        .select(TopicLinkRow::as_select())
        .load(conn)?
        .into_iter()
        .fold(HashMap::<Uuid, Vec<topic::Id>>::new(), |mut acc, r| {
            acc.entry(r.group_id)
                .or_default()
                .push(topic::Id::from(r.topic_id));
            acc
        });

    let groups = rows
        .into_iter()
        .map(|r| Group {
            id: Id::from(r.id),
            name: r.name,
            description: r.description,
            location: Location::from_parts(r.location_name, r.latitude, r.longitude),
            created_at: r.created_at,
            admin: user::Id::from(r.admin_id),
            members: members.remove(&r.id).unwrap_or_default(),
            meeting_dates: meeting_dates.remove(&r.id).unwrap_or_default(),
            topics: topics.remove(&r.id).unwrap_or_default(),
            version: r.version,
        })
        .collect();

    Ok(groups)
}

fn insert_links(conn: &mut PgConnection, g: &Group) -> crate::Result<()> {
    let group_id = *g.id.get();

    let members = g
        .members
        .iter()
        .zip(0..)
        .map(|(m, position)| MemberRow {
            group_id,
            user_id: *m.get(),
            position,
        })
        .collect::<Vec<_>>();

    let dates = g
        .meeting_dates
        .iter()
        .map(|d| MeetingDateRow {
            group_id,
            meeting_date: *d,
        })
        .collect::<Vec<_>>();

    let topics = g
        .topics
        .iter()
        .zip(0..)
        .map(|(t, position)| TopicLinkRow {
            group_id,
            topic_id: *t.get(),
            position,
        })
        .collect::<Vec<_>>();

    diesel::insert_into(groups_members::table)
        .values(&members)
        .execute(conn)?;

    if !dates.is_empty() {
        diesel::insert_into(groups_meeting_dates::table)
            .values(&dates)
            .execute(conn)?;
    }

    if !topics.is_empty() {
        diesel::insert_into(groups_topics::table)
            .values(&topics)
            .execute(conn)?;
    }

    Ok(())
}

fn delete_links(conn: &mut PgConnection, group_id: Uuid) -> crate::Result<()> {
    diesel::delete(groups_topics::table.filter(groups_topics::group_id.eq(group_id)))
        .execute(conn)?;
    diesel::delete(groups_members::table.filter(groups_members::group_id.eq(group_id)))
        .execute(conn)?;
    diesel::delete(
        groups_meeting_dates::table.filter(groups_meeting_dates::group_id.eq(group_id)),
    )
    .execute(conn)?;

    Ok(())
}

impl GroupRepository for PgGroupRepository {
    fn find_by_id(&self, id: &Id) -> crate::Result<Option<Group>> {
        let mut conn = self.pool.get()?;

        let row = groups::table
            .find(*id.get())
            .select(GroupRow::as_select())
            .first(&mut conn)
            .optional()?;

        match row {
            Some(r) => Ok(hydrate(&mut conn, vec![r])?.pop()),
            None => Ok(None),
        }
    }

    fn find_by_admin(&self, user_id: &user::Id) -> crate::Result<Vec<Group>> {
        let mut conn = self.pool.get()?;

        let rows = groups::table
            .filter(groups::admin_id.eq(*user_id.get()))
            .order(groups::created_at.asc())
            .select(GroupRow::as_select())
            .load(&mut conn)?;

        hydrate(&mut conn, rows)
    }

    fn find_by_member(&self, user_id: &user::Id) -> crate::Result<Vec<Group>> {
        let mut conn = self.pool.get()?;

        let rows = groups::table
            .inner_join(groups_members::table)
            .filter(groups_members::user_id.eq(*user_id.get()))
            .order(groups::created_at.asc())
            .select(GroupRow::as_select())
            .load(&mut conn)?;

        hydrate(&mut conn, rows)
    }

    fn find_by_topic(&self, topic_id: &topic::Id) -> crate::Result<Vec<Group>> {
        let mut conn = self.pool.get()?;

        let rows = groups::table
            .inner_join(groups_topics::table)
            .filter(groups_topics::topic_id.eq(*topic_id.get()))
            .order(groups::created_at.asc())
            .select(GroupRow::as_select())
            .load(&mut conn)?;

        hydrate(&mut conn, rows)
    }

    fn find_all(&self) -> crate::Result<Vec<Group>> {
        let mut conn = self.pool.get()?;

        let rows = groups::table
            .order(groups::created_at.asc())
            .select(GroupRow::as_select())
            .load(&mut conn)?;

        hydrate(&mut conn, rows)
    }

    fn save_with_topics(&self, g: &Group, new_topics: &[Topic]) -> crate::Result<()> {
        let mut conn = self.pool.get()?;
        let row = GroupRow::from(g);

        conn.transaction::<_, Error, _>(|conn| {
            for t in new_topics {
                insert_topic(conn, t)?;
            }

            if g.version == 0 {
                diesel::insert_into(groups::table)
                    .values(&row)
                    .execute(conn)?;
            } else {
                let updated = diesel::update(
                    groups::table
                        .filter(groups::id.eq(row.id))
                        .filter(groups::version.eq(g.version)),
                )
                .set(&row)
                .execute(conn)?;

                if updated == 0 {
                    debug!("stale version {} of group {}", g.version, g.id);
                    return Err(Error::Conflict);
                }

                delete_links(conn, row.id)?;
            }

            insert_links(conn, g)
        })
    }

    fn delete(&self, g: &Group) -> crate::Result<()> {
        let mut conn = self.pool.get()?;
        let id = *g.id.get();

        conn.transaction::<_, Error, _>(|conn| {
            // claims the row at the loaded version, holding its lock until commit
            let claimed = diesel::update(
                groups::table
                    .filter(groups::id.eq(id))
                    .filter(groups::version.eq(g.version)),
            )
            .set(groups::version.eq(groups::version + 1))
            .execute(conn)?;

            if claimed == 0 {
                debug!("stale version {} of group {} not deleted", g.version, g.id);
                return Err(Error::Conflict);
            }

            delete_links(conn, id)?;
            diesel::delete(groups::table.find(id)).execute(conn)?;
            Ok(())
        })
    }
}
