use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::Error;
use crate::integration::db::Pool;
use crate::schema::{groups, groups_topics, topics};

use super::Id;
use super::model::Topic;

pub trait TopicRepository {
    /// Fails with `TopicAlreadyExists` when the normalized name is taken.
    fn insert(&self, topic: &Topic) -> crate::Result<()>;

    fn update(&self, topic: &Topic) -> crate::Result<()>;

    fn find_by_id(&self, id: &Id) -> crate::Result<Option<Topic>>;

    fn find_by_name(&self, normalized_name: &str) -> crate::Result<Option<Topic>>;

    /// Unknown ids are skipped, the rest keep the requested order.
    fn find_by_ids(&self, ids: &[Id]) -> crate::Result<Vec<Topic>>;

    /// Ordered by creation.
    fn find_all(&self) -> crate::Result<Vec<Topic>>;

    /// Detaches the topic from every group, then removes it.
    fn delete(&self, id: &Id) -> crate::Result<()>;
}

#[derive(Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = topics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TopicRow {
    id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<&Topic> for TopicRow {
    fn from(t: &Topic) -> Self {
        Self {
            id: *t.id.get(),
            name: t.name.clone(),
            description: t.description.clone(),
            created_at: t.created_at,
        }
    }
}

impl From<TopicRow> for Topic {
    fn from(r: TopicRow) -> Self {
        Self {
            id: Id::from(r.id),
            name: r.name,
            description: r.description,
            created_at: r.created_at,
        }
    }
}

pub struct PgTopicRepository {
    pool: Pool,
}

impl PgTopicRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// Fails with `TopicAlreadyExists` when the normalized name is taken.
pub(crate) fn insert_topic(conn: &mut PgConnection, t: &Topic) -> crate::Result<()> {
    let res = diesel::insert_into(topics::table)
        .values(&TopicRow::from(t))
        .execute(conn);

    match res {
        Ok(_) => Ok(()),
        Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
            Err(Error::TopicAlreadyExists(t.name.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

impl TopicRepository for PgTopicRepository {
    fn insert(&self, t: &Topic) -> crate::Result<()> {
        let mut conn = self.pool.get()?;
        insert_topic(&mut conn, t)
    }

    fn update(&self, t: &Topic) -> crate::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::update(topics::table.find(*t.id.get()))
            .set(&TopicRow::from(t))
            .execute(&mut conn)?;

        Ok(())
    }

    fn find_by_id(&self, id: &Id) -> crate::Result<Option<Topic>> {
        let mut conn = self.pool.get()?;

        let t = topics::table
            .find(*id.get())
            .select(TopicRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(t.map(Topic::from))
    }

    fn find_by_name(&self, normalized_name: &str) -> crate::Result<Option<Topic>> {
        let mut conn = self.pool.get()?;

        let t = topics::table
            .filter(topics::name.eq(normalized_name))
            .select(TopicRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(t.map(Topic::from))
    }

    fn find_by_ids(&self, ids: &[Id]) -> crate::Result<Vec<Topic>> {
        let mut conn = self.pool.get()?;

        let uuids = ids.iter().map(|id| *id.get()).collect::<Vec<_>>();
        let mut found = topics::table
            .filter(topics::id.eq_any(uuids))
            .select(TopicRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(|r| (r.id, Topic::from(r)))
            .collect::<HashMap<_, _>>();

        Ok(ids.iter().filter_map(|id| found.remove(id.get())).collect())
    }

    fn find_all(&self) -> crate::Result<Vec<Topic>> {
        let mut conn = self.pool.get()?;

        let rows = topics::table
            .order(topics::created_at.asc())
            .select(TopicRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Topic::from).collect())
    }

    fn delete(&self, id: &Id) -> crate::Result<()> {
        let mut conn = self.pool.get()?;
        let id = *id.get();

        conn.transaction::<_, Error, _>(|conn| {
            let group_ids = groups_topics::table
                .filter(groups_topics::topic_id.eq(id))
                .select(groups_topics::group_id)
                .load::<Uuid>(conn)?;

            diesel::delete(groups_topics::table.filter(groups_topics::topic_id.eq(id)))
                .execute(conn)?;

            diesel::update(groups::table.filter(groups::id.eq_any(group_ids)))
                .set(groups::version.eq(groups::version + 1))
                .execute(conn)?;

            diesel::delete(topics::table.find(id)).execute(conn)?;

            Ok(())
        })
    }
}
