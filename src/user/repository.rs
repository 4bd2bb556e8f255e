use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;
use uuid::Uuid;

use crate::auth::Role;
use crate::integration::db::Pool;
use crate::schema::users;

use super::model::User;
use super::{Email, Id, Username};

pub trait UserRepository {
    fn insert(&self, user: &User) -> crate::Result<()>;

    fn update(&self, user: &User) -> crate::Result<()>;

    fn find_by_id(&self, id: &Id) -> crate::Result<Option<User>>;

    fn find_by_ids(&self, ids: &[Id]) -> crate::Result<Vec<User>>;

    fn find_by_username(&self, username: &Username) -> crate::Result<Option<User>>;

    fn find_by_email(&self, email: &Email) -> crate::Result<Option<User>>;

    /// Ordered by creation.
    fn find_all(&self) -> crate::Result<Vec<User>>;

    fn delete(&self, id: &Id) -> crate::Result<()>;
}

#[derive(Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    password_hash: String,
    avatar_color: String,
    role: String,
    active: bool,
    not_locked: bool,
    created_at: DateTime<Utc>,
}

impl From<&User> for UserRow {
    fn from(u: &User) -> Self {
        Self {
            id: *u.id.get(),
            username: u.username.as_str().to_owned(),
            email: u.email.as_str().to_owned(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            password_hash: u.password_hash.clone(),
            avatar_color: u.avatar_color.clone(),
            role: u.role.as_str().to_owned(),
            active: u.active,
            not_locked: u.not_locked,
            created_at: u.created_at,
        }
    }
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        let role = Role::parse(&r.role).unwrap_or_else(|| {
            warn!("unknown role {} for user {}, falling back to user", r.role, r.id);
            Role::User
        });

        Self {
            id: Id::from(r.id),
            username: Username::from(r.username),
            email: Email::from(r.email),
            first_name: r.first_name,
            last_name: r.last_name,
            password_hash: r.password_hash,
            avatar_color: r.avatar_color,
            role,
            active: r.active,
            not_locked: r.not_locked,
            created_at: r.created_at,
        }
    }
}

pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PgUserRepository {
    fn insert(&self, u: &User) -> crate::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::insert_into(users::table)
            .values(&UserRow::from(u))
            .execute(&mut conn)?;

        Ok(())
    }

    fn update(&self, u: &User) -> crate::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::update(users::table.find(*u.id.get()))
            .set(&UserRow::from(u))
            .execute(&mut conn)?;

        Ok(())
    }

    fn find_by_id(&self, id: &Id) -> crate::Result<Option<User>> {
        let mut conn = self.pool.get()?;

        let u = users::table
            .find(*id.get())
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(u.map(User::from))
    }

    fn find_by_ids(&self, ids: &[Id]) -> crate::Result<Vec<User>> {
        let mut conn = self.pool.get()?;

        let ids = ids.iter().map(|id| *id.get()).collect::<Vec<_>>();
        let users = users::table
            .filter(users::id.eq_any(ids))
            .select(UserRow::as_select())
            .load(&mut conn)?;

        Ok(users.into_iter().map(User::from).collect())
    }

    fn find_by_username(&self, username: &Username) -> crate::Result<Option<User>> {
        let mut conn = self.pool.get()?;

        let u = users::table
            .filter(users::username.eq(username.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(u.map(User::from))
    }

    fn find_by_email(&self, email: &Email) -> crate::Result<Option<User>> {
        let mut conn = self.pool.get()?;

        let u = users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(u.map(User::from))
    }

    fn find_all(&self) -> crate::Result<Vec<User>> {
        let mut conn = self.pool.get()?;

        let users = users::table
            .order(users::created_at.asc())
            .select(UserRow::as_select())
            .load(&mut conn)?;

        Ok(users.into_iter().map(User::from).collect())
    }

    fn delete(&self, id: &Id) -> crate::Result<()> {
        let mut conn = self.pool.get()?;

        diesel::delete(users::table.find(*id.get())).execute(&mut conn)?;

        Ok(())
    }
}
