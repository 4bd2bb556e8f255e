use std::env;
use std::time::Duration;

use diesel::PgConnection;
use diesel::connection::SimpleConnection;
use diesel::r2d2::ConnectionManager;
use log::info;

use crate::schema;

pub type Pool = r2d2::Pool<ConnectionManager<PgConnection>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    host: String,
    port: u16,
    user: String,
    password: String,
    db: String,
    pool_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 5432,
            user: String::from("postgres"),
            password: String::from("postgres"),
            db: String::from("study_groups"),
            pool_size: 10,
        }
    }
}

impl Config {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        db: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            db: db.into(),
            ..Self::default()
        }
    }

    pub fn env() -> super::Result<Self> {
        let host = env::var("PG_HOST")?;
        let port = env::var("PG_PORT")?.parse()?;
        let user = env::var("PG_USER")?;
        let password = env::var("PG_PASSWORD")?;
        let db = env::var("PG_DB")?;
        let pool_size = match env::var("PG_POOL_SIZE") {
            Ok(s) => s.parse()?,
            Err(_) => Self::default().pool_size,
        };

        Ok(Self {
            host,
            port,
            user,
            password,
            db,
            pool_size,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.db
        )
    }
}

pub fn init(config: &Config) -> super::Result<Pool> {
    let manager = ConnectionManager::<PgConnection>::new(config.url());

    let pool = r2d2::Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(Duration::from_secs(5))
        .build(manager)?;

    Ok(pool)
}

/// Creates missing tables. Safe to run on every start.
pub fn bootstrap(pool: &Pool) -> super::Result<()> {
    let mut conn = pool.get()?;
    conn.batch_execute(schema::DDL)?;
    info!("database schema is up to date");
    Ok(())
}
