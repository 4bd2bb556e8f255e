use std::env;
use std::fs::File;
use std::str::FromStr;

use dotenv::dotenv;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode, WriteLogger};

pub mod db;
#[cfg(test)]
pub(crate) mod memory;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid environment: {0}")]
    InvalidEnv(String),
    #[error(transparent)]
    _EnvVar(#[from] env::VarError),
    #[error(transparent)]
    _ParseInt(#[from] std::num::ParseIntError),
    #[error(transparent)]
    _Io(#[from] std::io::Error),
    #[error(transparent)]
    _Logger(#[from] log::SetLoggerError),
    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Env {
    Local,
    Dev,
    Stage,
    Production,
}

impl FromStr for Env {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "stg" => Ok(Self::Stage),
            "prod" => Ok(Self::Production),
            _ => Err(Error::InvalidEnv(s.to_owned())),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub env: Env,
    pub pg: db::Config,
}

impl Config {
    /// Reads `.env` and the process environment. Unset database variables
    /// fall back to [`db::Config::default`].
    pub fn env() -> Result<Self> {
        dotenv().ok();

        let env = match env::var("ENV") {
            Ok(e) => e.parse()?,
            Err(_) => Env::Local,
        };

        Ok(Self {
            env,
            pg: db::Config::env().unwrap_or_default(),
        })
    }
}

pub fn init_logger() -> Result<()> {
    let rust_log = env::var("RUST_LOG").unwrap_or("info".into());
    let level = LevelFilter::from_str(&rust_log).unwrap_or(LevelFilter::Info);
    let log_file = env::var("SERVICE_NAME")
        .map(|pkg| format!("{pkg}.log"))
        .unwrap_or("study_groups.log".into());

    CombinedLogger::init(vec![
        TermLogger::new(
            level,
            simplelog::Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(level, simplelog::Config::default(), File::create(log_file)?),
    ])?;

    Ok(())
}
