pub mod auth;
pub mod error;
pub mod group;
pub mod integration;
pub mod schema;
pub mod state;
pub mod topic;
pub mod user;

pub use error::{Error, Result};
