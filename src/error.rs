use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::auth::Authority;
use crate::{group, user};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("anonymous caller is not allowed")]
    AnonymousCaller,
    #[error("missing authority: {0}")]
    Forbidden(Authority),

    #[error("group not found: {0}")]
    GroupNotFound(group::Id),
    #[error("only the admin of the group is allowed to do that")]
    NotGroupAdmin,
    #[error("user is already a member of the group")]
    AlreadyMember,
    #[error("user is not a member of the group")]
    NotAMember,
    #[error("target user not found: {0}")]
    TargetNotFound(user::Id),
    #[error("target user is not a member of the group: {0}")]
    TargetNotAMember(user::Id),
    #[error("admin cannot be kicked from the group")]
    CannotKickAdmin,
    #[error("user is already admin of the group")]
    AlreadyAdmin,
    #[error("meeting date is not in the future: {0}")]
    MeetingDateInPast(DateTime<Utc>),
    #[error("group was modified concurrently")]
    Conflict,

    #[error("topic already exists: {0}")]
    TopicAlreadyExists(String),
    #[error("topic not found: {0}")]
    TopicNotFound(String),

    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("username already exists: {0}")]
    UsernameTaken(user::Username),
    #[error("email already exists: {0}")]
    EmailTaken(user::Email),

    #[error(transparent)]
    _R2d2(#[from] r2d2::Error),
    #[error(transparent)]
    _Diesel(#[from] diesel::result::Error),
}

impl From<Error> for StatusCode {
    fn from(e: Error) -> Self {
        match e {
            Error::AnonymousCaller => Self::UNAUTHORIZED,
            Error::Forbidden(_) | Error::NotGroupAdmin => Self::FORBIDDEN,
            Error::GroupNotFound(_)
            | Error::TargetNotFound(_)
            | Error::TopicNotFound(_)
            | Error::UserNotFound(_) => Self::NOT_FOUND,
            Error::AlreadyMember
            | Error::AlreadyAdmin
            | Error::Conflict
            | Error::TopicAlreadyExists(_)
            | Error::UsernameTaken(_)
            | Error::EmailTaken(_) => Self::CONFLICT,
            Error::NotAMember
            | Error::TargetNotAMember(_)
            | Error::CannotKickAdmin
            | Error::MeetingDateInPast(_) => Self::BAD_REQUEST,
            Error::_R2d2(_) | Error::_Diesel(_) => Self::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let message = match &self {
            Self::_R2d2(e) => {
                debug!("connection pool error: {e}");
                "Something went wrong".to_owned()
            }
            Self::_Diesel(e) => {
                debug!("database error: {e}");
                "Something went wrong".to_owned()
            }
            other => other.to_string(),
        };

        let status = StatusCode::from(self);
        (status, Json(ErrorResponse { message })).into_response()
    }
}
