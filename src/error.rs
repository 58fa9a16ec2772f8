use std::io::Cursor;

use rocket::{
    http::{ContentType, Status},
    response::{self, Responder},
    Request, Response,
};
use thiserror::Error;

use crate::model::mongodb::Id;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure an operation can report. All of them are recoverable and are
/// shown to the user as a single line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Already voted for answer {position} of topic {topic}")]
    DuplicateVote { topic: Id, position: usize },
    #[error("Topic {0} is locked")]
    Locked(Id),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Unauthorized: {0}")]
    Auth(String),
    #[error("Topics are still loading")]
    Loading,
    #[error("Cannot load data: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Store(StoreError),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::BadRequest,
            Self::DuplicateVote { .. } => Status::Conflict,
            Self::Locked(_) => Status::Locked,
            Self::NotFound(_) => Status::NotFound,
            Self::Auth(_) => Status::Unauthorized,
            Self::Loading | Self::Unavailable(_) => Status::ServiceUnavailable,
            Self::Store(_) => Status::InternalServerError,
        }
    }
}

impl From<StoreError> for Error {
    /// A write against a document that has since disappeared is a stale
    /// reference, not a store failure.
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Missing(id) => Self::NotFound(format!("Topic {id}")),
            other => Self::Store(other),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let message = self.to_string();
        if status.code >= 500 {
            error!("{message}");
        } else {
            warn!("{message}");
        }
        Response::build()
            .status(status)
            .header(ContentType::Plain)
            .sized_body(message.len(), Cursor::new(message))
            .ok()
    }
}
