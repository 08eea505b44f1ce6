use thiserror::Error;

use crate::play::PlayId;
use crate::song::SongId;

/// The broad categories callers need to tell apart. Every
/// `BackendError` belongs to exactly one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A field value fell outside its declared domain.
    Validation,

    /// A referenced record does not exist.
    Reference,

    /// A query parameter was missing or malformed.
    InvalidArgument,

    /// A well-formed query legitimately produced nothing.
    NotFound,

    /// A mutation was attempted without valid credentials.
    Unauthenticated,

    /// The write clashes with an existing record.
    Conflict,

    /// Anything the caller cannot fix.
    Internal,
}

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// A choice field received a value outside its closed set.
    #[error("{value:?} is not a valid {field}")]
    InvalidChoice { field: &'static str, value: String },

    /// A required text field was blank after normalization.
    #[error("{0} must not be blank")]
    BlankField(&'static str),

    /// The database refused a value through a check constraint.
    #[error("value rejected by constraint {0}")]
    ConstraintViolated(String),

    /// A request body could not be parsed as the expected JSON.
    #[error("malformed request body: {source}")]
    MalformedBody { source: serde_json::Error },

    /// A play record referred to a song that does not exist.
    #[error("song {0} does not exist")]
    NonExistentSong(SongId),

    /// A query parameter could not be parsed.
    #[error("invalid {name} parameter: {value:?}")]
    InvalidParameter { name: &'static str, value: String },

    /// A required query parameter was absent.
    #[error("missing {0} parameter")]
    MissingParameter(&'static str),

    /// A random pick was requested from an empty catalog.
    #[error("No songs available")]
    NoSongs,

    /// A title search matched nothing.
    #[error("no songs with titles containing {0:?}")]
    NoMatches(String),

    /// The requested page lies past the end of the listing.
    #[error("invalid page")]
    InvalidPage(u32),

    /// No song exists with the given ID.
    #[error("song {0} not found")]
    SongNotFound(SongId),

    /// No play record exists with the given ID.
    #[error("play record {0} does not exist")]
    NonExistentPlay(PlayId),

    /// No `Authorization` header was supplied.
    #[error("authentication credentials were not provided")]
    MissingCredentials,

    /// The `Authorization` header was malformed or named an unknown token.
    #[error("invalid token")]
    InvalidToken,

    /// The username is already registered.
    #[error("username already exists in database")]
    UsernameAlreadyExists,
}

impl BackendError {
    pub fn kind(&self) -> ErrorKind {
        use BackendError::*;

        match self {
            InvalidChoice { .. } | BlankField(..) | ConstraintViolated(..) | MalformedBody { .. } => {
                ErrorKind::Validation
            }
            NonExistentSong(..) => ErrorKind::Reference,
            InvalidParameter { .. } | MissingParameter(..) => ErrorKind::InvalidArgument,
            NoSongs | NoMatches(..) | InvalidPage(..) | SongNotFound(..) | NonExistentPlay(..) => {
                ErrorKind::NotFound
            }
            MissingCredentials | InvalidToken => ErrorKind::Unauthenticated,
            UsernameAlreadyExists => ErrorKind::Conflict,
            Sqlx { .. } => ErrorKind::Internal,
        }
    }
}
