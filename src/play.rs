use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::song::SongId;
use crate::user::UserId;

/// An ID in the `song_users` table.
pub type PlayId = i64;

/// One play or guessing session of a song by a user.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Play {
    /// The ID of the record.
    pub id: PlayId,

    /// The song that was played.
    pub song: SongId,

    /// The account that played it.
    pub user: UserId,

    pub correct_guesses: u32,

    pub wrong_guesses: u32,

    /// The times it was created and updated.
    #[serde(flatten)]
    pub times: Times,
}

/// The guess tallies submitted with a new play record. The player is
/// never taken from the submission.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlaySubmission {
    pub song: SongId,

    #[serde(default)]
    pub correct_guesses: u32,

    #[serde(default)]
    pub wrong_guesses: u32,
}

/// A replacement for the guess tallies of an existing record.
///
/// Clients commonly echo `song` and `user` back; those are accepted
/// and ignored since a record never moves between songs or players.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
pub struct PlayUpdate {
    #[serde(default)]
    pub correct_guesses: u32,

    #[serde(default)]
    pub wrong_guesses: u32,
}

/// A play record ready to be stored.
#[derive(Clone, Copy, Debug)]
pub struct NewPlay {
    pub(crate) song: SongId,
    pub(crate) user: UserId,
    pub(crate) correct_guesses: u32,
    pub(crate) wrong_guesses: u32,
}

impl NewPlay {
    pub fn new(user: UserId, submission: PlaySubmission) -> Self {
        NewPlay {
            song: submission.song,
            user,
            correct_guesses: submission.correct_guesses,
            wrong_guesses: submission.wrong_guesses,
        }
    }
}

/// When a record was created and last modified.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Times {
    /// The date and time it was created.
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,

    /// The date and time it was last modified.
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

impl Times {
    pub(crate) fn now() -> Self {
        let now = OffsetDateTime::now_utc();

        Times {
            created_at: now,
            updated_at: now,
        }
    }
}
