use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::BackendError;
use crate::normalization::normalize_text;

/// An ID in the `songs` table.
pub type SongId = i64;

macro_rules! choices {
    ($(#[$meta:meta])* $name:ident, $field:literal; $($variant:ident => $code:literal),+ $(,)?) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
        pub enum $name {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The code stored in the database and sent over the wire.
            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl FromStr for $name {
            type Err = BackendError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    _ => Err(BackendError::InvalidChoice {
                        field: $field,
                        value: s.to_owned(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

choices! {
    /// The language a song is sung in.
    Language, "language";
    English => "EN",
    Spanish => "ES",
    French => "FR",
    German => "DE",
    Italian => "IT",
    Portuguese => "PT",
}

choices! {
    /// The genre a song is filed under.
    Category, "category";
    Pop => "POP",
    Rock => "ROCK",
    Jazz => "JAZZ",
    Classical => "CLASSICAL",
    HipHop => "HIPHOP",
    Country => "COUNTRY",
    Electronic => "ELECTRONIC",
    Reggae => "REGGAE",
    Latin => "LATIN",
    Other => "OTHER",
}

/// A song in the catalog.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Song {
    /// The ID of the song.
    pub id: SongId,

    pub title: String,

    pub artist: String,

    pub language: Language,

    pub category: Category,

    /// How many play records have ever been created for this song.
    pub number_times_played: i64,

    /// Where the audio lives in blob storage.
    pub audio_file: String,

    /// Where the timed lyrics live in blob storage.
    pub lrc_file: String,

    /// Where the cover image lives in blob storage.
    pub background_image: String,
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// A song as submitted for creation, before any validation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SongSubmission {
    pub title: String,
    pub artist: String,
    pub language: String,
    pub category: String,
    pub audio_file: String,
    pub lrc_file: String,
    pub background_image: String,
}

/// A validated song, ready to be stored. Its counter always starts at
/// zero, so there is no field for it.
#[derive(Clone, Debug, PartialEq)]
pub struct NewSong {
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) language: Language,
    pub(crate) category: Category,
    pub(crate) audio_file: String,
    pub(crate) lrc_file: String,
    pub(crate) background_image: String,
}

impl NewSong {
    /// Attaches the identity assigned by the store.
    pub(crate) fn into_song(self, id: SongId) -> Song {
        Song {
            id,
            title: self.title,
            artist: self.artist,
            language: self.language,
            category: self.category,
            number_times_played: 0,
            audio_file: self.audio_file,
            lrc_file: self.lrc_file,
            background_image: self.background_image,
        }
    }
}

impl TryFrom<SongSubmission> for NewSong {
    type Error = BackendError;

    fn try_from(submission: SongSubmission) -> Result<Self, Self::Error> {
        let title = non_blank("title", &submission.title)?;
        let artist = non_blank("artist", &submission.artist)?;

        Ok(NewSong {
            title,
            artist,
            language: submission.language.parse()?,
            category: submission.category.parse()?,
            audio_file: submission.audio_file,
            lrc_file: submission.lrc_file,
            background_image: submission.background_image,
        })
    }
}

fn non_blank(field: &'static str, value: &str) -> Result<String, BackendError> {
    let normalized = normalize_text(value);

    if normalized.is_empty() {
        Err(BackendError::BlankField(field))
    } else {
        Ok(normalized)
    }
}
