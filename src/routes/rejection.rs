use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;
use crate::play::PlayId;
use crate::song::SongId;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            detail: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

/// The JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) detail: String,
}

/// The operation that failed, plus whatever identifies its target.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Context {
    CreatePlay,
    CreateSong,
    DeletePlay { id: PlayId },
    ListPlays,
    ListSongs { page: Option<String> },
    RandomSong,
    RetrievePlay { id: PlayId },
    RetrieveSong { id: SongId },
    SearchSongs { title: Option<String> },
    TopSongs { n: Option<String> },
    UpdatePlay { id: PlayId },
}

impl Context {
    pub fn create_play() -> Context {
        Context::CreatePlay
    }

    pub fn create_song() -> Context {
        Context::CreateSong
    }

    pub fn delete_play(id: PlayId) -> Context {
        Context::DeletePlay { id }
    }

    pub fn list_plays() -> Context {
        Context::ListPlays
    }

    pub fn list_songs(page: Option<String>) -> Context {
        Context::ListSongs { page }
    }

    pub fn random_song() -> Context {
        Context::RandomSong
    }

    pub fn retrieve_play(id: PlayId) -> Context {
        Context::RetrievePlay { id }
    }

    pub fn retrieve_song(id: SongId) -> Context {
        Context::RetrieveSong { id }
    }

    pub fn search_songs(title: Option<String>) -> Context {
        Context::SearchSongs { title }
    }

    pub fn top_songs(n: Option<String>) -> Context {
        Context::TopSongs { n }
    }

    pub fn update_play(id: PlayId) -> Context {
        Context::UpdatePlay { id }
    }
}

#[cfg(test)]
mod tests {
    use super::{Context, Rejection};
    use crate::errors::BackendError;

    #[test]
    fn flattened_rejection_names_operation_and_detail() {
        let rejection = Rejection::new(Context::random_song(), BackendError::NoSongs);
        let body = serde_json::to_value(rejection.flatten()).expect("serialize rejection");

        assert_eq!(
            body,
            serde_json::json!({"operation": "random_song", "detail": "No songs available"})
        );
    }

    #[test]
    fn context_fields_are_inlined() {
        let rejection = Rejection::new(
            Context::top_songs(Some("invalid".to_owned())),
            BackendError::InvalidParameter {
                name: "n",
                value: "invalid".to_owned(),
            },
        );
        let body = serde_json::to_value(rejection.flatten()).expect("serialize rejection");

        assert_eq!(body["operation"], "top_songs");
        assert_eq!(body["n"], "invalid");
    }
}
