use std::time::{Duration, Instant};

use log::debug;
use serde::de::DeserializeOwned;
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::catalog::{self, SafeDb};
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::play::{PlayId, PlaySubmission, PlayUpdate};
use crate::routes::{
    query::{PageQuery, SearchQuery, TopQuery},
    rejection::{Context, Rejection},
    response::SuccessResponse,
};
use crate::song::{SongId, SongSubmission};
use crate::user::{parse_authorization, User};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        // TODO when `try` blocks are stabilized, we can wrap the body
        // and return the headers even on errors
        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn songs_list(environment: Environment, query: PageQuery) -> RouteResult {
    timed! {
        let PageQuery { page } = query;
        let error_handler = |e: BackendError| Rejection::new(Context::list_songs(page.clone()), e);

        let number = catalog::parse_page_number(page.as_deref()).map_err(error_handler)?;
        debug!(environment.logger, "Listing songs..."; "page" => number);

        let listing = catalog::list_songs(environment.db.as_ref(), number)
            .await
            .map_err(error_handler)?;
        let urls = &environment.urls;

        json(&SuccessResponse::Page {
            count: listing.count,
            next: if listing.has_next { Some(urls.songs_page(number + 1)) } else { None },
            previous: if number > 1 { Some(urls.songs_page(number - 1)) } else { None },
            results: listing.results,
        })
    }
}

pub async fn random_song(environment: Environment) -> RouteResult {
    timed! {
        let song = catalog::random_song(environment.db.as_ref())
            .await
            .map_err(|e| Rejection::new(Context::random_song(), e))?;

        json(&song)
    }
}

pub async fn top_songs(environment: Environment, query: TopQuery) -> RouteResult {
    timed! {
        let TopQuery { n } = query;
        let error_handler = |e: BackendError| Rejection::new(Context::top_songs(n.clone()), e);

        let count = catalog::parse_top_count(n.as_deref()).map_err(error_handler)?;
        debug!(environment.logger, "Ranking songs..."; "count" => count);

        let songs = catalog::top_songs(environment.db.as_ref(), count)
            .await
            .map_err(error_handler)?;

        json(&songs)
    }
}

pub async fn search_songs(environment: Environment, query: SearchQuery) -> RouteResult {
    timed! {
        let SearchQuery { title } = query;
        let error_handler = |e: BackendError| Rejection::new(Context::search_songs(title.clone()), e);

        let term = catalog::parse_search_term(title.as_deref()).map_err(error_handler)?;
        debug!(environment.logger, "Searching songs..."; "term" => &term);

        let songs = catalog::search_songs(environment.db.as_ref(), &term)
            .await
            .map_err(error_handler)?;

        json(&songs)
    }
}

pub async fn song(environment: Environment, id: SongId) -> RouteResult {
    timed! {
        debug!(environment.logger, "Retrieving song..."; "id" => id);

        let error_handler = |e: BackendError| Rejection::new(Context::retrieve_song(id), e);

        let song = environment
            .db
            .retrieve_song(id)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::SongNotFound(id)))?;

        json(&song)
    }
}

pub async fn create_song(environment: Environment, body: Bytes) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create_song(), e);

        let submission: SongSubmission = parse_body(&body).map_err(error_handler)?;
        debug!(environment.logger, "Creating song..."; "title" => &submission.title);

        let song = catalog::create_song(environment.db.as_ref(), submission)
            .await
            .map_err(error_handler)?;

        with_status(json(&song), StatusCode::CREATED)
    }
}

pub async fn plays_list(environment: Environment) -> RouteResult {
    timed! {
        let plays = environment
            .db
            .retrieve_plays()
            .await
            .map_err(|e| Rejection::new(Context::list_plays(), e))?;

        json(&plays)
    }
}

pub async fn play(environment: Environment, id: PlayId) -> RouteResult {
    timed! {
        debug!(environment.logger, "Retrieving play record..."; "id" => id);

        let error_handler = |e: BackendError| Rejection::new(Context::retrieve_play(id), e);

        let play = environment
            .db
            .retrieve_play(id)
            .await
            .map_err(error_handler)?
            .ok_or_else(|| error_handler(BackendError::NonExistentPlay(id)))?;

        json(&play)
    }
}

pub async fn create_play(
    environment: Environment,
    authorization: Option<String>,
    body: Bytes,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create_play(), e);

        let user = authenticate(environment.db.as_ref(), authorization)
            .await
            .map_err(error_handler)?;
        let submission: PlaySubmission = parse_body(&body).map_err(error_handler)?;
        debug!(environment.logger, "Recording play..."; "song" => submission.song, "user" => user.id);

        let play = catalog::record_play(environment.db.as_ref(), user.id, submission)
            .await
            .map_err(error_handler)?;

        with_header(
            with_status(json(&play), StatusCode::CREATED),
            "location",
            environment.urls.play(play.id).as_str(),
        )
    }
}

pub async fn update_play(
    environment: Environment,
    id: PlayId,
    authorization: Option<String>,
    body: Bytes,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update_play(id), e);

        let user = authenticate(environment.db.as_ref(), authorization)
            .await
            .map_err(error_handler)?;
        let update: PlayUpdate = parse_body(&body).map_err(error_handler)?;
        debug!(environment.logger, "Updating play record..."; "id" => id, "user" => user.id);

        let play = catalog::update_play(environment.db.as_ref(), id, update)
            .await
            .map_err(error_handler)?;

        json(&play)
    }
}

pub async fn delete_play(
    environment: Environment,
    id: PlayId,
    authorization: Option<String>,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete_play(id), e);

        let user = authenticate(environment.db.as_ref(), authorization)
            .await
            .map_err(error_handler)?;
        debug!(environment.logger, "Deleting play record..."; "id" => id, "user" => user.id);

        catalog::delete_play(environment.db.as_ref(), id)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

/// Resolves the `Authorization` header to the account it names.
async fn authenticate(db: &SafeDb, authorization: Option<String>) -> Result<User, BackendError> {
    let token = parse_authorization(authorization.as_deref())?;

    db.retrieve_user_by_token(&token)
        .await?
        .ok_or(BackendError::InvalidToken)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    serde_json::from_slice(body).map_err(|source| BackendError::MalformedBody { source })
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
