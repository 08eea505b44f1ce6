use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::{BackendError, ErrorKind};

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// The largest JSON body to accept. The HTTP gateway should enforce a
/// tighter limit.
const MAX_CONTENT_LENGTH: u64 = 64 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    match e.kind() {
        ErrorKind::Validation | ErrorKind::Reference | ErrorKind::InvalidArgument => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{
        body::{bytes, content_length_limit},
        delete, get as g,
        header::optional,
        path as p,
        path::param as par,
        post, put, query,
    };

    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::play::PlayId;
    use crate::song::SongId;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident; $($filters:expr),+) => (
        pub fn $name(environment: Environment) -> Route {
            let r = environment.urls.api_path.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(r));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_songs_list_route => songs_list, rt; p("songs"), query::<q::PageQuery>(), end(), g());
    route!(make_random_song_route => random_song, rt; p("songs"), p("random"), end(), g());
    route!(make_top_songs_route => top_songs, rt; p("songs"), p("top"), query::<q::TopQuery>(), end(), g());
    route!(make_search_songs_route => search_songs, rt; p("songs"), p("search"), query::<q::SearchQuery>(), end(), g());
    route!(make_song_route => song, rt; p("songs"), par::<SongId>(), end(), g());
    route!(make_plays_list_route => plays_list, rt; p("songusers"), end(), g());
    route!(make_play_route => play, rt; p("songusers"), par::<PlayId>(), end(), g());
    route!(make_create_play_route => create_play, rt; p("songusers"), end(), post(), optional::<String>("authorization"), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_update_play_route => update_play, rt; p("songusers"), par::<PlayId>(), end(), put(), optional::<String>("authorization"), content_length_limit(MAX_CONTENT_LENGTH), bytes());
    route!(make_delete_play_route => delete_play, rt; p("songusers"), par::<PlayId>(), end(), delete(), optional::<String>("authorization"));

    /// Every public route, most specific first, with errors rendered
    /// as JSON.
    pub fn make_api_routes(environment: Environment) -> Route {
        let logger = environment.logger.clone();

        make_songs_list_route(environment.clone())
            .or(make_random_song_route(environment.clone()))
            .unify()
            .or(make_top_songs_route(environment.clone()))
            .unify()
            .or(make_search_songs_route(environment.clone()))
            .unify()
            .or(make_song_route(environment.clone()))
            .unify()
            .or(make_plays_list_route(environment.clone()))
            .unify()
            .or(make_play_route(environment.clone()))
            .unify()
            .or(make_create_play_route(environment.clone()))
            .unify()
            .or(make_update_play_route(environment.clone()))
            .unify()
            .or(make_delete_play_route(environment))
            .unify()
            .recover(move |r| super::format_rejection(logger.clone(), r))
            .map(|reply| Box::new(reply) as Box<dyn Reply>)
            .boxed()
    }
}
