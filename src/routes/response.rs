use serde::Serialize;
use url::Url;

use crate::song::Song;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Page {
        count: i64,
        next: Option<Url>,
        previous: Option<Url>,
        results: Vec<Song>,
    },
}
