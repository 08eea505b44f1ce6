use serde::Deserialize;

// parameters stay strings so that malformed values reach the handlers
// and get reported in the usual JSON format

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub n: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub title: Option<String>,
}
