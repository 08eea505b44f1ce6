use std::sync::Arc;

use log::Logger;

use crate::catalog::SafeDb;
use crate::urls::Urls;

/// Everything a request handler needs.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<SafeDb>,
    pub urls: Arc<Urls>,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, db: Arc<SafeDb>, urls: Arc<Urls>) -> Self {
        Self { logger, db, urls }
    }
}
