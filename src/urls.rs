use url::Url;

use crate::play::PlayId;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path segment under which all public routes live.
    pub(crate) api_path: String,

    /// Prefix for all public routes.
    api_prefix: String,
}

impl Urls {
    /// Create a new instance. `api_path` should *not* include slashes.
    pub fn new(base: impl AsRef<str>, api_path: impl Into<String>) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));
        let api_path = api_path.into();
        let api_prefix = format!("{}/", api_path);

        Urls {
            base,
            api_path,
            api_prefix,
        }
    }

    pub fn api(&self) -> Url {
        self.base.join(&self.api_prefix).expect("get API URL")
    }

    pub fn songs(&self) -> Url {
        self.api().join("songs/").expect("get songs URL")
    }

    /// The listing page with the given 1-based number.
    pub fn songs_page(&self, page: u32) -> Url {
        let mut url = self.songs();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string());
        url
    }

    pub fn play(&self, id: PlayId) -> Url {
        self.api()
            .join(&format!("songusers/{}/", id))
            .unwrap_or_else(|_| panic!("get URL for play record {}", id))
    }
}
