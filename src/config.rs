use std::env;

use crate::search::SearchConfig;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    /// Prefix for stored logo and banner paths.
    pub media_url: String,
    /// `None` when `SEARCH_URL` is unset; discovery then returns no hits.
    pub search: Option<SearchConfig>,
}

impl AppConfig {
    pub fn new_from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://course_classification.db".to_string());
        let media_url = env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string());

        Self {
            database_url,
            media_url,
            search: SearchConfig::new_from_env().ok(),
        }
    }
}
