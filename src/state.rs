use std::sync::Arc;

use sqlx::SqlitePool;

use crate::search::SearchClient;
use crate::services::{
    CatalogService, DiscoveryService, EnrichOptions, InstitutionPageService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub search: Arc<dyn SearchClient>,
    pub media_url: String,
}

impl AppState {
    pub fn new(db: SqlitePool, search: Arc<dyn SearchClient>, media_url: impl Into<String>) -> Self {
        Self {
            db,
            search,
            media_url: media_url.into(),
        }
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone(), self.media_url.clone())
    }

    pub fn discovery(&self) -> DiscoveryService {
        DiscoveryService::new(
            self.db.clone(),
            self.search.clone(),
            EnrichOptions::new(self.media_url.clone()),
        )
    }

    pub fn institution_pages(&self) -> InstitutionPageService {
        InstitutionPageService::new(self.db.clone(), self.discovery(), self.media_url.clone())
    }
}
