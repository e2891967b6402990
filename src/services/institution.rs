use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{EnrichedCourse, MainClassificationTemplate};
use crate::services::discovery::{DiscoveryRequest, DiscoveryService};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["en", "es_419"];

/// Map a request language onto a supported template language.
pub fn normalize_language(preference: Option<&str>) -> &'static str {
    let Some(raw) = preference else {
        return DEFAULT_LANGUAGE;
    };
    let wanted = raw.trim().replace('-', "_").to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|lang| *lang == wanted)
        .unwrap_or(DEFAULT_LANGUAGE)
}

fn template_in<'a>(
    templates: &'a [MainClassificationTemplate],
    language: &str,
) -> Option<&'a MainClassificationTemplate> {
    templates
        .iter()
        .find(|t| t.language.as_deref() == Some(language))
}

/// Pick the template for `language`, then the other supported languages with
/// the default first. Templates with no language set are never served.
pub fn select_template<'a>(
    templates: &'a [MainClassificationTemplate],
    language: &str,
) -> Option<&'a MainClassificationTemplate> {
    // SUPPORTED_LANGUAGES lists the default first.
    template_in(templates, language)
        .or_else(|| {
            SUPPORTED_LANGUAGES
                .iter()
                .filter(|lang| **lang != language)
                .find_map(|lang| template_in(templates, lang))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstitutionPage {
    pub name: String,
    pub banner_url: String,
    pub template_html: String,
    pub courses: Vec<EnrichedCourse>,
}

#[derive(Clone)]
pub struct InstitutionPageService {
    db: SqlitePool,
    discovery: DiscoveryService,
    media_url: String,
}

impl InstitutionPageService {
    pub fn new(db: SqlitePool, discovery: DiscoveryService, media_url: impl Into<String>) -> Self {
        Self {
            db,
            discovery,
            media_url: media_url.into(),
        }
    }

    /// `NotFound` sends the visitor back to the index page.
    pub async fn page(
        &self,
        institution_id: i64,
        language_preference: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<InstitutionPage, AppError> {
        let institution = repository::fetch_main_classification(&self.db, institution_id)
            .await?
            .filter(|main| main.is_active)
            .ok_or(AppError::NotFound)?;

        if institution.banner.is_empty() {
            info!("institution {} has no banner, no page to show", institution_id);
            return Err(AppError::NotFound);
        }

        let language = normalize_language(language_preference);
        let templates = repository::fetch_templates(&self.db, institution_id).await?;
        let Some(template) = select_template(&templates, language) else {
            warn!("institution {} has no page template", institution_id);
            return Err(AppError::NotFound);
        };

        let request = DiscoveryRequest {
            classification: Some(institution_id),
            ..Default::default()
        };
        let courses = self.discovery.search(&request, now).await?.results;

        Ok(InstitutionPage {
            banner_url: institution.banner_url(&self.media_url),
            name: institution.name,
            template_html: template.template.clone(),
            courses,
        })
    }
}
