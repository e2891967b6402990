//! Listings built straight from the catalog and the classification store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::repository;
use crate::error::AppError;
use crate::models::InstitutionBadge;
use crate::services::grouping::{
    GroupedCatalog, LabeledCourse, group_courses, institutions_by_course,
    sort_by_state_and_proximity,
};

/// Logo strip entry; `page_url` is set only for institutions with a page template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitutionLogo {
    pub logo_url: String,
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitutionOption {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedCourses {
    pub courses: Vec<LabeledCourse>,
    pub institutions: HashMap<String, InstitutionBadge>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: SqlitePool,
    media_url: String,
}

impl CatalogService {
    pub fn new(db: SqlitePool, media_url: impl Into<String>) -> Self {
        Self {
            db,
            media_url: media_url.into(),
        }
    }

    /// Listed courses grouped as featured or by category.
    pub async fn grouped_listing(&self, now: DateTime<Utc>) -> Result<GroupedCatalog, AppError> {
        let candidates = repository::fetch_listed_courses(&self.db).await?;
        let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let snapshot = repository::fetch_classification_snapshot(&self.db, &ids).await?;

        debug!("grouping {} listed courses", candidates.len());
        Ok(group_courses(&candidates, &snapshot, now))
    }

    /// Listed featured courses, sorted, with the institutions of those courses.
    pub async fn featured_courses(&self, now: DateTime<Utc>) -> Result<FeaturedCourses, AppError> {
        let featured_ids = repository::fetch_featured_course_ids(&self.db).await?;
        let catalog = repository::fetch_catalog_courses_by_ids(&self.db, &featured_ids).await?;
        let snapshot = repository::fetch_classification_snapshot(&self.db, &featured_ids).await?;

        let listed: Vec<_> = featured_ids
            .iter()
            .filter_map(|id| catalog.get(id))
            .filter(|course| course.is_listed())
            .collect();

        let institutions = institutions_by_course(listed.iter().copied(), &snapshot);
        let courses = listed
            .into_iter()
            .map(|course| LabeledCourse::new(course.clone(), now))
            .collect();

        Ok(FeaturedCourses {
            courses: sort_by_state_and_proximity(courses, now),
            institutions,
        })
    }

    /// Logos for the index page, in institution order.
    pub async fn institution_logos(&self) -> Result<Vec<InstitutionLogo>, AppError> {
        let with_templates = repository::fetch_institutions_with_templates(&self.db).await?;

        let logos = repository::fetch_active_main_classifications(&self.db)
            .await?
            .into_iter()
            .filter(|main| main.visibility.on_index() && !main.logo.is_empty())
            .map(|main| InstitutionLogo {
                logo_url: main.logo_url(&self.media_url),
                page_url: with_templates.contains(&main.id).then(|| main.page_path()),
            })
            .collect();
        Ok(logos)
    }

    /// Institutions offered as a search filter.
    pub async fn search_institutions(&self) -> Result<Vec<InstitutionOption>, AppError> {
        let options = repository::fetch_active_main_classifications(&self.db)
            .await?
            .into_iter()
            .filter(|main| main.visibility.in_search())
            .map(|main| InstitutionOption {
                id: main.id,
                name: main.name,
            })
            .collect();
        Ok(options)
    }

    /// Course ids of an active institution; empty for inactive or unknown ids.
    pub async fn courses_by_institution(&self, institution_id: i64) -> Result<Vec<String>, AppError> {
        repository::fetch_course_ids_by_institution(&self.db, institution_id).await
    }
}
