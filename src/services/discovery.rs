//! Course discovery: catalog filters, the search engine call and enrichment of
//! the returned hits.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::error::AppError;
use crate::models::{CatalogCourse, CourseState, EnrichedCourse};
use crate::search::{SearchClient, SearchQuery, SortOrder};
use crate::services::enrichment::{EnrichOptions, enrich_hits};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Coarse date filter offered by the search form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFilter {
    Active,
    Finished,
    ComingSoon,
}

impl StateFilter {
    /// Unknown values mean "no filter".
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(StateFilter::Active),
            "finished" => Some(StateFilter::Finished),
            "coming_soon" => Some(StateFilter::ComingSoon),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub size: usize,
    pub index: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            size: DEFAULT_PAGE_SIZE,
            index: 0,
        }
    }
}

impl Pagination {
    /// Page sizes are capped at [`MAX_PAGE_SIZE`]; a size of zero is rejected,
    /// as is a page index whose offset does not fit in `usize`.
    pub fn new(size: usize, index: usize) -> Result<Self, AppError> {
        if size == 0 {
            return Err(AppError::BadRequest("page_size must be positive".to_string()));
        }
        let size = size.min(MAX_PAGE_SIZE);
        if size.checked_mul(index).is_none() {
            return Err(AppError::BadRequest(format!(
                "page_index {} is out of range",
                index
            )));
        }
        Ok(Self { size, index })
    }

    /// Offset of the first result; saturates for hand-built out-of-range pages.
    pub fn from(&self) -> usize {
        self.size.saturating_mul(self.index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryRequest {
    pub search_term: Option<String>,
    pub order_by: Option<SortOrder>,
    pub year: Option<i32>,
    pub state: Option<StateFilter>,
    /// Institution id.
    pub classification: Option<i64>,
    pub featured: bool,
    /// Keep only results in one of these states; empty keeps everything.
    pub course_states: Vec<CourseState>,
    pub page: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscoveryResults {
    pub took: u64,
    pub total: u64,
    pub max_score: Option<f64>,
    pub results: Vec<EnrichedCourse>,
}

/// The catalog-side conditions a course must meet to be searchable.
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub year: Option<i32>,
    pub state: Option<StateFilter>,
    pub allowed_ids: Option<HashSet<String>>,
}

fn year_bounds(year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31)?.and_hms_opt(0, 0, 0)?;
    Some((first.and_utc(), last.and_utc()))
}

fn within(at: Option<DateTime<Utc>>, low: DateTime<Utc>, high: DateTime<Utc>) -> bool {
    at.is_some_and(|at| low <= at && at <= high)
}

impl CatalogFilter {
    /// Whether `course` may appear in the results at `now`. Courses without a
    /// start date never match a date condition.
    pub fn admits(&self, course: &CatalogCourse, now: DateTime<Utc>) -> bool {
        if !course.is_listed() {
            return false;
        }
        if let Some(allowed) = &self.allowed_ids {
            if !allowed.contains(&course.id) {
                return false;
            }
        }

        let bounds = self.year.and_then(year_bounds);
        if let Some((first, last)) = bounds {
            if !within(course.start, first, last) {
                return false;
            }
        }

        let not_ended = course.end.is_none_or(|end| end > now);
        match (self.state, bounds) {
            (None, _) => true,
            (Some(StateFilter::Active), Some((first, _))) => {
                not_ended && within(course.start, first, now)
            }
            (Some(StateFilter::Active), None) => {
                not_ended && course.start.is_some_and(|start| start <= now)
            }
            (Some(StateFilter::Finished), _) => course.end.is_some_and(|end| end <= now),
            (Some(StateFilter::ComingSoon), Some((_, last))) => within(course.start, now, last),
            (Some(StateFilter::ComingSoon), None) => {
                course.start.is_some_and(|start| start > now)
            }
        }
    }

    /// Ids of catalog courses the search engine has to leave out.
    pub fn excluded_ids(&self, catalog: &[CatalogCourse], now: DateTime<Utc>) -> Vec<String> {
        catalog
            .iter()
            .filter(|course| !self.admits(course, now))
            .map(|course| course.id.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct DiscoveryService {
    db: SqlitePool,
    search: Arc<dyn SearchClient>,
    options: EnrichOptions,
}

impl DiscoveryService {
    pub fn new(db: SqlitePool, search: Arc<dyn SearchClient>, options: EnrichOptions) -> Self {
        Self {
            db,
            search,
            options,
        }
    }

    async fn catalog_filter(&self, request: &DiscoveryRequest) -> Result<CatalogFilter, AppError> {
        let mut allowed: Option<HashSet<String>> = None;

        if let Some(institution_id) = request.classification {
            let ids = repository::fetch_course_ids_by_institution(&self.db, institution_id).await?;
            allowed = Some(ids.into_iter().collect());
        }

        if request.featured {
            let featured: HashSet<String> = repository::fetch_featured_course_ids(&self.db)
                .await?
                .into_iter()
                .collect();
            allowed = Some(match allowed {
                Some(ids) => ids.intersection(&featured).cloned().collect(),
                None => featured,
            });
        }

        Ok(CatalogFilter {
            year: request.year,
            state: request.state,
            allowed_ids: allowed,
        })
    }

    pub async fn search(
        &self,
        request: &DiscoveryRequest,
        now: DateTime<Utc>,
    ) -> Result<DiscoveryResults, AppError> {
        info!(
            "course discovery search initiated: term={:?} page_size={} page_number={}",
            request.search_term, request.page.size, request.page.index
        );

        let filter = self.catalog_filter(request).await?;
        let catalog = repository::fetch_catalog_courses(&self.db).await?;

        let query = SearchQuery {
            query_string: request.search_term.clone(),
            size: request.page.size,
            from: request.page.from(),
            exclude_ids: filter.excluded_ids(&catalog, now),
            sort: request.order_by,
        };
        let response = self.search.search(&query).await?;

        let hit_ids: Vec<String> = response.results.iter().map(|hit| hit.id.clone()).collect();
        let catalog_rows = repository::fetch_catalog_courses_by_ids(&self.db, &hit_ids).await?;
        let snapshot = repository::fetch_classification_snapshot(&self.db, &hit_ids).await?;

        let mut results = enrich_hits(&response.results, &catalog_rows, &snapshot, &self.options, now)
            .inspect_err(|e| {
                warn!(
                    "course discovery page failed: term={:?} page_number={}: {}",
                    request.search_term, request.page.index, e
                )
            })?;
        if !request.course_states.is_empty() {
            results.retain(|course| request.course_states.contains(&course.course_state));
        }

        info!(
            "course discovery results displayed: term={:?} page_size={} page_number={} results_count={}",
            request.search_term, request.page.size, request.page.index, response.total
        );

        Ok(DiscoveryResults {
            took: response.took,
            total: response.total,
            max_score: response.max_score,
            results,
        })
    }

    /// First page of every searchable course, keeping those in `states`.
    pub async fn courses_in_states(
        &self,
        states: &[CourseState],
        now: DateTime<Utc>,
    ) -> Result<Vec<EnrichedCourse>, AppError> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let request = DiscoveryRequest {
            course_states: states.to_vec(),
            ..Default::default()
        };
        Ok(self.search(&request, now).await?.results)
    }
}
