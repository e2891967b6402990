#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use course_classification::db;
use course_classification::db::repository;
use course_classification::error::AppError;
use course_classification::models::{
    CatalogCourse, CatalogVisibility, Category, MainClassification, NewCategoryRequest,
    NewCourseClassificationRequest, NewMainClassificationRequest, ShowOption,
};
use course_classification::search::{SearchClient, SearchHit, SearchQuery, SearchResults};

pub fn utc(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub async fn setup_db() -> SqlitePool {
    db::connect("sqlite::memory:")
        .await
        .expect("Failed to create database")
}

pub fn course(id: &str, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> CatalogCourse {
    let mut course = CatalogCourse::new(id, "MCCx", start);
    course.end = end;
    course
}

pub fn hidden_course(id: &str, start: DateTime<Utc>) -> CatalogCourse {
    let mut course = CatalogCourse::new(id, "MCCx", start);
    course.catalog_visibility = CatalogVisibility::None;
    course
}

pub async fn seed_courses(db: &SqlitePool, courses: &[CatalogCourse]) {
    for course in courses {
        repository::upsert_catalog_course(db, course)
            .await
            .expect("Failed to insert course");
    }
}

pub async fn seed_category(db: &SqlitePool, name: &str, sequence: i64) -> Category {
    repository::insert_category(
        db,
        NewCategoryRequest {
            name: name.to_string(),
            sequence,
            show_opt: ShowOption::Always,
        },
    )
    .await
    .expect("Failed to insert category")
}

pub async fn seed_institution(db: &SqlitePool, name: &str, sequence: i64) -> MainClassification {
    repository::insert_main_classification(db, NewMainClassificationRequest::named(name, sequence))
        .await
        .expect("Failed to insert institution")
}

pub async fn classify_course(
    db: &SqlitePool,
    course_id: &str,
    main_class_id: Option<i64>,
    category_ids: Vec<i64>,
    is_featured_course: bool,
) {
    repository::upsert_course_classification(
        db,
        &NewCourseClassificationRequest {
            course_id: course_id.to_string(),
            main_class_id,
            category_ids,
            is_featured_course,
        },
    )
    .await
    .expect("Failed to classify course");
}

/// Index document for a course as the search engine returns it.
pub fn hit(id: &str, start: &str, end: Option<&str>) -> SearchHit {
    let data = json!({
        "id": id,
        "start": start,
        "end": end,
        "content": { "display_name": format!("Course {}", id) },
        "org": "MCCx",
    });
    let Value::Object(data) = data else {
        unreachable!()
    };
    SearchHit {
        id: id.to_string(),
        score: Some(1.0),
        data,
    }
}

/// In-process search engine: returns its hits in order, honours exclusions and
/// paging, and records every query it receives.
pub struct FakeSearchClient {
    hits: Vec<SearchHit>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl FakeSearchClient {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> SearchQuery {
        self.recorded().pop().expect("no query recorded")
    }
}

#[async_trait]
impl SearchClient for FakeSearchClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResults, AppError> {
        self.queries.lock().unwrap().push(query.clone());

        let matching: Vec<SearchHit> = self
            .hits
            .iter()
            .filter(|hit| !query.exclude_ids.contains(&hit.id))
            .cloned()
            .collect();

        Ok(SearchResults {
            took: 1,
            total: matching.len() as u64,
            max_score: Some(1.0),
            results: matching
                .into_iter()
                .skip(query.from)
                .take(query.size)
                .collect(),
        })
    }
}
