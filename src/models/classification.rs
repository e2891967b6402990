use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

/// Directory under the media root holding institution logos and banners.
pub const ASSETS_DIR: &str = "course_classification_assets";

/// Storage path of an uploaded institution asset.
pub fn asset_path(institution_id: i64, filename: &str) -> String {
    format!("{}/{}/{}", ASSETS_DIR, institution_id, filename)
}

/// Public URL of a stored asset, `""` when there is none.
pub fn asset_url(media_url: &str, path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!(
        "{}/{}",
        media_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowOption {
    NoShow,
    OnlyWithCourse,
    Always,
}

impl ShowOption {
    pub fn code(&self) -> i64 {
        match self {
            ShowOption::NoShow => 0,
            ShowOption::OnlyWithCourse => 1,
            ShowOption::Always => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, AppError> {
        match code {
            0 => Ok(ShowOption::NoShow),
            1 => Ok(ShowOption::OnlyWithCourse),
            2 => Ok(ShowOption::Always),
            other => Err(AppError::BadRequest(format!("unknown show_opt: {}", other))),
        }
    }
}

/// Where an institution is offered: the index page logo strip, the search
/// filter, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionVisibility {
    IndexOnly,
    SearchOnly,
    Both,
}

impl InstitutionVisibility {
    pub fn code(&self) -> i64 {
        match self {
            InstitutionVisibility::IndexOnly => 0,
            InstitutionVisibility::SearchOnly => 1,
            InstitutionVisibility::Both => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, AppError> {
        match code {
            0 => Ok(InstitutionVisibility::IndexOnly),
            1 => Ok(InstitutionVisibility::SearchOnly),
            2 => Ok(InstitutionVisibility::Both),
            other => Err(AppError::BadRequest(format!(
                "unknown institution visibility: {}",
                other
            ))),
        }
    }

    pub fn on_index(&self) -> bool {
        matches!(self, InstitutionVisibility::IndexOnly | InstitutionVisibility::Both)
    }

    pub fn in_search(&self) -> bool {
        matches!(self, InstitutionVisibility::SearchOnly | InstitutionVisibility::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub sequence: i64,
    pub show_opt: ShowOption,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub sequence: i64,
    pub show_opt: i64,
}

impl TryFrom<CategoryRow> for Category {
    type Error = AppError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Category {
            show_opt: ShowOption::from_code(row.show_opt)?,
            id: row.id,
            name: row.name,
            sequence: row.sequence,
        })
    }
}

/// An institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainClassification {
    pub id: i64,
    pub name: String,
    pub banner: String,
    pub logo: String,
    pub sequence: i64,
    pub is_active: bool,
    pub visibility: InstitutionVisibility,
}

impl MainClassification {
    pub fn logo_url(&self, media_url: &str) -> String {
        asset_url(media_url, &self.logo)
    }

    pub fn banner_url(&self, media_url: &str) -> String {
        asset_url(media_url, &self.banner)
    }

    pub fn page_path(&self) -> String {
        format!("/institutions/{}/", self.id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MainClassificationRow {
    pub id: i64,
    pub name: String,
    pub banner: String,
    pub logo: String,
    pub sequence: i64,
    pub is_active: bool,
    pub visibility: i64,
}

impl TryFrom<MainClassificationRow> for MainClassification {
    type Error = AppError;

    fn try_from(row: MainClassificationRow) -> Result<Self, Self::Error> {
        Ok(MainClassification {
            visibility: InstitutionVisibility::from_code(row.visibility)?,
            id: row.id,
            name: row.name,
            banner: row.banner,
            logo: row.logo,
            sequence: row.sequence,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MainClassificationTemplate {
    pub id: i64,
    pub main_classification_id: i64,
    pub template: String,
    pub language: Option<String>,
}

/// Classification of one course: its institution, its categories and whether it
/// is featured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseClassification {
    pub course_id: String,
    pub main_class: Option<MainClassification>,
    pub category_ids: Vec<i64>,
    pub is_featured_course: bool,
}

/// Classification rows preloaded for a set of course ids, plus every category.
#[derive(Debug, Clone, Default)]
pub struct ClassificationSnapshot {
    pub categories: Vec<Category>,
    pub by_course: HashMap<String, CourseClassification>,
}

impl ClassificationSnapshot {
    pub fn get(&self, course_id: &str) -> Option<&CourseClassification> {
        self.by_course.get(course_id)
    }

    pub fn institution_of(&self, course_id: &str) -> Option<&MainClassification> {
        self.get(course_id).and_then(|c| c.main_class.as_ref())
    }

    pub fn is_featured(&self, course_id: &str) -> bool {
        self.get(course_id).is_some_and(|c| c.is_featured_course)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategoryRequest {
    pub name: String,
    pub sequence: i64,
    pub show_opt: ShowOption,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMainClassificationRequest {
    pub name: String,
    pub banner: String,
    pub logo: String,
    pub sequence: i64,
    pub is_active: bool,
    pub visibility: InstitutionVisibility,
}

impl NewMainClassificationRequest {
    /// Active, visible everywhere, no assets.
    pub fn named(name: impl Into<String>, sequence: i64) -> Self {
        Self {
            name: name.into(),
            banner: String::new(),
            logo: String::new(),
            sequence,
            is_active: true,
            visibility: InstitutionVisibility::Both,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplateRequest {
    pub main_classification_id: i64,
    pub template: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCourseClassificationRequest {
    pub course_id: String,
    pub main_class_id: Option<i64>,
    pub category_ids: Vec<i64>,
    pub is_featured_course: bool,
}
