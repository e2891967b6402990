use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::time::parse_optional_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogVisibility {
    Both,
    About,
    None,
}

impl CatalogVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogVisibility::Both => "both",
            CatalogVisibility::About => "about",
            CatalogVisibility::None => "none",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "both" => Ok(CatalogVisibility::Both),
            "about" => Ok(CatalogVisibility::About),
            "none" => Ok(CatalogVisibility::None),
            other => Err(AppError::BadRequest(format!(
                "unknown catalog visibility: {}",
                other
            ))),
        }
    }
}

/// The timing fields the state classifier looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseTiming {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub enrollment_start: Option<DateTime<Utc>>,
    pub enrollment_end: Option<DateTime<Utc>>,
    pub invitation_only: bool,
}

/// A course as the catalog knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCourse {
    pub id: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub enrollment_start: Option<DateTime<Utc>>,
    pub enrollment_end: Option<DateTime<Utc>>,
    pub invitation_only: bool,
    pub catalog_visibility: CatalogVisibility,
    pub short_description: Option<String>,
    pub advertised_start: Option<String>,
    pub display_org_with_default: String,
    pub effort: Option<String>,
    pub self_paced: bool,
    pub price: Option<i64>,
}

impl CatalogCourse {
    /// A visible course with only an id, an org and a start date.
    pub fn new(id: impl Into<String>, org: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start: Some(start),
            end: None,
            enrollment_start: None,
            enrollment_end: None,
            invitation_only: false,
            catalog_visibility: CatalogVisibility::Both,
            short_description: None,
            advertised_start: None,
            display_org_with_default: org.into(),
            effort: None,
            self_paced: false,
            price: None,
        }
    }

    pub fn timing(&self) -> CourseTiming {
        CourseTiming {
            start: self.start,
            end: self.end,
            enrollment_start: self.enrollment_start,
            enrollment_end: self.enrollment_end,
            invitation_only: self.invitation_only,
        }
    }

    pub fn is_listed(&self) -> bool {
        self.catalog_visibility == CatalogVisibility::Both
    }
}

/// Raw `course_overviews` row; timestamps are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct CatalogCourseRow {
    pub id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub enrollment_start: Option<String>,
    pub enrollment_end: Option<String>,
    pub invitation_only: bool,
    pub catalog_visibility: String,
    pub short_description: Option<String>,
    pub advertised_start: Option<String>,
    pub display_org_with_default: String,
    pub effort: Option<String>,
    pub self_paced: bool,
    pub price: Option<i64>,
}

impl TryFrom<CatalogCourseRow> for CatalogCourse {
    type Error = AppError;

    fn try_from(row: CatalogCourseRow) -> Result<Self, Self::Error> {
        Ok(CatalogCourse {
            start: parse_optional_timestamp("start", row.start_date.as_deref())?,
            end: parse_optional_timestamp("end", row.end_date.as_deref())?,
            enrollment_start: parse_optional_timestamp(
                "enrollment_start",
                row.enrollment_start.as_deref(),
            )?,
            enrollment_end: parse_optional_timestamp(
                "enrollment_end",
                row.enrollment_end.as_deref(),
            )?,
            catalog_visibility: CatalogVisibility::parse(&row.catalog_visibility)?,
            id: row.id,
            invitation_only: row.invitation_only,
            short_description: row.short_description,
            advertised_start: row.advertised_start,
            display_org_with_default: row.display_org_with_default,
            effort: row.effort,
            self_paced: row.self_paced,
            price: row.price,
        })
    }
}

/// Lifecycle state of a course relative to "now".
///
/// Declaration order is the display order of the state buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseState {
    OngoingEnrollable,
    UpcomingEnrollable,
    UpcomingNotenrollable,
    OngoingNotenrollable,
    Completed,
    Other,
}

impl CourseState {
    pub const ALL: [CourseState; 6] = [
        CourseState::OngoingEnrollable,
        CourseState::UpcomingEnrollable,
        CourseState::UpcomingNotenrollable,
        CourseState::OngoingNotenrollable,
        CourseState::Completed,
        CourseState::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseState::OngoingEnrollable => "ongoing_enrollable",
            CourseState::UpcomingEnrollable => "upcoming_enrollable",
            CourseState::UpcomingNotenrollable => "upcoming_notenrollable",
            CourseState::OngoingNotenrollable => "ongoing_notenrollable",
            CourseState::Completed => "completed",
            CourseState::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn is_enrollable(&self) -> bool {
        matches!(
            self,
            CourseState::OngoingEnrollable | CourseState::UpcomingEnrollable
        )
    }

    /// Completed and unclassifiable courses are ordered by their end date,
    /// everything else by its start date.
    pub fn sorts_by_end(&self) -> bool {
        matches!(self, CourseState::Completed | CourseState::Other)
    }
}
