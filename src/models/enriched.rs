use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::models::course::{CatalogCourse, CourseState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeUnit {
    #[serde(rename = "y")]
    Years,
    #[serde(rename = "m")]
    Months,
    #[serde(rename = "d")]
    Days,
}

/// Serialized as `[magnitude, unit]`, e.g. `[3, "m"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeLeft(pub i64, pub TimeUnit);

/// Institution name and logo shown next to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitutionBadge {
    pub name: String,
    pub logo: String,
}

/// Catalog fields copied into a search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogExtra {
    pub short_description: Option<String>,
    pub advertised_start: Option<String>,
    pub display_org_with_default: String,
    pub invitation_only: bool,
    pub effort: Option<String>,
    pub self_paced: bool,
    pub price: Option<i64>,
}

impl From<&CatalogCourse> for CatalogExtra {
    fn from(course: &CatalogCourse) -> Self {
        Self {
            short_description: course.short_description.clone(),
            advertised_start: course.advertised_start.clone(),
            display_org_with_default: course.display_org_with_default.clone(),
            invitation_only: course.invitation_only,
            effort: course.effort.clone(),
            self_paced: course.self_paced,
            price: course.price,
        }
    }
}

/// `catalog` is `None` when the course is missing from the catalog; the
/// institution serializes as `{}` when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraData {
    #[serde(flatten)]
    pub catalog: Option<CatalogExtra>,
    #[serde(serialize_with = "badge_or_empty")]
    pub main_classification: Option<InstitutionBadge>,
}

fn badge_or_empty<S>(badge: &Option<InstitutionBadge>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match badge {
        Some(badge) => badge.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// A search hit with display metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedCourse {
    pub id: String,
    /// Remaining indexed fields of the hit, passed through untouched.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub time_left: TimeLeft,
    pub course_state: CourseState,
    pub extra_data: ExtraData,
}
