//! Featured/category grouping of catalog courses and the state-then-proximity
//! ordering used inside every group.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{
    CatalogCourse, Category, ClassificationSnapshot, CourseState, InstitutionBadge, ShowOption,
};
use crate::services::course_state::classify;
use crate::time::days_until;

/// A catalog course together with its state at the time of grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledCourse {
    #[serde(flatten)]
    pub course: CatalogCourse,
    pub course_state: CourseState,
}

impl LabeledCourse {
    /// Courses without a start date cannot be classified; they are reported and
    /// kept in the `other` bucket.
    pub fn new(course: CatalogCourse, now: DateTime<Utc>) -> Self {
        let course_state = match classify(&course.id, &course.timing(), now) {
            Ok(state) => state,
            Err(e) => {
                warn!("placing course {} in the other bucket: {}", course.id, e);
                CourseState::Other
            }
        };
        Self {
            course,
            course_state,
        }
    }

    /// Absolute day distance from `now` to the date this course is ordered by.
    fn distance_days(&self, now: DateTime<Utc>) -> Option<i64> {
        let reference = if self.course_state.sorts_by_end() {
            self.course.end
        } else {
            self.course.start
        };
        reference.map(|at| days_until(at, now).abs())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryGroup {
    #[serde(flatten)]
    pub category: Category,
    pub courses: Vec<LabeledCourse>,
}

impl CategoryGroup {
    pub fn is_displayed(&self) -> bool {
        match self.category.show_opt {
            ShowOption::Always => true,
            ShowOption::OnlyWithCourse => !self.courses.is_empty(),
            ShowOption::NoShow => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseGroups {
    Featured(Vec<LabeledCourse>),
    Categories(Vec<CategoryGroup>),
}

impl CourseGroups {
    pub fn len(&self) -> usize {
        match self {
            CourseGroups::Featured(_) => 1,
            CourseGroups::Categories(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedCatalog {
    pub groups: CourseGroups,
    /// Institution name and stored logo path per course id.
    pub institutions: HashMap<String, InstitutionBadge>,
}

/// Order courses by state bucket, then by distance in days to their start (or
/// end, for completed and other courses). Missing dates go last; ties keep
/// their input order.
pub fn sort_by_state_and_proximity(
    mut courses: Vec<LabeledCourse>,
    now: DateTime<Utc>,
) -> Vec<LabeledCourse> {
    courses.sort_by_key(|c| {
        let distance = c.distance_days(now);
        (c.course_state, distance.is_none(), distance.unwrap_or_default())
    });
    courses
}

/// Institution badge per course, for every candidate attached to an institution.
pub fn institutions_by_course<'a>(
    courses: impl IntoIterator<Item = &'a CatalogCourse>,
    snapshot: &ClassificationSnapshot,
) -> HashMap<String, InstitutionBadge> {
    courses
        .into_iter()
        .filter_map(|course| {
            snapshot.institution_of(&course.id).map(|main| {
                (
                    course.id.clone(),
                    InstitutionBadge {
                        name: main.name.clone(),
                        logo: main.logo.clone(),
                    },
                )
            })
        })
        .collect()
}

/// Group `candidates` for display.
///
/// If any candidate is featured the result is the single featured group and
/// categories are not looked at. Otherwise every category appears, ordered by
/// sequence then name, holding its member candidates.
pub fn group_courses(
    candidates: &[CatalogCourse],
    snapshot: &ClassificationSnapshot,
    now: DateTime<Utc>,
) -> GroupedCatalog {
    let institutions = institutions_by_course(candidates, snapshot);

    let featured: Vec<LabeledCourse> = candidates
        .iter()
        .filter(|c| snapshot.is_featured(&c.id))
        .map(|c| LabeledCourse::new(c.clone(), now))
        .collect();

    if !featured.is_empty() {
        debug!("{} featured courses, skipping category grouping", featured.len());
        return GroupedCatalog {
            groups: CourseGroups::Featured(sort_by_state_and_proximity(featured, now)),
            institutions,
        };
    }

    let mut members: HashMap<i64, Vec<LabeledCourse>> = HashMap::new();
    for course in candidates {
        let Some(classification) = snapshot.get(&course.id) else {
            continue;
        };
        if classification.category_ids.is_empty() {
            continue;
        }
        let labeled = LabeledCourse::new(course.clone(), now);
        for category_id in &classification.category_ids {
            members
                .entry(*category_id)
                .or_default()
                .push(labeled.clone());
        }
    }

    let mut categories = snapshot.categories.clone();
    categories.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));

    let groups = categories
        .into_iter()
        .map(|category| {
            let courses = members.remove(&category.id).unwrap_or_default();
            CategoryGroup {
                courses: sort_by_state_and_proximity(courses, now),
                category,
            }
        })
        .collect();

    GroupedCatalog {
        groups: CourseGroups::Categories(groups),
        institutions,
    }
}
