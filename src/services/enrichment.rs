//! Joins search hits with catalog and classification data for display.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::AppError;
use crate::models::{
    CatalogCourse, CatalogExtra, ClassificationSnapshot, CourseTiming, EnrichedCourse, ExtraData,
    InstitutionBadge, TimeLeft, TimeUnit,
};
use crate::search::SearchHit;
use crate::services::course_state::classify;
use crate::time::{days_until, parse_timestamp};

/// Keys set on every enriched record; indexed values under these names are
/// dropped so each appears once in the output.
const COMPUTED_KEYS: [&str; 4] = ["id", "time_left", "course_state", "extra_data"];

/// What to do with a hit whose course is not in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CatalogMissPolicy {
    /// Keep the hit with `extra_data` reduced to an empty institution.
    #[default]
    Keep,
    /// Leave the hit out of the results.
    Drop,
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub miss_policy: CatalogMissPolicy,
    /// Prefix turning stored logo paths into URLs.
    pub media_url: String,
}

impl EnrichOptions {
    pub fn new(media_url: impl Into<String>) -> Self {
        Self {
            miss_policy: CatalogMissPolicy::default(),
            media_url: media_url.into(),
        }
    }

    pub fn with_miss_policy(mut self, miss_policy: CatalogMissPolicy) -> Self {
        self.miss_policy = miss_policy;
        self
    }
}

/// Time until `start` as a single `[magnitude, unit]` label.
///
/// Days are whole days rounded down, so a course that started this morning is
/// `[-1, "d"]`. Once `days / 30` exceeds 12 the year branch has already matched,
/// so the day branch only ever sees `days <= 31`.
pub fn time_left(start: DateTime<Utc>, now: DateTime<Utc>) -> TimeLeft {
    let days = days_until(start, now);
    let years = days / 365;
    let months = days / 30;

    if years > 0 {
        TimeLeft(years, TimeUnit::Years)
    } else if (1..=12).contains(&months) {
        TimeLeft(months, TimeUnit::Months)
    } else {
        TimeLeft(days, TimeUnit::Days)
    }
}

fn timestamp_field(
    fields: &Map<String, Value>,
    key: &str,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_timestamp(key, s).map(Some),
        Some(other) => Err(AppError::UnparseableTimestamp {
            field: key.to_string(),
            value: other.to_string(),
        }),
    }
}

fn hit_timing(
    fields: &Map<String, Value>,
    catalog_row: Option<&CatalogCourse>,
) -> Result<CourseTiming, AppError> {
    let invitation_only = match catalog_row {
        Some(course) => course.invitation_only,
        None => fields
            .get("invitation_only")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };

    Ok(CourseTiming {
        start: timestamp_field(fields, "start")?,
        end: timestamp_field(fields, "end")?,
        enrollment_start: timestamp_field(fields, "enrollment_start")?,
        enrollment_end: timestamp_field(fields, "enrollment_end")?,
        invitation_only,
    })
}

fn extra_data(
    course_id: &str,
    catalog_row: Option<&CatalogCourse>,
    snapshot: &ClassificationSnapshot,
    media_url: &str,
) -> ExtraData {
    let Some(course) = catalog_row else {
        return ExtraData {
            catalog: None,
            main_classification: None,
        };
    };

    ExtraData {
        catalog: Some(CatalogExtra::from(course)),
        main_classification: snapshot.institution_of(course_id).map(|main| InstitutionBadge {
            name: main.name.clone(),
            logo: main.logo_url(media_url),
        }),
    }
}

/// Enrich one hit. Returns `Ok(None)` when the hit is dropped by the miss policy.
pub fn enrich_hit(
    hit: &SearchHit,
    catalog: &HashMap<String, CatalogCourse>,
    snapshot: &ClassificationSnapshot,
    options: &EnrichOptions,
    now: DateTime<Utc>,
) -> Result<Option<EnrichedCourse>, AppError> {
    let catalog_row = catalog.get(&hit.id);
    if catalog_row.is_none() && options.miss_policy == CatalogMissPolicy::Drop {
        debug!("dropping search hit {}: not in the catalog", hit.id);
        return Ok(None);
    }

    let mut fields = hit.data.clone();
    for key in COMPUTED_KEYS {
        fields.remove(key);
    }

    let timing = hit_timing(&fields, catalog_row)?;
    let start = timing
        .start
        .ok_or_else(|| AppError::MissingStartDate(hit.id.clone()))?;
    let course_state = classify(&hit.id, &timing, now)?;

    Ok(Some(EnrichedCourse {
        id: hit.id.clone(),
        fields,
        time_left: time_left(start, now),
        course_state,
        extra_data: extra_data(&hit.id, catalog_row, snapshot, &options.media_url),
    }))
}

/// Enrich every hit, in order. `catalog` and `snapshot` must already hold the
/// rows for all hit ids.
pub fn enrich_hits(
    hits: &[SearchHit],
    catalog: &HashMap<String, CatalogCourse>,
    snapshot: &ClassificationSnapshot,
    options: &EnrichOptions,
    now: DateTime<Utc>,
) -> Result<Vec<EnrichedCourse>, AppError> {
    let mut enriched = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Some(course) = enrich_hit(hit, catalog, snapshot, options, now)? {
            enriched.push(course);
        }
    }
    Ok(enriched)
}
