//! Course lifecycle state derived from a course's dates and "now".

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::AppError;
use crate::models::{CourseState, CourseTiming};

/// Stand-in for an enrollment window that never closes.
pub const FAR_FUTURE: DateTime<Utc> = DateTime::<Utc>::MAX_UTC;

/// Classify one course.
///
/// `course_id` is only used for error reporting. Rules are checked in order and
/// the first match wins; each later rule assumes the earlier ones did not match.
pub fn classify(
    course_id: &str,
    timing: &CourseTiming,
    now: DateTime<Utc>,
) -> Result<CourseState, AppError> {
    let start = timing
        .start
        .ok_or_else(|| AppError::MissingStartDate(course_id.to_string()))?;
    let end = timing.end;
    let enrollment_start = timing.enrollment_start.unwrap_or(start);
    let enrollment_end = timing.enrollment_end.or(end).unwrap_or(FAR_FUTURE);

    let started = start <= now;
    let not_ended = end.is_none_or(|end| end > now);
    let enrollment_open = enrollment_start <= now && now < enrollment_end;
    let enrollment_closed = enrollment_start > now || enrollment_end <= now;

    if timing.invitation_only {
        return Ok(if started {
            CourseState::OngoingNotenrollable
        } else {
            CourseState::UpcomingNotenrollable
        });
    }

    let state = if enrollment_open && started && not_ended {
        CourseState::OngoingEnrollable
    } else if enrollment_open && !started {
        CourseState::UpcomingEnrollable
    } else if enrollment_closed && !started {
        CourseState::UpcomingNotenrollable
    } else if enrollment_closed && started && not_ended {
        CourseState::OngoingNotenrollable
    } else if end.is_some_and(|end| end <= now) {
        CourseState::Completed
    } else {
        // With a start date every combination is covered above; kept as a net.
        warn!(
            "course {} fell through every state rule (start={}, end={:?}, enrollment={}..{})",
            course_id, start, end, enrollment_start, enrollment_end
        );
        CourseState::Other
    };

    Ok(state)
}
