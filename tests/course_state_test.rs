mod common;

use chrono::{DateTime, TimeDelta, Utc};

use common::utc;
use course_classification::error::AppError;
use course_classification::models::{CourseState, CourseTiming};
use course_classification::services::classify;

fn timing(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> CourseTiming {
    CourseTiming {
        start: Some(start),
        end,
        ..Default::default()
    }
}

/// Offsets around `now`, in hours, used to build the exhaustive grids.
const OFFSETS: [i64; 7] = [-720, -24, -1, 0, 1, 24, 720];

fn shifted(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now + TimeDelta::hours(hours)
}

fn optional_points(now: DateTime<Utc>) -> Vec<Option<DateTime<Utc>>> {
    std::iter::once(None)
        .chain(OFFSETS.iter().map(|h| Some(shifted(now, *h))))
        .collect()
}

/// Every combination of the four dates and the invitation flag.
fn lattice(now: DateTime<Utc>) -> Vec<CourseTiming> {
    let mut out = Vec::new();
    for start in OFFSETS.iter().map(|h| shifted(now, *h)) {
        for end in optional_points(now) {
            for enrollment_start in optional_points(now) {
                for enrollment_end in optional_points(now) {
                    for invitation_only in [false, true] {
                        out.push(CourseTiming {
                            start: Some(start),
                            end,
                            enrollment_start,
                            enrollment_end,
                            invitation_only,
                        });
                    }
                }
            }
        }
    }
    out
}

#[test]
fn test_started_course_with_default_window_is_ongoing_enrollable() {
    let now = utc(2023, 3, 15);
    let state = classify("c1", &timing(utc(2023, 3, 1), Some(utc(2023, 6, 1))), now).unwrap();
    assert_eq!(state, CourseState::OngoingEnrollable);
}

#[test]
fn test_future_course_with_open_enrollment_is_upcoming_enrollable() {
    let now = utc(2023, 3, 15);
    let t = CourseTiming {
        enrollment_start: Some(utc(2023, 3, 1)),
        ..timing(utc(2023, 4, 1), None)
    };
    assert_eq!(classify("c1", &t, now).unwrap(), CourseState::UpcomingEnrollable);
}

#[test]
fn test_future_course_defaults_enrollment_to_its_start() {
    let now = utc(2023, 3, 15);
    let state = classify("c1", &timing(utc(2023, 5, 1), None), now).unwrap();
    assert_eq!(state, CourseState::UpcomingNotenrollable);
}

#[test]
fn test_closed_enrollment_on_running_course_is_ongoing_notenrollable() {
    let now = utc(2023, 3, 15);
    let t = CourseTiming {
        enrollment_end: Some(utc(2023, 3, 10)),
        ..timing(utc(2023, 3, 1), Some(utc(2023, 6, 1)))
    };
    assert_eq!(classify("c1", &t, now).unwrap(), CourseState::OngoingNotenrollable);
}

#[test]
fn test_ended_course_is_completed() {
    let now = utc(2023, 3, 15);
    let state = classify("c1", &timing(utc(2023, 1, 1), Some(utc(2023, 2, 1))), now).unwrap();
    assert_eq!(state, CourseState::Completed);
}

#[test]
fn test_boundaries_are_half_open() {
    let now = utc(2023, 3, 15);

    // start == now counts as started
    let state = classify("c1", &timing(now, None), now).unwrap();
    assert_eq!(state, CourseState::OngoingEnrollable);

    // enrollment_end == now counts as closed
    let t = CourseTiming {
        enrollment_end: Some(now),
        ..timing(utc(2023, 3, 1), Some(utc(2023, 6, 1)))
    };
    assert_eq!(classify("c1", &t, now).unwrap(), CourseState::OngoingNotenrollable);

    // end == now counts as ended
    let state = classify("c1", &timing(utc(2023, 3, 1), Some(now)), now).unwrap();
    assert_eq!(state, CourseState::Completed);
}

#[test]
fn test_missing_start_is_an_error() {
    let t = CourseTiming::default();
    let err = classify("course-v1:x", &t, utc(2023, 3, 15)).unwrap_err();
    assert!(matches!(err, AppError::MissingStartDate(id) if id == "course-v1:x"));
}

#[test]
fn test_open_window_on_running_course_is_always_ongoing_enrollable() {
    let now = utc(2023, 3, 15);
    for t in lattice(now) {
        let start = t.start.unwrap();
        let enrollment_start = t.enrollment_start.unwrap_or(start);
        let enrollment_end = t.enrollment_end.or(t.end);
        let window_open =
            enrollment_start <= now && enrollment_end.is_none_or(|end| now < end);
        let running = start <= now && t.end.is_none_or(|end| end > now);

        if !t.invitation_only && window_open && running {
            assert_eq!(classify("c", &t, now).unwrap(), CourseState::OngoingEnrollable, "{t:?}");
        }
    }
}

#[test]
fn test_invitation_only_is_never_enrollable() {
    let now = utc(2023, 3, 15);
    for t in lattice(now).into_iter().filter(|t| t.invitation_only) {
        let state = classify("c", &t, now).unwrap();
        assert!(
            matches!(
                state,
                CourseState::UpcomingNotenrollable | CourseState::OngoingNotenrollable
            ),
            "{t:?} -> {state:?}"
        );
        assert!(!state.is_enrollable());
    }
}

#[test]
fn test_classification_is_idempotent() {
    let now = utc(2023, 3, 15);
    for t in lattice(now) {
        assert_eq!(classify("c", &t, now).unwrap(), classify("c", &t, now).unwrap());
    }
}

/// Searches the whole grid for an input that reaches the `other` fallback.
/// With a start date present rules 1 to 7 cover every case, so none exists.
#[test]
fn test_other_is_unreachable_with_a_start_date() {
    let now = utc(2023, 3, 15);
    let reached: Vec<_> = lattice(now)
        .into_iter()
        .filter(|t| classify("c", t, now).unwrap() == CourseState::Other)
        .collect();
    assert!(reached.is_empty(), "reached other with {reached:?}");
}

#[test]
fn test_state_labels_round_trip_through_their_names() {
    for state in CourseState::ALL {
        assert_eq!(CourseState::parse(state.as_str()), Some(state));
        assert_eq!(
            serde_json::to_value(state).unwrap(),
            serde_json::Value::String(state.as_str().to_string())
        );
    }
    assert_eq!(CourseState::parse("archived"), None);
}
