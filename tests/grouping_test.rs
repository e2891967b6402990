mod common;

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use common::{course, hidden_course, utc};
use course_classification::models::{
    CatalogCourse, Category, ClassificationSnapshot, CourseClassification, CourseState,
    InstitutionBadge, InstitutionVisibility, MainClassification, ShowOption,
};
use course_classification::services::{
    CourseGroups, LabeledCourse, classify, group_courses, sort_by_state_and_proximity,
};

fn category(id: i64, name: &str, sequence: i64) -> Category {
    Category {
        id,
        name: name.to_string(),
        sequence,
        show_opt: ShowOption::Always,
    }
}

fn institution(id: i64, name: &str) -> MainClassification {
    MainClassification {
        id,
        name: name.to_string(),
        banner: String::new(),
        logo: format!("course_classification_assets/{}/logo.png", id),
        sequence: 1,
        is_active: true,
        visibility: InstitutionVisibility::Both,
    }
}

fn classification(
    course_id: &str,
    main_class: Option<MainClassification>,
    category_ids: Vec<i64>,
    is_featured_course: bool,
) -> CourseClassification {
    CourseClassification {
        course_id: course_id.to_string(),
        main_class,
        category_ids,
        is_featured_course,
    }
}

fn snapshot(categories: Vec<Category>, rows: Vec<CourseClassification>) -> ClassificationSnapshot {
    ClassificationSnapshot {
        categories,
        by_course: rows.into_iter().map(|c| (c.course_id.clone(), c)).collect(),
    }
}

fn ids(courses: &[LabeledCourse]) -> Vec<&str> {
    courses.iter().map(|c| c.course.id.as_str()).collect()
}

#[test]
fn test_featured_course_suppresses_category_groups() {
    let now = utc(2023, 3, 15);
    let candidates = vec![
        course("c1", utc(2023, 3, 1), None),
        course("c2", utc(2023, 4, 1), None),
    ];
    let snap = snapshot(
        vec![category(1, "Math", 1), category(2, "Art", 2), category(3, "Law", 3)],
        vec![
            classification("c1", None, vec![1, 2], true),
            classification("c2", None, vec![1, 3], false),
        ],
    );

    let grouped = group_courses(&candidates, &snap, now);

    assert_eq!(grouped.groups.len(), 1);
    let CourseGroups::Featured(featured) = &grouped.groups else {
        panic!("expected featured group, got {:?}", grouped.groups);
    };
    assert_eq!(ids(featured), vec!["c1"]);
}

#[test]
fn test_categories_ordered_by_sequence_then_name_and_kept_when_empty() {
    let now = utc(2023, 3, 15);
    let candidates = vec![
        course("c1", utc(2023, 3, 1), None),
        course("c2", utc(2023, 4, 1), None),
        course("c3", utc(2023, 2, 1), None),
    ];
    let snap = snapshot(
        vec![category(1, "B", 2), category(2, "Z", 1), category(3, "A", 1)],
        vec![
            classification("c1", None, vec![1, 3], false),
            classification("c2", None, vec![3], false),
        ],
    );

    let grouped = group_courses(&candidates, &snap, now);

    let CourseGroups::Categories(groups) = &grouped.groups else {
        panic!("expected category groups");
    };
    let names: Vec<&str> = groups.iter().map(|g| g.category.name.as_str()).collect();
    assert_eq!(names, vec!["A", "Z", "B"]);

    assert_eq!(ids(&groups[0].courses), vec!["c1", "c2"]);
    assert!(groups[1].courses.is_empty());
    assert_eq!(ids(&groups[2].courses), vec!["c1"]);

    // c3 is unclassified and shows up nowhere
    assert!(groups.iter().all(|g| g.courses.iter().all(|c| c.course.id != "c3")));
}

#[test]
fn test_sort_buckets_then_proximity() {
    let now = utc(2023, 3, 15);
    let courses = vec![
        course("completed-far", utc(2022, 1, 1), Some(utc(2022, 6, 1))),
        course("upcoming-far", utc(2023, 9, 1), None),
        course("ongoing-old", utc(2023, 1, 1), None),
        course("completed-near", utc(2023, 1, 1), Some(utc(2023, 3, 1))),
        course("upcoming-near", utc(2023, 3, 20), None),
        course("ongoing-recent", utc(2023, 3, 10), None),
    ];
    let labeled = courses
        .into_iter()
        .map(|c| LabeledCourse::new(c, now))
        .collect();

    let sorted = sort_by_state_and_proximity(labeled, now);

    assert_eq!(
        ids(&sorted),
        vec![
            "ongoing-recent",
            "ongoing-old",
            "upcoming-near",
            "upcoming-far",
            "completed-near",
            "completed-far",
        ]
    );
}

#[test]
fn test_sort_is_stable_for_identical_start_and_bucket() {
    let now = utc(2023, 3, 15);
    let labeled: Vec<LabeledCourse> = ["b", "a", "c"]
        .into_iter()
        .map(|id| LabeledCourse::new(course(id, utc(2023, 3, 1), None), now))
        .collect();

    let sorted = sort_by_state_and_proximity(labeled, now);
    assert_eq!(ids(&sorted), vec!["b", "a", "c"]);
}

#[test]
fn test_course_without_start_lands_in_other_last() {
    let now = utc(2023, 3, 15);
    let mut undated = course("undated", utc(2023, 3, 1), None);
    undated.start = None;

    let labeled = vec![
        LabeledCourse::new(undated, now),
        LabeledCourse::new(course("c1", utc(2022, 1, 1), Some(utc(2022, 2, 1))), now),
    ];
    assert_eq!(labeled[0].course_state, CourseState::Other);

    let sorted = sort_by_state_and_proximity(labeled, now);
    assert_eq!(ids(&sorted), vec!["c1", "undated"]);
}

#[test]
fn test_show_options_drive_group_display() {
    let now = utc(2023, 3, 15);
    let mut hidden = category(1, "Hidden", 1);
    hidden.show_opt = ShowOption::NoShow;
    let mut only_with_course = category(2, "Sometimes", 2);
    only_with_course.show_opt = ShowOption::OnlyWithCourse;
    let always = category(3, "Always", 3);

    let snap = snapshot(vec![hidden, only_with_course, always], vec![]);
    let grouped = group_courses(&[course("c1", utc(2023, 3, 1), None)], &snap, now);

    let CourseGroups::Categories(groups) = &grouped.groups else {
        panic!("expected category groups");
    };
    let displayed: Vec<bool> = groups.iter().map(|g| g.is_displayed()).collect();
    assert_eq!(displayed, vec![false, false, true]);
}

#[test]
fn test_scenario_unconfigured_catalog_groups_to_nothing() {
    let now = utc(2023, 3, 15);
    let catalog = vec![
        course("c1", utc(2023, 2, 1), None),
        course("c2", utc(2023, 3, 1), None),
        hidden_course("c3", utc(2023, 5, 1)),
    ];
    let candidates: Vec<CatalogCourse> = catalog.into_iter().filter(|c| c.is_listed()).collect();
    let snap = ClassificationSnapshot::default();

    let grouped = group_courses(&candidates, &snap, now);

    assert!(grouped.groups.is_empty());
    assert!(grouped.institutions.is_empty());
    for c in &candidates {
        assert_eq!(
            classify(&c.id, &c.timing(), now).unwrap(),
            CourseState::OngoingEnrollable
        );
    }
}

#[test]
fn test_scenario_featured_course_with_institution() {
    let now = utc(2023, 3, 15);
    let candidates = vec![
        course("course1", utc(2023, 3, 1), None),
        course("course2", utc(2023, 3, 1), None),
    ];
    let snap = snapshot(
        vec![category(1, "Math", 1)],
        vec![
            classification("course1", Some(institution(1, "MCC1")), vec![], true),
            classification("course2", None, vec![1], false),
        ],
    );

    let grouped = group_courses(&candidates, &snap, now);

    let json = serde_json::to_value(&grouped.groups).unwrap();
    let featured = json["featured"].as_array().unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0]["id"], "course1");
    assert_eq!(featured[0]["course_state"], "ongoing_enrollable");

    let expected = HashMap::from([(
        "course1".to_string(),
        InstitutionBadge {
            name: "MCC1".to_string(),
            logo: "course_classification_assets/1/logo.png".to_string(),
        },
    )]);
    assert_eq!(grouped.institutions, expected);
}
