pub mod catalog;
pub mod course_state;
pub mod discovery;
pub mod enrichment;
pub mod grouping;
pub mod institution;

pub use catalog::{CatalogService, FeaturedCourses, InstitutionLogo, InstitutionOption};
pub use course_state::{FAR_FUTURE, classify};
pub use discovery::{
    CatalogFilter, DiscoveryRequest, DiscoveryResults, DiscoveryService, Pagination, StateFilter,
};
pub use enrichment::{CatalogMissPolicy, EnrichOptions, enrich_hit, enrich_hits, time_left};
pub use grouping::{
    CategoryGroup, CourseGroups, GroupedCatalog, LabeledCourse, group_courses,
    institutions_by_course, sort_by_state_and_proximity,
};
pub use institution::{InstitutionPage, InstitutionPageService, normalize_language};
