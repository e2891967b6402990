pub mod classification;
pub mod course;
pub mod enriched;

pub use classification::{
    Category, ClassificationSnapshot, CourseClassification, InstitutionVisibility,
    MainClassification, MainClassificationTemplate, NewCategoryRequest,
    NewCourseClassificationRequest, NewMainClassificationRequest, NewTemplateRequest, ShowOption,
};
pub use course::{CatalogCourse, CatalogVisibility, CourseState, CourseTiming};
pub use enriched::{CatalogExtra, EnrichedCourse, ExtraData, InstitutionBadge, TimeLeft, TimeUnit};
