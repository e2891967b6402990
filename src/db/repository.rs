use std::collections::{HashMap, HashSet};

use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::AppError;
use crate::models::classification::{CategoryRow, MainClassificationRow};
use crate::models::course::CatalogCourseRow;
use crate::models::{
    CatalogCourse, Category, ClassificationSnapshot, CourseClassification, MainClassification,
    MainClassificationTemplate, NewCategoryRequest, NewCourseClassificationRequest,
    NewMainClassificationRequest, NewTemplateRequest,
};

/// Upper bound on ids bound into a single `IN (...)` list.
const ID_BATCH_SIZE: usize = 500;

const CATALOG_COLUMNS: &str = r#"
    id, start_date, end_date, enrollment_start, enrollment_end, invitation_only,
    catalog_visibility, short_description, advertised_start, display_org_with_default,
    effort, self_paced, price
"#;

const MAIN_CLASSIFICATION_COLUMNS: &str =
    "id, name, banner, logo, sequence, is_active, visibility";

fn push_id_list<'a>(qb: &mut QueryBuilder<'a, Sqlite>, ids: &'a [String]) {
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
}

// ---------------------------------------------------------------------------
// Course catalog
// ---------------------------------------------------------------------------

pub async fn upsert_catalog_course(db: &SqlitePool, course: &CatalogCourse) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO course_overviews
            (id, start_date, end_date, enrollment_start, enrollment_end, invitation_only,
            catalog_visibility, short_description, advertised_start, display_org_with_default,
            effort, self_paced, price)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(id) DO UPDATE SET
            start_date = excluded.start_date,
            end_date = excluded.end_date,
            enrollment_start = excluded.enrollment_start,
            enrollment_end = excluded.enrollment_end,
            invitation_only = excluded.invitation_only,
            catalog_visibility = excluded.catalog_visibility,
            short_description = excluded.short_description,
            advertised_start = excluded.advertised_start,
            display_org_with_default = excluded.display_org_with_default,
            effort = excluded.effort,
            self_paced = excluded.self_paced,
            price = excluded.price
        "#,
    )
    .bind(&course.id)
    .bind(course.start.map(|t| t.to_rfc3339()))
    .bind(course.end.map(|t| t.to_rfc3339()))
    .bind(course.enrollment_start.map(|t| t.to_rfc3339()))
    .bind(course.enrollment_end.map(|t| t.to_rfc3339()))
    .bind(course.invitation_only)
    .bind(course.catalog_visibility.as_str())
    .bind(&course.short_description)
    .bind(&course.advertised_start)
    .bind(&course.display_org_with_default)
    .bind(&course.effort)
    .bind(course.self_paced)
    .bind(course.price)
    .execute(db)
    .await?;

    Ok(())
}

fn into_courses(rows: Vec<CatalogCourseRow>) -> Result<Vec<CatalogCourse>, AppError> {
    rows.into_iter().map(CatalogCourse::try_from).collect()
}

pub async fn fetch_catalog_courses(db: &SqlitePool) -> Result<Vec<CatalogCourse>, AppError> {
    let sql = format!("SELECT {} FROM course_overviews ORDER BY id", CATALOG_COLUMNS);
    let rows = sqlx::query_as::<_, CatalogCourseRow>(&sql)
        .fetch_all(db)
        .await?;
    into_courses(rows)
}

/// Courses whose catalog visibility allows them to be listed.
pub async fn fetch_listed_courses(db: &SqlitePool) -> Result<Vec<CatalogCourse>, AppError> {
    let sql = format!(
        "SELECT {} FROM course_overviews WHERE catalog_visibility = 'both' ORDER BY id",
        CATALOG_COLUMNS
    );
    let rows = sqlx::query_as::<_, CatalogCourseRow>(&sql)
        .fetch_all(db)
        .await?;
    into_courses(rows)
}

/// Catalog rows for `ids`, keyed by course id. Unknown ids are simply absent.
pub async fn fetch_catalog_courses_by_ids(
    db: &SqlitePool,
    ids: &[String],
) -> Result<HashMap<String, CatalogCourse>, AppError> {
    let mut courses = HashMap::with_capacity(ids.len());

    for chunk in ids.chunks(ID_BATCH_SIZE) {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM course_overviews WHERE id IN (",
            CATALOG_COLUMNS
        ));
        push_id_list(&mut qb, chunk);
        let rows = qb.build_query_as::<CatalogCourseRow>().fetch_all(db).await?;
        for course in into_courses(rows)? {
            courses.insert(course.id.clone(), course);
        }
    }

    Ok(courses)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub async fn insert_category(
    db: &SqlitePool,
    req: NewCategoryRequest,
) -> Result<Category, AppError> {
    let id = sqlx::query("INSERT INTO course_categories (name, sequence, show_opt) VALUES (?1, ?2, ?3)")
        .bind(&req.name)
        .bind(req.sequence)
        .bind(req.show_opt.code())
        .execute(db)
        .await?
        .last_insert_rowid();

    Ok(Category {
        id,
        name: req.name,
        sequence: req.sequence,
        show_opt: req.show_opt,
    })
}

pub async fn delete_category(db: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM course_categories WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_categories(db: &SqlitePool) -> Result<Vec<Category>, AppError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, sequence, show_opt FROM course_categories ORDER BY sequence, name",
    )
    .fetch_all(db)
    .await?;
    rows.into_iter().map(Category::try_from).collect()
}

// ---------------------------------------------------------------------------
// Institutions and their page templates
// ---------------------------------------------------------------------------

pub async fn insert_main_classification(
    db: &SqlitePool,
    req: NewMainClassificationRequest,
) -> Result<MainClassification, AppError> {
    let id = sqlx::query(
        r#"
        INSERT INTO main_classifications (name, banner, logo, sequence, is_active, visibility)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&req.name)
    .bind(&req.banner)
    .bind(&req.logo)
    .bind(req.sequence)
    .bind(req.is_active)
    .bind(req.visibility.code())
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(MainClassification {
        id,
        name: req.name,
        banner: req.banner,
        logo: req.logo,
        sequence: req.sequence,
        is_active: req.is_active,
        visibility: req.visibility,
    })
}

/// Deleting an institution also deletes its templates and the classification
/// rows pointing at it.
pub async fn delete_main_classification(db: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM main_classifications WHERE id = ?1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_main_classification(
    db: &SqlitePool,
    id: i64,
) -> Result<Option<MainClassification>, AppError> {
    let sql = format!(
        "SELECT {} FROM main_classifications WHERE id = ?1",
        MAIN_CLASSIFICATION_COLUMNS
    );
    let row = sqlx::query_as::<_, MainClassificationRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    row.map(MainClassification::try_from).transpose()
}

pub async fn fetch_active_main_classifications(
    db: &SqlitePool,
) -> Result<Vec<MainClassification>, AppError> {
    let sql = format!(
        "SELECT {} FROM main_classifications WHERE is_active = 1 ORDER BY sequence, name",
        MAIN_CLASSIFICATION_COLUMNS
    );
    let rows = sqlx::query_as::<_, MainClassificationRow>(&sql)
        .fetch_all(db)
        .await?;
    rows.into_iter().map(MainClassification::try_from).collect()
}

pub async fn insert_template(
    db: &SqlitePool,
    req: NewTemplateRequest,
) -> Result<MainClassificationTemplate, AppError> {
    let id = sqlx::query(
        r#"
        INSERT INTO main_classification_templates (main_classification_id, template, language)
        VALUES (?1, ?2, ?3)
        "#,
    )
    .bind(req.main_classification_id)
    .bind(&req.template)
    .bind(&req.language)
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(MainClassificationTemplate {
        id,
        main_classification_id: req.main_classification_id,
        template: req.template,
        language: req.language,
    })
}

pub async fn fetch_templates(
    db: &SqlitePool,
    main_classification_id: i64,
) -> Result<Vec<MainClassificationTemplate>, AppError> {
    let templates = sqlx::query_as::<_, MainClassificationTemplate>(
        r#"
        SELECT id, main_classification_id, template, language
        FROM main_classification_templates
        WHERE main_classification_id = ?1
        ORDER BY id
        "#,
    )
    .bind(main_classification_id)
    .fetch_all(db)
    .await?;
    Ok(templates)
}

/// Ids of institutions that have at least one page template.
pub async fn fetch_institutions_with_templates(db: &SqlitePool) -> Result<HashSet<i64>, AppError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT DISTINCT main_classification_id FROM main_classification_templates",
    )
    .fetch_all(db)
    .await?;
    Ok(ids.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Course classifications
// ---------------------------------------------------------------------------

/// Create or replace the classification of one course, including its category
/// links.
pub async fn upsert_course_classification(
    db: &SqlitePool,
    req: &NewCourseClassificationRequest,
) -> Result<(), AppError> {
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO course_classifications (course_id, main_class_id, is_featured_course)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(course_id) DO UPDATE SET
            main_class_id = excluded.main_class_id,
            is_featured_course = excluded.is_featured_course
        "#,
    )
    .bind(&req.course_id)
    .bind(req.main_class_id)
    .bind(req.is_featured_course)
    .execute(&mut *tx)
    .await?;

    let classification_id =
        sqlx::query_scalar::<_, i64>("SELECT id FROM course_classifications WHERE course_id = ?1")
            .bind(&req.course_id)
            .fetch_one(&mut *tx)
            .await?;

    sqlx::query("DELETE FROM course_classification_categories WHERE classification_id = ?1")
        .bind(classification_id)
        .execute(&mut *tx)
        .await?;

    for category_id in &req.category_ids {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO course_classification_categories (classification_id, category_id)
            VALUES (?1, ?2)
            "#,
        )
        .bind(classification_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

#[derive(Debug, FromRow)]
struct ClassificationJoinRow {
    course_id: String,
    is_featured_course: bool,
    main_id: Option<i64>,
    main_name: Option<String>,
    main_banner: Option<String>,
    main_logo: Option<String>,
    main_sequence: Option<i64>,
    main_is_active: Option<bool>,
    main_visibility: Option<i64>,
}

impl ClassificationJoinRow {
    fn main_class(&self) -> Result<Option<MainClassification>, AppError> {
        let Some(id) = self.main_id else {
            return Ok(None);
        };
        MainClassification::try_from(MainClassificationRow {
            id,
            name: self.main_name.clone().unwrap_or_default(),
            banner: self.main_banner.clone().unwrap_or_default(),
            logo: self.main_logo.clone().unwrap_or_default(),
            sequence: self.main_sequence.unwrap_or_default(),
            is_active: self.main_is_active.unwrap_or_default(),
            visibility: self.main_visibility.unwrap_or_default(),
        })
        .map(Some)
    }
}

/// Load everything grouping and enrichment need for `course_ids`: their
/// classification rows with institution and category links, and all categories.
///
/// The number of queries depends only on the batch count, never on how many
/// courses are classified.
pub async fn fetch_classification_snapshot(
    db: &SqlitePool,
    course_ids: &[String],
) -> Result<ClassificationSnapshot, AppError> {
    let mut by_course: HashMap<String, CourseClassification> = HashMap::new();

    for chunk in course_ids.chunks(ID_BATCH_SIZE) {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT cc.course_id, cc.is_featured_course,
                m.id AS main_id, m.name AS main_name, m.banner AS main_banner,
                m.logo AS main_logo, m.sequence AS main_sequence,
                m.is_active AS main_is_active, m.visibility AS main_visibility
            FROM course_classifications cc
            LEFT JOIN main_classifications m ON m.id = cc.main_class_id
            WHERE cc.course_id IN ("#,
        );
        push_id_list(&mut qb, chunk);
        let rows = qb
            .build_query_as::<ClassificationJoinRow>()
            .fetch_all(db)
            .await?;

        for row in rows {
            let main_class = row.main_class()?;
            by_course.insert(
                row.course_id.clone(),
                CourseClassification {
                    course_id: row.course_id,
                    main_class,
                    category_ids: Vec::new(),
                    is_featured_course: row.is_featured_course,
                },
            );
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT cc.course_id, l.category_id
            FROM course_classification_categories l
            JOIN course_classifications cc ON cc.id = l.classification_id
            WHERE cc.course_id IN ("#,
        );
        push_id_list(&mut qb, chunk);
        qb.push(" ORDER BY cc.course_id, l.category_id");
        let links = qb.build_query_as::<(String, i64)>().fetch_all(db).await?;

        for (course_id, category_id) in links {
            if let Some(classification) = by_course.get_mut(&course_id) {
                classification.category_ids.push(category_id);
            }
        }
    }

    Ok(ClassificationSnapshot {
        categories: fetch_categories(db).await?,
        by_course,
    })
}

/// Courses classified under `main_classification_id`, provided that institution
/// is active.
pub async fn fetch_course_ids_by_institution(
    db: &SqlitePool,
    main_classification_id: i64,
) -> Result<Vec<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT cc.course_id
        FROM course_classifications cc
        JOIN main_classifications m ON m.id = cc.main_class_id
        WHERE m.id = ?1 AND m.is_active = 1
        ORDER BY cc.course_id
        "#,
    )
    .bind(main_classification_id)
    .fetch_all(db)
    .await?;
    Ok(ids)
}

pub async fn fetch_featured_course_ids(db: &SqlitePool) -> Result<Vec<String>, AppError> {
    let ids = sqlx::query_scalar::<_, String>(
        "SELECT course_id FROM course_classifications WHERE is_featured_course = 1 ORDER BY course_id",
    )
    .fetch_all(db)
    .await?;
    Ok(ids)
}
