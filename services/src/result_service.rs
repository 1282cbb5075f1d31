use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use validator::Validate;

use crate::auth::AuthUser;
use crate::deadline_service;
use crate::service::{ServiceError, ServiceResult};
use common::format_validation_errors;
use db::grade::Grade;
use db::models::student_result::{ActiveModel, Column, Entity, Model};

pub use db::models::student_result::Model as StudentResult;

#[derive(Debug, Clone, Validate)]
pub struct SubmitResult {
    pub student_id: i64,
    pub session_id: i64,
    pub exam_type_id: i64,
    pub subject_id: i64,
    pub class_id: i64,
    pub section_id: i64,
    #[validate(range(min = 1, message = "total_marks must be at least 1"))]
    pub total_marks: i32,
    #[validate(range(min = 0, message = "obtained_marks cannot be negative"))]
    pub obtained_marks: i32,
    pub is_absent: bool,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Validate)]
pub struct BulkResultEntry {
    pub student_id: i64,
    #[validate(range(min = 0, message = "obtained_marks cannot be negative"))]
    pub obtained_marks: i32,
    pub is_absent: bool,
    pub remarks: Option<String>,
}

/// One shared marking context plus per-student entries.
#[derive(Debug, Clone, Validate)]
pub struct BulkSubmitResults {
    pub session_id: i64,
    pub exam_type_id: i64,
    pub subject_id: i64,
    pub class_id: i64,
    pub section_id: i64,
    #[validate(range(min = 1, message = "total_marks must be at least 1"))]
    pub total_marks: i32,
    #[validate(nested)]
    pub entries: Vec<BulkResultEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct BulkSubmitOutcome {
    pub upserted: usize,
    /// Student ids whose existing rows were locked and left untouched.
    pub skipped_locked: Vec<i64>,
}

/// Any subset of scope columns; unset fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFilter {
    pub session_id: Option<i64>,
    pub exam_type_id: Option<i64>,
    pub class_id: Option<i64>,
    pub section_id: Option<i64>,
    pub subject_id: Option<i64>,
}

/// Submit or resubmit one result.
///
/// Gated on an open window for the (session, exam type, class, subject)
/// scope. The write is a single conditional upsert on the natural key,
/// so concurrent submissions for the same key cannot race a separate
/// read-then-write, and a locked row refuses the update outright.
pub async fn submit_single(
    db: &DatabaseConnection,
    actor: &AuthUser,
    params: SubmitResult,
) -> ServiceResult<Model> {
    params
        .validate()
        .map_err(|e| ServiceError::Validation(format_validation_errors(&e)))?;

    let now = Utc::now();
    deadline_service::require_open_window(
        db,
        params.session_id,
        params.exam_type_id,
        params.class_id,
        Some(params.subject_id),
        now,
    )
    .await?;

    let grade = if params.is_absent {
        Grade::Absent
    } else {
        Grade::from_marks(params.obtained_marks, params.total_marks)?
    };

    let row = ActiveModel {
        student_id: Set(params.student_id),
        session_id: Set(params.session_id),
        exam_type_id: Set(params.exam_type_id),
        subject_id: Set(params.subject_id),
        class_id: Set(params.class_id),
        section_id: Set(params.section_id),
        total_marks: Set(params.total_marks),
        obtained_marks: Set(params.obtained_marks),
        grade: Set(grade),
        remarks: Set(params.remarks.clone()),
        is_absent: Set(params.is_absent),
        is_locked: Set(false),
        submitted_by: Set(actor.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    // upsert and read-back share one transaction so the returned snapshot
    // is exactly this call's write, not a later concurrent one
    let txn = db.begin().await?;

    let affected = Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                Column::StudentId,
                Column::SessionId,
                Column::ExamTypeId,
                Column::SubjectId,
            ])
            .update_columns([
                Column::ClassId,
                Column::SectionId,
                Column::TotalMarks,
                Column::ObtainedMarks,
                Column::Grade,
                Column::Remarks,
                Column::IsAbsent,
                Column::SubmittedBy,
                Column::UpdatedAt,
            ])
            .action_and_where(Expr::col(Column::IsLocked).eq(false))
            .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    if affected == 0 {
        // conflict row exists but the lock condition filtered the update
        return Err(ServiceError::ResultLocked {
            student_id: params.student_id,
        });
    }

    let model = Entity::find()
        .filter(Column::StudentId.eq(params.student_id))
        .filter(Column::SessionId.eq(params.session_id))
        .filter(Column::ExamTypeId.eq(params.exam_type_id))
        .filter(Column::SubjectId.eq(params.subject_id))
        .one(&txn)
        .await?
        .ok_or_else(|| sea_orm::DbErr::RecordNotFound("Upserted result row disappeared".into()))?;

    txn.commit().await?;

    log::info!(
        "result submitted for student {} (session {}, exam type {}, subject {}) by actor {}",
        params.student_id,
        params.session_id,
        params.exam_type_id,
        params.subject_id,
        actor.id
    );

    Ok(model)
}

/// Submit one section's marks for a subject in a single batch.
///
/// The window is checked once for the whole batch; a closed window fails
/// everything with no partial application. Rows whose current state is
/// locked are skipped and reported back rather than silently overwritten,
/// unlike the overwrite-everything behavior a bare upsert would give.
/// The remaining entries go through one batch upsert in one transaction.
pub async fn submit_bulk(
    db: &DatabaseConnection,
    actor: &AuthUser,
    params: BulkSubmitResults,
) -> ServiceResult<BulkSubmitOutcome> {
    params
        .validate()
        .map_err(|e| ServiceError::Validation(format_validation_errors(&e)))?;

    let now = Utc::now();
    deadline_service::require_open_window(
        db,
        params.session_id,
        params.exam_type_id,
        params.class_id,
        Some(params.subject_id),
        now,
    )
    .await?;

    if params.entries.is_empty() {
        return Ok(BulkSubmitOutcome::default());
    }

    let student_ids: Vec<i64> = params.entries.iter().map(|e| e.student_id).collect();

    let txn = db.begin().await?;

    let mut skipped_locked: Vec<i64> = Entity::find()
        .filter(Column::SessionId.eq(params.session_id))
        .filter(Column::ExamTypeId.eq(params.exam_type_id))
        .filter(Column::SubjectId.eq(params.subject_id))
        .filter(Column::StudentId.is_in(student_ids))
        .filter(Column::IsLocked.eq(true))
        .all(&txn)
        .await?
        .into_iter()
        .map(|r| r.student_id)
        .collect();
    skipped_locked.sort_unstable();

    let mut rows = Vec::with_capacity(params.entries.len());
    for entry in &params.entries {
        if skipped_locked.contains(&entry.student_id) {
            continue;
        }
        let grade = if entry.is_absent {
            Grade::Absent
        } else {
            Grade::from_marks(entry.obtained_marks, params.total_marks)?
        };
        rows.push(ActiveModel {
            student_id: Set(entry.student_id),
            session_id: Set(params.session_id),
            exam_type_id: Set(params.exam_type_id),
            subject_id: Set(params.subject_id),
            class_id: Set(params.class_id),
            section_id: Set(params.section_id),
            total_marks: Set(params.total_marks),
            obtained_marks: Set(entry.obtained_marks),
            grade: Set(grade),
            remarks: Set(entry.remarks.clone()),
            is_absent: Set(entry.is_absent),
            is_locked: Set(false),
            submitted_by: Set(actor.id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        });
    }

    let upserted = rows.len();
    if !rows.is_empty() {
        Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([
                    Column::StudentId,
                    Column::SessionId,
                    Column::ExamTypeId,
                    Column::SubjectId,
                ])
                .update_columns([
                    Column::ClassId,
                    Column::SectionId,
                    Column::TotalMarks,
                    Column::ObtainedMarks,
                    Column::Grade,
                    Column::Remarks,
                    Column::IsAbsent,
                    Column::SubmittedBy,
                    Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    log::info!(
        "bulk result submission for section {} subject {}: {} upserted, {} locked rows skipped",
        params.section_id,
        params.subject_id,
        upserted,
        skipped_locked.len()
    );

    Ok(BulkSubmitOutcome {
        upserted,
        skipped_locked,
    })
}

/// Lock or unlock every result row in the given scope.
///
/// An administrative override: no window check applies, and rows can
/// cycle between locked and unlocked indefinitely. Returns the number
/// of rows touched.
pub async fn set_locked(
    db: &DatabaseConnection,
    session_id: i64,
    exam_type_id: i64,
    class_id: Option<i64>,
    subject_id: Option<i64>,
    locked: bool,
) -> ServiceResult<u64> {
    let mut update = Entity::update_many()
        .col_expr(Column::IsLocked, Expr::value(locked))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::SessionId.eq(session_id))
        .filter(Column::ExamTypeId.eq(exam_type_id));

    if let Some(class_id) = class_id {
        update = update.filter(Column::ClassId.eq(class_id));
    }
    if let Some(subject_id) = subject_id {
        update = update.filter(Column::SubjectId.eq(subject_id));
    }

    let result = update.exec(db).await?;

    log::info!(
        "{} {} result rows for session {} exam type {} (class {:?}, subject {:?})",
        if locked { "locked" } else { "unlocked" },
        result.rows_affected,
        session_id,
        exam_type_id,
        class_id,
        subject_id
    );

    Ok(result.rows_affected)
}

/// Results matching the filter, most recently updated first.
pub async fn list_results(
    db: &DatabaseConnection,
    filter: ResultFilter,
) -> ServiceResult<Vec<Model>> {
    let mut query = Entity::find();

    if let Some(session_id) = filter.session_id {
        query = query.filter(Column::SessionId.eq(session_id));
    }
    if let Some(exam_type_id) = filter.exam_type_id {
        query = query.filter(Column::ExamTypeId.eq(exam_type_id));
    }
    if let Some(class_id) = filter.class_id {
        query = query.filter(Column::ClassId.eq(class_id));
    }
    if let Some(section_id) = filter.section_id {
        query = query.filter(Column::SectionId.eq(section_id));
    }
    if let Some(subject_id) = filter.subject_id {
        query = query.filter(Column::SubjectId.eq(subject_id));
    }

    Ok(query
        .order_by_desc(Column::UpdatedAt)
        .order_by_desc(Column::Id)
        .all(db)
        .await?)
}

/// All of one student's results, optionally narrowed to a session.
pub async fn results_for_student(
    db: &DatabaseConnection,
    student_id: i64,
    session_id: Option<i64>,
) -> ServiceResult<Vec<Model>> {
    let mut query = Entity::find().filter(Column::StudentId.eq(student_id));
    if let Some(session_id) = session_id {
        query = query.filter(Column::SessionId.eq(session_id));
    }

    Ok(query
        .order_by_desc(Column::UpdatedAt)
        .order_by_desc(Column::Id)
        .all(db)
        .await?)
}

pub async fn find_by_natural_key(
    db: &DatabaseConnection,
    student_id: i64,
    session_id: i64,
    exam_type_id: i64,
    subject_id: i64,
) -> ServiceResult<Option<Model>> {
    Ok(Entity::find()
        .filter(Column::StudentId.eq(student_id))
        .filter(Column::SessionId.eq(session_id))
        .filter(Column::ExamTypeId.eq(exam_type_id))
        .filter(Column::SubjectId.eq(subject_id))
        .one(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::deadline_service::{create_deadline, CreateResultDeadline};
    use chrono::Duration;
    use db::test_utils::setup_test_db;
    use sea_orm::PaginatorTrait;

    const SESSION: i64 = 1;
    const MIDTERM: i64 = 2;
    const MATHS: i64 = 3;
    const CLASS_A: i64 = 4;
    const CLASS_B: i64 = 40;
    const SECTION: i64 = 5;

    fn teacher() -> AuthUser {
        AuthUser {
            id: 7,
            role: Role::Teacher,
        }
    }

    fn admin() -> AuthUser {
        AuthUser {
            id: 1,
            role: Role::Admin,
        }
    }

    async fn open_general_window(db: &DatabaseConnection) {
        let now = Utc::now();
        create_deadline(
            db,
            &admin(),
            CreateResultDeadline {
                session_id: SESSION,
                exam_type_id: MIDTERM,
                class_id: None,
                subject_id: None,
                start_date: now - Duration::hours(1),
                end_date: now + Duration::hours(1),
                is_open: true,
            },
        )
        .await
        .unwrap();
    }

    fn submission(student_id: i64, obtained: i32) -> SubmitResult {
        SubmitResult {
            student_id,
            session_id: SESSION,
            exam_type_id: MIDTERM,
            subject_id: MATHS,
            class_id: CLASS_A,
            section_id: SECTION,
            total_marks: 100,
            obtained_marks: obtained,
            is_absent: false,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn closed_window_refuses_and_writes_nothing() {
        let db = setup_test_db().await;

        let err = submit_single(&db, &teacher(), submission(100, 80))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DeadlineClosed));
        assert_eq!(Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn resubmission_updates_in_place() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        let first = submit_single(&db, &teacher(), submission(100, 55))
            .await
            .unwrap();
        assert_eq!(first.grade, Grade::D);

        let second = submit_single(&db, &teacher(), submission(100, 85))
            .await
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.obtained_marks, 85);
        assert_eq!(second.grade, Grade::A);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn returned_snapshot_matches_the_submitted_values() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        let mut params = submission(100, 64);
        params.remarks = Some("steady improvement".into());
        let returned = submit_single(&db, &teacher(), params).await.unwrap();
        assert_eq!(returned.obtained_marks, 64);
        assert_eq!(returned.grade, Grade::C);
        assert_eq!(returned.remarks.as_deref(), Some("steady improvement"));
        assert_eq!(returned.submitted_by, teacher().id);

        let stored = find_by_natural_key(&db, 100, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, returned);
    }

    #[tokio::test]
    async fn locked_row_refuses_single_submit() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        let original = submit_single(&db, &teacher(), submission(100, 70))
            .await
            .unwrap();
        set_locked(&db, SESSION, MIDTERM, None, None, true)
            .await
            .unwrap();

        let err = submit_single(&db, &teacher(), submission(100, 95))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::ResultLocked { student_id: 100 }
        ));

        let row = find_by_natural_key(&db, 100, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.obtained_marks, original.obtained_marks);
        assert_eq!(row.grade, original.grade);
    }

    #[tokio::test]
    async fn unlock_reopens_the_row() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        submit_single(&db, &teacher(), submission(100, 70))
            .await
            .unwrap();
        set_locked(&db, SESSION, MIDTERM, None, None, true)
            .await
            .unwrap();
        set_locked(&db, SESSION, MIDTERM, None, None, false)
            .await
            .unwrap();

        let updated = submit_single(&db, &teacher(), submission(100, 95))
            .await
            .unwrap();
        assert_eq!(updated.obtained_marks, 95);
    }

    #[tokio::test]
    async fn absent_submission_stores_sentinel_grade() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        let mut params = submission(100, 42);
        params.is_absent = true;
        let row = submit_single(&db, &teacher(), params).await.unwrap();
        assert_eq!(row.grade, Grade::Absent);
        assert_eq!(row.counted_marks(), 0);
    }

    #[tokio::test]
    async fn validation_rejects_zero_total() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        let mut params = submission(100, 0);
        params.total_marks = 0;
        let err = submit_single(&db, &teacher(), params).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    fn bulk(entries: Vec<BulkResultEntry>) -> BulkSubmitResults {
        BulkSubmitResults {
            session_id: SESSION,
            exam_type_id: MIDTERM,
            subject_id: MATHS,
            class_id: CLASS_A,
            section_id: SECTION,
            total_marks: 100,
            entries,
        }
    }

    fn entry(student_id: i64, obtained: i32) -> BulkResultEntry {
        BulkResultEntry {
            student_id,
            obtained_marks: obtained,
            is_absent: false,
            remarks: None,
        }
    }

    #[tokio::test]
    async fn bulk_fails_whole_batch_when_window_closed() {
        let db = setup_test_db().await;

        let err = submit_bulk(&db, &teacher(), bulk(vec![entry(1, 50), entry(2, 60)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DeadlineClosed));
        assert_eq!(Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn bulk_upsert_twice_keeps_one_row_per_key() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        let first = submit_bulk(&db, &teacher(), bulk(vec![entry(1, 50), entry(2, 60)]))
            .await
            .unwrap();
        assert_eq!(first.upserted, 2);

        let second = submit_bulk(&db, &teacher(), bulk(vec![entry(1, 91), entry(2, 72)]))
            .await
            .unwrap();
        assert_eq!(second.upserted, 2);

        assert_eq!(Entity::find().count(&db).await.unwrap(), 2);
        let row = find_by_natural_key(&db, 1, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.obtained_marks, 91);
        assert_eq!(row.grade, Grade::APlus);
    }

    #[tokio::test]
    async fn bulk_skips_locked_rows_and_reports_them() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        submit_bulk(&db, &teacher(), bulk(vec![entry(1, 50), entry(2, 60)]))
            .await
            .unwrap();
        set_locked(&db, SESSION, MIDTERM, None, None, true)
            .await
            .unwrap();

        let outcome = submit_bulk(
            &db,
            &teacher(),
            bulk(vec![entry(1, 99), entry(2, 99), entry(3, 99)]),
        )
        .await
        .unwrap();
        assert_eq!(outcome.upserted, 1);
        assert_eq!(outcome.skipped_locked, vec![1, 2]);

        let locked = find_by_natural_key(&db, 1, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locked.obtained_marks, 50);

        let inserted = find_by_natural_key(&db, 3, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inserted.obtained_marks, 99);
        assert!(!inserted.is_locked);
    }

    #[tokio::test]
    async fn bulk_absent_entries_get_sentinel_grade() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        let mut absent = entry(1, 0);
        absent.is_absent = true;
        submit_bulk(&db, &teacher(), bulk(vec![absent])).await.unwrap();

        let row = find_by_natural_key(&db, 1, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.grade, Grade::Absent);
    }

    #[tokio::test]
    async fn lock_with_class_filter_leaves_other_classes_alone() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        submit_single(&db, &teacher(), submission(100, 70))
            .await
            .unwrap();
        let mut other_class = submission(200, 80);
        other_class.class_id = CLASS_B;
        submit_single(&db, &teacher(), other_class).await.unwrap();

        let affected = set_locked(&db, SESSION, MIDTERM, Some(CLASS_A), None, true)
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let locked = find_by_natural_key(&db, 100, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        let untouched = find_by_natural_key(&db, 200, SESSION, MIDTERM, MATHS)
            .await
            .unwrap()
            .unwrap();
        assert!(locked.is_locked);
        assert!(!untouched.is_locked);
    }

    #[tokio::test]
    async fn list_results_filters_by_scope() {
        let db = setup_test_db().await;
        open_general_window(&db).await;

        submit_single(&db, &teacher(), submission(100, 70))
            .await
            .unwrap();
        let mut other_class = submission(200, 80);
        other_class.class_id = CLASS_B;
        submit_single(&db, &teacher(), other_class).await.unwrap();

        let all = list_results(
            &db,
            ResultFilter {
                session_id: Some(SESSION),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(all.len(), 2);

        let class_a = list_results(
            &db,
            ResultFilter {
                session_id: Some(SESSION),
                class_id: Some(CLASS_A),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(class_a.len(), 1);
        assert_eq!(class_a[0].student_id, 100);
    }
}
