use sea_orm::{DatabaseConnection, DbErr, EntityTrait};

use crate::attendance_service::{self, AttendanceSummary};
use crate::result_service;
use crate::service::ServiceResult;
use db::grade::{rounded_percentage, Grade};
use db::models::{school_session, student, student_result, SchoolSession, Student};

/// Read-only composition of a student's standing in one session.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReportCard {
    pub student: student::Model,
    pub session: school_session::Model,
    pub results: Vec<student_result::Model>,
    pub total_obtained: i64,
    pub total_marks: i64,
    pub percentage: u32,
    /// None when the student has no marks in the session.
    pub overall_grade: Option<Grade>,
    pub attendance: Option<AttendanceSummary>,
}

/// Join student and session identity with the full result set and compute
/// report-level aggregates. Absent rows contribute zero obtained marks
/// but their totals still count toward the denominator.
pub async fn assemble(
    db: &DatabaseConnection,
    student_id: i64,
    session_id: i64,
    with_attendance: bool,
) -> ServiceResult<ReportCard> {
    let student = Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("Student {student_id} not found")))?;
    let session = SchoolSession::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("Session {session_id} not found")))?;

    let results = result_service::results_for_student(db, student_id, Some(session_id)).await?;

    let total_obtained: i64 = results.iter().map(|r| r.counted_marks() as i64).sum();
    let total_marks: i64 = results.iter().map(|r| r.total_marks as i64).sum();
    let percentage = rounded_percentage(total_obtained as f64, total_marks as f64);

    let overall_grade = if total_marks > 0 {
        Some(Grade::from_marks(total_obtained as i32, total_marks as i32)?)
    } else {
        None
    };

    let attendance = if with_attendance {
        let summary = attendance_service::summary_for_student(
            db,
            student_id,
            Some(session.start_date),
            Some(session.end_date),
        )
        .await?;
        Some(summary)
    } else {
        None
    };

    Ok(ReportCard {
        student,
        session,
        results,
        total_obtained,
        total_marks,
        percentage,
        overall_grade,
        attendance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance_service::{mark_section, MarkAttendanceEntry};
    use crate::auth::{AuthUser, Role};
    use crate::service::ServiceError;
    use chrono::{NaiveDate, Utc};
    use db::models::attendance_record::{AttendanceStatus, AttendanceType};
    use db::test_utils::setup_test_db;
    use sea_orm::{ActiveModelTrait, Set};

    const SESSION: i64 = 1;
    const MIDTERM: i64 = 2;
    const CLASS_A: i64 = 4;
    const SECTION: i64 = 5;

    fn teacher() -> AuthUser {
        AuthUser {
            id: 7,
            role: Role::Teacher,
        }
    }

    async fn seed_student(db: &DatabaseConnection, id: i64) {
        let now = Utc::now();
        student::ActiveModel {
            id: Set(id),
            first_name: Set("Asha".into()),
            last_name: Set("Patel".into()),
            admission_no: Set(format!("ADM-{id:04}")),
            class_id: Set(CLASS_A),
            section_id: Set(SECTION),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn seed_session(db: &DatabaseConnection) {
        let now = Utc::now();
        school_session::ActiveModel {
            id: Set(SESSION),
            name: Set("2025-2026".into()),
            start_date: Set(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()),
            end_date: Set(NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()),
            is_current: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn seed_result(
        db: &DatabaseConnection,
        student_id: i64,
        subject_id: i64,
        obtained: i32,
        total: i32,
        is_absent: bool,
    ) {
        let now = Utc::now();
        let grade = if is_absent {
            Grade::Absent
        } else {
            Grade::from_marks(obtained, total).unwrap()
        };
        student_result::ActiveModel {
            student_id: Set(student_id),
            session_id: Set(SESSION),
            exam_type_id: Set(MIDTERM),
            subject_id: Set(subject_id),
            class_id: Set(CLASS_A),
            section_id: Set(SECTION),
            total_marks: Set(total),
            obtained_marks: Set(obtained),
            grade: Set(grade),
            remarks: Set(None),
            is_absent: Set(is_absent),
            is_locked: Set(false),
            submitted_by: Set(7),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn absent_rows_count_toward_totals_but_not_obtained() {
        let db = setup_test_db().await;
        seed_student(&db, 1).await;
        seed_session(&db).await;
        seed_result(&db, 1, 30, 80, 100, false).await;
        seed_result(&db, 1, 31, 40, 50, true).await;

        let report = assemble(&db, 1, SESSION, false).await.unwrap();
        assert_eq!(report.total_obtained, 80);
        assert_eq!(report.total_marks, 150);
        assert_eq!(report.percentage, 53);
        assert_eq!(report.overall_grade, Some(Grade::D));
        assert_eq!(report.results.len(), 2);
        assert!(report.attendance.is_none());
    }

    #[tokio::test]
    async fn empty_result_set_has_no_overall_grade() {
        let db = setup_test_db().await;
        seed_student(&db, 1).await;
        seed_session(&db).await;

        let report = assemble(&db, 1, SESSION, false).await.unwrap();
        assert_eq!(report.total_marks, 0);
        assert_eq!(report.percentage, 0);
        assert_eq!(report.overall_grade, None);
    }

    #[tokio::test]
    async fn attendance_summary_rides_along_when_requested() {
        let db = setup_test_db().await;
        seed_student(&db, 1).await;
        seed_session(&db).await;
        seed_result(&db, 1, 30, 90, 100, false).await;

        mark_section(
            &db,
            &teacher(),
            SECTION,
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            vec![MarkAttendanceEntry {
                student_id: 1,
                status: AttendanceStatus::Present,
                attendance_type: AttendanceType::FullDay,
                left_early: false,
                left_at: None,
                remarks: None,
            }],
        )
        .await
        .unwrap();

        let report = assemble(&db, 1, SESSION, true).await.unwrap();
        let attendance = report.attendance.expect("summary requested");
        assert_eq!(attendance.total, 1);
        assert_eq!(attendance.percentage, 100);
        assert_eq!(report.overall_grade, Some(Grade::APlus));
    }

    #[tokio::test]
    async fn unknown_student_surfaces_not_found() {
        let db = setup_test_db().await;
        seed_session(&db).await;

        let err = assemble(&db, 42, SESSION, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::Database(_)));
    }
}
