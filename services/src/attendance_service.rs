use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::auth::AuthUser;
use crate::service::ServiceResult;
use db::models::attendance_record::{
    ActiveModel, AttendanceStatus, AttendanceType, Column, Entity, Model,
};

pub use db::attendance::{summarize, AttendanceSummary};

#[derive(Debug, Clone)]
pub struct MarkAttendanceEntry {
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub attendance_type: AttendanceType,
    pub left_early: bool,
    pub left_at: Option<NaiveTime>,
    pub remarks: Option<String>,
}

/// Record a section's roll call for one date.
///
/// Re-submission replaces the whole day for the section: existing rows
/// are deleted and the new set inserted in one transaction, so a repeat
/// never leaves duplicates behind.
pub async fn mark_section(
    db: &DatabaseConnection,
    actor: &AuthUser,
    section_id: i64,
    date: NaiveDate,
    entries: Vec<MarkAttendanceEntry>,
) -> ServiceResult<usize> {
    let now = Utc::now();
    let txn = db.begin().await?;

    Entity::delete_many()
        .filter(Column::SectionId.eq(section_id))
        .filter(Column::Date.eq(date))
        .exec(&txn)
        .await?;

    if !entries.is_empty() {
        let rows: Vec<ActiveModel> = entries
            .iter()
            .map(|entry| ActiveModel {
                student_id: Set(entry.student_id),
                section_id: Set(section_id),
                date: Set(date),
                status: Set(entry.status),
                attendance_type: Set(entry.attendance_type),
                left_early: Set(entry.left_early),
                left_at: Set(entry.left_at),
                remarks: Set(entry.remarks.clone()),
                marked_by: Set(actor.id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            })
            .collect();

        Entity::insert_many(rows).exec_without_returning(&txn).await?;
    }

    txn.commit().await?;

    log::info!(
        "roll call for section {section_id} on {date}: {} records by actor {}",
        entries.len(),
        actor.id
    );

    Ok(entries.len())
}

/// One student's records, oldest first, optionally bounded by dates.
pub async fn records_for_student(
    db: &DatabaseConnection,
    student_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ServiceResult<Vec<Model>> {
    let mut query = Entity::find().filter(Column::StudentId.eq(student_id));
    if let Some(from) = from {
        query = query.filter(Column::Date.gte(from));
    }
    if let Some(to) = to {
        query = query.filter(Column::Date.lte(to));
    }

    Ok(query.order_by_asc(Column::Date).all(db).await?)
}

/// Fetch and aggregate in one call; consumed by reports and promotion
/// policy.
pub async fn summary_for_student(
    db: &DatabaseConnection,
    student_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ServiceResult<AttendanceSummary> {
    let records = records_for_student(db, student_id, from, to).await?;
    Ok(summarize(&records))
}
