use crate::grade::Grade;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One result row per (student, session, exam type, subject).
///
/// The 4-tuple is the natural key and carries a unique index; upserts
/// resolve insert-vs-update against it. A locked row refuses single-row
/// writes until explicitly unlocked.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "student_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub session_id: i64,
    pub exam_type_id: i64,
    pub subject_id: i64,
    pub class_id: i64,
    pub section_id: i64,
    pub total_marks: i32,
    pub obtained_marks: i32,
    pub grade: Grade,
    pub remarks: Option<String>,
    pub is_absent: bool,
    pub is_locked: bool,
    pub submitted_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::school_session::Entity",
        from = "Column::SessionId",
        to = "super::school_session::Column::Id"
    )]
    Session,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::school_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Marks this row contributes to report aggregates. Absent rows
    /// contribute zero regardless of what is stored.
    pub fn counted_marks(&self) -> i32 {
        if self.is_absent { 0 } else { self.obtained_marks }
    }
}
