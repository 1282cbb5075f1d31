use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A submission window for results.
///
/// `class_id = NULL` means the window applies to every class in the
/// (session, exam type) scope; `subject_id = NULL` likewise for subjects.
/// Windows are toggled open/closed and kept for audit, never deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "result_deadlines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub exam_type_id: i64,
    pub class_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_open: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::school_session::Entity",
        from = "Column::SessionId",
        to = "super::school_session::Column::Id"
    )]
    Session,
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
    /// Whether this window accepts submissions at `now`.
    pub fn accepts_at(&self, now: DateTime<Utc>) -> bool {
        self.is_open && self.start_date <= now && now <= self.end_date
    }
}
