use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "school_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::student_result::Entity")]
    Results,
    #[sea_orm(has_many = "super::result_deadline::Entity")]
    Deadlines,
}

impl Related<super::student_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Results.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl Related<super::result_deadline::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deadlines.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}
