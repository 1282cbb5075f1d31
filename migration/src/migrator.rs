use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202508250001_create_students::Migration),
            Box::new(migrations::m202508250002_create_school_sessions::Migration),
            Box::new(migrations::m202508250003_create_result_deadlines::Migration),
            Box::new(migrations::m202508250004_create_student_results::Migration),
            Box::new(migrations::m202508250005_create_attendance_records::Migration),
        ]
    }
}
