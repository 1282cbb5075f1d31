use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202508250004_create_student_results"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("student_results"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).big_integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("student_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("session_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("exam_type_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("subject_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("class_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("section_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("total_marks")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("obtained_marks")).integer().not_null())
                    .col(ColumnDef::new(Alias::new("grade")).string().not_null())
                    .col(ColumnDef::new(Alias::new("remarks")).string().null())
                    .col(ColumnDef::new(Alias::new("is_absent")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("is_locked")).boolean().not_null().default(false))
                    .col(ColumnDef::new(Alias::new("submitted_by")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    // natural key: upserts resolve insert-vs-update against this
                    .index(
                        Index::create()
                            .name("ux_student_results_natural_key")
                            .col(Alias::new("student_id"))
                            .col(Alias::new("session_id"))
                            .col(Alias::new("exam_type_id"))
                            .col(Alias::new("subject_id"))
                            .unique(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("student_results")).to_owned())
            .await
    }
}
