use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202508250003_create_result_deadlines"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("result_deadlines"))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).big_integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Alias::new("session_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("exam_type_id")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("class_id")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("subject_id")).big_integer().null())
                    .col(ColumnDef::new(Alias::new("start_date")).timestamp().not_null())
                    .col(ColumnDef::new(Alias::new("end_date")).timestamp().not_null())
                    .col(ColumnDef::new(Alias::new("is_open")).boolean().not_null().default(true))
                    .col(ColumnDef::new(Alias::new("created_by")).big_integer().not_null())
                    .col(ColumnDef::new(Alias::new("created_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .col(ColumnDef::new(Alias::new("updated_at")).timestamp().not_null().default(Expr::cust("CURRENT_TIMESTAMP")))
                    .to_owned(),
            )
            .await?;

        // One authoritative window per scope; makes the specific-then-general
        // resolution deterministic. Plain unique indexes treat NULLs as
        // distinct, so the nullable scope columns are coalesced (-1 is not a
        // valid collaborator id).
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX ux_result_deadlines_scope \
                 ON result_deadlines (session_id, exam_type_id, \
                 COALESCE(class_id, -1), COALESCE(subject_id, -1))",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("result_deadlines")).to_owned())
            .await
    }
}
