use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .if_not_exists()
                    .table(TaskTag::Table)
                    .col(fk_id_col(manager, TaskTag::TaskId))
                    .col(fk_id_col(manager, TaskTag::TagId))
                    .col(
                        ColumnDef::new(TaskTag::Position)
                            .integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(
                        ColumnDef::new(TaskTag::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_task_tag")
                            .col(TaskTag::TaskId)
                            .col(TaskTag::TagId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_tag_task_id")
                            .from(TaskTag::Table, TaskTag::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_tag_tag_id")
                            .from(TaskTag::Table, TaskTag::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_tag_tag_id")
                    .table(TaskTag::Table)
                    .col(TaskTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskTag::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

#[derive(Iden)]
enum TaskTag {
    Table,
    TaskId,
    TagId,
    Position,
    CreatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
}

#[derive(Iden)]
enum Tags {
    Table,
    Id,
}
