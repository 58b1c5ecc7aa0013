use sea_orm_migration::prelude::*;

use crate::m20260101_000001_users::Users;

#[derive(DeriveIden)]
enum Impersonations {
    Table,
    Id,
    ImpersonatorId,
    ImpersonatedId,
    StartedAt,
    EndedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Impersonations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Impersonations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Impersonations::ImpersonatorId).uuid().not_null())
                    .col(ColumnDef::new(Impersonations::ImpersonatedId).uuid().not_null())
                    .col(
                        ColumnDef::new(Impersonations::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Impersonations::EndedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_impersonations_impersonator")
                            .from(Impersonations::Table, Impersonations::ImpersonatorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_impersonations_impersonated")
                            .from(Impersonations::Table, Impersonations::ImpersonatedId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_impersonations_impersonator")
                    .table(Impersonations::Table)
                    .col(Impersonations::ImpersonatorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Impersonations::Table).to_owned())
            .await
    }
}
