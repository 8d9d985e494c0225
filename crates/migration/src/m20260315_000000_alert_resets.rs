//! Record of the months whose new-month alert reset already ran.
//!
//! - `alert_resets`: one row per calendar month, claimed by the first
//!   scheduler tick of that month

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum AlertResets {
    Table,
    ResetYear,
    ResetMonth,
    ResetAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AlertResets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AlertResets::ResetYear).integer().not_null())
                    .col(ColumnDef::new(AlertResets::ResetMonth).integer().not_null())
                    .col(
                        ColumnDef::new(AlertResets::ResetAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk-alert_resets")
                            .col(AlertResets::ResetYear)
                            .col(AlertResets::ResetMonth),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AlertResets::Table).to_owned())
            .await
    }
}
