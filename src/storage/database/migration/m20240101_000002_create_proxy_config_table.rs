use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProxyConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProxyConfig::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProxyConfig::Strategy)
                            .string()
                            .not_null()
                            .default("least_active"),
                    )
                    .col(
                        ColumnDef::new(ProxyConfig::Weight)
                            .double()
                            .not_null()
                            .default(1.0),
                    )
                    .col(
                        ColumnDef::new(ProxyConfig::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Seed the single row (id is always 1 — spec §3 "ProxyConfig (single row)")
        manager
            .exec_stmt(
                Query::insert()
                    .into_table(ProxyConfig::Table)
                    .columns([ProxyConfig::Id, ProxyConfig::Strategy, ProxyConfig::Weight])
                    .values_panic([1.into(), "least_active".into(), 1.0.into()])
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProxyConfig::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProxyConfig {
    Table,
    Id,
    Strategy,
    Weight,
    UpdatedAt,
}
