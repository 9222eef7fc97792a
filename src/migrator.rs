use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240601_000001_create_catalog_products_table::Migration)]
    }
}

// Migration implementations

mod m20240601_000001_create_catalog_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_catalog_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with entities::catalog_product Model
            manager
                .create_table(
                    Table::create()
                        .table(CatalogProducts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CatalogProducts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CatalogProducts::Slug).string().not_null())
                        .col(ColumnDef::new(CatalogProducts::Name).string().not_null())
                        .col(ColumnDef::new(CatalogProducts::NameKey).string().not_null())
                        .col(
                            ColumnDef::new(CatalogProducts::CategorySlug)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogProducts::Status)
                                .string()
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(CatalogProducts::Featured)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(CatalogProducts::Document).json().not_null())
                        .col(
                            ColumnDef::new(CatalogProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CatalogProducts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Backstop for concurrent slug claims
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_catalog_products_slug")
                        .table(CatalogProducts::Table)
                        .col(CatalogProducts::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_catalog_products_name_key")
                        .table(CatalogProducts::Table)
                        .col(CatalogProducts::NameKey)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_catalog_products_category_slug")
                        .table(CatalogProducts::Table)
                        .col(CatalogProducts::CategorySlug)
                        .to_owned(),
                )
                .await?;

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CatalogProducts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CatalogProducts {
        Table,
        Id,
        Slug,
        Name,
        NameKey,
        CategorySlug,
        Status,
        Featured,
        Document,
        CreatedAt,
        UpdatedAt,
    }
}
