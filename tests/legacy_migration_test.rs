use std::{fs, sync::Arc};

use bakery_catalog::{
    db,
    repositories::{
        JsonDirectorySource, ProductFilter, ProductRepository, SeaOrmProductRepository,
    },
    services::{normalizer::normalize_row, LegacyMigration},
};
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::TempDir;

async fn sqlite_repository() -> Arc<SeaOrmProductRepository> {
    let pool = db::establish_connection("sqlite::memory:")
        .await
        .expect("failed to create test database");
    db::run_migrations(&pool).await.expect("migrations");
    Arc::new(SeaOrmProductRepository::new(Arc::new(pool)))
}

fn write_collection(dir: &TempDir, collection: &str, records: serde_json::Value) {
    fs::write(
        dir.path().join(format!("{}.json", collection)),
        serde_json::to_vec_pretty(&records).unwrap(),
    )
    .unwrap();
}

fn export_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_collection(
        &dir,
        "paes",
        json!([
            { "nome": "Pão Francês", "valor": 0.75, "vtipo": "UN", "img": "frances.png" },
            { "nome": "Pão Francês", "valor": 0.8, "vtipo": "UN", "ingredientes": null },
            { "nome": "Pão Velho", "valor": 1, "deleted": true }
        ]),
    );
    write_collection(
        &dir,
        "salgados",
        json!([
            {
                "nome": "Coxinha",
                "valor": 5,
                "vtipo": "UN",
                "subc": "Fritos",
                "ingredientes": "frango, massa, catupiry",
                "status": "pause",
                "destaque": true
            }
        ]),
    );
    write_collection(&dir, "bebidas", json!([{ "valor": 4 }]));
    // Remaining collections are absent from the export.
    dir
}

#[tokio::test]
async fn migrates_an_export_directory_into_sqlite() {
    let dir = export_dir();
    let repo = sqlite_repository().await;
    let migration = LegacyMigration::new(
        Arc::new(JsonDirectorySource::new(dir.path())),
        repo.clone(),
        100,
    );

    let report = migration.run().await.unwrap();

    assert!(!report.skipped);
    assert_eq!(report.total_migrated, 3);
    let paes = &report.per_collection[0];
    assert_eq!((paes.migrated, paes.skipped_deleted, paes.failed), (2, 1, 0));
    let bebidas = report
        .per_collection
        .iter()
        .find(|c| c.collection == "bebidas")
        .unwrap();
    assert_eq!(bebidas.failed, 1);
    let tortas = report
        .per_collection
        .iter()
        .find(|c| c.collection == "tortas")
        .unwrap();
    assert!(tortas.error.is_some());

    let first = repo.find_by_slug("pao-frances").await.unwrap().unwrap();
    let second = repo.find_by_slug("pao-frances-1").await.unwrap().unwrap();
    assert_eq!(normalize_row(&first).unwrap().price.amount, dec!(0.75));
    assert!(normalize_row(&second).unwrap().ingredients.is_empty());

    let coxinha = normalize_row(&repo.find_by_slug("coxinha").await.unwrap().unwrap()).unwrap();
    assert_eq!(coxinha.category.slug, "salgados");
    assert_eq!(coxinha.subcategory, "Fritos");
    assert_eq!(coxinha.status.as_str(), "inactive");
    assert!(coxinha.featured);
    assert_eq!(coxinha.ingredients, vec!["frango", "massa", "catupiry"]);
    assert_eq!(coxinha.price.unit, "UN");
}

#[tokio::test]
async fn second_run_against_populated_store_writes_nothing() {
    let dir = export_dir();
    let repo = sqlite_repository().await;
    let migration = LegacyMigration::new(
        Arc::new(JsonDirectorySource::new(dir.path())),
        repo.clone(),
        100,
    );

    let first = migration.run().await.unwrap();
    let count_after_first = repo.count(&ProductFilter::default()).await.unwrap();

    let second = migration.run().await.unwrap();

    assert_eq!(first.total_migrated, count_after_first);
    assert!(second.skipped);
    assert_eq!(second.total_migrated, 0);
    assert!(second.per_collection.is_empty());
    assert_eq!(
        repo.count(&ProductFilter::default()).await.unwrap(),
        count_after_first
    );
}
