use config::{Config, DatabaseConfig};
use db::DBService;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;

use crate::AppContext;

/// Context over a fresh in-memory database.
pub async fn test_context(page_size: u64) -> AppContext {
    let pool = Database::connect("sqlite::memory:").await.unwrap();
    db_migration::Migrator::up(&pool, None).await.unwrap();

    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Url("sqlite::memory:".to_string()),
        page_size,
    };
    AppContext::new(DBService::from_connection(pool), config)
}
