//! Helpers for integration tests.
#![allow(dead_code, unused_imports)]

use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pushkind_common::db::{DbPool, establish_connection_pool};
use pushkind_importer::domain::source::{
    AuthMode, EndpointTemplate, NewSourceConfig, SourceEndpoints,
};
use pushkind_importer::domain::task::{CategorySelector, ImportKind, NewImportTask};
use pushkind_importer::domain::types::{
    BaseUrl, CategoryId, CurrencyCode, SellerId, SourceConfigId, SourceName, SourceSlug, TaskName,
};
pub use pushkind_importer::services::fixtures::StubHttpClient;
use tempfile::NamedTempFile;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!(); // assumes migrations/ exists

/// Temporary database used in integration tests.
pub struct TestDb {
    _tempfile: NamedTempFile,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let tempfile = NamedTempFile::new().expect("Failed to create temp file");
        let pool = establish_connection_pool(tempfile.path().to_str().unwrap())
            .expect("Failed to establish SQLite connection.");
        let mut conn = pool
            .get()
            .expect("Failed to get SQLite connection from pool.");
        conn.run_pending_migrations(MIGRATIONS)
            .expect("Migrations failed");
        TestDb {
            _tempfile: tempfile,
            pool,
        }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }
}

/// Source `acme` served from `https://api.acme.test`.
pub fn acme_source() -> NewSourceConfig {
    NewSourceConfig {
        slug: SourceSlug::new("acme").unwrap(),
        name: SourceName::new("Acme Supplies").unwrap(),
        endpoints: SourceEndpoints::new(
            BaseUrl::new("https://api.acme.test").unwrap(),
            EndpointTemplate::plain("/categories").unwrap(),
            EndpointTemplate::plain("/categories/search").unwrap(),
            EndpointTemplate::plain("/products").unwrap(),
            EndpointTemplate::with_category_id("/categories/{category_id}/products").unwrap(),
        )
        .unwrap(),
        image_base_url: Some(BaseUrl::new("https://cdn.acme.test").unwrap()),
        auth: AuthMode::BearerToken("secret".into()),
        default_currency: Some(CurrencyCode::new("EUR").unwrap()),
        is_active: true,
    }
}

pub fn new_task(
    source_config_id: SourceConfigId,
    kind: ImportKind,
    selector: CategorySelector,
    target_category_id: Option<CategoryId>,
) -> NewImportTask {
    NewImportTask {
        name: TaskName::new(format!("acme {kind}")).unwrap(),
        source_config_id,
        target_category_id,
        seller_id: SellerId::new(1).unwrap(),
        kind,
        selector,
    }
}

pub fn products_url(category: &str, page: u32) -> String {
    format!("https://api.acme.test/categories/{category}/products?page={page}")
}
