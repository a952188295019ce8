//! Drives one import run from `pending` to a terminal state.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::domain::external::{
    CategoryNode, ExternalCategory, ExternalProduct, raw_source_id,
};
use crate::domain::run::{ImportRun, ImportRunStatus, ItemType, NewImportRunItem};
use crate::domain::source::SourceConfig;
use crate::domain::task::{CategorySelector, ImportKind, ImportTask};
use crate::domain::types::{CategoryId, ExternalId, ImportRunId};
use crate::models::config::ImportSettings;
use crate::repository::{
    BrandWriter, CategoryReader, CategoryWriter, ImportRunReader, ImportRunWriter, ProductReader,
    ProductWriter,
};
use crate::services::categories::{CategoryReconciler, filter_subtree};
use crate::services::errors::{ConversionError, ImportError, ImportResult};
use crate::services::fetcher::{HttpClient, RemoteFetcher};
use crate::services::images::ImageAcquirer;
use crate::services::products::ProductReconciler;
use crate::services::storage::BlobStorage;

/// Repository operations needed to execute a run.
pub trait ImportRepository:
    ImportRunReader
    + ImportRunWriter
    + CategoryReader
    + CategoryWriter
    + ProductReader
    + ProductWriter
    + BrandWriter
{
}

impl<T> ImportRepository for T where
    T: ImportRunReader
        + ImportRunWriter
        + CategoryReader
        + CategoryWriter
        + ProductReader
        + ProductWriter
        + BrandWriter
{
}

/// Run-level deadline, checked before every page fetch and every record.
struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> ImportResult<()> {
        if self.started.elapsed() >= self.limit {
            Err(ImportError::Timeout(self.limit))
        } else {
            Ok(())
        }
    }
}

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn display_id(id: Option<&ExternalId>) -> &str {
    id.map_or("<unknown>", ExternalId::as_str)
}

fn clamp_count(value: i64) -> i32 {
    i32::try_from(value.max(0)).unwrap_or(i32::MAX)
}

pub struct ImportOrchestrator<'a, R, C, S> {
    repo: &'a R,
    client: &'a C,
    storage: &'a S,
    settings: ImportSettings,
}

impl<'a, R, C, S> ImportOrchestrator<'a, R, C, S>
where
    R: ImportRepository,
    C: HttpClient,
    S: BlobStorage,
{
    pub fn new(repo: &'a R, client: &'a C, storage: &'a S, settings: ImportSettings) -> Self {
        Self {
            repo,
            client,
            storage,
            settings,
        }
    }

    /// Executes `run` of `task` against `source`.
    ///
    /// Only a `pending` run is executed. Per-record failures are written to
    /// the audit trail and the run still completes; anything else marks the
    /// run `failed` with the error message and is returned to the caller.
    pub fn execute(
        &self,
        task: &ImportTask,
        source: &SourceConfig,
        run: &ImportRun,
    ) -> ImportResult<ImportRun> {
        let Some(running) = self.repo.start_import_run(run.id, now())? else {
            let status = self
                .repo
                .get_import_run_by_id(run.id)?
                .map_or(run.status, |current| current.status);
            return Err(ImportError::InvalidRunState { id: run.id, status });
        };
        log::info!(
            "Starting import run {} of task {} ({}) from source {}",
            running.id,
            task.id,
            task.kind,
            source.slug
        );

        match self.run_steps(task, source, running.id) {
            Ok(()) => {
                let finished =
                    self.repo
                        .finish_import_run(running.id, ImportRunStatus::Completed, None, now())?;
                let counters = &finished.counters;
                log::info!(
                    "Import run {} completed: total {}, processed {}, created {}, updated {}, failed {}",
                    finished.id,
                    counters.total,
                    counters.processed,
                    counters.created,
                    counters.updated,
                    counters.failed
                );
                Ok(finished)
            }
            Err(e) => {
                log::error!("Import run {} failed: {e}", running.id);
                let message = e.to_string();
                if let Err(finish_err) = self.repo.finish_import_run(
                    running.id,
                    ImportRunStatus::Failed,
                    Some(&message),
                    now(),
                ) {
                    log::error!("Failed to mark import run {} as failed: {finish_err}", running.id);
                }
                Err(e)
            }
        }
    }

    fn run_steps(
        &self,
        task: &ImportTask,
        source: &SourceConfig,
        run_id: ImportRunId,
    ) -> ImportResult<()> {
        if !source.is_active {
            return Err(ImportError::InactiveSource(source.slug.to_string()));
        }
        let deadline = Deadline::start(self.settings.run_timeout);
        let fetcher = RemoteFetcher::new(self.client, source, self.settings.listing_timeout);

        match task.kind {
            ImportKind::Categories => self.import_categories(&fetcher, task, source, run_id, &deadline),
            ImportKind::Products => self.import_products(&fetcher, task, source, run_id, &deadline),
        }
    }

    fn import_categories(
        &self,
        fetcher: &RemoteFetcher<'_, C>,
        task: &ImportTask,
        source: &SourceConfig,
        run_id: ImportRunId,
        deadline: &Deadline,
    ) -> ImportResult<()> {
        deadline.check()?;
        let listing = fetcher.fetch_category_listing()?;
        let records = match &task.selector {
            CategorySelector::All => listing.categories,
            CategorySelector::Single(target) => filter_subtree(&listing.categories, target),
        };
        self.repo
            .add_import_run_total(run_id, clamp_count(records.len() as i64))?;

        let reconciler = CategoryReconciler::new(self.repo, source, task);
        let mut deferred = Vec::new();
        for record in &records {
            deadline.check()?;
            let source_id = raw_source_id(record);
            let result = serde_json::from_value::<ExternalCategory>(record.clone())
                .map_err(ConversionError::from)
                .and_then(|category| reconciler.reconcile(&category));

            let item = match result {
                Ok(outcome) => {
                    if let Some(parent) = outcome.pending_parent {
                        deferred.push((outcome.category.id, parent));
                    }
                    NewImportRunItem::succeeded(
                        ItemType::Category,
                        source_id.as_ref(),
                        record,
                        outcome.category.id.get(),
                        outcome.action,
                    )
                }
                Err(e) => {
                    log::warn!(
                        "Failed to import category {} in run {run_id}: {e}",
                        display_id(source_id.as_ref())
                    );
                    NewImportRunItem::failed(ItemType::Category, source_id.as_ref(), record, e.to_string())
                }
            };
            self.repo.record_import_run_item(run_id, &item)?;
        }

        if !deferred.is_empty() {
            let resolved = reconciler.resolve_deferred_parents(&deferred);
            log::info!(
                "Resolved {resolved} of {} deferred parent links in run {run_id}",
                deferred.len()
            );
        }
        Ok(())
    }

    fn import_products(
        &self,
        fetcher: &RemoteFetcher<'_, C>,
        task: &ImportTask,
        source: &SourceConfig,
        run_id: ImportRunId,
        deadline: &Deadline,
    ) -> ImportResult<()> {
        let reconciler = ProductReconciler::new(
            self.repo,
            ImageAcquirer::new(self.client, self.storage, self.settings.image_timeout),
            source,
            task,
            self.settings.in_stock_quantity,
        );

        let target = match &task.selector {
            CategorySelector::Single(target) => target,
            CategorySelector::All => {
                deadline.check()?;
                let listing = fetcher.fetch_category_listing()?;
                for record in &listing.categories {
                    let Some(external) = record.external_id() else {
                        log::warn!("Skipping category without id in run {run_id}: {record}");
                        continue;
                    };
                    match self.import_category_products(
                        fetcher,
                        &reconciler,
                        task,
                        source,
                        &external,
                        run_id,
                        deadline,
                    ) {
                        Ok(()) => {}
                        Err(e @ ImportError::Timeout(_)) => return Err(e),
                        Err(e) => {
                            log::error!(
                                "Failed to import products of category {external} in run {run_id}: {e}"
                            );
                        }
                    }
                }
                return Ok(());
            }
        };

        self.import_category_products(fetcher, &reconciler, task, source, target, run_id, deadline)
    }

    /// Pages through the products of one external category.
    #[allow(clippy::too_many_arguments)]
    fn import_category_products(
        &self,
        fetcher: &RemoteFetcher<'_, C>,
        reconciler: &ProductReconciler<'_, R, C, S>,
        task: &ImportTask,
        source: &SourceConfig,
        external: &ExternalId,
        run_id: ImportRunId,
        deadline: &Deadline,
    ) -> ImportResult<()> {
        let category_id = self
            .repo
            .find_category_by_source(&source.slug, external)?
            .map(|category| category.id)
            .or(task.target_category_id);

        let mut page = 1;
        let mut last_page = 1;
        loop {
            deadline.check()?;
            let body = fetcher.fetch_products_page(external, page)?;
            if page == 1 {
                last_page = body.last_page();
                self.repo
                    .add_import_run_total(run_id, clamp_count(body.total()))?;
            }
            for record in body.records() {
                deadline.check()?;
                self.import_product(reconciler, record, category_id, run_id)?;
            }
            if page >= last_page {
                break;
            }
            page += 1;
        }
        Ok(())
    }

    fn import_product(
        &self,
        reconciler: &ProductReconciler<'_, R, C, S>,
        record: &Value,
        category_id: Option<CategoryId>,
        run_id: ImportRunId,
    ) -> ImportResult<()> {
        let source_id = raw_source_id(record);
        let result = serde_json::from_value::<ExternalProduct>(record.clone())
            .map_err(ConversionError::from)
            .and_then(|product| reconciler.reconcile(&product, category_id));

        let item = match result {
            Ok(outcome) => {
                if let Some((brand, action)) = &outcome.brand {
                    let brand_item = NewImportRunItem::succeeded(
                        ItemType::Brand,
                        ExternalId::new(brand.slug.as_str()).ok().as_ref(),
                        record.get("brand").unwrap_or(&Value::Null),
                        brand.id.get(),
                        *action,
                    );
                    self.repo.record_import_run_item(run_id, &brand_item)?;
                }
                NewImportRunItem::succeeded(
                    ItemType::Product,
                    source_id.as_ref(),
                    record,
                    outcome.product.id.get(),
                    outcome.action,
                )
            }
            Err(e) => {
                log::warn!(
                    "Failed to import product {} in run {run_id}: {e}",
                    display_id(source_id.as_ref())
                );
                NewImportRunItem::failed(ItemType::Product, source_id.as_ref(), record, e.to_string())
            }
        };
        self.repo.record_import_run_item(run_id, &item)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::run::ItemStatus;
    use crate::domain::source::AuthMode;
    use crate::repository::test::TestRepository;
    use crate::repository::{ImportRunItemReader, RunItemListQuery};
    use crate::services::fixtures::{StubHttpClient, source, task};
    use crate::services::storage::FsStorage;

    const CATEGORIES: &str = "https://api.acme.test/categories";

    fn products_url(category: &str, page: u32) -> String {
        format!("https://api.acme.test/categories/{category}/products?page={page}")
    }

    fn execute(
        repo: &TestRepository,
        client: &StubHttpClient,
        task: &ImportTask,
        source: &SourceConfig,
        settings: ImportSettings,
    ) -> (ImportResult<ImportRun>, ImportRun) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let run = repo.create_import_run(task.id).unwrap();
        let result = ImportOrchestrator::new(repo, client, &storage, settings).execute(task, source, &run);
        let stored = repo.get_import_run_by_id(run.id).unwrap().unwrap();
        (result, stored)
    }

    #[test]
    fn imports_selected_category_subtree() {
        let client = StubHttpClient::default();
        client.json(
            CATEGORIES,
            json!({ "categories": [
                { "id": 3, "name": "Cordless", "parent_id": 2 },
                { "id": 1, "name": "Tools", "parent_id": null },
                { "id": 2, "name": "Drills", "parent_id": 1 },
                { "id": 4, "name": "Orphan", "parent_id": 99 },
                { "id": 5, "name": "Garden", "parent_id": null }
            ]}),
        );
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(
            ImportKind::Categories,
            CategorySelector::Single(ExternalId::new("1").unwrap()),
            None,
        );

        let (result, run) = execute(&repo, &client, &task, &source, ImportSettings::default());
        let finished = result.unwrap();
        assert_eq!(finished.status, ImportRunStatus::Completed);
        assert_eq!(run.counters.total, 3);
        assert_eq!(run.counters.processed, 3);
        assert_eq!(run.counters.created, 3);
        assert!(run.started_at.is_some() && run.finished_at.is_some());

        let categories = repo.categories();
        let by_source = |id: &str| {
            categories
                .iter()
                .find(|c| c.source_id.as_ref().is_some_and(|s| s.as_str() == id))
                .unwrap()
        };
        // "Cordless" came before its parent and is linked by the second pass.
        assert_eq!(by_source("3").parent_id, Some(by_source("2").id));
        assert_eq!(by_source("2").parent_id, Some(by_source("1").id));
        assert_eq!(categories.len(), 3);
    }

    #[test]
    fn malformed_record_does_not_fail_the_run() {
        let client = StubHttpClient::default();
        client.json(
            &products_url("7", 1),
            json!({ "products": { "data": [
                { "id": 1, "name": "Saw", "base_price": 10 },
                { "id": 2, "name": "Broken" },
                { "id": 3, "name": "Hammer", "base_price": "5" }
            ], "total": 3, "last_page": 1 }}),
        );
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(
            ImportKind::Products,
            CategorySelector::Single(ExternalId::new("7").unwrap()),
            None,
        );

        let (result, run) = execute(&repo, &client, &task, &source, ImportSettings::default());
        assert!(result.is_ok());
        assert_eq!(run.status, ImportRunStatus::Completed);
        assert_eq!(run.counters.processed, 3);
        assert_eq!(run.counters.created, 2);
        assert_eq!(run.counters.failed, 1);
        assert_eq!(repo.products().len(), 2);

        let (count, failed) = repo
            .list_run_items(RunItemListQuery::new(run.id).status(ItemStatus::Failed))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(failed[0].source_id.as_deref(), Some("2"));
        assert!(failed[0].error_message.is_some());
        assert_eq!(failed[0].local_id, None);
    }

    #[test]
    fn paginates_until_last_page() {
        let client = StubHttpClient::default();
        client
            .json(
                &products_url("7", 1),
                json!({ "data": [{ "id": 1, "name": "A", "base_price": 1, "brand": { "name": "Acme" } }], "total": 2, "last_page": 2 }),
            )
            .json(
                &products_url("7", 2),
                json!({ "data": [{ "id": 2, "name": "B", "base_price": 1, "brand": { "name": "Acme" } }], "total": 2, "last_page": 2 }),
            );
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(
            ImportKind::Products,
            CategorySelector::Single(ExternalId::new("7").unwrap()),
            None,
        );

        let (_, run) = execute(&repo, &client, &task, &source, ImportSettings::default());
        assert_eq!(run.counters.total, 2);
        assert_eq!(run.counters.processed, 2);
        assert!(!client.requested(&products_url("7", 3)));

        let (brand_items, items) = repo
            .list_run_items(RunItemListQuery::new(run.id).item_type(ItemType::Brand))
            .unwrap();
        assert_eq!(brand_items, 2);
        assert_eq!(items[0].status, ItemStatus::Created);
        assert_eq!(items[1].status, ItemStatus::Updated);
        assert_eq!(items[0].source_id.as_deref(), Some("acme"));
    }

    #[test]
    fn failed_category_does_not_stop_other_categories() {
        let client = StubHttpClient::default();
        client
            .json(
                CATEGORIES,
                json!({ "categories": [{ "id": 1, "name": "A" }, { "id": 2, "name": "B" }] }),
            )
            .status(&products_url("1", 1), 500)
            .json(
                &products_url("2", 1),
                json!({ "data": [{ "id": 9, "name": "Nail", "base_price": 0.1 }] }),
            );
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Products, CategorySelector::All, None);

        let (result, run) = execute(&repo, &client, &task, &source, ImportSettings::default());
        assert!(result.is_ok());
        assert_eq!(run.status, ImportRunStatus::Completed);
        assert_eq!(run.counters.created, 1);
        assert_eq!(repo.products().len(), 1);
    }

    #[test]
    fn product_is_attached_to_imported_category() {
        let client = StubHttpClient::default();
        client
            .json(CATEGORIES, json!({ "categories": [{ "id": 7, "name": "Saws" }] }))
            .json(
                &products_url("7", 1),
                json!({ "data": [{ "id": 1, "name": "Saw", "base_price": 3 }] }),
            );
        let repo = TestRepository::new();
        let source = source(AuthMode::None);

        let categories = task(ImportKind::Categories, CategorySelector::All, None);
        execute(&repo, &client, &categories, &source, ImportSettings::default())
            .0
            .unwrap();
        let products = task(
            ImportKind::Products,
            CategorySelector::Single(ExternalId::new("7").unwrap()),
            None,
        );
        execute(&repo, &client, &products, &source, ImportSettings::default())
            .0
            .unwrap();

        let category = &repo.categories()[0];
        assert_eq!(repo.products()[0].category_id, Some(category.id));
    }

    #[test]
    fn page_fetch_failure_fails_single_category_run() {
        let client = StubHttpClient::default();
        client.status(&products_url("7", 1), 503);
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(
            ImportKind::Products,
            CategorySelector::Single(ExternalId::new("7").unwrap()),
            None,
        );

        let (result, run) = execute(&repo, &client, &task, &source, ImportSettings::default());
        assert!(matches!(result, Err(ImportError::Transport(_))));
        assert_eq!(run.status, ImportRunStatus::Failed);
        assert!(run.error_message.unwrap().contains("503"));
    }

    #[test]
    fn expired_deadline_fails_the_run() {
        let client = StubHttpClient::default();
        client.json(CATEGORIES, json!({ "categories": [{ "id": 1, "name": "A" }] }));
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Products, CategorySelector::All, None);
        let settings = ImportSettings {
            run_timeout: Duration::ZERO,
            ..ImportSettings::default()
        };

        let (result, run) = execute(&repo, &client, &task, &source, settings);
        assert!(matches!(result, Err(ImportError::Timeout(_))));
        assert_eq!(run.status, ImportRunStatus::Failed);
        assert!(client.requests.borrow().is_empty());
    }

    #[test]
    fn inactive_source_fails_without_fetching() {
        let client = StubHttpClient::default();
        let repo = TestRepository::new();
        let mut source = source(AuthMode::None);
        source.is_active = false;
        let task = task(ImportKind::Categories, CategorySelector::All, None);

        let (result, run) = execute(&repo, &client, &task, &source, ImportSettings::default());
        assert!(matches!(result, Err(ImportError::InactiveSource(_))));
        assert_eq!(run.status, ImportRunStatus::Failed);
        assert!(client.requests.borrow().is_empty());
    }

    #[test]
    fn only_pending_runs_execute() {
        let client = StubHttpClient::default();
        client.json(CATEGORIES, json!({ "categories": [] }));
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Categories, CategorySelector::All, None);
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let orchestrator =
            ImportOrchestrator::new(&repo, &client, &storage, ImportSettings::default());

        let run = repo.create_import_run(task.id).unwrap();
        orchestrator.execute(&task, &source, &run).unwrap();
        let err = orchestrator.execute(&task, &source, &run).unwrap_err();
        assert!(matches!(
            err,
            ImportError::InvalidRunState {
                status: ImportRunStatus::Completed,
                ..
            }
        ));
    }
}
