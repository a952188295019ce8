use chrono::NaiveDateTime;

use pushkind_common::db::{DbConnection, DbPool};
use pushkind_common::pagination::Pagination;
use pushkind_common::repository::errors::{RepositoryError, RepositoryResult};

use crate::domain::brand::{Brand, NewBrand};
use crate::domain::category::{Category, CategoryDraft};
use crate::domain::product::{Product, ProductChildren, ProductDetails, ProductDraft};
use crate::domain::run::{
    ImportRun, ImportRunItem, ImportRunStatus, ItemStatus, ItemType, NewImportRunItem,
    UpsertAction,
};
use crate::domain::source::{NewSourceConfig, SourceConfig};
use crate::domain::task::{ImportTask, NewImportTask};
use crate::domain::types::{
    CategoryId, ExternalId, ImportRunId, ImportTaskId, ProductId, Slug, SourceConfigId,
    SourceSlug, StoredPath, TypeConstraintError,
};

pub mod brand;
pub mod category;
pub mod product;
pub mod run;
pub mod source;
pub mod task;

/// Repository implementation backed by Diesel and SQLite.
///
/// The underlying `r2d2::Pool` is cheap to clone, allowing the repository to
/// be handed to every run.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool, // r2d2::Pool is cheap to clone
}

impl DieselRepository {
    /// Create a new repository from an established database pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a pooled database connection.
    fn conn(&self) -> RepositoryResult<DbConnection> {
        crate::db::get_connection(&self.pool)
    }
}

/// Error of a write transaction that also runs caller code.
///
/// Keeps the caller's error type intact while still letting Diesel roll back
/// on its own failures.
pub(crate) enum TxError<E> {
    Repository(RepositoryError),
    Caller(E),
}

impl<E> From<diesel::result::Error> for TxError<E> {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Repository(err.into())
    }
}

impl<E> From<TypeConstraintError> for TxError<E> {
    fn from(err: TypeConstraintError) -> Self {
        TxError::Repository(err.into())
    }
}

impl<E> From<RepositoryError> for TxError<E> {
    fn from(err: RepositoryError) -> Self {
        TxError::Repository(err)
    }
}

impl<E: From<RepositoryError>> TxError<E> {
    pub(crate) fn into_caller(self) -> E {
        match self {
            TxError::Repository(err) => err.into(),
            TxError::Caller(err) => err,
        }
    }
}

/// Query parameters used when listing the audit items of a run.
#[derive(Debug, Clone)]
pub struct RunItemListQuery {
    pub run_id: ImportRunId,
    pub status: Option<ItemStatus>,
    pub item_type: Option<ItemType>,
    pub pagination: Option<Pagination>,
}

impl RunItemListQuery {
    pub fn new(run_id: ImportRunId) -> Self {
        Self {
            run_id,
            status: None,
            item_type: None,
            pagination: None,
        }
    }
    pub fn status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }
    pub fn item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }
    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}

/// Result of a product save: the stored row and the image files of the
/// replaced image set, which the caller removes once the save committed.
#[derive(Debug, Clone)]
pub struct SavedProduct {
    pub product: Product,
    pub action: UpsertAction,
    pub replaced_images: Vec<StoredPath>,
}

/// Read-only operations for source configurations.
pub trait SourceReader {
    fn get_source_by_id(&self, id: SourceConfigId) -> RepositoryResult<Option<SourceConfig>>;
    fn get_source_by_slug(&self, slug: &SourceSlug) -> RepositoryResult<Option<SourceConfig>>;
}

pub trait SourceWriter {
    /// Register a new source.
    fn create_source(&self, source: &NewSourceConfig) -> RepositoryResult<SourceConfig>;
}

/// Read-only operations for import tasks.
pub trait ImportTaskReader {
    fn get_import_task_by_id(&self, id: ImportTaskId) -> RepositoryResult<Option<ImportTask>>;
}

pub trait ImportTaskWriter {
    fn create_import_task(&self, task: &NewImportTask) -> RepositoryResult<ImportTask>;
}

/// Read-only operations for import runs.
pub trait ImportRunReader {
    fn get_import_run_by_id(&self, id: ImportRunId) -> RepositoryResult<Option<ImportRun>>;
    /// Runs of a task, newest first.
    fn list_import_runs(&self, task_id: ImportTaskId) -> RepositoryResult<Vec<ImportRun>>;
}

/// State transitions and counter updates of import runs.
pub trait ImportRunWriter {
    /// Create a `pending` run for a task.
    fn create_import_run(&self, task_id: ImportTaskId) -> RepositoryResult<ImportRun>;
    /// Move a `pending` run to `running`. Returns `None` when the run is not
    /// pending anymore.
    fn start_import_run(
        &self,
        id: ImportRunId,
        started_at: NaiveDateTime,
    ) -> RepositoryResult<Option<ImportRun>>;
    /// Increase the expected item total of a run.
    fn add_import_run_total(&self, id: ImportRunId, delta: i32) -> RepositoryResult<ImportRun>;
    /// Append an audit item and apply its counter increments atomically.
    fn record_import_run_item(
        &self,
        id: ImportRunId,
        item: &NewImportRunItem,
    ) -> RepositoryResult<ImportRunItem>;
    /// Move a run into a terminal state.
    fn finish_import_run(
        &self,
        id: ImportRunId,
        status: ImportRunStatus,
        error_message: Option<&str>,
        finished_at: NaiveDateTime,
    ) -> RepositoryResult<ImportRun>;
}

/// Audit trail queries.
pub trait ImportRunItemReader {
    fn list_run_items(
        &self,
        query: RunItemListQuery,
    ) -> RepositoryResult<(usize, Vec<ImportRunItem>)>;
}

/// Read-only operations for category entities.
pub trait CategoryReader {
    fn get_category_by_id(&self, id: CategoryId) -> RepositoryResult<Option<Category>>;
    /// Look up an imported category by its natural key.
    fn find_category_by_source(
        &self,
        source: &SourceSlug,
        source_id: &ExternalId,
    ) -> RepositoryResult<Option<Category>>;
    fn is_category_slug_taken(
        &self,
        slug: &str,
        exclude: Option<CategoryId>,
    ) -> RepositoryResult<bool>;
}

/// Write operations for category entities.
pub trait CategoryWriter {
    /// Create a category, or update `existing` in place, choosing a unique
    /// slug from `draft.slug_base` in the same transaction.
    fn save_category(
        &self,
        existing: Option<CategoryId>,
        draft: &CategoryDraft,
    ) -> RepositoryResult<Category>;
    fn set_category_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> RepositoryResult<usize>;
}

pub trait BrandReader {
    fn find_brand_by_slug(&self, slug: &Slug) -> RepositoryResult<Option<Brand>>;
}

pub trait BrandWriter {
    /// Return the brand with `brand.slug`, creating it when missing.
    fn upsert_brand(&self, brand: &NewBrand) -> RepositoryResult<(Brand, UpsertAction)>;
}

/// Read-only operations for product entities.
pub trait ProductReader {
    fn get_product_by_id(&self, id: ProductId) -> RepositoryResult<Option<Product>>;
    fn find_product_by_source(
        &self,
        source: &SourceSlug,
        source_id: &ExternalId,
    ) -> RepositoryResult<Option<Product>>;
    /// Product with its image and variant sets.
    fn get_product_details(&self, id: ProductId) -> RepositoryResult<Option<ProductDetails>>;
    fn is_product_slug_taken(
        &self,
        slug: &str,
        exclude: Option<ProductId>,
    ) -> RepositoryResult<bool>;
}

pub trait ProductWriter {
    /// Create or update a product and replace its image and variant sets as
    /// one unit.
    ///
    /// `children` runs inside the write transaction after the product row is
    /// written, so it can use the product id. Any error from it rolls the
    /// whole save back. It must not do network or file I/O: the SQLite write
    /// lock is held until it returns.
    fn save_product<E, F>(
        &self,
        existing: Option<ProductId>,
        draft: &ProductDraft,
        children: F,
    ) -> Result<SavedProduct, E>
    where
        F: FnOnce(&Product) -> Result<ProductChildren, E>,
        E: From<RepositoryError>;
}
