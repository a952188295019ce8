//! Reconciliation of external product records.

use crate::domain::brand::{Brand, NewBrand};
use crate::domain::external::{ExternalBrand, ExternalProduct, ExternalVariant};
use crate::domain::product::{
    NewProductImage, NewProductVariant, Product, ProductChildren, ProductDraft, StockPolicy,
    assign_primary,
};
use crate::domain::run::UpsertAction;
use crate::domain::slug::base_slug;
use crate::domain::source::SourceConfig;
use crate::domain::task::ImportTask;
use crate::domain::types::{
    BrandName, CategoryId, ProductId, ProductName, ProductPrice, RatingAverage, RatingCount, Slug,
    StockQuantity, StoredPath, VariantName,
};
use crate::repository::{BrandWriter, ProductReader, ProductWriter};
use crate::services::errors::ConversionError;
use crate::services::fetcher::HttpClient;
use crate::services::images::{ImageAcquirer, product_image_path, staging_dir};
use crate::services::storage::BlobStorage;

/// Result of reconciling one product record.
#[derive(Debug, Clone)]
pub struct ProductOutcome {
    pub product: Product,
    pub action: UpsertAction,
    /// Brand matched or created for the record, if it named one.
    pub brand: Option<(Brand, UpsertAction)>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub struct ProductReconciler<'a, R, C: HttpClient, S: BlobStorage> {
    repo: &'a R,
    images: ImageAcquirer<'a, C, S>,
    source: &'a SourceConfig,
    task: &'a ImportTask,
    in_stock_quantity: StockQuantity,
}

impl<'a, R, C, S> ProductReconciler<'a, R, C, S>
where
    R: ProductReader + ProductWriter + BrandWriter,
    C: HttpClient,
    S: BlobStorage,
{
    pub fn new(
        repo: &'a R,
        images: ImageAcquirer<'a, C, S>,
        source: &'a SourceConfig,
        task: &'a ImportTask,
        in_stock_quantity: StockQuantity,
    ) -> Self {
        Self {
            repo,
            images,
            source,
            task,
            in_stock_quantity,
        }
    }

    /// Creates or updates the product matched by `(source slug, record.id)`
    /// in `category_id`, replacing its images and variants.
    ///
    /// The product row and both child sets are written as one short
    /// transaction. Images are downloaded into a staging directory before it
    /// opens and moved under the product directory once it committed; a save
    /// that rolls back discards them. Files of a replaced image set are
    /// removed only after the save committed.
    pub fn reconcile(
        &self,
        record: &ExternalProduct,
        category_id: Option<CategoryId>,
    ) -> Result<ProductOutcome, ConversionError> {
        let name = ProductName::new(record.name.as_str())?;
        let base_price = ProductPrice::new(record.base_price)?;
        let list_price = record.list_price.map(ProductPrice::new).transpose()?;
        let rating_average = record.rating_average.map(RatingAverage::new).transpose()?;
        let rating_count = RatingCount::new(record.rating_count.unwrap_or(0))?;
        let stock = StockPolicy::from_source(record.stock_status.as_deref(), self.in_stock_quantity);
        let variants = self.variants(record, &name, base_price, &stock)?;

        let brand = record
            .brand
            .as_ref()
            .map(|brand| self.upsert_brand(brand))
            .transpose()?
            .flatten();

        let existing = self
            .repo
            .find_product_by_source(&self.source.slug, &record.id)?;

        let draft = ProductDraft {
            seller_id: self.task.seller_id,
            category_id,
            brand_id: brand.as_ref().map(|(b, _)| b.id),
            name,
            slug_base: base_slug(record.slug.as_deref(), &record.name, "product"),
            short_description: non_empty(record.short_description.as_deref()),
            description: non_empty(record.description.as_deref()),
            base_price,
            list_price,
            currency: self.source.default_currency.clone(),
            stock,
            specifications: record.specifications.clone().filter(|s| !s.is_null()),
            is_featured: record.is_featured,
            is_new: record.is_new,
            rating_average,
            rating_count,
            source: self.source.slug.clone(),
            source_id: record.id.clone(),
            source_url: non_empty(record.source_url.as_deref()),
        };

        let staging = staging_dir(&self.source.slug, &record.id);
        let staged = self.download_images(record, &staging);
        let saved = self.repo.save_product::<ConversionError, _>(
            existing.map(|p| p.id),
            &draft,
            |product: &Product| {
                let images = staged
                    .iter()
                    .map(|image| -> Result<NewProductImage, ConversionError> {
                        Ok(NewProductImage {
                            path: product_image_path(&self.source.slug, product.id, &image.path)?,
                            ..image.clone()
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ProductChildren { images, variants })
            },
        );

        let saved = match saved {
            Ok(saved) => saved,
            Err(e) => {
                self.discard_staging(&staging);
                return Err(e);
            }
        };
        self.promote_images(&staged, saved.product.id);
        self.discard_staging(&staging);
        self.remove_files(&saved.replaced_images);

        Ok(ProductOutcome {
            product: saved.product,
            action: saved.action,
            brand,
        })
    }

    fn upsert_brand(
        &self,
        brand: &ExternalBrand,
    ) -> Result<Option<(Brand, UpsertAction)>, ConversionError> {
        let Some(name) = brand.name() else {
            return Ok(None);
        };
        let new_brand = NewBrand {
            name: BrandName::new(name)?,
            slug: Slug::new(base_slug(brand.slug.as_deref(), name, "brand"))?,
        };
        Ok(Some(self.repo.upsert_brand(&new_brand)?))
    }

    fn variants(
        &self,
        record: &ExternalProduct,
        product_name: &ProductName,
        base_price: ProductPrice,
        stock: &StockPolicy,
    ) -> Result<Vec<NewProductVariant>, ConversionError> {
        if record.variants.is_empty() {
            return Ok(vec![NewProductVariant::default_for(base_price, stock)?]);
        }
        record
            .variants
            .iter()
            .enumerate()
            .map(|(idx, variant)| self.variant(variant, idx == 0, product_name, base_price, stock))
            .collect()
    }

    fn variant(
        &self,
        variant: &ExternalVariant,
        is_default: bool,
        product_name: &ProductName,
        base_price: ProductPrice,
        stock: &StockPolicy,
    ) -> Result<NewProductVariant, ConversionError> {
        let stock = match variant.stock_status.as_deref() {
            Some(raw) => StockPolicy::from_source(Some(raw), self.in_stock_quantity),
            None => *stock,
        };
        let name = non_empty(variant.name.as_deref()).unwrap_or_else(|| product_name.to_string());
        Ok(NewProductVariant {
            name: VariantName::new(name)?,
            sku: non_empty(variant.sku.as_deref()),
            price: variant
                .price
                .map(ProductPrice::new)
                .transpose()?
                .unwrap_or(base_price),
            list_price: variant.list_price.map(ProductPrice::new).transpose()?,
            stock_quantity: stock.quantity,
            allow_backorders: stock.allow_backorders,
            is_default,
        })
    }

    fn download_images(&self, record: &ExternalProduct, dir: &str) -> Vec<NewProductImage> {
        let base_url = self.source.asset_base_url();
        let mut images = Vec::with_capacity(record.images.len());
        for (idx, image) in record.images.iter().enumerate() {
            let Some(location) = image.location() else {
                log::warn!(
                    "Skipping image {idx} of product {} without path or url",
                    record.id
                );
                continue;
            };
            let Some(path) = self.images.acquire(location, Some(base_url), dir) else {
                continue;
            };
            images.push(NewProductImage {
                path,
                alt_text: non_empty(image.alt_text.as_deref()),
                sort_order: image.sort_order.unwrap_or(idx as i32),
                is_primary: image.is_primary,
            });
        }
        assign_primary(&mut images);
        images
    }

    /// Moves staged images to the paths their committed rows point at.
    fn promote_images(&self, staged: &[NewProductImage], product_id: ProductId) {
        let storage = self.images.storage();
        for image in staged {
            let moved = product_image_path(&self.source.slug, product_id, &image.path)
                .map_err(|e| e.to_string())
                .and_then(|target| {
                    storage
                        .rename(image.path.as_str(), target.as_str())
                        .map_err(|e| e.to_string())
                });
            if let Err(e) = moved {
                log::error!(
                    "Failed to move staged image {} of product {product_id}: {e}",
                    image.path
                );
            }
        }
    }

    fn discard_staging(&self, dir: &str) {
        if let Err(e) = self.images.storage().delete_dir(dir) {
            log::warn!("Failed to remove staging directory {dir}: {e}");
        }
    }

    fn remove_files(&self, paths: &[StoredPath]) {
        for path in paths {
            if let Err(e) = self.images.storage().delete(path.as_str()) {
                log::warn!("Failed to remove stored image {path}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Value, json};

    use super::*;
    use crate::domain::product::StockStatus;
    use crate::domain::source::AuthMode;
    use crate::domain::task::{CategorySelector, ImportKind};
    use crate::repository::test::TestRepository;
    use crate::services::fixtures::{StubHttpClient, source, task};
    use crate::services::storage::FsStorage;

    fn record(value: Value) -> ExternalProduct {
        serde_json::from_value(value).unwrap()
    }

    fn quantity() -> StockQuantity {
        StockQuantity::new(100).unwrap()
    }

    #[test]
    fn creates_product_with_brand_images_and_default_variant() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let client = StubHttpClient::default();
        client
            .bytes("https://cdn.acme.test/a.jpg", "image/jpeg", b"a")
            .bytes("https://cdn.acme.test/b.png", "image/png", b"b")
            .timeout("https://cdn.acme.test/slow.jpg");
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Products, CategorySelector::All, None);
        let reconciler = ProductReconciler::new(
            &repo,
            ImageAcquirer::new(&client, &storage, Duration::from_secs(30)),
            &source,
            &task,
            quantity(),
        );

        let outcome = reconciler
            .reconcile(
                &record(json!({
                    "id": 77,
                    "name": "Cordless Drill",
                    "base_price": "49.90",
                    "stock_status": "in_stock",
                    "brand": { "name": "Makita" },
                    "images": [
                        { "path": "/a.jpg" },
                        { "path": "/slow.jpg", "is_primary": true },
                        { "url": "https://cdn.acme.test/b.png" }
                    ]
                })),
                None,
            )
            .unwrap();

        assert_eq!(outcome.action, UpsertAction::Created);
        let (brand, brand_action) = outcome.brand.unwrap();
        assert_eq!(brand.slug.as_str(), "makita");
        assert_eq!(brand_action, UpsertAction::Created);

        let product = outcome.product;
        assert_eq!(product.slug.as_str(), "cordless-drill");
        assert_eq!(product.brand_id, Some(brand.id));
        assert_eq!(product.currency.as_ref().unwrap().as_str(), "USD");
        assert_eq!(product.stock.status, StockStatus::InStock);
        assert_eq!(product.seller_id, task.seller_id);

        let images = repo.images_of(product.id);
        assert_eq!(images.len(), 2);
        assert_eq!(images.iter().filter(|i| i.is_primary).count(), 1);
        assert!(images[0].is_primary);
        let product_dir = format!("products/acme/{}/", product.id);
        for image in &images {
            assert!(image.path.as_str().starts_with(&product_dir));
            assert!(storage.exists(image.path.as_str()).unwrap());
        }
        let mut staged = std::fs::read_dir(dir.path().join("staging/acme")).unwrap();
        assert!(staged.next().is_none());

        let variants = repo.variants_of(product.id);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].price, 49.9);
        assert_eq!(variants[0].stock_quantity, 100);
        assert!(variants[0].is_default);
    }

    #[test]
    fn reimport_replaces_images_and_variants() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let client = StubHttpClient::default();
        client
            .bytes("https://cdn.acme.test/1.jpg", "image/jpeg", b"1")
            .bytes("https://cdn.acme.test/2.jpg", "image/jpeg", b"2")
            .bytes("https://cdn.acme.test/3.jpg", "image/jpeg", b"3");
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Products, CategorySelector::All, None);
        let reconciler = ProductReconciler::new(
            &repo,
            ImageAcquirer::new(&client, &storage, Duration::from_secs(30)),
            &source,
            &task,
            quantity(),
        );

        let first = reconciler
            .reconcile(
                &record(json!({
                    "id": "77",
                    "name": "Saw",
                    "base_price": 10,
                    "images": [{ "path": "1.jpg" }, { "path": "2.jpg" }],
                    "variants": [
                        { "name": "Small", "price": 10 },
                        { "name": "Large", "price": "12.5", "stock_status": "in_stock" }
                    ]
                })),
                None,
            )
            .unwrap();
        let old_images = repo.images_of(first.product.id);
        assert_eq!(old_images.len(), 2);
        assert_eq!(repo.variants_of(first.product.id).len(), 2);

        let second = reconciler
            .reconcile(
                &record(json!({
                    "id": 77,
                    "name": "Saw",
                    "base_price": 11,
                    "images": [{ "path": "3.jpg" }]
                })),
                None,
            )
            .unwrap();

        assert_eq!(second.action, UpsertAction::Updated);
        assert_eq!(second.product.id, first.product.id);
        assert_eq!(second.product.slug.as_str(), "saw");
        assert_eq!(repo.products().len(), 1);

        let new_images = repo.images_of(second.product.id);
        assert_eq!(new_images.len(), 1);
        for old in &old_images {
            assert!(!storage.exists(old.path.as_str()).unwrap());
        }
        assert!(storage.exists(new_images[0].path.as_str()).unwrap());

        let variants = repo.variants_of(second.product.id);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].price, 11.0);
    }

    #[test]
    fn variant_fields_fall_back_to_product() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let client = StubHttpClient::default();
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Products, CategorySelector::All, None);
        let reconciler = ProductReconciler::new(
            &repo,
            ImageAcquirer::new(&client, &storage, Duration::from_secs(30)),
            &source,
            &task,
            quantity(),
        );

        let outcome = reconciler
            .reconcile(
                &record(json!({
                    "id": 5,
                    "name": "Hammer",
                    "base_price": 7,
                    "stock_status": "in_stock",
                    "variants": [{ "sku": " H-1 " }, { "name": "Heavy", "stock_status": "sold_out" }]
                })),
                CategoryId::new(4).ok(),
            )
            .unwrap();

        let variants = repo.variants_of(outcome.product.id);
        assert_eq!(variants[0].name.as_str(), "Hammer");
        assert_eq!(variants[0].sku.as_deref(), Some("H-1"));
        assert_eq!(variants[0].price, 7.0);
        assert_eq!(variants[0].stock_quantity, 100);
        assert!(variants[0].is_default);
        assert_eq!(variants[1].stock_quantity, 0);
        assert!(!variants[1].allow_backorders);
        assert!(!variants[1].is_default);
        assert_eq!(outcome.product.category_id, CategoryId::new(4).ok());
    }

    #[test]
    fn invalid_record_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let client = StubHttpClient::default();
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Products, CategorySelector::All, None);
        let reconciler = ProductReconciler::new(
            &repo,
            ImageAcquirer::new(&client, &storage, Duration::from_secs(30)),
            &source,
            &task,
            quantity(),
        );

        let err = reconciler
            .reconcile(
                &record(json!({
                    "id": 5,
                    "name": "Hammer",
                    "base_price": -1,
                    "brand": { "name": "Stanley" }
                })),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ConversionError::InvalidField(_)));
        assert!(repo.products().is_empty());
        assert!(repo.brands().is_empty());
    }

    #[test]
    fn brand_is_matched_by_slug() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let client = StubHttpClient::default();
        let repo = TestRepository::new();
        let source = source(AuthMode::None);
        let task = task(ImportKind::Products, CategorySelector::All, None);
        let reconciler = ProductReconciler::new(
            &repo,
            ImageAcquirer::new(&client, &storage, Duration::from_secs(30)),
            &source,
            &task,
            quantity(),
        );

        for (id, brand) in [(1, json!({ "name": "Bosch" })), (2, json!({ "name": "BOSCH", "slug": "bosch" }))] {
            reconciler
                .reconcile(
                    &record(json!({ "id": id, "name": "Tool", "base_price": 1, "brand": brand })),
                    None,
                )
                .unwrap();
        }
        let outcome = reconciler
            .reconcile(
                &record(json!({ "id": 3, "name": "Tool", "base_price": 1, "brand": { "name": " " } })),
                None,
            )
            .unwrap();

        assert_eq!(repo.brands().len(), 1);
        assert!(outcome.brand.is_none());
        assert_eq!(outcome.product.slug.as_str(), "tool-2");
    }
}
