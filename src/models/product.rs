use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::product::{
    NewProductImage as DomainNewProductImage, NewProductVariant as DomainNewProductVariant,
    Product as DomainProduct, ProductDraft, ProductImage as DomainProductImage,
    ProductVariant as DomainProductVariant, StockPolicy, StockStatus,
};
use crate::domain::types::{
    CurrencyCode, ExternalId, ProductName, ProductPrice, RatingAverage, RatingCount, Slug,
    SourceSlug, StockQuantity, StoredPath, TypeConstraintError, VariantName,
};

/// Diesel model representing the `products` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::products)]
pub struct Product {
    pub id: i32,
    pub seller_id: i32,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
    pub name: String,
    pub slug: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub base_price: f64,
    pub list_price: Option<f64>,
    pub currency: Option<String>,
    pub stock_quantity: i32,
    pub allow_backorders: bool,
    pub stock_status: String,
    pub specifications: Option<String>,
    pub is_featured: bool,
    pub is_new: bool,
    pub rating_average: Option<f64>,
    pub rating_count: i32,
    pub source: Option<String>,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Insertable/patchable form of [`Product`].
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::products, treat_none_as_null = true)]
pub struct ProductChanges<'a> {
    pub seller_id: i32,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
    pub name: &'a str,
    pub slug: &'a str,
    pub short_description: Option<&'a str>,
    pub description: Option<&'a str>,
    pub base_price: f64,
    pub list_price: Option<f64>,
    pub currency: Option<&'a str>,
    pub stock_quantity: i32,
    pub allow_backorders: bool,
    pub stock_status: &'a str,
    pub specifications: Option<String>,
    pub is_featured: bool,
    pub is_new: bool,
    pub rating_average: Option<f64>,
    pub rating_count: i32,
    pub source: Option<&'a str>,
    pub source_id: Option<&'a str>,
    pub source_url: Option<&'a str>,
    pub updated_at: NaiveDateTime,
}

impl<'a> ProductChanges<'a> {
    pub fn new(draft: &'a ProductDraft, slug: &'a Slug, now: NaiveDateTime) -> Self {
        Self {
            seller_id: draft.seller_id.get(),
            category_id: draft.category_id.map(|id| id.get()),
            brand_id: draft.brand_id.map(|id| id.get()),
            name: draft.name.as_str(),
            slug: slug.as_str(),
            short_description: draft.short_description.as_deref(),
            description: draft.description.as_deref(),
            base_price: draft.base_price.get(),
            list_price: draft.list_price.map(ProductPrice::get),
            currency: draft.currency.as_ref().map(|c| c.as_str()),
            stock_quantity: draft.stock.quantity.get(),
            allow_backorders: draft.stock.allow_backorders,
            stock_status: draft.stock.status.as_str(),
            specifications: draft.specifications.as_ref().map(|s| s.to_string()),
            is_featured: draft.is_featured,
            is_new: draft.is_new,
            rating_average: draft.rating_average.map(RatingAverage::get),
            rating_count: draft.rating_count.get(),
            source: Some(draft.source.as_str()),
            source_id: Some(draft.source_id.as_str()),
            source_url: draft.source_url.as_deref(),
            updated_at: now,
        }
    }
}

impl TryFrom<Product> for DomainProduct {
    type Error = TypeConstraintError;

    fn try_from(product: Product) -> Result<Self, Self::Error> {
        let specifications = product
            .specifications
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| TypeConstraintError::InvalidValue(format!("specifications: {e}")))
            })
            .transpose()?;
        Ok(Self {
            id: product.id.try_into()?,
            seller_id: product.seller_id.try_into()?,
            category_id: product.category_id.map(TryInto::try_into).transpose()?,
            brand_id: product.brand_id.map(TryInto::try_into).transpose()?,
            name: ProductName::new(product.name)?,
            slug: Slug::new(product.slug)?,
            short_description: product.short_description,
            description: product.description,
            base_price: ProductPrice::new(product.base_price)?,
            list_price: product.list_price.map(ProductPrice::new).transpose()?,
            currency: product.currency.map(CurrencyCode::new).transpose()?,
            stock: StockPolicy {
                status: StockStatus::try_from(product.stock_status.as_str())?,
                quantity: StockQuantity::new(product.stock_quantity)?,
                allow_backorders: product.allow_backorders,
            },
            specifications,
            is_featured: product.is_featured,
            is_new: product.is_new,
            rating_average: product.rating_average.map(RatingAverage::new).transpose()?,
            rating_count: RatingCount::new(product.rating_count)?,
            source: product.source.map(SourceSlug::new).transpose()?,
            source_id: product.source_id.map(ExternalId::new).transpose()?,
            source_url: product.source_url,
            created_at: product.created_at,
            updated_at: product.updated_at,
        })
    }
}

/// Diesel model representing the `product_images` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::product_images)]
pub struct ProductImage {
    pub id: i32,
    pub product_id: i32,
    pub path: String,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub is_primary: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::product_images)]
pub struct NewProductImage<'a> {
    pub product_id: i32,
    pub path: &'a str,
    pub alt_text: Option<&'a str>,
    pub sort_order: i32,
    pub is_primary: bool,
}

impl<'a> NewProductImage<'a> {
    pub fn from_domain(product_id: i32, image: &'a DomainNewProductImage) -> Self {
        Self {
            product_id,
            path: image.path.as_str(),
            alt_text: image.alt_text.as_deref(),
            sort_order: image.sort_order,
            is_primary: image.is_primary,
        }
    }
}

impl TryFrom<ProductImage> for DomainProductImage {
    type Error = TypeConstraintError;

    fn try_from(image: ProductImage) -> Result<Self, Self::Error> {
        Ok(Self {
            id: image.id.try_into()?,
            product_id: image.product_id.try_into()?,
            path: StoredPath::new(image.path)?,
            alt_text: image.alt_text,
            sort_order: image.sort_order,
            is_primary: image.is_primary,
        })
    }
}

/// Diesel model representing the `product_variants` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::product_variants)]
pub struct ProductVariant {
    pub id: i32,
    pub product_id: i32,
    pub name: String,
    pub sku: Option<String>,
    pub price: f64,
    pub list_price: Option<f64>,
    pub stock_quantity: i32,
    pub allow_backorders: bool,
    pub is_default: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::product_variants)]
pub struct NewProductVariant<'a> {
    pub product_id: i32,
    pub name: &'a str,
    pub sku: Option<&'a str>,
    pub price: f64,
    pub list_price: Option<f64>,
    pub stock_quantity: i32,
    pub allow_backorders: bool,
    pub is_default: bool,
}

impl<'a> NewProductVariant<'a> {
    pub fn from_domain(product_id: i32, variant: &'a DomainNewProductVariant) -> Self {
        Self {
            product_id,
            name: variant.name.as_str(),
            sku: variant.sku.as_deref(),
            price: variant.price.get(),
            list_price: variant.list_price.map(ProductPrice::get),
            stock_quantity: variant.stock_quantity.get(),
            allow_backorders: variant.allow_backorders,
            is_default: variant.is_default,
        }
    }
}

impl TryFrom<ProductVariant> for DomainProductVariant {
    type Error = TypeConstraintError;

    fn try_from(variant: ProductVariant) -> Result<Self, Self::Error> {
        Ok(Self {
            id: variant.id.try_into()?,
            product_id: variant.product_id.try_into()?,
            name: VariantName::new(variant.name)?,
            sku: variant.sku,
            price: ProductPrice::new(variant.price)?,
            list_price: variant.list_price.map(ProductPrice::new).transpose()?,
            stock_quantity: StockQuantity::new(variant.stock_quantity)?,
            allow_backorders: variant.allow_backorders,
            is_default: variant.is_default,
        })
    }
}
