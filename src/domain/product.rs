use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::domain::types::{
    BrandId, CategoryId, CurrencyCode, ExternalId, ProductId, ProductImageId, ProductName,
    ProductPrice, ProductVariantId, RatingAverage, RatingCount, SellerId, Slug, SourceSlug,
    StockQuantity, StoredPath, TypeConstraintError, VariantName,
};

/// Raw stock status value sources use for products that can be ordered.
pub const IN_STOCK_SENTINEL: &str = "in_stock";

/// Stock availability as stored on products.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    /// Maps a raw source value. Only the exact in-stock sentinel counts as
    /// available.
    pub fn from_source(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(IN_STOCK_SENTINEL) => Self::InStock,
            _ => Self::OutOfStock,
        }
    }

    /// String representation used in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::OutOfStock => "out_of_stock",
        }
    }
}

impl Display for StockStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for StockStatus {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "in_stock" => Ok(Self::InStock),
            "out_of_stock" => Ok(Self::OutOfStock),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "stock status: {other}"
            ))),
        }
    }
}

/// Quantity and backorder policy derived from a stock status.
///
/// Sources do not report exact counts, so an available product gets a fixed
/// placeholder quantity.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct StockPolicy {
    pub status: StockStatus,
    pub quantity: StockQuantity,
    pub allow_backorders: bool,
}

impl StockPolicy {
    pub fn from_source(raw: Option<&str>, in_stock_quantity: StockQuantity) -> Self {
        match StockStatus::from_source(raw) {
            StockStatus::InStock => Self {
                status: StockStatus::InStock,
                quantity: in_stock_quantity,
                allow_backorders: true,
            },
            StockStatus::OutOfStock => Self {
                status: StockStatus::OutOfStock,
                quantity: StockQuantity::default(),
                allow_backorders: false,
            },
        }
    }
}

/// Local catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub seller_id: SellerId,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub name: ProductName,
    pub slug: Slug,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub base_price: ProductPrice,
    pub list_price: Option<ProductPrice>,
    pub currency: Option<CurrencyCode>,
    pub stock: StockPolicy,
    pub specifications: Option<serde_json::Value>,
    pub is_featured: bool,
    pub is_new: bool,
    pub rating_average: Option<RatingAverage>,
    pub rating_count: RatingCount,
    pub source: Option<SourceSlug>,
    pub source_id: Option<ExternalId>,
    pub source_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Values written when a product is created or updated.
///
/// As with categories, the final slug is resolved from `slug_base` inside the
/// write transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDraft {
    pub seller_id: SellerId,
    pub category_id: Option<CategoryId>,
    pub brand_id: Option<BrandId>,
    pub name: ProductName,
    pub slug_base: String,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub base_price: ProductPrice,
    pub list_price: Option<ProductPrice>,
    pub currency: Option<CurrencyCode>,
    pub stock: StockPolicy,
    pub specifications: Option<serde_json::Value>,
    pub is_featured: bool,
    pub is_new: bool,
    pub rating_average: Option<RatingAverage>,
    pub rating_count: RatingCount,
    pub source: SourceSlug,
    pub source_id: ExternalId,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub path: StoredPath,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProductImage {
    pub path: StoredPath,
    pub alt_text: Option<String>,
    pub sort_order: i32,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariant {
    pub id: ProductVariantId,
    pub product_id: ProductId,
    pub name: VariantName,
    pub sku: Option<String>,
    pub price: ProductPrice,
    pub list_price: Option<ProductPrice>,
    pub stock_quantity: StockQuantity,
    pub allow_backorders: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProductVariant {
    pub name: VariantName,
    pub sku: Option<String>,
    pub price: ProductPrice,
    pub list_price: Option<ProductPrice>,
    pub stock_quantity: StockQuantity,
    pub allow_backorders: bool,
    pub is_default: bool,
}

impl NewProductVariant {
    /// The variant synthesized for products delivered without any.
    pub fn default_for(price: ProductPrice, stock: &StockPolicy) -> Result<Self, TypeConstraintError> {
        Ok(Self {
            name: VariantName::new("Default")?,
            sku: None,
            price,
            list_price: None,
            stock_quantity: stock.quantity,
            allow_backorders: stock.allow_backorders,
            is_default: true,
        })
    }
}

/// Child collections that replace a product's images and variants wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChildren {
    pub images: Vec<NewProductImage>,
    pub variants: Vec<NewProductVariant>,
}

/// A product together with its image and variant sets.
#[derive(Debug, Clone)]
pub struct ProductDetails {
    pub product: Product,
    pub images: Vec<ProductImage>,
    pub variants: Vec<ProductVariant>,
}

/// Marks exactly one image as primary: the first one flagged by the source,
/// else the first image.
pub fn assign_primary(images: &mut [NewProductImage]) {
    let primary = images.iter().position(|i| i.is_primary).unwrap_or(0);
    for (idx, image) in images.iter_mut().enumerate() {
        image.is_primary = idx == primary;
    }
}
