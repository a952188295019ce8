//! Boundary types for payloads delivered by external catalog sources.
//!
//! Sources send loosely shaped JSON. Every record is kept as a raw
//! [`serde_json::Value`] for the audit trail and decoded into one of the typed
//! records below right before reconciliation, so that a malformed record fails
//! on its own without affecting its siblings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::types::ExternalId;

/// Reads a price given either as a JSON number or a numeric string.
fn parse_price(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("price out of range: {n}")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("price is not numeric: {s:?}")),
        other => Err(format!("price must be a number, got {other}")),
    }
}

fn required_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_price(&value)
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("price is required"))
}

fn optional_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_price(&value).map_err(serde::de::Error::custom)
}

/// Treats `null` like a missing field for collections and flags.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One record of the category listing endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExternalCategory {
    pub id: ExternalId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<ExternalId>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExternalBrand {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl ExternalBrand {
    /// The trimmed brand name, if the source sent a usable one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExternalImage {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_primary: bool,
}

impl ExternalImage {
    /// Location of the image: `path` when present, else `url`.
    pub fn location(&self) -> Option<&str> {
        self.path
            .as_deref()
            .or(self.url.as_deref())
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExternalVariant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "optional_price")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "optional_price")]
    pub list_price: Option<f64>,
    #[serde(default)]
    pub stock_status: Option<String>,
}

/// One record of a products page.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExternalProduct {
    pub id: ExternalId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "required_price")]
    pub base_price: f64,
    #[serde(default, deserialize_with = "optional_price")]
    pub list_price: Option<f64>,
    #[serde(default)]
    pub stock_status: Option<String>,
    #[serde(default)]
    pub specifications: Option<Value>,
    #[serde(default)]
    pub brand: Option<ExternalBrand>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ExternalImage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<ExternalVariant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_featured: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_new: bool,
    #[serde(default, deserialize_with = "optional_price")]
    pub rating_average: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<i32>,
    #[serde(default, alias = "url")]
    pub source_url: Option<String>,
}

/// Envelope of the category listing and category search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryListing {
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<Value>,
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default)]
    pub last_page: Option<u32>,
}

/// A products page. Sources either nest the page under `products` or return
/// it at the top level.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductPage {
    Nested { products: PageBody },
    Flat(PageBody),
}

impl ProductPage {
    fn body(&self) -> &PageBody {
        match self {
            Self::Nested { products } => products,
            Self::Flat(body) => body,
        }
    }

    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Nested { products } => products.data,
            Self::Flat(body) => body.data,
        }
    }

    pub fn records(&self) -> &[Value] {
        &self.body().data
    }

    /// Total number of records across all pages, falling back to the size of
    /// this page when the source omits it.
    pub fn total(&self) -> i64 {
        let body = self.body();
        body.total.unwrap_or(body.data.len() as i64).max(0)
    }

    /// Number of the last page, at least 1.
    pub fn last_page(&self) -> u32 {
        self.body().last_page.unwrap_or(1).max(1)
    }
}

/// Read access to the tree links of a flat category record.
pub trait CategoryNode {
    fn external_id(&self) -> Option<ExternalId>;
    fn external_parent_id(&self) -> Option<ExternalId>;
}

impl CategoryNode for ExternalCategory {
    fn external_id(&self) -> Option<ExternalId> {
        Some(self.id.clone())
    }

    fn external_parent_id(&self) -> Option<ExternalId> {
        self.parent_id.clone()
    }
}

/// Raw records are filtered before they are decoded, so a record that later
/// fails conversion still takes part in subtree selection.
impl CategoryNode for Value {
    fn external_id(&self) -> Option<ExternalId> {
        self.get("id").and_then(ExternalId::from_json)
    }

    fn external_parent_id(&self) -> Option<ExternalId> {
        self.get("parent_id").and_then(ExternalId::from_json)
    }
}

/// Best-effort source id of a raw record, used for audit rows of records that
/// fail to decode.
pub fn raw_source_id(record: &Value) -> Option<ExternalId> {
    record.get("id").and_then(ExternalId::from_json)
}
