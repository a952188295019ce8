use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{CategoryId, CategoryName, ExternalId, Slug, SourceSlug};

/// Local catalog category.
///
/// Imported categories always carry both `source` and `source_id`; locally
/// authored ones carry neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: CategoryName,
    pub slug: Slug,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub source: Option<SourceSlug>,
    pub source_id: Option<ExternalId>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Values written when a category is created or updated.
///
/// `slug_base` is the preferred slug before collision resolution; the
/// repository picks the final unique slug inside the write transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryDraft {
    pub name: CategoryName,
    pub slug_base: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub is_active: bool,
    pub source: Option<SourceSlug>,
    pub source_id: Option<ExternalId>,
}
