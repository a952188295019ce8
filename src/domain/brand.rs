use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{BrandId, BrandName, Slug};

/// Product brand, matched by slug during import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: BrandName,
    pub slug: Slug,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Data required to insert a new [`Brand`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBrand {
    pub name: BrandName,
    pub slug: Slug,
}
