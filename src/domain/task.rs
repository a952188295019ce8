use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::domain::types::{
    CategoryId, ExternalId, ImportTaskId, SellerId, SourceConfigId, TaskName, TypeConstraintError,
};

/// What an import task pulls from its source. A task imports one or the
/// other, never both.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Categories,
    Products,
}

impl ImportKind {
    /// String representation used in persistence.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Products => "products",
        }
    }
}

impl Display for ImportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ImportKind {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "categories" => Ok(Self::Categories),
            "products" => Ok(Self::Products),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "import kind: {other}"
            ))),
        }
    }
}

/// Which part of the source category tree a task covers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CategorySelector {
    /// The whole tree.
    All,
    /// One external category and all of its descendants.
    Single(ExternalId),
}

impl CategorySelector {
    /// Persisted form: `None` stands for every category.
    pub fn from_column(value: Option<String>) -> Result<Self, TypeConstraintError> {
        match value {
            None => Ok(Self::All),
            Some(id) => Ok(Self::Single(ExternalId::new(id)?)),
        }
    }

    pub fn to_column(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Single(id) => Some(id.as_str()),
        }
    }
}

/// A saved, reusable import configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportTask {
    pub id: ImportTaskId,
    pub name: TaskName,
    pub source_config_id: SourceConfigId,
    /// Local category used as the import root (categories) or fallback
    /// category (products).
    pub target_category_id: Option<CategoryId>,
    /// Seller that owns created products.
    pub seller_id: SellerId,
    pub kind: ImportKind,
    pub selector: CategorySelector,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Data required to save a new [`ImportTask`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NewImportTask {
    pub name: TaskName,
    pub source_config_id: SourceConfigId,
    pub target_category_id: Option<CategoryId>,
    pub seller_id: SellerId,
    pub kind: ImportKind,
    pub selector: CategorySelector,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_uses_null_for_all_categories() {
        assert_eq!(CategorySelector::from_column(None).unwrap(), CategorySelector::All);
        assert_eq!(CategorySelector::All.to_column(), None);

        let single = CategorySelector::from_column(Some("12".into())).unwrap();
        assert_eq!(single.to_column(), Some("12"));
    }

    #[test]
    fn parses_import_kind() {
        assert_eq!(ImportKind::try_from("products").unwrap(), ImportKind::Products);
        assert!(ImportKind::try_from("brands").is_err());
    }
}
