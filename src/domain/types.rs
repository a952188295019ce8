//! Strongly-typed value objects used by domain entities.
//!
//! Domain structs should carry these wrappers instead of raw primitives so that
//! identifiers, text values and numeric constraints are enforced at the
//! boundary.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Errors produced when attempting to construct constrained domain types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeConstraintError {
    /// An identifier was zero or negative.
    #[error("{0} must be greater than zero")]
    NonPositiveId(&'static str),
    /// A numeric value required to be non-negative was negative or not finite.
    #[error("{0} must be zero or greater")]
    NegativeNumber(&'static str),
    /// A string was empty or whitespace-only after trimming.
    #[error("{0} cannot be empty")]
    EmptyString(&'static str),
    /// An endpoint template did not match its placeholder rules.
    #[error("invalid endpoint template `{template}`: {reason}")]
    InvalidTemplate {
        template: String,
        reason: &'static str,
    },
    /// Catch-all for custom validation failures.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

fn trim_and_require_non_empty<S: Into<String>>(
    value: S,
    field: &'static str,
) -> Result<String, TypeConstraintError> {
    let trimmed = value.into().trim().to_string();
    if trimmed.is_empty() {
        Err(TypeConstraintError::EmptyString(field))
    } else {
        Ok(trimmed)
    }
}

/// Macro to generate lightweight newtypes for positive identifiers.
macro_rules! id_newtype {
    ($name:ident, $doc:expr, $field:expr) => {
        #[doc = $doc]
        #[derive(
            Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Creates a new identifier ensuring it is greater than zero.
            pub fn new(value: i32) -> Result<Self, TypeConstraintError> {
                if value > 0 {
                    Ok(Self(value))
                } else {
                    Err(TypeConstraintError::NonPositiveId($field))
                }
            }

            /// Returns the raw `i32` backing this identifier.
            pub const fn get(self) -> i32 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<i32> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl PartialEq<i32> for $name {
            fn eq(&self, other: &i32) -> bool {
                self.0 == *other
            }
        }
    };
}

macro_rules! non_empty_string_newtype {
    ($name:ident, $doc:expr, $field:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Constructs a trimmed, non-empty value.
            pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
                trim_and_require_non_empty(value, $field).map(Self)
            }

            /// Borrow the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the owned string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }
    };
}

trait NonNegative: Copy {
    fn is_non_negative(self) -> bool;
}

impl NonNegative for f64 {
    fn is_non_negative(self) -> bool {
        self.is_finite() && self >= 0.0
    }
}

impl NonNegative for i32 {
    fn is_non_negative(self) -> bool {
        self >= 0
    }
}

/// Generates a newtype over a numeric primitive that rejects negative values.
///
/// Floating point inputs must additionally be finite.
macro_rules! non_negative_newtype {
    ($name:ident, $inner:ty, $doc:expr, $field:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, PartialOrd)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Constructs a value that must be zero or greater.
            pub fn new(value: $inner) -> Result<Self, TypeConstraintError> {
                if value.is_non_negative() {
                    Ok(Self(value))
                } else {
                    Err(TypeConstraintError::NegativeNumber($field))
                }
            }

            /// Returns the raw value.
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<$inner> for $name {
            type Error = TypeConstraintError;

            fn try_from(value: $inner) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for $inner {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl PartialEq<$inner> for $name {
            fn eq(&self, other: &$inner) -> bool {
                self.0 == *other
            }
        }
    };
}

id_newtype!(
    SourceConfigId,
    "Unique identifier for an external catalog source.",
    "source_config_id"
);
id_newtype!(
    ImportTaskId,
    "Unique identifier for a saved import task.",
    "import_task_id"
);
id_newtype!(
    ImportRunId,
    "Unique identifier for one execution of an import task.",
    "import_run_id"
);
id_newtype!(
    ImportRunItemId,
    "Unique identifier for an import audit item.",
    "import_run_item_id"
);
id_newtype!(
    CategoryId,
    "Unique identifier for a category.",
    "category_id"
);
id_newtype!(ProductId, "Unique identifier for a product.", "product_id");
id_newtype!(
    ProductImageId,
    "Unique identifier for a product image.",
    "product_image_id"
);
id_newtype!(
    ProductVariantId,
    "Unique identifier for a product variant.",
    "product_variant_id"
);
id_newtype!(BrandId, "Unique identifier for a brand.", "brand_id");
id_newtype!(
    SellerId,
    "Identifier of the seller owning imported products.",
    "seller_id"
);

non_empty_string_newtype!(
    SourceSlug,
    "Stable slug identifying an external catalog source.",
    "source slug"
);
non_empty_string_newtype!(
    SourceName,
    "Human readable source name.",
    "source name"
);
non_empty_string_newtype!(
    BaseUrl,
    "Base URL of a source API. Not validated beyond being non-empty.",
    "base url"
);
non_empty_string_newtype!(
    CurrencyCode,
    "Currency code such as `USD`.",
    "currency"
);
non_empty_string_newtype!(TaskName, "Import task display name.", "task name");
non_empty_string_newtype!(
    CategoryName,
    "Category name enforcing non-empty values.",
    "category name"
);
non_empty_string_newtype!(
    ProductName,
    "Product name enforcing non-empty values.",
    "product name"
);
non_empty_string_newtype!(
    VariantName,
    "Product variant name enforcing non-empty values.",
    "variant name"
);
non_empty_string_newtype!(BrandName, "Brand name enforcing non-empty values.", "brand name");
non_empty_string_newtype!(
    Slug,
    "URL slug unique within its entity table.",
    "slug"
);
non_empty_string_newtype!(
    StoredPath,
    "Relative path of a file persisted in blob storage.",
    "stored path"
);

non_negative_newtype!(
    ProductPrice,
    f64,
    "Non-negative price value in standard currency units.",
    "price"
);
non_negative_newtype!(
    RatingAverage,
    f64,
    "Average customer rating.",
    "rating average"
);
non_negative_newtype!(
    StockQuantity,
    i32,
    "Units available for sale.",
    "stock quantity"
);
non_negative_newtype!(
    ItemCount,
    i32,
    "Counter of import items.",
    "item count"
);
non_negative_newtype!(
    RatingCount,
    i32,
    "Number of customer ratings.",
    "rating count"
);

/// Identifier of a record in an external catalog.
///
/// External systems use both numeric and string identifiers, so the value is
/// normalized to a trimmed string. JSON numbers and strings are both accepted.
#[derive(Clone, Debug, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ExternalId(String);

impl ExternalId {
    /// Constructs a trimmed, non-empty identifier.
    pub fn new<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        trim_and_require_non_empty(value, "source id").map(Self)
    }

    /// Reads an identifier from an arbitrary JSON value.
    ///
    /// Returns `None` for anything that is not a non-empty string or a number.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Self::new(s.as_str()).ok(),
            serde_json::Value::Number(n) => Self::new(n.to_string()).ok(),
            _ => None,
        }
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ExternalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for ExternalId {
    type Error = TypeConstraintError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ExternalId {
    type Error = TypeConstraintError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExternalId> for String {
    fn from(value: ExternalId) -> Self {
        value.0
    }
}

impl PartialEq<&str> for ExternalId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<'de> Deserialize<'de> for ExternalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&value).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "expected a non-empty string or number identifier, got {value}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_non_empty_strings() {
        let value = ProductName::new("  product  ").unwrap();
        assert_eq!(value.as_str(), "product");
    }

    #[test]
    fn rejects_empty_strings() {
        assert_eq!(
            CategoryName::new("   ").unwrap_err(),
            TypeConstraintError::EmptyString("category name")
        );
    }

    #[test]
    fn rejects_non_positive_ids() {
        let err = ProductId::new(0).unwrap_err();
        assert_eq!(err, TypeConstraintError::NonPositiveId("product_id"));
    }

    #[test]
    fn product_price_allows_zero() {
        assert_eq!(ProductPrice::new(0.0).unwrap().get(), 0.0);
    }

    #[test]
    fn product_price_rejects_negative_and_non_finite_numbers() {
        assert_eq!(
            ProductPrice::new(-0.01).unwrap_err(),
            TypeConstraintError::NegativeNumber("price")
        );
        assert!(ProductPrice::new(f64::NAN).is_err());
        assert!(ProductPrice::new(f64::INFINITY).is_err());
    }

    #[test]
    fn stock_quantity_rejects_negative() {
        assert!(StockQuantity::new(0).is_ok());
        assert_eq!(
            StockQuantity::new(-1).unwrap_err(),
            TypeConstraintError::NegativeNumber("stock quantity")
        );
    }

    #[test]
    fn external_id_accepts_numbers_and_strings() {
        let numeric: ExternalId = serde_json::from_str("77").unwrap();
        let text: ExternalId = serde_json::from_str("\" abc-1 \"").unwrap();
        assert_eq!(numeric, "77");
        assert_eq!(text, "abc-1");
        assert!(serde_json::from_str::<ExternalId>("null").is_err());
        assert!(serde_json::from_str::<ExternalId>("\"\"").is_err());
    }
}
