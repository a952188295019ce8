//! Error conversion glue between layers.
//!
//! The domain layer must not depend on repository or service error types, so
//! the conversions out of [`TypeConstraintError`] live here.

use pushkind_common::repository::errors::RepositoryError;

use crate::domain::types::TypeConstraintError;

impl From<TypeConstraintError> for RepositoryError {
    fn from(val: TypeConstraintError) -> Self {
        RepositoryError::ValidationError(val.to_string())
    }
}

#[cfg(feature = "worker")]
mod worker {
    use crate::domain::types::TypeConstraintError;
    use crate::services::errors::{ConversionError, ImportError};

    impl From<TypeConstraintError> for ConversionError {
        fn from(val: TypeConstraintError) -> Self {
            ConversionError::InvalidField(val.to_string())
        }
    }

    impl From<TypeConstraintError> for ImportError {
        fn from(val: TypeConstraintError) -> Self {
            ImportError::InvalidConfiguration(val.to_string())
        }
    }
}
