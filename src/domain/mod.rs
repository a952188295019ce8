//! Domain entities and value objects of the catalog importer.

pub mod brand;
pub mod category;
pub mod external;
pub mod product;
pub mod run;
pub mod slug;
pub mod source;
pub mod task;
pub mod types;
