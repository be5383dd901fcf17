//! Field Metadata
//!
//! The closed set of tables and fields a rule tree may reference. The
//! compiler resolves every identifier through a `Catalog`, so nothing a
//! client sends ever reaches an identifier position unchecked.
//!
//! The built-in catalog describes the sample schema created by `db`;
//! a JSON file with the same shape as `GET /api/metadata/fields` can
//! replace it.

mod catalog;
mod sample;

pub use catalog::{Catalog, CatalogError, FieldMetadata, FieldType, TableMetadata, TableSummary};
