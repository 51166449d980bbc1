//! Content-store to search-index synchronization.
//!
//! [`Indexer`] ties the pieces together: the [`FieldCatalog`] decides which
//! fields are indexed, the [`TypeInferencer`] types them from sampled data, the
//! [`MappingBuilder`] turns that into a mapping, and the
//! [`DocumentTransformer`] builds documents against it.
pub mod catalog;
pub mod indexer;
pub mod infer;
pub mod mapping;
pub mod summary;
pub mod transform;

pub use catalog::{AvailableFields, FieldCatalog};
pub use indexer::Indexer;
pub use infer::{Classification, TypeInferencer};
pub use mapping::MappingBuilder;
pub use summary::{BulkSummary, ReindexProgress, RemapSummary, UnitFailure};
pub use transform::{DocumentTransformer, Transformed};
