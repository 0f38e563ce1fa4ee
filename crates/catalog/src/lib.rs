//! Catalog store: deep-copy-on-read container for providers, authors, and
//! models, plus the per-field provenance store and the embedded baseline.

pub mod embedded;
pub mod persist;
pub mod provenance;
pub mod search;
pub mod store;

pub use crate::catalog::persist::{load_catalog, save_catalog};
pub use crate::catalog::provenance::{ProvenanceRecord, ProvenanceStore};
pub use crate::catalog::search::{search_models, ModelQuery};
pub use crate::catalog::store::{
    resource_id, AuthorCollection, Catalog, CatalogHandle, ModelEntry, ProviderCollection,
};

use crate::starmap_core::error::Error;

/// Load the embedded baseline catalog behind a swappable handle.
pub fn open_catalog() -> Result<CatalogHandle, Error> {
    Ok(CatalogHandle::new(embedded::load()?))
}
