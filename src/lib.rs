#[path = "../crates/types/src/lib.rs"]
pub mod types;
#[path = "../crates/core/src/lib.rs"]
pub mod core;
#[path = "../crates/schema/src/lib.rs"]
pub mod schema;
#[path = "../crates/authority/src/lib.rs"]
pub mod authority;
#[path = "../crates/catalog/src/lib.rs"]
pub mod catalog;
#[path = "../crates/diff/src/lib.rs"]
pub mod diff;
#[path = "../crates/merge/src/lib.rs"]
pub mod merge;
#[path = "../crates/source/src/lib.rs"]
pub mod source;
#[path = "../crates/transports/http/src/lib.rs"]
pub mod transport_http;

#[path = "../crates/sources/api/src/lib.rs"]
pub mod source_api;
#[path = "../crates/sources/embedded/src/lib.rs"]
pub mod source_embedded;
#[path = "../crates/sources/models-dev/src/lib.rs"]
pub mod source_models_dev;

#[path = "../crates/sync/src/lib.rs"]
pub mod sync;
#[path = "../crates/export/src/lib.rs"]
pub mod export;

pub mod sources {
    pub use crate::source_api as api;
    pub use crate::source_embedded as embedded;
    pub use crate::source_models_dev as models_dev;
}

pub use crate::catalog::{open_catalog, Catalog, CatalogHandle};
pub use crate::core::error::Error;
pub use crate::diff::Changeset;
pub use crate::sync::{pipeline, start_pipeline, Pipeline, SourceError, SyncOptions, SyncResult};

pub(crate) use crate::authority as starmap_authority;
pub(crate) use crate::catalog as starmap_catalog;
pub(crate) use crate::core as starmap_core;
pub(crate) use crate::diff as starmap_diff;
pub(crate) use crate::merge as starmap_merge;
pub(crate) use crate::schema as starmap_schema;
pub(crate) use crate::source as starmap_source;
#[allow(unused_imports)]
pub(crate) use crate::source_api as starmap_source_api;
#[allow(unused_imports)]
pub(crate) use crate::source_embedded as starmap_source_embedded;
#[allow(unused_imports)]
pub(crate) use crate::source_models_dev as starmap_source_models_dev;
pub(crate) use crate::transport_http as http_transport;
pub(crate) use crate::types as starmap_types;
