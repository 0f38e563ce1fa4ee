//! Entity definitions for the starmap catalog
//!
//! This crate provides the core types shared across the catalog store, the
//! sync pipeline, and the differ: models, providers, authors, and the
//! type-erased provenance value.

pub mod author;
pub mod model;
pub mod pricing;
pub mod provider;
pub mod value;

use serde::{Deserialize, Serialize};

pub use self::author::Author;
pub use self::model::{
    Modality, Model, ModelArchitecture, ModelFeatures, ModelLimits, ModelMetadata,
    ModelModalities, Quantization, Tokenizer,
};
pub use self::pricing::{ModelPricing, OperationPricing, TokenCost, TokenPricing};
pub use self::provider::{
    AuthStatus, CatalogEndpoint, EndpointType, Provider, ProviderApiKey, ProviderCatalogConfig,
};
pub use self::value::Value;

/// Kind of catalog resource a provenance record or change refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Model,
    Provider,
    Author,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Model => "model",
            ResourceKind::Provider => "provider",
            ResourceKind::Author => "author",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
