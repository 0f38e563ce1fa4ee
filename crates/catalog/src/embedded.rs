//! The embedded baseline catalog.
//!
//! One YAML file per provider (descriptor plus owned models) and one per
//! author, compiled into the binary. `open_catalog` starts from this
//! baseline; syncs refine it with live data.

use std::collections::BTreeMap;

use crate::starmap_catalog::provenance::ProvenanceStore;
use crate::starmap_catalog::store::Catalog;
use crate::starmap_core::error::Error;
use crate::starmap_types::{Author, Provider};

const PROVIDER_FILES: &[(&str, &str)] = &[
    (
        "anthropic.yaml",
        include_str!("../embedded/providers/anthropic.yaml"),
    ),
    (
        "google.yaml",
        include_str!("../embedded/providers/google.yaml"),
    ),
    ("groq.yaml", include_str!("../embedded/providers/groq.yaml")),
    (
        "mistral.yaml",
        include_str!("../embedded/providers/mistral.yaml"),
    ),
    (
        "openai.yaml",
        include_str!("../embedded/providers/openai.yaml"),
    ),
];

const AUTHOR_FILES: &[(&str, &str)] = &[
    (
        "anthropic.yaml",
        include_str!("../embedded/authors/anthropic.yaml"),
    ),
    ("google.yaml", include_str!("../embedded/authors/google.yaml")),
    ("meta.yaml", include_str!("../embedded/authors/meta.yaml")),
    (
        "mistral.yaml",
        include_str!("../embedded/authors/mistral.yaml"),
    ),
    ("openai.yaml", include_str!("../embedded/authors/openai.yaml")),
];

/// Parse the embedded provider and author files into a catalog.
pub fn load() -> Result<Catalog, Error> {
    let mut providers = BTreeMap::new();
    for (file, raw) in PROVIDER_FILES {
        let provider: Provider = serde_yaml::from_str(raw)
            .map_err(|e| Error::parse(format!("embedded provider {file}: {e}")))?;
        if providers.insert(provider.id.clone(), provider).is_some() {
            return Err(Error::validation(
                format!("embedded/{file}"),
                "duplicate provider id",
            ));
        }
    }

    let mut authors = BTreeMap::new();
    for (file, raw) in AUTHOR_FILES {
        let author: Author = serde_yaml::from_str(raw)
            .map_err(|e| Error::parse(format!("embedded author {file}: {e}")))?;
        if authors.insert(author.id.clone(), author).is_some() {
            return Err(Error::validation(
                format!("embedded/{file}"),
                "duplicate author id",
            ));
        }
    }

    Ok(Catalog::new(providers, authors, ProvenanceStore::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_parses() {
        let catalog = load().expect("embedded catalog must parse");
        assert!(catalog.provider_count() >= 5);
        assert!(catalog.author_count() >= 5);
        assert!(catalog.model_count() >= 8);
    }

    #[test]
    fn embedded_catalog_passes_validation() {
        let catalog = load().unwrap();
        let issues = catalog.validate();
        assert!(issues.is_empty(), "embedded baseline invalid: {issues:?}");
    }

    #[test]
    fn embedded_providers_have_endpoints() {
        let catalog = load().unwrap();
        let openai = catalog.provider("openai").unwrap();
        let endpoint = openai.catalog.unwrap().endpoint.unwrap();
        assert!(endpoint.url.starts_with("https://"));
    }
}
