//! Reading and writing the on-disk catalog layout.
//!
//! The layout mirrors the embedded baseline: a `providers/` directory with
//! one YAML file per provider (descriptor plus owned models) and an
//! `authors/` directory with one YAML file per author. `save` and `load`
//! round-trip through the same serde shapes the embedded loader uses.

use std::collections::BTreeMap;
use std::path::Path;

use crate::starmap_catalog::provenance::ProvenanceStore;
use crate::starmap_catalog::store::Catalog;
use crate::starmap_core::error::Error;
use crate::starmap_types::{Author, Provider};

/// Write a catalog to `dir` as provider and author YAML files. Existing
/// files for the same ids are overwritten; stray files are left alone.
pub fn save_catalog(catalog: &Catalog, dir: &Path) -> Result<(), Error> {
    let providers_dir = dir.join("providers");
    let authors_dir = dir.join("authors");
    std::fs::create_dir_all(&providers_dir)
        .map_err(|e| Error::process(format!("create {}: {e}", providers_dir.display())))?;
    std::fs::create_dir_all(&authors_dir)
        .map_err(|e| Error::process(format!("create {}: {e}", authors_dir.display())))?;

    for provider in catalog.providers().list() {
        let path = providers_dir.join(format!("{}.yaml", provider.id));
        let body = serde_yaml::to_string(&provider)?;
        std::fs::write(&path, body)
            .map_err(|e| Error::process(format!("write {}: {e}", path.display())))?;
    }
    for author in catalog.authors().list() {
        let path = authors_dir.join(format!("{}.yaml", author.id));
        let body = serde_yaml::to_string(&author)?;
        std::fs::write(&path, body)
            .map_err(|e| Error::process(format!("write {}: {e}", path.display())))?;
    }
    tracing::debug!(
        dir = %dir.display(),
        providers = catalog.provider_count(),
        authors = catalog.author_count(),
        "catalog saved"
    );
    Ok(())
}

/// Load a catalog from the directory layout `save_catalog` writes.
pub fn load_catalog(dir: &Path) -> Result<Catalog, Error> {
    let mut providers = BTreeMap::new();
    for body in read_yaml_files(&dir.join("providers"))? {
        let provider: Provider = serde_yaml::from_str(&body)?;
        if providers.insert(provider.id.clone(), provider).is_some() {
            return Err(Error::validation(
                dir.display().to_string(),
                "duplicate provider id",
            ));
        }
    }

    let mut authors = BTreeMap::new();
    for body in read_yaml_files(&dir.join("authors"))? {
        let author: Author = serde_yaml::from_str(&body)?;
        if authors.insert(author.id.clone(), author).is_some() {
            return Err(Error::validation(
                dir.display().to_string(),
                "duplicate author id",
            ));
        }
    }

    Ok(Catalog::new(providers, authors, ProvenanceStore::new()))
}

fn read_yaml_files(dir: &Path) -> Result<Vec<String>, Error> {
    let mut bodies = Vec::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(bodies),
    };
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    paths.sort();
    for path in paths {
        let body = std::fs::read_to_string(&path)
            .map_err(|e| Error::process(format!("read {}: {e}", path.display())))?;
        bodies.push(body);
    }
    Ok(bodies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starmap_catalog::embedded;

    #[test]
    fn round_trips_the_embedded_baseline() {
        let catalog = embedded::load().unwrap();
        let temp = tempfile::tempdir().unwrap();

        save_catalog(&catalog, temp.path()).unwrap();
        let reloaded = load_catalog(temp.path()).unwrap();

        assert_eq!(reloaded.provider_count(), catalog.provider_count());
        assert_eq!(reloaded.author_count(), catalog.author_count());
        assert_eq!(reloaded.model_count(), catalog.model_count());

        let original = catalog.provider("openai").unwrap();
        let restored = reloaded.provider("openai").unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn loading_an_empty_directory_yields_an_empty_catalog() {
        let temp = tempfile::tempdir().unwrap();
        let catalog = load_catalog(temp.path()).unwrap();
        assert_eq!(catalog.provider_count(), 0);
        assert_eq!(catalog.author_count(), 0);
    }

    #[test]
    fn saved_files_land_in_the_expected_layout() {
        let catalog = embedded::load().unwrap();
        let temp = tempfile::tempdir().unwrap();
        save_catalog(&catalog, temp.path()).unwrap();

        assert!(temp.path().join("providers").join("openai.yaml").exists());
        assert!(temp.path().join("authors").join("meta.yaml").exists());
    }
}
