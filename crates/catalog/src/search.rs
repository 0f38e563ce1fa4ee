//! Query helpers over the flattened model list.
//!
//! The CLI's list/show commands filter by free text, provider, capability
//! flags, and modality; the query runs against deep copies like every other
//! read.

use crate::starmap_catalog::store::{Catalog, ModelEntry};
use crate::starmap_types::Modality;

/// Filter over the flattened model list. Unset fields do not constrain.
#[derive(Debug, Clone)]
pub struct ModelQuery {
    /// Case-insensitive substring match against model id and display name
    pub text: Option<String>,
    /// Provider id or alias
    pub provider: Option<String>,
    pub tools: Option<bool>,
    pub reasoning: Option<bool>,
    /// Require this input modality
    pub input_modality: Option<Modality>,
    /// Maximum number of results
    pub limit: usize,
}

impl Default for ModelQuery {
    fn default() -> Self {
        Self {
            text: None,
            provider: None,
            tools: None,
            reasoning: None,
            input_modality: None,
            limit: 50,
        }
    }
}

impl ModelQuery {
    fn matches(&self, entry: &ModelEntry) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_ascii_lowercase();
            let id = entry.model.id.to_ascii_lowercase();
            let name = entry.model.name.to_ascii_lowercase();
            if !id.contains(&needle) && !name.contains(&needle) {
                return false;
            }
        }
        if let Some(tools) = self.tools {
            let has = entry.model.features.as_ref().is_some_and(|f| f.tools);
            if has != tools {
                return false;
            }
        }
        if let Some(reasoning) = self.reasoning {
            let has = entry.model.features.as_ref().is_some_and(|f| f.reasoning);
            if has != reasoning {
                return false;
            }
        }
        if let Some(modality) = self.input_modality {
            let has = entry
                .model
                .features
                .as_ref()
                .is_some_and(|f| f.modalities.input.contains(&modality));
            if !has {
                return false;
            }
        }
        true
    }
}

/// Run a query against a catalog. Results keep the catalog's model-id
/// ordering and are truncated to the query limit.
pub fn search_models(catalog: &Catalog, query: &ModelQuery) -> Vec<ModelEntry> {
    // Resolve the provider filter through aliases first so "gemini" finds
    // the google provider.
    let provider_id = match &query.provider {
        Some(id_or_alias) => match catalog.providers().resolve(id_or_alias) {
            Ok(provider) => Some(provider.id),
            Err(_) => return Vec::new(),
        },
        None => None,
    };

    catalog
        .models()
        .into_iter()
        .filter(|entry| {
            provider_id
                .as_deref()
                .is_none_or(|id| entry.provider == id)
        })
        .filter(|entry| query.matches(entry))
        .take(query.limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starmap_catalog::embedded;

    #[test]
    fn text_search_matches_id_and_name() {
        let catalog = embedded::load().unwrap();
        let query = ModelQuery {
            text: Some("haiku".into()),
            ..Default::default()
        };
        let results = search_models(&catalog, &query);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].model.id, "claude-3-5-haiku-20241022");
    }

    #[test]
    fn provider_filter_resolves_aliases() {
        let catalog = embedded::load().unwrap();
        let query = ModelQuery {
            provider: Some("gemini".into()),
            ..Default::default()
        };
        let results = search_models(&catalog, &query);
        assert!(!results.is_empty());
        assert!(results.iter().all(|e| e.provider == "google"));

        let missing = ModelQuery {
            provider: Some("not-a-provider".into()),
            ..Default::default()
        };
        assert!(search_models(&catalog, &missing).is_empty());
    }

    #[test]
    fn capability_flags_constrain() {
        let catalog = embedded::load().unwrap();
        let query = ModelQuery {
            reasoning: Some(true),
            ..Default::default()
        };
        let results = search_models(&catalog, &query);
        assert!(!results.is_empty());
        assert!(results
            .iter()
            .all(|e| e.model.features.as_ref().unwrap().reasoning));
    }

    #[test]
    fn limit_truncates_results() {
        let catalog = embedded::load().unwrap();
        let query = ModelQuery {
            limit: 3,
            ..Default::default()
        };
        assert_eq!(search_models(&catalog, &query).len(), 3);
    }

    #[test]
    fn modality_filter_requires_membership() {
        let catalog = embedded::load().unwrap();
        let query = ModelQuery {
            input_modality: Some(Modality::Video),
            ..Default::default()
        };
        let results = search_models(&catalog, &query);
        assert!(!results.is_empty());
        assert!(results.iter().all(|e| e.provider == "google"));
    }
}
