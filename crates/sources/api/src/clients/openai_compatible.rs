//! Client for OpenAI-compatible model listings (`GET /v1/models`).
//!
//! Serves OpenAI itself plus the compatibility crowd (Groq, Mistral, and
//! friends). The wire shape is `{object: "list", data: [{id, object,
//! created, owned_by}]}`.

use chrono::DateTime;
use serde::Deserialize;

use crate::http_transport::{auth_for_provider, HttpClient};
use crate::starmap_core::error::Error;
use crate::starmap_source::SyncContext;
use crate::starmap_types::{Model, Provider};

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelObject>,
}

#[derive(Debug, Deserialize)]
struct ModelObject {
    id: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    owned_by: Option<String>,
}

pub async fn fetch_models(
    http: &HttpClient,
    ctx: &SyncContext,
    provider: &Provider,
) -> Result<Vec<Model>, Error> {
    let Some(endpoint) = provider.catalog.as_ref().and_then(|c| c.endpoint.as_ref()) else {
        return Ok(Vec::new());
    };
    let auth = auth_for_provider(provider)?;
    if endpoint.auth_required && auth.is_none() {
        tracing::debug!(provider = %provider.id, "skipping fetch: no credentials set");
        return Ok(Vec::new());
    }

    let (body, _stats) = http.get(ctx, &endpoint.url, auth.as_ref()).await?;
    parse_models(provider, &body)
}

/// Parse a listing payload into models. Shared by the normal fetch path and
/// raw-response mode, so both dialects stay in lockstep.
pub fn parse_models(provider: &Provider, body: &[u8]) -> Result<Vec<Model>, Error> {
    let list: ModelList = serde_json::from_slice(body)?;
    Ok(list
        .data
        .into_iter()
        .map(|item| to_model(provider, item))
        .collect())
}

fn to_model(provider: &Provider, item: ModelObject) -> Model {
    let mut model = Model::new(item.id);

    if let Some(owned_by) = item.owned_by.filter(|s| !s.trim().is_empty()) {
        model.authors = vec![map_author(provider, owned_by.trim())];
    }
    if let Some(created) = item.created.filter(|c| *c > 0) {
        if let Some(date) = DateTime::from_timestamp(created, 0) {
            let metadata = model.metadata.get_or_insert_with(Default::default);
            metadata.release_date = Some(date.date_naive());
        }
    }
    model
}

/// Map a raw `owned_by` string through the provider's author mapping. A
/// string the mapping misses is kept verbatim, never dropped.
pub(crate) fn map_author(provider: &Provider, raw: &str) -> String {
    provider
        .catalog
        .as_ref()
        .and_then(|c| c.author_mapping.get(raw))
        .cloned()
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starmap_types::{CatalogEndpoint, EndpointType, ProviderCatalogConfig};

    fn provider_with_mapping() -> Provider {
        let mut provider = Provider::new("groq", "Groq");
        let mut config = ProviderCatalogConfig {
            endpoint: Some(CatalogEndpoint {
                url: "https://api.groq.com/openai/v1/models".into(),
                kind: EndpointType::OpenaiCompatible,
                auth_required: true,
            }),
            ..Default::default()
        };
        config
            .author_mapping
            .insert("Meta".to_string(), "meta".to_string());
        provider.catalog = Some(config);
        provider
    }

    #[test]
    fn parses_the_listing_shape() {
        let provider = provider_with_mapping();
        let body = br#"{
            "object": "list",
            "data": [
                {"id": "llama-3.3-70b-versatile", "object": "model", "created": 1733447754, "owned_by": "Meta"},
                {"id": "whisper-large-v3", "object": "model", "created": 1693721698, "owned_by": "OpenAI"}
            ]
        }"#;
        let models = parse_models(&provider, body).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "llama-3.3-70b-versatile");
        assert_eq!(models[0].authors, vec!["meta"]);
        assert!(models[0].metadata.as_ref().unwrap().release_date.is_some());
    }

    #[test]
    fn unmapped_owned_by_is_kept_verbatim() {
        let provider = provider_with_mapping();
        let body = br#"{"object": "list", "data": [{"id": "m", "owned_by": "Acme Labs"}]}"#;
        let models = parse_models(&provider, body).unwrap();
        assert_eq!(models[0].authors, vec!["Acme Labs"]);
    }

    #[test]
    fn malformed_payload_is_a_parse_error() {
        let provider = provider_with_mapping();
        let result = parse_models(&provider, b"<html>nope</html>");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }
}
