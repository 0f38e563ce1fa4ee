//! Client for the Google Generative Language listing (`GET /v1beta/models`).

use serde::Deserialize;

use crate::http_transport::{auth_for_provider, HttpClient};
use crate::starmap_core::error::Error;
use crate::starmap_source::SyncContext;
use crate::starmap_types::{Model, ModelLimits, Provider};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    /// Resource name, e.g. `models/gemini-2.0-flash`
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_token_limit: Option<i64>,
    #[serde(default)]
    output_token_limit: Option<i64>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
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

/// Parse a listing payload; the raw-response counterpart of `fetch_models`.
pub fn parse_models(provider: &Provider, body: &[u8]) -> Result<Vec<Model>, Error> {
    let list: ModelList = serde_json::from_slice(body)?;
    Ok(list
        .models
        .into_iter()
        .map(|e| to_model(provider, e))
        .collect())
}

fn to_model(provider: &Provider, entry: Entry) -> Model {
    let id = entry
        .name
        .strip_prefix("models/")
        .unwrap_or(&entry.name)
        .to_string();
    let mut model = Model::new(id);

    if let Some(name) = entry.display_name.filter(|s| !s.is_empty()) {
        model.name = name;
    }
    model.description = entry.description.filter(|s| !s.is_empty());
    model.authors = vec![super::openai_compatible::map_author(provider, &provider.id)];

    if entry.input_token_limit.is_some() || entry.output_token_limit.is_some() {
        model.limits = Some(ModelLimits {
            context_window: entry.input_token_limit,
            output_tokens: entry.output_token_limit,
        });
    }
    if entry
        .supported_generation_methods
        .iter()
        .any(|m| m == "streamGenerateContent")
    {
        let features = model.features.get_or_insert_with(Default::default);
        features.streaming = true;
    }
    model
}
