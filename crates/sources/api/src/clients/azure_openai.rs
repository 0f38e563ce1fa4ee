//! Client for Azure OpenAI deployments (`GET /openai/models`).
//!
//! Azure speaks a near-OpenAI dialect but requires an `api-version` query
//! parameter and reports lifecycle/capability metadata instead of
//! `owned_by`.

use chrono::DateTime;
use serde::Deserialize;

use crate::http_transport::{auth_for_provider, HttpClient};
use crate::starmap_core::error::Error;
use crate::starmap_source::SyncContext;
use crate::starmap_types::{Model, Provider};

const API_VERSION: &str = "2024-10-21";

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    #[serde(default)]
    created_at: Option<i64>,
    #[serde(default)]
    lifecycle_status: Option<String>,
    #[serde(default)]
    capabilities: Option<Capabilities>,
}

#[derive(Debug, Default, Deserialize)]
struct Capabilities {
    #[serde(default)]
    chat_completion: bool,
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

    let separator = if endpoint.url.contains('?') { '&' } else { '?' };
    let url = format!("{}{separator}api-version={API_VERSION}", endpoint.url);
    let (body, _stats) = http.get(ctx, &url, auth.as_ref()).await?;
    parse_models(provider, &body)
}

/// Parse a listing payload; the raw-response counterpart of `fetch_models`.
/// Deprecated/retired deployments are skipped.
pub fn parse_models(provider: &Provider, body: &[u8]) -> Result<Vec<Model>, Error> {
    let list: ModelList = serde_json::from_slice(body)?;
    Ok(list
        .data
        .into_iter()
        .filter(|entry| {
            entry
                .lifecycle_status
                .as_deref()
                .is_none_or(|status| !status.eq_ignore_ascii_case("deprecated"))
        })
        .map(|entry| to_model(provider, entry))
        .collect())
}

fn to_model(provider: &Provider, entry: Entry) -> Model {
    let mut model = Model::new(entry.id);
    model.authors = vec![super::openai_compatible::map_author(provider, &provider.id)];
    if let Some(created) = entry.created_at.filter(|c| *c > 0) {
        if let Some(date) = DateTime::from_timestamp(created, 0) {
            let metadata = model.metadata.get_or_insert_with(Default::default);
            metadata.release_date = Some(date.date_naive());
        }
    }
    if entry.capabilities.is_some_and(|c| c.chat_completion) {
        let features = model.features.get_or_insert_with(Default::default);
        features.streaming = true;
    }
    model
}
