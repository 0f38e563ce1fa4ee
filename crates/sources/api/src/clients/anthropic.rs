//! Client for the Anthropic-native model listing (`GET /v1/models`).
//!
//! Anthropic pages with `has_more`/`last_id`; the fetch path follows the
//! pages, the raw path parses a single page.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::http_transport::{auth_for_provider, HttpClient};
use crate::starmap_core::error::Error;
use crate::starmap_source::SyncContext;
use crate::starmap_types::{Model, Provider};

/// Safety cap on pagination; the live listing is a handful of pages.
const MAX_PAGES: usize = 10;

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Entry>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
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

    let mut models = Vec::new();
    let mut after: Option<String> = None;
    for _ in 0..MAX_PAGES {
        ctx.ensure_live()?;
        let url = match &after {
            Some(last) => format!("{}?limit=100&after_id={last}", endpoint.url),
            None => format!("{}?limit=100", endpoint.url),
        };
        let (body, _stats) = http.get(ctx, &url, auth.as_ref()).await?;
        let page: Page = serde_json::from_slice(&body)?;
        models.extend(page.data.into_iter().map(|e| to_model(provider, e)));
        if !page.has_more {
            break;
        }
        after = page.last_id;
        if after.is_none() {
            break;
        }
    }
    Ok(models)
}

/// Parse one listing page; the raw-response counterpart of `fetch_models`.
pub fn parse_models(provider: &Provider, body: &[u8]) -> Result<Vec<Model>, Error> {
    let page: Page = serde_json::from_slice(body)?;
    Ok(page
        .data
        .into_iter()
        .map(|e| to_model(provider, e))
        .collect())
}

fn to_model(provider: &Provider, entry: Entry) -> Model {
    let mut model = Model::new(entry.id);
    if let Some(name) = entry.display_name.filter(|s| !s.is_empty()) {
        model.name = name;
    }
    model.authors = vec![super::openai_compatible::map_author(provider, &provider.id)];
    if let Some(created) = entry.created_at {
        let metadata = model.metadata.get_or_insert_with(Default::default);
        metadata.release_date = Some(created.date_naive());
    }
    model
}
