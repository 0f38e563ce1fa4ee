//! Exported model-list formats.
//!
//! Two wire dialects consumers already speak: the OpenAI `/v1/models` list
//! and the OpenRouter catalog shape. Prices in the OpenRouter form are
//! per-token decimal strings with ten fractional digits; absent prices
//! render as `"0"`.

use serde::Serialize;

use crate::starmap_catalog::store::ModelEntry;
use crate::starmap_types::{Modality, Model, Tokenizer};

/// OpenAI-compatible model list (`{object: "list", data: [...]}`).
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiModelList {
    pub object: &'static str,
    pub data: Vec<OpenAiModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiModel {
    pub id: String,
    pub object: &'static str,
    /// Unix seconds of the release date (falls back to catalog creation)
    pub created: i64,
    /// Comma-joined author ids, or "system" when none are known
    pub owned_by: String,
}

pub fn to_openai_list(entries: &[ModelEntry]) -> OpenAiModelList {
    OpenAiModelList {
        object: "list",
        data: entries
            .iter()
            .map(|entry| OpenAiModel {
                id: entry.model.id.clone(),
                object: "model",
                created: created_seconds(&entry.model),
                owned_by: owned_by(&entry.model),
            })
            .collect(),
    }
}

fn created_seconds(model: &Model) -> i64 {
    model
        .metadata
        .as_ref()
        .and_then(|m| m.release_date)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_else(|| model.created_at.timestamp())
}

fn owned_by(model: &Model) -> String {
    if model.authors.is_empty() {
        "system".to_string()
    } else {
        model.authors.join(",")
    }
}

/// OpenRouter-compatible catalog (`{data: [...]}`).
#[derive(Debug, Clone, Serialize)]
pub struct OpenRouterModelList {
    pub data: Vec<OpenRouterModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenRouterModel {
    pub id: String,
    pub canonical_slug: String,
    pub name: String,
    pub created: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_length: Option<i64>,
    pub architecture: OpenRouterArchitecture,
    pub top_provider: OpenRouterTopProvider,
    pub pricing: OpenRouterPricing,
    pub per_request_limits: Option<serde_json::Value>,
    pub supported_parameters: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenRouterArchitecture {
    pub input_modalities: Vec<String>,
    pub output_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,
    pub instruct_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenRouterTopProvider {
    pub context_length: Option<i64>,
    pub max_completion_tokens: Option<i64>,
    pub is_moderated: bool,
}

/// Prices per single token, ten fractional digits, `"0"` when absent.
#[derive(Debug, Clone, Serialize)]
pub struct OpenRouterPricing {
    pub prompt: String,
    pub completion: String,
    pub request: String,
    pub image: String,
    pub web_search: String,
    pub internal_reasoning: String,
    pub input_cache_read: String,
    pub input_cache_write: String,
}

pub fn to_openrouter_list(entries: &[ModelEntry]) -> OpenRouterModelList {
    OpenRouterModelList {
        data: entries.iter().map(to_openrouter_model).collect(),
    }
}

fn to_openrouter_model(entry: &ModelEntry) -> OpenRouterModel {
    let model = &entry.model;
    let slug = entry.qualified_id();
    let tokens = model.pricing.as_ref().and_then(|p| p.tokens.as_ref());
    let operations = model.pricing.as_ref().and_then(|p| p.operations.as_ref());
    let modalities = model.features.as_ref().map(|f| &f.modalities);

    OpenRouterModel {
        id: slug.clone(),
        canonical_slug: slug,
        name: model.name.clone(),
        created: created_seconds(model),
        description: model.description.clone(),
        context_length: model.limits.as_ref().and_then(|l| l.context_window),
        architecture: OpenRouterArchitecture {
            input_modalities: modalities
                .map(|m| modality_names(&m.input))
                .unwrap_or_default(),
            output_modalities: modalities
                .map(|m| modality_names(&m.output))
                .unwrap_or_default(),
            tokenizer: model
                .metadata
                .as_ref()
                .and_then(|m| m.architecture.as_ref())
                .and_then(|a| a.tokenizer)
                .map(openrouter_tokenizer),
            instruct_type: None,
        },
        top_provider: OpenRouterTopProvider {
            context_length: model.limits.as_ref().and_then(|l| l.context_window),
            max_completion_tokens: model.limits.as_ref().and_then(|l| l.output_tokens),
            is_moderated: false,
        },
        pricing: OpenRouterPricing {
            prompt: per_token_price(tokens.and_then(|t| t.input.map(|c| c.per_1m))),
            completion: per_token_price(tokens.and_then(|t| t.output.map(|c| c.per_1m))),
            request: flat_price(operations.and_then(|o| o.per_request)),
            image: flat_price(operations.and_then(|o| o.image_input)),
            web_search: flat_price(operations.and_then(|o| o.web_search)),
            internal_reasoning: per_token_price(tokens.and_then(|t| t.reasoning.map(|c| c.per_1m))),
            input_cache_read: per_token_price(tokens.and_then(|t| t.cache_read.map(|c| c.per_1m))),
            input_cache_write: per_token_price(
                tokens.and_then(|t| t.cache_write.map(|c| c.per_1m)),
            ),
        },
        per_request_limits: None,
        supported_parameters: supported_parameters(model),
    }
}

fn modality_names(modalities: &[Modality]) -> Vec<String> {
    modalities.iter().map(|m| m.as_str().to_string()).collect()
}

fn openrouter_tokenizer(tokenizer: Tokenizer) -> String {
    match tokenizer {
        Tokenizer::Claude => "Claude",
        Tokenizer::Gpt => "GPT",
        Tokenizer::Gemini => "Gemini",
        Tokenizer::Llama2 => "Llama2",
        Tokenizer::Llama3 => "Llama3",
        Tokenizer::Mistral => "Mistral",
        Tokenizer::Qwen => "Qwen",
        Tokenizer::Deepseek => "DeepSeek",
        Tokenizer::Other => "Other",
    }
    .to_string()
}

/// Convert a per-1M rate to a per-token decimal string.
fn per_token_price(per_1m: Option<f64>) -> String {
    match per_1m {
        Some(rate) => format!("{:.10}", rate / 1_000_000.0),
        None => "0".to_string(),
    }
}

/// Flat (non-token) rates render with the same precision.
fn flat_price(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.10}", rate),
        None => "0".to_string(),
    }
}

fn supported_parameters(model: &Model) -> Vec<String> {
    let mut params = vec!["max_tokens".to_string(), "temperature".to_string()];
    if let Some(features) = &model.features {
        if features.tools {
            params.push("tools".to_string());
            params.push("tool_choice".to_string());
        }
        if features.structured_outputs {
            params.push("response_format".to_string());
            params.push("structured_outputs".to_string());
        }
        if features.reasoning {
            params.push("reasoning".to_string());
            params.push("include_reasoning".to_string());
        }
        if features.streaming {
            params.push("stream".to_string());
        }
    }
    params
}
