//! Model records and their capability/limit/metadata subtrees.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::starmap_types::pricing::ModelPricing;

/// A single AI model as known to the catalog.
///
/// Models are owned by a provider; the merge identity of a model is the
/// `(provider id, model id)` tuple, so the same `id` may legitimately appear
/// under several providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Model {
    /// Unique identifier within the owning provider (e.g., "gpt-4o")
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Optional human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Author IDs in insertion order (first author is the primary one)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Context window / output token limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ModelLimits>,
    /// Pricing information (per 1M tokens plus per-operation rates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
    /// Capability flags and modalities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<ModelFeatures>,
    /// Release/cutoff dates, open-weights flag, architecture descriptor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelMetadata>,
    /// When this record first entered the catalog
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    /// When this record last changed
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Model {
    /// Create a model with just an id; display name defaults to the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            authors: Vec::new(),
            limits: None,
            pricing: None,
            features: None,
            metadata: None,
            created_at: epoch(),
            updated_at: epoch(),
        }
    }
}

/// Token limits communicated by sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelLimits {
    /// Context window size in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<i64>,
    /// Maximum output tokens per response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<i64>,
}

/// Capability flags for a model.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelFeatures {
    #[serde(default)]
    pub tools: bool,
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub structured_outputs: bool,
    /// Supported input/output modalities
    #[serde(default)]
    pub modalities: ModelModalities,
}

/// Supported input/output modalities for a model.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelModalities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<Modality>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<Modality>,
}

/// A single I/O modality.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Image,
    Audio,
    Video,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Image => "image",
            Modality::Audio => "audio",
            Modality::Video => "video",
        }
    }

    /// Parse a modality name; unknown strings are ignored by callers.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Modality::Text),
            "image" => Some(Modality::Image),
            "audio" => Some(Modality::Audio),
            "video" => Some(Modality::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release metadata and architecture descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelMetadata {
    /// Public release date (YYYY-MM-DD)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    /// Knowledge cutoff date (YYYY-MM-DD; day defaults to 01 for month cutoffs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_cutoff: Option<NaiveDate>,
    /// Whether the model weights are openly available
    #[serde(default)]
    pub open_weights: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<ModelArchitecture>,
}

/// Architecture descriptor as reported by dataset sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelArchitecture {
    /// Parameter count as a display string (e.g., "405B", "8x7B")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_count: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<Tokenizer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<Quantization>,
}

/// Tokenizer family used by a model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tokenizer {
    Claude,
    Gpt,
    Gemini,
    Llama2,
    Llama3,
    Mistral,
    Qwen,
    Deepseek,
    Other,
}

impl Tokenizer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tokenizer::Claude => "claude",
            Tokenizer::Gpt => "gpt",
            Tokenizer::Gemini => "gemini",
            Tokenizer::Llama2 => "llama2",
            Tokenizer::Llama3 => "llama3",
            Tokenizer::Mistral => "mistral",
            Tokenizer::Qwen => "qwen",
            Tokenizer::Deepseek => "deepseek",
            Tokenizer::Other => "other",
        }
    }
}

/// Quantization level of published weights.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quantization {
    Fp32,
    Fp16,
    Bf16,
    Fp8,
    Int8,
    Int4,
    Unspecified,
}

impl Quantization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::Fp32 => "fp32",
            Quantization::Fp16 => "fp16",
            Quantization::Bf16 => "bf16",
            Quantization::Fp8 => "fp8",
            Quantization::Int8 => "int8",
            Quantization::Int4 => "int4",
            Quantization::Unspecified => "unspecified",
        }
    }
}
