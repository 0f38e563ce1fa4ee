//! Wire shapes of the models.dev dataset and their conversion into catalog
//! entities.
//!
//! The dataset is one large JSON object keyed by provider id; each provider
//! carries its models inline. Costs are dollars per one million tokens.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::starmap_schema::parse_loose_date;
use crate::starmap_types::{
    Modality, Model, ModelFeatures, ModelLimits, ModelMetadata, ModelModalities, ModelPricing,
    Provider, TokenCost, TokenPricing,
};

/// The whole dataset: provider id → provider record.
pub type Dataset = BTreeMap<String, DatasetProvider>;

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetProvider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub env: Vec<String>,
    #[serde(default)]
    pub models: BTreeMap<String, DatasetModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attachment: bool,
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default)]
    pub tool_call: bool,
    #[serde(default)]
    pub structured_output: bool,
    #[serde(default)]
    pub temperature: bool,
    #[serde(default)]
    pub open_weights: bool,
    /// Knowledge cutoff (YYYY-MM)
    #[serde(default)]
    pub knowledge: Option<String>,
    /// Release date (YYYY-MM-DD)
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub modalities: DatasetModalities,
    #[serde(default)]
    pub cost: DatasetCost,
    #[serde(default)]
    pub limit: DatasetLimit,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetModalities {
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
}

/// Costs in dollars per 1M tokens. `None` means the dataset does not price
/// the class; an explicit `0` means free.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetCost {
    #[serde(default)]
    pub input: Option<f64>,
    #[serde(default)]
    pub output: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<f64>,
    #[serde(default)]
    pub cache_read: Option<f64>,
    #[serde(default)]
    pub cache_write: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetLimit {
    #[serde(default)]
    pub context: i64,
    #[serde(default)]
    pub output: i64,
}

/// Parse the dataset from raw JSON bytes.
pub fn parse(body: &[u8]) -> Result<Dataset, crate::starmap_core::error::Error> {
    Ok(serde_json::from_slice(body)?)
}

/// Convert a provider record to the catalog shape, models excluded (they
/// travel through `fetch_models`).
pub fn to_provider(record: &DatasetProvider) -> Provider {
    let mut provider = Provider::new(&record.id, &record.name);
    provider.icon_url = Some(format!("https://models.dev/logos/{}.svg", record.id));
    provider
}

/// Convert a model record to the catalog shape.
pub fn to_model(record: &DatasetModel) -> Model {
    let mut model = Model::new(&record.id);
    model.name = record.name.clone();

    if record.limit.context > 0 || record.limit.output > 0 {
        model.limits = Some(ModelLimits {
            context_window: (record.limit.context > 0).then_some(record.limit.context),
            output_tokens: (record.limit.output > 0).then_some(record.limit.output),
        });
    }

    let cost = &record.cost;
    if cost.input.is_some()
        || cost.output.is_some()
        || cost.reasoning.is_some()
        || cost.cache_read.is_some()
        || cost.cache_write.is_some()
    {
        model.pricing = Some(ModelPricing {
            currency: "USD".to_string(),
            tokens: Some(TokenPricing {
                input: cost.input.map(TokenCost::new),
                output: cost.output.map(TokenCost::new),
                reasoning: cost.reasoning.map(TokenCost::new),
                cache_read: cost.cache_read.map(TokenCost::new),
                cache_write: cost.cache_write.map(TokenCost::new),
            }),
            operations: None,
        });
    }

    model.features = Some(ModelFeatures {
        tools: record.tool_call,
        reasoning: record.reasoning,
        streaming: false,
        structured_outputs: record.structured_output,
        modalities: ModelModalities {
            input: parse_modalities(&record.modalities.input),
            output: parse_modalities(&record.modalities.output),
        },
    });

    let metadata = ModelMetadata {
        release_date: record.release_date.as_deref().and_then(parse_loose_date),
        knowledge_cutoff: record.knowledge.as_deref().and_then(parse_loose_date),
        open_weights: record.open_weights,
        architecture: None,
    };
    if metadata != ModelMetadata::default() {
        model.metadata = Some(metadata);
    }

    model
}

fn parse_modalities(names: &[String]) -> Vec<Modality> {
    let mut out = Vec::new();
    for name in names {
        if let Some(m) = Modality::parse(name) {
            if !out.contains(&m) {
                out.push(m);
            }
        }
    }
    out
}
