//! Stable field-tree walk over catalog entities.
//!
//! Merge and diff both need to visit every leaf field of an entity in a
//! deterministic order that comes from the entity schema itself, never from
//! any source's JSON key order. Each entity kind exposes a static table of
//! `FieldSpec`s: a dotted path, a getter producing the type-erased `Value`,
//! and a setter that materializes intermediate subtrees on demand.

use std::collections::BTreeMap;

use crate::starmap_types::{
    Author, CatalogEndpoint, EndpointType, Modality, Model, ModelArchitecture, Provider,
    ProviderApiKey, Quantization, Tokenizer, Value,
};

/// Whether a field is a scalar (winner-takes-all on merge) or a list
/// (merged as an ordered union deduped by element identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    List,
}

/// One leaf in an entity's field tree.
pub struct FieldSpec<T: 'static> {
    pub path: &'static str,
    pub kind: FieldKind,
    /// Read the field; `None` when the subtree holding it is absent.
    pub get: fn(&T) -> Option<Value>,
    /// Write the field, creating intermediate subtrees as needed.
    pub set: fn(&mut T, &Value),
}

fn limits(m: &mut Model) -> &mut crate::starmap_types::ModelLimits {
    m.limits.get_or_insert_with(Default::default)
}

fn pricing(m: &mut Model) -> &mut crate::starmap_types::ModelPricing {
    m.pricing.get_or_insert_with(Default::default)
}

fn tokens(m: &mut Model) -> &mut crate::starmap_types::TokenPricing {
    pricing(m).tokens.get_or_insert_with(Default::default)
}

fn operations(m: &mut Model) -> &mut crate::starmap_types::OperationPricing {
    pricing(m).operations.get_or_insert_with(Default::default)
}

fn features(m: &mut Model) -> &mut crate::starmap_types::ModelFeatures {
    m.features.get_or_insert_with(Default::default)
}

fn metadata(m: &mut Model) -> &mut crate::starmap_types::ModelMetadata {
    m.metadata.get_or_insert_with(Default::default)
}

fn architecture(m: &mut Model) -> &mut ModelArchitecture {
    metadata(m).architecture.get_or_insert_with(Default::default)
}

fn api_key(p: &mut Provider) -> &mut ProviderApiKey {
    p.api_key.get_or_insert_with(Default::default)
}

fn catalog_config(p: &mut Provider) -> &mut crate::starmap_types::ProviderCatalogConfig {
    p.catalog.get_or_insert_with(Default::default)
}

fn endpoint(p: &mut Provider) -> &mut CatalogEndpoint {
    catalog_config(p).endpoint.get_or_insert_with(|| CatalogEndpoint {
        url: String::new(),
        kind: EndpointType::OpenaiCompatible,
        auth_required: false,
    })
}

fn token_cost(value: &Value) -> Option<crate::starmap_types::TokenCost> {
    value
        .as_f64()
        .map(crate::starmap_types::TokenCost::new)
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Value::Str(s) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn modality_list(value: &Value) -> Vec<Modality> {
    let mut out = Vec::new();
    for name in string_list(value) {
        if let Some(m) = Modality::parse(&name) {
            if !out.contains(&m) {
                out.push(m);
            }
        }
    }
    out
}

fn modalities_value(modalities: &[Modality]) -> Option<Value> {
    if modalities.is_empty() {
        None
    } else {
        Some(Value::List(
            modalities.iter().map(|m| Value::Str(m.as_str().to_string())).collect(),
        ))
    }
}

fn date_value(value: &Value) -> Option<chrono::NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Str(s) => parse_loose_date(s),
        _ => None,
    }
}

/// Parse `YYYY-MM-DD` or a `YYYY-MM` knowledge cutoff (day defaults to 01).
pub fn parse_loose_date(s: &str) -> Option<chrono::NaiveDate> {
    let s = s.trim();
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    chrono::NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok()
}

/// The stable field walk for models. Paths are the canonical dotted names
/// used by the authority table, provenance store, and diff output.
pub fn model_fields() -> &'static [FieldSpec<Model>] {
    static FIELDS: &[FieldSpec<Model>] = &[
        FieldSpec {
            path: "name",
            kind: FieldKind::Scalar,
            get: |m| Some(Value::Str(m.name.clone())),
            set: |m, v| {
                if let Some(s) = v.as_str() {
                    m.name = s.to_string();
                }
            },
        },
        FieldSpec {
            path: "description",
            kind: FieldKind::Scalar,
            get: |m| m.description.clone().map(Value::Str),
            set: |m, v| m.description = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "authors",
            kind: FieldKind::List,
            get: |m| {
                if m.authors.is_empty() {
                    None
                } else {
                    Some(Value::List(
                        m.authors.iter().cloned().map(Value::Str).collect(),
                    ))
                }
            },
            set: |m, v| m.authors = string_list(v),
        },
        FieldSpec {
            path: "limits.context_window",
            kind: FieldKind::Scalar,
            get: |m| m.limits.as_ref().and_then(|l| l.context_window).map(Value::Int),
            set: |m, v| limits(m).context_window = v.as_i64(),
        },
        FieldSpec {
            path: "limits.output_tokens",
            kind: FieldKind::Scalar,
            get: |m| m.limits.as_ref().and_then(|l| l.output_tokens).map(Value::Int),
            set: |m, v| limits(m).output_tokens = v.as_i64(),
        },
        FieldSpec {
            path: "pricing.currency",
            kind: FieldKind::Scalar,
            get: |m| m.pricing.as_ref().map(|p| Value::Str(p.currency.clone())),
            set: |m, v| {
                if let Some(s) = v.as_str() {
                    pricing(m).currency = s.to_string();
                }
            },
        },
        FieldSpec {
            path: "pricing.tokens.input.per_1m",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.tokens.as_ref())
                    .and_then(|t| t.input)
                    .map(|c| Value::Float(c.per_1m))
            },
            set: |m, v| tokens(m).input = token_cost(v),
        },
        FieldSpec {
            path: "pricing.tokens.output.per_1m",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.tokens.as_ref())
                    .and_then(|t| t.output)
                    .map(|c| Value::Float(c.per_1m))
            },
            set: |m, v| tokens(m).output = token_cost(v),
        },
        FieldSpec {
            path: "pricing.tokens.reasoning.per_1m",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.tokens.as_ref())
                    .and_then(|t| t.reasoning)
                    .map(|c| Value::Float(c.per_1m))
            },
            set: |m, v| tokens(m).reasoning = token_cost(v),
        },
        FieldSpec {
            path: "pricing.tokens.cache_read.per_1m",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.tokens.as_ref())
                    .and_then(|t| t.cache_read)
                    .map(|c| Value::Float(c.per_1m))
            },
            set: |m, v| tokens(m).cache_read = token_cost(v),
        },
        FieldSpec {
            path: "pricing.tokens.cache_write.per_1m",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.tokens.as_ref())
                    .and_then(|t| t.cache_write)
                    .map(|c| Value::Float(c.per_1m))
            },
            set: |m, v| tokens(m).cache_write = token_cost(v),
        },
        FieldSpec {
            path: "pricing.operations.per_request",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.operations.as_ref())
                    .and_then(|o| o.per_request)
                    .map(Value::Float)
            },
            set: |m, v| operations(m).per_request = v.as_f64(),
        },
        FieldSpec {
            path: "pricing.operations.image_input",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.operations.as_ref())
                    .and_then(|o| o.image_input)
                    .map(Value::Float)
            },
            set: |m, v| operations(m).image_input = v.as_f64(),
        },
        FieldSpec {
            path: "pricing.operations.web_search",
            kind: FieldKind::Scalar,
            get: |m| {
                m.pricing
                    .as_ref()
                    .and_then(|p| p.operations.as_ref())
                    .and_then(|o| o.web_search)
                    .map(Value::Float)
            },
            set: |m, v| operations(m).web_search = v.as_f64(),
        },
        FieldSpec {
            path: "features.tools",
            kind: FieldKind::Scalar,
            get: |m| m.features.as_ref().map(|f| Value::Bool(f.tools)),
            set: |m, v| {
                if let Some(b) = v.as_bool() {
                    features(m).tools = b;
                }
            },
        },
        FieldSpec {
            path: "features.reasoning",
            kind: FieldKind::Scalar,
            get: |m| m.features.as_ref().map(|f| Value::Bool(f.reasoning)),
            set: |m, v| {
                if let Some(b) = v.as_bool() {
                    features(m).reasoning = b;
                }
            },
        },
        FieldSpec {
            path: "features.streaming",
            kind: FieldKind::Scalar,
            get: |m| m.features.as_ref().map(|f| Value::Bool(f.streaming)),
            set: |m, v| {
                if let Some(b) = v.as_bool() {
                    features(m).streaming = b;
                }
            },
        },
        FieldSpec {
            path: "features.structured_outputs",
            kind: FieldKind::Scalar,
            get: |m| m.features.as_ref().map(|f| Value::Bool(f.structured_outputs)),
            set: |m, v| {
                if let Some(b) = v.as_bool() {
                    features(m).structured_outputs = b;
                }
            },
        },
        FieldSpec {
            path: "features.modalities.input",
            kind: FieldKind::List,
            get: |m| {
                m.features
                    .as_ref()
                    .and_then(|f| modalities_value(&f.modalities.input))
            },
            set: |m, v| features(m).modalities.input = modality_list(v),
        },
        FieldSpec {
            path: "features.modalities.output",
            kind: FieldKind::List,
            get: |m| {
                m.features
                    .as_ref()
                    .and_then(|f| modalities_value(&f.modalities.output))
            },
            set: |m, v| features(m).modalities.output = modality_list(v),
        },
        FieldSpec {
            path: "metadata.release_date",
            kind: FieldKind::Scalar,
            get: |m| {
                m.metadata
                    .as_ref()
                    .and_then(|md| md.release_date)
                    .map(Value::Date)
            },
            set: |m, v| metadata(m).release_date = date_value(v),
        },
        FieldSpec {
            path: "metadata.knowledge_cutoff",
            kind: FieldKind::Scalar,
            get: |m| {
                m.metadata
                    .as_ref()
                    .and_then(|md| md.knowledge_cutoff)
                    .map(Value::Date)
            },
            set: |m, v| metadata(m).knowledge_cutoff = date_value(v),
        },
        FieldSpec {
            path: "metadata.open_weights",
            kind: FieldKind::Scalar,
            get: |m| m.metadata.as_ref().map(|md| Value::Bool(md.open_weights)),
            set: |m, v| {
                if let Some(b) = v.as_bool() {
                    metadata(m).open_weights = b;
                }
            },
        },
        FieldSpec {
            path: "metadata.architecture.parameter_count",
            kind: FieldKind::Scalar,
            get: |m| {
                m.metadata
                    .as_ref()
                    .and_then(|md| md.architecture.as_ref())
                    .and_then(|a| a.parameter_count.clone())
                    .map(Value::Str)
            },
            set: |m, v| architecture(m).parameter_count = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "metadata.architecture.tokenizer",
            kind: FieldKind::Scalar,
            get: |m| {
                m.metadata
                    .as_ref()
                    .and_then(|md| md.architecture.as_ref())
                    .and_then(|a| a.tokenizer)
                    .map(|t| Value::Str(t.as_str().to_string()))
            },
            set: |m, v| {
                if let Some(s) = v.as_str() {
                    architecture(m).tokenizer = parse_tokenizer(s);
                }
            },
        },
        FieldSpec {
            path: "metadata.architecture.quantization",
            kind: FieldKind::Scalar,
            get: |m| {
                m.metadata
                    .as_ref()
                    .and_then(|md| md.architecture.as_ref())
                    .and_then(|a| a.quantization)
                    .map(|q| Value::Str(q.as_str().to_string()))
            },
            set: |m, v| {
                if let Some(s) = v.as_str() {
                    architecture(m).quantization = parse_quantization(s);
                }
            },
        },
    ];
    FIELDS
}

fn parse_tokenizer(s: &str) -> Option<Tokenizer> {
    match s.trim().to_ascii_lowercase().as_str() {
        "claude" => Some(Tokenizer::Claude),
        "gpt" => Some(Tokenizer::Gpt),
        "gemini" => Some(Tokenizer::Gemini),
        "llama2" => Some(Tokenizer::Llama2),
        "llama3" => Some(Tokenizer::Llama3),
        "mistral" => Some(Tokenizer::Mistral),
        "qwen" => Some(Tokenizer::Qwen),
        "deepseek" => Some(Tokenizer::Deepseek),
        "other" => Some(Tokenizer::Other),
        _ => None,
    }
}

fn parse_quantization(s: &str) -> Option<Quantization> {
    match s.trim().to_ascii_lowercase().as_str() {
        "fp32" => Some(Quantization::Fp32),
        "fp16" => Some(Quantization::Fp16),
        "bf16" => Some(Quantization::Bf16),
        "fp8" => Some(Quantization::Fp8),
        "int8" => Some(Quantization::Int8),
        "int4" => Some(Quantization::Int4),
        "unspecified" => Some(Quantization::Unspecified),
        _ => None,
    }
}

fn parse_endpoint_type(s: &str) -> Option<EndpointType> {
    match s.trim().to_ascii_lowercase().as_str() {
        "openai-compatible" => Some(EndpointType::OpenaiCompatible),
        "anthropic-native" => Some(EndpointType::AnthropicNative),
        "google-cloud" => Some(EndpointType::GoogleCloud),
        "azure-openai" => Some(EndpointType::AzureOpenai),
        _ => None,
    }
}

/// The stable field walk for providers. The `models` map is not a leaf;
/// model merging happens per `(provider, model)` identity.
pub fn provider_fields() -> &'static [FieldSpec<Provider>] {
    static FIELDS: &[FieldSpec<Provider>] = &[
        FieldSpec {
            path: "name",
            kind: FieldKind::Scalar,
            get: |p| Some(Value::Str(p.name.clone())),
            set: |p, v| {
                if let Some(s) = v.as_str() {
                    p.name = s.to_string();
                }
            },
        },
        FieldSpec {
            path: "aliases",
            kind: FieldKind::List,
            get: |p| {
                if p.aliases.is_empty() {
                    None
                } else {
                    Some(Value::List(
                        p.aliases.iter().cloned().map(Value::Str).collect(),
                    ))
                }
            },
            set: |p, v| p.aliases = string_list(v),
        },
        FieldSpec {
            path: "headquarters",
            kind: FieldKind::Scalar,
            get: |p| p.headquarters.clone().map(Value::Str),
            set: |p, v| p.headquarters = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "status_page_url",
            kind: FieldKind::Scalar,
            get: |p| p.status_page_url.clone().map(Value::Str),
            set: |p, v| p.status_page_url = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "icon_url",
            kind: FieldKind::Scalar,
            get: |p| p.icon_url.clone().map(Value::Str),
            set: |p, v| p.icon_url = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "api_key.name",
            kind: FieldKind::Scalar,
            get: |p| p.api_key.as_ref().map(|k| Value::Str(k.name.clone())),
            set: |p, v| {
                if let Some(s) = v.as_str() {
                    api_key(p).name = s.to_string();
                }
            },
        },
        FieldSpec {
            path: "api_key.header",
            kind: FieldKind::Scalar,
            get: |p| p.api_key.as_ref().and_then(|k| k.header.clone()).map(Value::Str),
            set: |p, v| api_key(p).header = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "api_key.query_param",
            kind: FieldKind::Scalar,
            get: |p| {
                p.api_key
                    .as_ref()
                    .and_then(|k| k.query_param.clone())
                    .map(Value::Str)
            },
            set: |p, v| api_key(p).query_param = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "api_key.scheme",
            kind: FieldKind::Scalar,
            get: |p| p.api_key.as_ref().and_then(|k| k.scheme.clone()).map(Value::Str),
            set: |p, v| api_key(p).scheme = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "api_key.pattern",
            kind: FieldKind::Scalar,
            get: |p| p.api_key.as_ref().and_then(|k| k.pattern.clone()).map(Value::Str),
            set: |p, v| api_key(p).pattern = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "catalog.endpoint.url",
            kind: FieldKind::Scalar,
            get: |p| {
                p.catalog
                    .as_ref()
                    .and_then(|c| c.endpoint.as_ref())
                    .map(|e| Value::Str(e.url.clone()))
            },
            set: |p, v| {
                if let Some(s) = v.as_str() {
                    endpoint(p).url = s.to_string();
                }
            },
        },
        FieldSpec {
            path: "catalog.endpoint.type",
            kind: FieldKind::Scalar,
            get: |p| {
                p.catalog
                    .as_ref()
                    .and_then(|c| c.endpoint.as_ref())
                    .map(|e| Value::Str(e.kind.as_str().to_string()))
            },
            set: |p, v| {
                if let Some(kind) = v.as_str().and_then(parse_endpoint_type) {
                    endpoint(p).kind = kind;
                }
            },
        },
        FieldSpec {
            path: "catalog.endpoint.auth_required",
            kind: FieldKind::Scalar,
            get: |p| {
                p.catalog
                    .as_ref()
                    .and_then(|c| c.endpoint.as_ref())
                    .map(|e| Value::Bool(e.auth_required))
            },
            set: |p, v| {
                if let Some(b) = v.as_bool() {
                    endpoint(p).auth_required = b;
                }
            },
        },
        FieldSpec {
            path: "catalog.docs_url",
            kind: FieldKind::Scalar,
            get: |p| p.catalog.as_ref().and_then(|c| c.docs_url.clone()).map(Value::Str),
            set: |p, v| catalog_config(p).docs_url = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "catalog.author_mapping",
            kind: FieldKind::Scalar,
            get: |p| {
                p.catalog.as_ref().and_then(|c| {
                    if c.author_mapping.is_empty() {
                        None
                    } else {
                        Some(Value::Map(
                            c.author_mapping
                                .iter()
                                .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
                                .collect::<BTreeMap<_, _>>(),
                        ))
                    }
                })
            },
            set: |p, v| {
                if let Value::Map(entries) = v {
                    catalog_config(p).author_mapping = entries
                        .iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect();
                }
            },
        },
    ];
    FIELDS
}

/// The stable field walk for authors.
pub fn author_fields() -> &'static [FieldSpec<Author>] {
    static FIELDS: &[FieldSpec<Author>] = &[
        FieldSpec {
            path: "name",
            kind: FieldKind::Scalar,
            get: |a| Some(Value::Str(a.name.clone())),
            set: |a, v| {
                if let Some(s) = v.as_str() {
                    a.name = s.to_string();
                }
            },
        },
        FieldSpec {
            path: "description",
            kind: FieldKind::Scalar,
            get: |a| a.description.clone().map(Value::Str),
            set: |a, v| a.description = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "website",
            kind: FieldKind::Scalar,
            get: |a| a.website.clone().map(Value::Str),
            set: |a, v| a.website = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "github",
            kind: FieldKind::Scalar,
            get: |a| a.github.clone().map(Value::Str),
            set: |a, v| a.github = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "huggingface",
            kind: FieldKind::Scalar,
            get: |a| a.huggingface.clone().map(Value::Str),
            set: |a, v| a.huggingface = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "twitter",
            kind: FieldKind::Scalar,
            get: |a| a.twitter.clone().map(Value::Str),
            set: |a, v| a.twitter = v.as_str().map(str::to_string),
        },
        FieldSpec {
            path: "models",
            kind: FieldKind::List,
            get: |a| {
                if a.models.is_empty() {
                    None
                } else {
                    Some(Value::List(a.models.iter().cloned().map(Value::Str).collect()))
                }
            },
            set: |a, v| a.models = string_list(v),
        },
    ];
    FIELDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_setters_materialize_subtrees() {
        let mut model = Model::new("gpt-x");
        let spec = model_fields()
            .iter()
            .find(|f| f.path == "pricing.tokens.input.per_1m")
            .unwrap();
        (spec.set)(&mut model, &Value::Float(3.0));
        assert_eq!(
            model.pricing.unwrap().tokens.unwrap().input.unwrap().per_1m,
            3.0
        );
    }

    #[test]
    fn model_roundtrip_through_the_walk() {
        let mut source = Model::new("m");
        source.name = "M".into();
        source.description = Some("desc".into());
        for spec in model_fields() {
            if let Some(value) = (spec.get)(&source) {
                let mut target = Model::new("m");
                (spec.set)(&mut target, &value);
                assert_eq!((spec.get)(&target), Some(value), "field {}", spec.path);
            }
        }
    }

    #[test]
    fn walk_order_is_schema_derived() {
        let paths: Vec<&str> = model_fields().iter().map(|f| f.path).collect();
        let name_pos = paths.iter().position(|p| *p == "name").unwrap();
        let pricing_pos = paths
            .iter()
            .position(|p| *p == "pricing.tokens.input.per_1m")
            .unwrap();
        assert!(name_pos < pricing_pos);
    }
}
