//! Pricing subtrees for model records.
//!
//! All token rates are expressed in currency units per one million tokens.
//! A rate of `None` means "not priced by any source"; an explicit `0.0` is a
//! real value (a source may declare a model free of charge) and survives the
//! merge only when the reporting source holds authority over the field.

use serde::{Deserialize, Serialize};

/// Pricing information for a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelPricing {
    /// ISO-4217 currency code the rates are quoted in
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenPricing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<OperationPricing>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for ModelPricing {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            tokens: None,
            operations: None,
        }
    }
}

/// Per-token rates, each per one million tokens.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TokenPricing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<TokenCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<TokenCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<TokenCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read: Option<TokenCost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_write: Option<TokenCost>,
}

/// Cost for one class of tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct TokenCost {
    /// Rate per one million tokens
    pub per_1m: f64,
}

impl TokenCost {
    pub fn new(per_1m: f64) -> Self {
        Self { per_1m }
    }

    /// Rate per single token, used by export renderers.
    pub fn per_token(&self) -> f64 {
        self.per_1m / 1_000_000.0
    }
}

/// Per-operation rates (flat, not token-denominated).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OperationPricing {
    /// Flat rate charged per API request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_request: Option<f64>,
    /// Rate per input image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_input: Option<f64>,
    /// Rate per web search invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_search: Option<f64>,
}

impl ModelPricing {
    /// True when no rate at all has been populated.
    pub fn is_unpriced(&self) -> bool {
        let tokens_empty = match &self.tokens {
            None => true,
            Some(t) => {
                t.input.is_none()
                    && t.output.is_none()
                    && t.reasoning.is_none()
                    && t.cache_read.is_none()
                    && t.cache_write.is_none()
            }
        };
        let ops_empty = match &self.operations {
            None => true,
            Some(o) => o.per_request.is_none() && o.image_input.is_none() && o.web_search.is_none(),
        };
        tokens_empty && ops_empty
    }
}
