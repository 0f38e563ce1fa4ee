//! Provider records: identity, authentication descriptor, catalog endpoint.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::starmap_types::model::Model;

/// A provider of AI models (the entity operating the serving API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    /// Unique identifier (e.g., "openai")
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Alternate IDs this provider is known under (e.g., "gemini" for "google")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Corporate headquarters location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headquarters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    /// How callers authenticate against the provider's API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ProviderApiKey>,
    /// Where and how the provider publishes its model listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<ProviderCatalogConfig>,
    /// Models owned by this provider, keyed by model id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub models: BTreeMap<String, Model>,
}

impl Provider {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            headquarters: None,
            status_page_url: None,
            icon_url: None,
            api_key: None,
            catalog: None,
            models: BTreeMap::new(),
        }
    }

    /// True when `candidate` names this provider directly or via an alias.
    pub fn answers_to(&self, candidate: &str) -> bool {
        self.id.eq_ignore_ascii_case(candidate)
            || self
                .aliases
                .iter()
                .any(|a| a.eq_ignore_ascii_case(candidate))
    }
}

/// API key descriptor: which env var carries the credential and how it is
/// presented to the API. Exactly one of `header` / `query_param` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderApiKey {
    /// Environment variable name (e.g., "OPENAI_API_KEY")
    pub name: String,
    /// Header the key is sent in (e.g., "Authorization", "x-api-key")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Query parameter the key is sent in (e.g., "key" for Google)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>,
    /// Value scheme prefix (e.g., "Bearer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Regex the key value is expected to match. Deliberately unanchored:
    /// a substring match is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl ProviderApiKey {
    /// Check the header/query-param exclusivity rule.
    pub fn check_exclusive(&self) -> Result<(), String> {
        match (&self.header, &self.query_param) {
            (Some(_), Some(_)) => Err(format!(
                "api key '{}' sets both header and query_param",
                self.name
            )),
            (None, None) => Err(format!(
                "api key '{}' sets neither header nor query_param",
                self.name
            )),
            _ => Ok(()),
        }
    }

    /// Match a candidate key against the declared pattern (unanchored).
    /// Absent or invalid patterns accept everything.
    pub fn pattern_matches(&self, candidate: &str) -> bool {
        match &self.pattern {
            Some(p) => match regex::Regex::new(p) {
                Ok(re) => re.is_match(candidate),
                Err(_) => true,
            },
            None => true,
        }
    }
}

/// Where a provider publishes its model listing.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProviderCatalogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<CatalogEndpoint>,
    /// Documentation URL for the listing API
    #[serde(rename = "docs", default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    /// Raw `owned_by` string → canonical author id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub author_mapping: BTreeMap<String, String>,
}

/// A model-listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEndpoint {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: EndpointType,
    #[serde(default)]
    pub auth_required: bool,
}

/// Wire dialect spoken by a model-listing endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EndpointType {
    /// `GET /v1/models` returning `{object:"list", data:[...]}`
    OpenaiCompatible,
    /// Anthropic-native `GET /v1/models` with `data`/`has_more` paging
    AnthropicNative,
    /// Google Generative Language `GET /v1beta/models`
    GoogleCloud,
    /// Azure OpenAI `GET /openai/models` with an `api-version` query param
    AzureOpenai,
}

impl EndpointType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointType::OpenaiCompatible => "openai-compatible",
            EndpointType::AnthropicNative => "anthropic-native",
            EndpointType::GoogleCloud => "google-cloud",
            EndpointType::AzureOpenai => "azure-openai",
        }
    }
}

/// Authentication status for a provider, as observed in the environment.
///
/// Providers authenticate heterogeneously; consumers pattern-match on the
/// variant rather than inspecting string fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "auth", rename_all = "snake_case")]
pub enum AuthStatus {
    ApiKey {
        env: String,
        set: bool,
        valid: bool,
        source: String,
    },
    GoogleCloud {
        kind: String,
        account: Option<String>,
        project: Option<String>,
        project_source: Option<String>,
        location: Option<String>,
        location_source: Option<String>,
        adc_path: Option<String>,
        last_auth: Option<DateTime<Utc>>,
    },
    Unsupported,
    Optional,
}

impl AuthStatus {
    /// Derive the status for an API-key provider from the process environment.
    pub fn from_api_key(descriptor: &ProviderApiKey) -> Self {
        match std::env::var(&descriptor.name) {
            Ok(v) if !v.trim().is_empty() => AuthStatus::ApiKey {
                env: descriptor.name.clone(),
                set: true,
                valid: descriptor.pattern_matches(v.trim()),
                source: "environment".to_string(),
            },
            _ => AuthStatus::ApiKey {
                env: descriptor.name.clone(),
                set: false,
                valid: false,
                source: "environment".to_string(),
            },
        }
    }
}
