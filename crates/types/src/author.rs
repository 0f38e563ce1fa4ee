//! Author records: the organizations that train and publish models.

use serde::{Deserialize, Serialize};

/// An author (lab or company) credited with one or more models.
///
/// Models are stored once, owned by their provider; an author references
/// them by qualified `provider/model` id and the catalog resolves the
/// references on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    /// Unique identifier (e.g., "meta")
    pub id: String,
    /// Human-readable display name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub huggingface: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    /// Qualified `provider/model` ids credited to this author
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            website: None,
            github: None,
            huggingface: None,
            twitter: None,
            models: Vec::new(),
        }
    }
}
