use std::time::Duration;
use thiserror::Error;

/// Wrapped cause for errors that carry an upstream failure.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error taxonomy for catalog operations and the sync pipeline.
///
/// Per-source failures are recovered locally by the pipeline and collected
/// into a side channel; only `Canceled`, a pipeline-level `Timeout`, and
/// `Process` conditions abort a sync.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("validation failed for {resource}: {message}")]
    Validation { resource: String, message: String },

    #[error("source '{source}' failed{}: {cause}", provider.as_deref().map(|p| format!(" for provider '{p}'")).unwrap_or_default())]
    Sync {
        source: String,
        provider: Option<String>,
        #[source]
        cause: BoxedCause,
    },

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("canceled")]
    Canceled,

    #[error("process error: {message}")]
    Process { message: String },
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn sync(
        source: impl Into<String>,
        provider: Option<&str>,
        cause: impl Into<BoxedCause>,
    ) -> Self {
        Error::Sync {
            source: source.into(),
            provider: provider.map(str::to_string),
            cause: cause.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        Error::Process {
            message: message.into(),
        }
    }

    /// Short classification tag used in logs and tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not-found",
            Error::Config { .. } => "config",
            Error::Validation { .. } => "validation",
            Error::Sync { .. } => "sync",
            Error::Parse { .. } => "parse",
            Error::Timeout(_) => "timeout",
            Error::Canceled => "canceled",
            Error::Process { .. } => "process",
        }
    }

    /// Whether the pipeline must abort rather than recover locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Canceled | Error::Process { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Parse {
            message: err.to_string(),
        }
    }
}
