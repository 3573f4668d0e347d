use thiserror::Error;

/// Pointer syntax and write-policy failures.
///
/// Reads never produce these: a bad pointer on `get` is a miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("invalid pointer '{0}': must be empty or start with '/'")]
    MissingLeadingSlash(String),
    #[error("invalid escape in pointer '{pointer}': segment '{segment}'")]
    InvalidEscape { pointer: String, segment: String },
    #[error("root replacement requires an object value")]
    RootNotObject,
}

impl PointerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingLeadingSlash(_) => "A2UI_E_POINTER_SYNTAX",
            Self::InvalidEscape { .. } => "A2UI_E_POINTER_ESCAPE",
            Self::RootNotObject => "A2UI_E_ROOT_NOT_OBJECT",
        }
    }
}

/// Whole-text message parsing failure.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not parse messages: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("could not parse messages: element {index} is not a message: {source}")]
    InvalidMessage {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "A2UI_E_PARSE_JSON",
            Self::InvalidMessage { .. } => "A2UI_E_PARSE_MESSAGE",
        }
    }
}

/// Non-fatal problems reported by the streaming assembler.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("malformed object in stream: {source}; near `{preview}`")]
    MalformedObject {
        preview: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("object in stream is not a message: {source}; near `{preview}`")]
    InvalidMessage {
        preview: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("final recovery parse failed: {source}; near `{preview}`")]
    Recovery {
        preview: String,
        #[source]
        source: ParseError,
    },
}

impl StreamError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedObject { .. } => "A2UI_E_STREAM_OBJECT",
            Self::InvalidMessage { .. } => "A2UI_E_STREAM_MESSAGE",
            Self::Recovery { .. } => "A2UI_E_STREAM_RECOVERY",
        }
    }

    /// The truncated text the error refers to.
    pub fn preview(&self) -> &str {
        match self {
            Self::MalformedObject { preview, .. }
            | Self::InvalidMessage { preview, .. }
            | Self::Recovery { preview, .. } => preview,
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "A2UI_E_CONFIG_IO",
            Self::Parse(_) => "A2UI_E_CONFIG_PARSE",
            Self::Invalid(_) => "A2UI_E_CONFIG_INVALID",
        }
    }
}
