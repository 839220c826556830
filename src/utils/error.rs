use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required option: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{op}: item does not exist: {reference}")]
    NotFound { op: &'static str, reference: String },

    #[error("{op}: request rejected by the endpoint: {summary}")]
    RemoteRejected { op: &'static str, summary: String },

    #[error("{op}: got an error from the endpoint: {status}")]
    HttpStatus { op: &'static str, status: String },

    #[error("{op}: request failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{op}: malformed response: {source}")]
    Parse {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Operation not supported by this storage backend")]
    NotSupported,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid,
    NotExist,
    IO,
    Other,
    NotSupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ConfigError { .. }
            | StoreError::MissingConfigError { .. }
            | StoreError::InvalidConfigValueError { .. } => ErrorKind::Invalid,
            StoreError::NotFound { .. } => ErrorKind::NotExist,
            StoreError::HttpStatus { .. }
            | StoreError::RemoteRejected { .. }
            | StoreError::Transport { .. }
            | StoreError::Parse { .. }
            | StoreError::IoError(_) => ErrorKind::IO,
            StoreError::SerializationError(_) => ErrorKind::Other,
            StoreError::NotSupported => ErrorKind::NotSupported,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }

    /// Only I/O failures may succeed on a second attempt; nothing in this
    /// crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::IO
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.kind() {
            ErrorKind::NotSupported => ErrorSeverity::Low,
            ErrorKind::NotExist | ErrorKind::IO => ErrorSeverity::Medium,
            ErrorKind::Other => ErrorSeverity::High,
            ErrorKind::Invalid => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        if let StoreError::RemoteRejected { .. } = self {
            return format!("Storage request rejected: {}", self);
        }
        match self.kind() {
            ErrorKind::Invalid => format!("Invalid configuration: {}", self),
            ErrorKind::NotExist => format!("Object not found: {}", self),
            ErrorKind::IO => format!("Could not reach the storage service: {}", self),
            ErrorKind::NotSupported => self.to_string(),
            ErrorKind::Other => format!("Storage request failed: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if let StoreError::RemoteRejected { .. } = self {
            return "Inspect the error summary returned by the service";
        }
        match self.kind() {
            ErrorKind::Invalid => "Check the store options in the server configuration file",
            ErrorKind::NotExist => "Verify the reference name; listing shows what is stored",
            ErrorKind::IO => "Check network access and that the access token is still valid",
            ErrorKind::NotSupported => "Use a backend that offers this capability",
            ErrorKind::Other => "Report the request that could not be encoded",
        }
    }
}
