use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroveMapError {
    #[error("Schema configuration error: {0}")]
    Configuration(String),

    #[error("No field named '{field}' in group at {path}")]
    UnknownField { path: String, field: String },

    #[error("Index {index} out of range for collection of length {length}")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("No record type named '{0}'")]
    UnknownRecordType(String),

    #[error("Link resolution error: {0}")]
    Resolution(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, GroveMapError>;
