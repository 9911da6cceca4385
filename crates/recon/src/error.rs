use thiserror::Error;

/// Fatal errors. Everything data-related is a [`crate::diagnostics::Diagnostic`]
/// instead; these only cover configuration and caller mistakes.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (duplicate source id, bad priority list, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Input records reference a source the config does not declare.
    #[error("unknown source: {0}")]
    UnknownSource(String),
    /// CSV writer failure while emitting.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// IO error on the emit writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
