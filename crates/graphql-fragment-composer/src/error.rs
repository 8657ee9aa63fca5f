/// Errors raised while a configuration is built, before any traversal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// `name` and `alias` only make sense inside a type override.
    #[error("the `{0}` option can only be used for targeted type overrides")]
    TargetedOnly(&'static str),
    /// The JSON configuration could not be read.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// The TOML configuration could not be read.
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised by the schema analyzer.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("could not parse the schema: {0}")]
    Parse(String),
}

/// The error type of formatting requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    /// A nested field or a variant points to a type missing from the graph.
    #[error("could not find type \"{name}\" for {origin}")]
    UnknownType { name: String, origin: String },
    /// The requested root type is missing from the graph.
    #[error("could not find type \"{0}\"")]
    UnknownRootType(String),
}
