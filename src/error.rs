#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid provider configuration: {0}")]
    Configuration(String),

    #[error("Invalid YAML in provider definition.")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Unable to read provider definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tile coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Tiling scheme {0} not found")]
    SchemeNotFound(String),

    #[error("Unsupported tile format {0}")]
    UnsupportedFormat(String),

    #[error("Tile query failed: {0}")]
    QueryExecution(#[from] sqlx::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
