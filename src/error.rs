use thiserror::Error;

#[derive(Error, Debug)]
pub enum BumpError {
    #[error("Unknown branch: {0}")]
    UnknownBranch(String),

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid version '{0}'")]
    VersionParse(String),

    #[error("Invalid version limit: {0}")]
    InvalidLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No upstream releases found for {0}")]
    NotFound(String),

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Push failed: {0}")]
    Push(String),

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Session lock error: {0}")]
    Lock(String),

    #[error("Module already recorded in this session: {0}")]
    DuplicateModule(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::de::DeError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BumpError>;
