use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Missing environment variable '{name}'")]
    ConfigMissing { name: String },

    #[error("Invalid value for '{name}': {message}")]
    ConfigInvalid { name: String, message: String },

    // Storage errors
    #[error("Failed to read '{path}': {source}")]
    StorageLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {source}")]
    StorageParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    StorageSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
