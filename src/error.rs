use thiserror::Error;

#[derive(Error, Debug)]
pub enum FindexError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("index not found: {path}")]
    IndexNotFound { path: String },

    #[error("no index record for {path}")]
    RecordNotFound { path: String },

    #[error("invalid file name: {name:?}")]
    InvalidName { name: String },

    #[error("rename target already exists: {path}")]
    RenameCollision { path: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FindexError>;
