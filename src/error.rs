use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid project URL: {0}")]
    InvalidProjectUrl(String),

    #[error("{operation} failed: {stderr}")]
    Git { operation: String, stderr: String },

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Unexpected {tool} output: {message}")]
    ToolOutput { tool: String, message: String },

    #[error("Too many failed links ({0}), stopping")]
    TooManyFailedProbes(usize),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MinerError>;
