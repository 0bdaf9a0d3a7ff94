use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid tax rate {0}: must lie in 0.0..=1.0")]
    InvalidTaxRate(f64),

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    #[error("artifact upload failed: {0}")]
    UploadFailure(String),

    #[error("artifact listing failed: {0}")]
    ListFailure(String),

    #[error("artifact deletion failed: {0}")]
    DeleteFailure(String),

    #[error("repository error: {0}")]
    RepositoryFailure(String),

    #[error("invalid export stage transition: {0}")]
    StageTransition(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
