use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("archive malformed: {0}")]
    ArchiveMalformed(String),

    #[error("pass content malformed: {0}")]
    ContentMalformed(String),

    #[error("signature malformed: {0}")]
    SignatureMalformed(String),

    #[error("invalid trust anchor config: {0}")]
    InvalidConfig(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
