use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Unknown option '{value}' for {field}")]
    UnknownOption { field: &'static str, value: String },
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure of a single attachment upload. Other uploads are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error("Maximum {max} files allowed")]
    TooManyFiles { max: usize },
    #[error("{name} is {size} bytes, the limit is {max} bytes")]
    TooLarge { name: String, size: u64, max: u64 },
    #[error("{name}: file type {mime_type} is not accepted")]
    UnsupportedType { name: String, mime_type: String },
    #[error("{name}: {message}")]
    Read { name: String, message: String },
    #[error("Upload transport error: {0}")]
    Transport(String),
    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Draft store failure. Never fatal to the session.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Draft I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Draft format invalid: {0}")]
    Format(#[from] serde_json::Error),
}

/// Failure of the final create call against the submission sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("Could not reach the submission service: {0}")]
    Transport(String),
    #[error("Submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Unexpected response from the submission service: {0}")]
    InvalidResponse(String),
}
