use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResultError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("The result page failed to load: {0}")]
    FrameLoadFailure(String),

    #[error("The viewer was opened without a result locator")]
    MissingNavigationParameters,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not build the HTTP client: {0}")]
    RequestError(#[from] reqwest::Error),
}

/// Discriminant of a [`ResultError`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    FrameLoadFailure,
    MissingNavigationParameters,
    InvalidConfig,
    Request,
}

impl ResultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResultError::InvalidInput(_) => ErrorKind::InvalidInput,
            ResultError::FrameLoadFailure(_) => ErrorKind::FrameLoadFailure,
            ResultError::MissingNavigationParameters => ErrorKind::MissingNavigationParameters,
            ResultError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ResultError::RequestError(_) => ErrorKind::Request,
        }
    }

    /// Whether the viewer's retry timer should keep trying after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::FrameLoadFailure)
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        ResultError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ResultError>;
