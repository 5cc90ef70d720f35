use thiserror::Error;

use crate::config::BackendKind;

#[derive(Error, Debug)]
pub enum ShimError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation '{operation}' is not implemented for backend kind '{kind}'")]
    UnsupportedOperation {
        operation: &'static str,
        kind: BackendKind,
    },

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("WebDriver error: {0}")]
    WebDriver(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ShimError {
    pub fn unsupported(operation: &'static str, kind: BackendKind) -> Self {
        Self::UnsupportedOperation { operation, kind }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed(message.into())
    }
}

/// Routes driver errors into the shim taxonomy. Stale element references get
/// their own variant so the instruction runner can tell them apart from
/// everything else; missing elements keep their identity for lookup callers;
/// no other driver error is special-cased.
impl From<thirtyfour::error::WebDriverError> for ShimError {
    fn from(err: thirtyfour::error::WebDriverError) -> Self {
        use thirtyfour::error::WebDriverError;
        match err {
            WebDriverError::StaleElementReference(_) => Self::StaleElement(err.to_string()),
            WebDriverError::NoSuchElement(_) => Self::ElementNotFound(err.to_string()),
            other => Self::WebDriver(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShimError>;
