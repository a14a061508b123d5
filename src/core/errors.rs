use thiserror::Error;

/// Failures that abort a whole bind or fill.
///
/// Conversion failures and constraint violations are not errors here; they
/// end up as messages in the validation report.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("path '{path}' must start with prefix '{prefix}'")]
    PathPrefixMismatch { path: String, prefix: String },

    #[error("field '{field}' must be nested under mapping path '{mapping}'")]
    FieldOutsideMapping { field: String, mapping: String },

    #[error("mapping '{path}' has no configuration")]
    MissingConfig { path: String },

    #[error("configuration is incomplete: {missing} is not set")]
    IncompleteConfig { missing: &'static str },

    #[error(
        "authorization token is not supported in root list mapping '{path}', use a single root mapping with a nested list mapping"
    )]
    SecuredRootList { path: String },

    #[error("list mapping '{path}' got row index {index}, at most {limit} rows are bound")]
    TooManyListRows { path: String, index: usize, limit: usize },

    #[error("request context is required by secured mapping '{path}'")]
    MissingContext { path: String },

    #[error("authorization token is missing, it should be posted as field '{field}'")]
    TokenMissing { field: String },

    #[error("authorization token is invalid: {0}")]
    InvalidToken(#[from] TokenRejected),

    #[error("mapping '{path}' produced a value that is not a {expected}")]
    TypeMismatch { path: String, expected: &'static str },

    #[error("binder failed for mapping '{path}': {reason}")]
    Binder { path: String, reason: String },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error("outline error: {0}")]
    Outline(String),
}

impl FormError {
    /// True for a missing or rejected anti-forgery token.
    pub fn is_authorization(&self) -> bool {
        matches!(self, FormError::TokenMissing { .. } | FormError::InvalidToken(_))
    }
}

/// Rejection reported by a token authority.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct TokenRejected {
    pub reason: String,
}

impl TokenRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
