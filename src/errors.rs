/*!
 * Error types for the speranto application.
 *
 * This module contains custom error types for the different layers of the
 * translation pipeline, using the thiserror crate for ergonomic error
 * definitions. Library boundaries return these types; the controller and the
 * CLI wrap them with `anyhow` context.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The requested model is not available and could not be fetched
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to the matching provider error
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors raised while parsing source content, existing translations or
/// model responses
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed JSON document
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Markdown content that cannot be split into blocks
    #[error("Invalid Markdown: {0}")]
    Markdown(String),

    /// JavaScript or TypeScript source with syntax errors
    #[error("Invalid script source: {0}")]
    Script(String),

    /// A model response that does not have the expected shape
    #[error("Unexpected model response: {0}")]
    Response(String),

    /// A file extension the pipeline has no parser for
    #[error("Unsupported content format: {0}")]
    UnsupportedFormat(String),
}

/// Errors from database adapters
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The database could not be opened
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// An operation was attempted before `connect` or after `close`
    #[error("Database not connected")]
    NotConnected,

    /// A table or column name that is not a plain SQL identifier
    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),

    /// The configured database type has no adapter
    #[error("Unsupported database type: {0}")]
    UnsupportedType(String),

    /// Error reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A blocking database task could not complete
    #[error("Database task failed: {0}")]
    Task(String),
}

/// Errors that can occur while translating a single unit
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model answered with something that could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The model returned no content
    #[error("Empty response from model for unit '{0}'")]
    EmptyResponse(String),

    /// The model answered without some of the keys it was sent
    #[error("Response for unit '{unit}' is missing keys: {}", keys.join(", "))]
    MissingKeys { unit: String, keys: Vec<String> },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or missing configuration, raised before any work starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A backend could not be reached; fatal for that backend
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from a parser
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error from a database adapter
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
