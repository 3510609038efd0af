//! Timetables error types.

/// Longest snippet of a rejected document carried in a [`ParseError`].
const SNIPPET_CHARS: usize = 300;

/// A document could not be parsed as XML of the expected shape.
///
/// Parsing is all-or-nothing per document: no rows are produced when this
/// is returned.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {document} XML: {message}. Snippet: {snippet}")]
pub struct ParseError {
    document: &'static str,
    message: String,
    snippet: String,
}

impl ParseError {
    pub(crate) fn new(document: &'static str, message: impl ToString, text: &str) -> Self {
        Self {
            document,
            message: message.to_string(),
            snippet: snippet(text),
        }
    }

    /// Which kind of document failed (`plan`, `fchg`, `station`).
    pub fn document(&self) -> &'static str {
        self.document
    }

    /// Start of the offending text, on a single line.
    pub fn snippet(&self) -> &str {
        &self.snippet
    }
}

/// Errors from the Timetables HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid client id / API key, or the key lacks access to the API
    #[error("unauthorized: check DB_CLIENT_ID and DB_API_KEY")]
    Unauthorized,

    /// Still rate limited after exhausting retries
    #[error("rate limited by Timetables API after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Response was not the XML we asked for
    #[error("unexpected content type {content_type:?}: {snippet}")]
    UnexpectedContent {
        content_type: String,
        snippet: String,
    },

    /// Response body was not a valid document
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Station search returned no results
    #[error("no station found for {0:?}")]
    StationNotFound(String),

    /// Station search hit carried no EVA number
    #[error("station {0:?} has no EVA number")]
    MissingEva(String),

    /// Base URL or credentials could not be turned into a request
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub(crate) fn snippet(text: &str) -> String {
    text.chars()
        .take(SNIPPET_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
