use thiserror::Error;

/// Failures scoped to a single lookup. None of these abort a batch.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Server answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Transport {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Request never produced a response (retries exhausted, bad URL, body read failure).
    #[error("request to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid locator {0}")]
    Locator(String),

    /// Page parsed but required fields were missing or unreadable.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}
