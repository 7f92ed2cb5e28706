use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the resolution engine.
/// Every fallible module returns `Result<T, PackError>`.
#[derive(Debug, Error)]
pub enum PackError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch failed for {url}: HTTP {status}")]
    FetchFailed { url: String, status: u16 },

    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("Redirect chain exceeded {limit} hops starting from {url}")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Redirect response from {url} carried no Location header")]
    MissingLocation { url: String },

    // ── XML ─────────────────────────────────────────────
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Document has no root element")]
    EmptyDocument,

    // ── Decode ──────────────────────────────────────────
    #[error("Module {module:?} has no ModType element")]
    MissingModType { module: String },

    #[error("Unrecognized mod type: {0:?}")]
    UnknownModType(String),

    // ── Resolution ──────────────────────────────────────
    #[error("Server {0:?} not found in pack")]
    ServerNotFound(String),

    #[error("Import {import} failed version checking")]
    ImportVersionMismatch { import: String },

    #[error("Import {import}: could not retrieve document")]
    ImportFetch { import: String },

    #[error("Unsupported pack format version: {0}")]
    UnsupportedPackVersion(u8),
}

/// Convenience alias used throughout the crate.
pub type PackResult<T> = Result<T, PackError>;

impl From<std::io::Error> for PackError {
    fn from(source: std::io::Error) -> Self {
        PackError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
