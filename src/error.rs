//! Error types for the notion2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Notion2MdError`] — **Fatal**: the conversion cannot proceed at all
//!   (page id unreadable, the service is unreachable, the response carries no
//!   block map, bad configuration). Returned as `Err(Notion2MdError)` from the
//!   top-level `convert*` functions; no partial Markdown is produced.
//!
//! * [`ImageError`] — **Non-fatal**: a single image could not be fetched or
//!   uploaded. Stored inside [`crate::output::RelocationResult`]; the image
//!   keeps its original URL and the remaining images are still processed.
//!
//! Malformed blocks never produce an error value at all: they render to an
//! empty or best-effort fragment.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notion2md library.
///
/// Per-image failures use [`ImageError`] and are stored in
/// [`crate::output::RelocationResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Notion2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input is neither a page URL nor a page id.
    #[error("Could not detect a Notion page id in '{input}'\nPass a page URL or a 32-character page id.")]
    InvalidPageId { input: String },

    // ── Source errors ─────────────────────────────────────────────────────
    /// The document request failed or the service returned a non-2xx status.
    #[error("Failed to fetch page '{page_id}': {reason}")]
    SourceUnavailable { page_id: String, reason: String },

    /// The document request exceeded the configured timeout.
    #[error("Fetching page '{page_id}' timed out after {secs}s\nIncrease --api-timeout.")]
    SourceTimeout { page_id: String, secs: u64 },

    /// The service answered, but the response has no `recordMap.block` map.
    #[error("Invalid response for page '{page_id}': no block map in record map")]
    MissingBlockMap { page_id: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Notion2MdError {
    /// True for every variant that means "the document could not be obtained".
    pub fn is_source_unavailable(&self) -> bool {
        matches!(
            self,
            Notion2MdError::SourceUnavailable { .. }
                | Notion2MdError::SourceTimeout { .. }
                | Notion2MdError::MissingBlockMap { .. }
        )
    }
}

/// A non-fatal error for a single image.
///
/// Stored alongside [`crate::output::RelocationResult`] when an image could
/// not be relocated. The Markdown keeps the original link for that image.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// Downloading the image bytes failed.
    #[error("fetching '{url}' failed: {detail}")]
    FetchFailed { url: String, detail: String },

    /// Downloading the image bytes timed out.
    #[error("fetching '{url}' timed out after {secs}s")]
    FetchTimeout { url: String, secs: u64 },

    /// The object store rejected the upload.
    #[error("uploading '{key}' failed: {detail}")]
    UploadFailed { key: String, detail: String },
}
