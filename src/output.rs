//! Conversion results.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};

/// Everything a conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Normalised page id the document was fetched with.
    pub page_id: String,
    /// Final Markdown, images rewritten where relocation succeeded.
    pub markdown: String,
    /// One entry per relocation candidate, in document order.
    pub relocations: Vec<RelocationResult>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Candidates that kept their original URL.
    pub fn failed_relocations(&self) -> impl Iterator<Item = &RelocationResult> {
        self.relocations.iter().filter(|r| r.error.is_some())
    }
}

/// Outcome for a single image link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationResult {
    pub alt: String,
    pub source_url: String,
    /// Object key, once the image was fetched and a key could be derived.
    pub key: Option<String>,
    /// Durable URL the link now points to. `None` when relocation failed.
    pub destination_url: Option<String>,
    pub error: Option<ImageError>,
}

impl RelocationResult {
    pub fn is_relocated(&self) -> bool {
        self.destination_url.is_some()
    }
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Blocks in the record map, including ones that rendered empty.
    pub block_count: usize,
    pub images_found: usize,
    pub images_relocated: usize,
    pub images_failed: usize,
    pub fetch_duration_ms: u64,
    pub relocate_duration_ms: u64,
    pub total_duration_ms: u64,
}
