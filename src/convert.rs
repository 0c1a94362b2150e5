//! Conversion entry points.
//!
//! [`convert`] wires the production capabilities (HTTP page source, HTTP image
//! fetcher, COS object store) from a [`ConversionConfig`]. [`convert_with`]
//! takes the capabilities as arguments and is what tests and embedders with
//! their own transport use.

use crate::config::{BlockOrdering, ConversionConfig};
use crate::document::Document;
use crate::error::Notion2MdError;
use crate::output::{ConversionOutput, ConversionStats, RelocationResult};
use crate::pipeline::flatten::flatten;
use crate::pipeline::relocate::{failures, relocate_images, RelocationTarget};
use crate::pipeline::source::{normalize_page_id, DocumentSource, NotionHttpSource};
use crate::storage::{CosObjectStore, HttpImageFetcher};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a page URL or id to Markdown.
///
/// Images are relocated only when [`ConversionConfig::storage`] is set and
/// [`ConversionConfig::relocate_images`] is true.
///
/// # Errors
/// Returns `Err(Notion2MdError)` only for fatal errors:
/// - the input carries no page id
/// - the page could not be fetched, or the response had no block map
///
/// Image failures are never fatal; check `output.stats.images_failed`.
pub async fn convert(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Notion2MdError> {
    let source = NotionHttpSource::from_config(config)?;

    let capabilities = match (config.relocation_target(), config.storage.as_ref()) {
        (Some(location), Some(storage)) => {
            let fetcher = HttpImageFetcher::new(config.download_timeout_secs)
                .map_err(|e| Notion2MdError::Internal(format!("HTTP client: {e}")))?;
            let store = CosObjectStore::new(storage, config.download_timeout_secs)
                .map_err(|e| Notion2MdError::Internal(format!("HTTP client: {e}")))?;
            Some((location, fetcher, store))
        }
        _ => None,
    };

    let target = capabilities
        .as_ref()
        .map(|(location, fetcher, store)| RelocationTarget {
            location,
            fetcher,
            store,
        });

    convert_with(input, &source, target, config).await
}

/// Convert using caller-supplied capabilities.
///
/// `relocation = None` skips the image pass entirely; the Markdown keeps its
/// original image URLs and `relocations` is empty.
pub async fn convert_with(
    input: impl AsRef<str>,
    source: &dyn DocumentSource,
    relocation: Option<RelocationTarget<'_>>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Notion2MdError> {
    let total_start = Instant::now();
    let page_id = normalize_page_id(input.as_ref())?;
    let progress = config.progress_callback.as_ref();
    info!("Starting conversion: {}", page_id);

    if let Some(cb) = progress {
        cb.on_conversion_start(&page_id);
    }

    // ── Step 1: Fetch the record map ─────────────────────────────────────
    if let Some(cb) = progress {
        cb.on_fetch_start(&page_id);
    }
    let fetch_start = Instant::now();
    let doc = source.fetch_document(&page_id).await?;
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
    info!("Fetched {} blocks in {}ms", doc.len(), fetch_duration_ms);

    // ── Step 2: Flatten ──────────────────────────────────────────────────
    let markdown = render_document(&doc, config.ordering);
    if let Some(cb) = progress {
        cb.on_render_complete(doc.len(), markdown.len());
    }

    // ── Step 3: Relocate images ──────────────────────────────────────────
    let relocate_start = Instant::now();
    let (markdown, relocations): (String, Vec<RelocationResult>) = match relocation {
        Some(target) => relocate_images(&markdown, target, progress).await,
        None => {
            debug!("Image relocation disabled");
            (markdown, Vec::new())
        }
    };
    let relocate_duration_ms = relocate_start.elapsed().as_millis() as u64;

    // ── Step 4: Stats ────────────────────────────────────────────────────
    let images_failed = failures(&relocations);
    let images_relocated = relocations.iter().filter(|r| r.is_relocated()).count();
    let stats = ConversionStats {
        block_count: doc.len(),
        images_found: relocations.len(),
        images_relocated,
        images_failed,
        fetch_duration_ms,
        relocate_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} blocks, {}/{} images relocated, {}ms total",
        stats.block_count, images_relocated, stats.images_found, stats.total_duration_ms
    );

    if let Some(cb) = progress {
        cb.on_conversion_complete(images_relocated, images_failed);
    }

    Ok(ConversionOutput {
        page_id,
        markdown,
        relocations,
        stats,
    })
}

/// Render an already-fetched document without touching the network.
pub fn render_document(doc: &Document, ordering: BlockOrdering) -> String {
    flatten(doc, ordering)
}

/// Convert a page and write the Markdown directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Notion2MdError> {
    let output = convert(input, config).await?;
    write_markdown(output_path.as_ref(), &output.markdown).await?;
    Ok(output.stats)
}

/// Write `markdown` to `path` through a sibling `.md.tmp` file.
pub(crate) async fn write_markdown(path: &Path, markdown: &str) -> Result<(), Notion2MdError> {
    let write_err = |e: std::io::Error| Notion2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Notion2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Notion2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}
