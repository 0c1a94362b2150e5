//! # notion2md
//!
//! Convert Notion pages to Markdown, optionally moving their images to
//! durable object storage.
//!
//! Page images are served from short-lived signed URLs. A Markdown export that
//! keeps those links breaks within hours, so this crate can copy each one to a
//! COS bucket and rewrite the link to the bucket's public URL.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page URL / id
//!  │
//!  ├─ 1. Source    normalise the id, POST loadPageChunk, read recordMap.block
//!  ├─ 2. Flatten   order blocks (depth-first from the roots)
//!  ├─ 3. Render    one Markdown fragment per block, rich-text annotations
//!  ├─ 4. Relocate  fetch transient images, upload under md5(url) keys, rewrite
//!  └─ 5. Output    Markdown + per-image results + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notion2md::{convert, ConversionConfig, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .notion_token(std::env::var("NOTION_TOKEN")?)
//!         .storage(StorageConfig::new("mybucket", "ap-guangzhou", "AKID...", "secret").prefix("notion/"))
//!         .build()?;
//!     let output = convert("https://www.notion.so/My-Page-0123abcd456789ef0123456789abcdef", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("images: {} relocated, {} failed",
//!         output.stats.images_relocated,
//!         output.stats.images_failed);
//!     Ok(())
//! }
//! ```
//!
//! Rendering alone needs no network:
//!
//! ```rust
//! use notion2md::{render_document, BlockOrdering, Document};
//! use serde_json::json;
//!
//! let doc = Document::from_block_map(&json!({
//!     "h": {"value": {"id": "h", "type": "header", "properties": {"title": [["Intro"]]}}}
//! }))
//! .unwrap();
//! assert_eq!(render_document(&doc, BlockOrdering::DepthFirst), "# Intro");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notion2md` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! notion2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BlockOrdering, ConversionConfig, ConversionConfigBuilder, StorageConfig};
pub use convert::{convert, convert_sync, convert_to_file, convert_with, render_document};
pub use document::{Block, BlockRecord, BlockType, Document};
pub use error::{ImageError, Notion2MdError};
pub use output::{ConversionOutput, ConversionStats, RelocationResult};
pub use pipeline::relocate::RelocationTarget;
pub use pipeline::source::{normalize_page_id, DocumentSource, NotionHttpSource};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::{
    CosObjectStore, FetchedImage, HttpImageFetcher, ImageFetcher, ObjectStore, StorageLocation,
};
