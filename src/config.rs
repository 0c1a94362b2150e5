//! Configuration types for Notion-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so a
//! config can be shared across tasks and logged as a whole (secrets are
//! redacted by the `Debug` impls).

use crate::error::Notion2MdError;
use crate::progress::ProgressCallback;
use crate::storage::StorageLocation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default endpoint of the service's internal API.
pub const DEFAULT_API_BASE_URL: &str = "https://www.notion.so/api/v3";

/// Configuration for a Notion-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use notion2md::{BlockOrdering, ConversionConfig, StorageConfig};
///
/// let config = ConversionConfig::builder()
///     .ordering(BlockOrdering::DepthFirst)
///     .storage(StorageConfig::new("mybucket", "ap-1", "AKID", "secret").prefix("notion/"))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// How blocks are ordered before rendering. Default: [`BlockOrdering::DepthFirst`].
    pub ordering: BlockOrdering,

    /// Object-storage target for image relocation.
    ///
    /// When `None` the relocation pass is skipped and image links keep their
    /// original URLs.
    pub storage: Option<StorageConfig>,

    /// Relocate transient image links when storage is configured. Default: true.
    pub relocate_images: bool,

    /// Session token sent as the `token_v2` cookie with the document request.
    pub notion_token: Option<String>,

    /// Base URL of the internal API. Default: [`DEFAULT_API_BASE_URL`].
    pub api_base_url: String,

    /// Maximum number of blocks requested in the page chunk. Default: 100.
    pub chunk_limit: usize,

    /// Timeout for the document request in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// Timeout for each image download and each upload in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            ordering: BlockOrdering::default(),
            storage: None,
            relocate_images: true,
            notion_token: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            chunk_limit: 100,
            api_timeout_secs: 30,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("ordering", &self.ordering)
            .field("storage", &self.storage)
            .field("relocate_images", &self.relocate_images)
            .field("notion_token", &self.notion_token.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("chunk_limit", &self.chunk_limit)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Storage location to relocate into, if relocation is enabled.
    pub fn relocation_target(&self) -> Option<StorageLocation> {
        if !self.relocate_images {
            return None;
        }
        self.storage.as_ref().map(StorageConfig::location)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn ordering(mut self, ordering: BlockOrdering) -> Self {
        self.config.ordering = ordering;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = Some(storage);
        self
    }

    pub fn relocate_images(mut self, v: bool) -> Self {
        self.config.relocate_images = v;
        self
    }

    pub fn notion_token(mut self, token: impl Into<String>) -> Self {
        self.config.notion_token = Some(token.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn chunk_limit(mut self, n: usize) -> Self {
        self.config.chunk_limit = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Notion2MdError> {
        let c = &self.config;
        if c.chunk_limit == 0 {
            return Err(Notion2MdError::InvalidConfig(
                "Chunk limit must be ≥ 1".into(),
            ));
        }
        if c.api_base_url.trim().is_empty() {
            return Err(Notion2MdError::InvalidConfig(
                "API base URL must not be empty".into(),
            ));
        }
        // Storage is only consulted when relocation is on.
        if let Some(storage) = c.storage.as_ref().filter(|_| c.relocate_images) {
            storage.validate()?;
        }
        Ok(self.config)
    }
}

// ── Storage ──────────────────────────────────────────────────────────────

/// Credentials and location of the durable object store.
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub secret_id: String,
    pub secret_key: String,
    /// Prepended verbatim to every object key (e.g. `"notion/"`).
    #[serde(default)]
    pub prefix: String,
}

impl StorageConfig {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        secret_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            secret_id: secret_id.into(),
            secret_key: secret_key.into(),
            prefix: String::new(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// The credential-free part of the config.
    pub fn location(&self) -> StorageLocation {
        StorageLocation {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            prefix: self.prefix.clone(),
        }
    }

    fn validate(&self) -> Result<(), Notion2MdError> {
        let missing: Vec<&str> = [
            ("bucket", &self.bucket),
            ("region", &self.region),
            ("secret id", &self.secret_id),
            ("secret key", &self.secret_key),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Notion2MdError::InvalidConfig(format!(
                "Storage settings incomplete, missing: {}",
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("secret_id", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("prefix", &self.prefix)
            .finish()
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Strategy used to turn the unordered record map into a block sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockOrdering {
    /// Walk from the root blocks, emitting each block before its `content`
    /// children, recursively. (default)
    #[default]
    DepthFirst,
    /// Stable sort under the pairwise `content`-position comparator used by
    /// earlier exports. Non-recursive; a parent ranks after its direct
    /// children.
    Legacy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.ordering, BlockOrdering::DepthFirst);
        assert!(c.relocate_images);
        assert_eq!(c.chunk_limit, 100);
        assert_eq!(c.api_base_url, DEFAULT_API_BASE_URL);
        assert!(c.relocation_target().is_none());
    }

    #[test]
    fn incomplete_storage_rejected() {
        let err = ConversionConfig::builder()
            .storage(StorageConfig::new("bucket", "", "id", " "))
            .build()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("region"), "got: {msg}");
        assert!(msg.contains("secret key"), "got: {msg}");
        assert!(!msg.contains("bucket,"), "got: {msg}");
    }

    #[test]
    fn incomplete_storage_ignored_when_relocation_off() {
        let c = ConversionConfig::builder()
            .storage(StorageConfig::new("mybucket", "", "", ""))
            .relocate_images(false)
            .build()
            .unwrap();
        assert!(c.relocation_target().is_none());
    }

    #[test]
    fn zero_chunk_limit_rejected() {
        assert!(ConversionConfig::builder().chunk_limit(0).build().is_err());
    }

    #[test]
    fn relocation_target_respects_switch() {
        let storage = StorageConfig::new("b", "r", "id", "key").prefix("img/");
        let on = ConversionConfig::builder()
            .storage(storage.clone())
            .build()
            .unwrap();
        let target = on.relocation_target().expect("target");
        assert_eq!(target.bucket, "b");
        assert_eq!(target.prefix, "img/");

        let off = ConversionConfig::builder()
            .storage(storage)
            .relocate_images(false)
            .build()
            .unwrap();
        assert!(off.relocation_target().is_none());
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = ConversionConfig::builder()
            .notion_token("tok-123")
            .storage(StorageConfig::new("b", "r", "AKID-XYZ", "very-secret"))
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("tok-123"));
        assert!(!dbg.contains("AKID-XYZ"));
        assert!(!dbg.contains("very-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
