//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline fetches, renders and relocates.
//!
//! Every event method has a default implementation that forwards a
//! human-readable line to [`ConversionProgressCallback::on_status`]. Callers
//! that only want status text override `on_status`; callers that want
//! structured events override the specific methods.
//!
//! # Example
//!
//! ```rust
//! use notion2md::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! struct StatusLog(Mutex<Vec<String>>);
//!
//! impl ConversionProgressCallback for StatusLog {
//!     fn on_status(&self, message: &str) {
//!         self.0.lock().unwrap().push(message.to_string());
//!     }
//! }
//!
//! let log = Arc::new(StatusLog(Mutex::new(Vec::new())));
//! let config = ConversionConfig::builder()
//!     .progress_callback(log as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline at each stage.
///
/// Implementations must be `Send + Sync` so a config holding one can be
/// shared across tasks.
pub trait ConversionProgressCallback: Send + Sync {
    /// Receives a human-readable status line. No-op by default.
    fn on_status(&self, message: &str) {
        let _ = message;
    }

    /// Called once before anything is fetched.
    fn on_conversion_start(&self, page_id: &str) {
        let _ = page_id;
        self.on_status("Starting conversion...");
    }

    /// Called just before the document request is sent.
    fn on_fetch_start(&self, page_id: &str) {
        self.on_status(&format!("Fetching page blocks for {page_id}..."));
    }

    /// Called after the block tree has been flattened into Markdown.
    ///
    /// # Arguments
    /// * `block_count`  — number of blocks in the record map
    /// * `markdown_len` — byte length of the rendered Markdown
    fn on_render_complete(&self, block_count: usize, markdown_len: usize) {
        self.on_status(&format!(
            "Rendered {block_count} blocks ({markdown_len} bytes)"
        ));
    }

    /// Called before the image relocation pass.
    fn on_relocation_start(&self, total_images: usize) {
        let _ = total_images;
        self.on_status("Processing images...");
    }

    /// Called before an image is fetched.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position among the candidates
    /// * `total` — number of candidates
    /// * `alt`   — the image's alt text (may be empty)
    fn on_image_start(&self, index: usize, total: usize, alt: &str) {
        let _ = (index, total);
        let label = if alt.is_empty() { "untitled" } else { alt };
        self.on_status(&format!("Uploading image... {label}"));
    }

    /// Called when an image has been uploaded and rewritten.
    fn on_image_complete(&self, index: usize, total: usize, destination_url: &str) {
        let _ = destination_url;
        self.on_status(&format!("Uploaded image {index}/{total}"));
    }

    /// Called when an image could not be relocated. The original link is kept.
    fn on_image_error(&self, index: usize, total: usize, alt: &str, error: &str) {
        let _ = (index, total, error);
        self.on_status(&format!("Image upload failed: {alt}"));
    }

    /// Called once when the final Markdown is ready.
    ///
    /// # Arguments
    /// * `relocated` — images rewritten to durable URLs
    /// * `failed`    — images left on their original URL
    fn on_conversion_complete(&self, relocated: usize, failed: usize) {
        if failed == 0 {
            self.on_status("Conversion complete");
        } else {
            self.on_status(&format!(
                "Conversion complete ({relocated} images relocated, {failed} failed)"
            ));
        }
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StatusLog {
        lines: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for StatusLog {
        fn on_status(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    struct ErrorCounter {
        errors: AtomicUsize,
    }

    impl ConversionProgressCallback for ErrorCounter {
        fn on_image_error(&self, _index: usize, _total: usize, _alt: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("p");
        cb.on_fetch_start("p");
        cb.on_render_complete(3, 42);
        cb.on_relocation_start(1);
        cb.on_image_start(1, 1, "cat");
        cb.on_image_error(1, 1, "cat", "boom");
        cb.on_conversion_complete(0, 1);
    }

    #[test]
    fn default_methods_forward_status_lines() {
        let log = StatusLog {
            lines: Mutex::new(Vec::new()),
        };
        log.on_conversion_start("p1");
        log.on_fetch_start("p1");
        log.on_relocation_start(2);
        log.on_image_start(1, 2, "");
        log.on_image_error(2, 2, "cat", "HTTP 500");
        log.on_conversion_complete(1, 1);

        let lines = log.lines.lock().unwrap();
        assert_eq!(lines[0], "Starting conversion...");
        assert_eq!(lines[1], "Fetching page blocks for p1...");
        assert_eq!(lines[2], "Processing images...");
        assert_eq!(lines[3], "Uploading image... untitled");
        assert_eq!(lines[4], "Image upload failed: cat");
        assert!(lines[5].contains("1 failed"));
    }

    #[test]
    fn structured_override_skips_status() {
        let counter = ErrorCounter {
            errors: AtomicUsize::new(0),
        };
        counter.on_image_error(1, 2, "a", "x");
        counter.on_image_error(2, 2, "b", "y");
        assert_eq!(counter.errors.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ConversionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_conversion_start("p");
        cb.on_image_complete(1, 1, "https://b.cos.r.myqcloud.com/k.png");
    }
}
