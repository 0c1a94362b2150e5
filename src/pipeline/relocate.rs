//! Image relocation: copy transient-hosted images to durable storage and
//! rewrite their Markdown links.
//!
//! ## Flow
//!
//! 1. Scan the Markdown for `![alt](url)` and keep the matches whose URL
//!    points at the origin service's transient hosting (`amazonaws.com` or
//!    `notion.so`). Everything else is left alone, including links that were
//!    already relocated.
//! 2. For each candidate, in order and one at a time: fetch the bytes,
//!    derive the object key from the *source URL*, upload, and note the
//!    destination URL.
//! 3. Rewrite each successful candidate at its own match span. Two images
//!    with identical syntax are rewritten independently.
//!
//! A failed candidate never aborts the pass: it keeps its original link and
//! its [`crate::error::ImageError`] is recorded in the returned [`RelocationResult`].
//!
//! Candidates are processed sequentially on purpose, so that neither the
//! origin host nor the storage credential's rate limit sees a burst.

use crate::output::RelocationResult;
use crate::progress::ProgressCallback;
use crate::storage::{hex, ImageFetcher, ObjectStore, StorageLocation};
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::{debug, info, warn};

static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").unwrap());

/// Substrings identifying the origin service's transient image hosting.
const TRANSIENT_HOSTS: [&str; 2] = ["amazonaws.com", "notion.so"];

/// Extension used when the content type carries no subtype.
const DEFAULT_EXTENSION: &str = "png";

/// An image link eligible for relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Byte span of the full `![alt](url)` match.
    pub span: Range<usize>,
    pub alt: String,
    pub url: String,
}

/// The capabilities and target a relocation pass needs.
#[derive(Clone, Copy)]
pub struct RelocationTarget<'a> {
    pub location: &'a StorageLocation,
    pub fetcher: &'a dyn ImageFetcher,
    pub store: &'a dyn ObjectStore,
}

/// True when `url` points at the origin service's transient hosting.
pub fn is_transient_url(url: &str) -> bool {
    TRANSIENT_HOSTS.iter().any(|host| url.contains(host))
}

/// Find every relocatable image link, in document order.
pub fn extract_candidates(markdown: &str) -> Vec<Candidate> {
    RE_IMAGE
        .captures_iter(markdown)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let url = caps.get(2)?.as_str();
            if !is_transient_url(url) {
                return None;
            }
            Some(Candidate {
                span: whole.range(),
                alt: caps.get(1).map_or("", |m| m.as_str()).to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

/// Object key for an image: `<prefix><md5-hex(url)>.<ext>`.
///
/// The hash covers the source URL, not the bytes, so relocating the same URL
/// twice always targets the same object.
pub fn object_key(prefix: &str, url: &str, content_type: Option<&str>) -> String {
    let hash = hex(&Md5::digest(url.as_bytes()));
    format!("{prefix}{hash}.{}", extension_for(content_type))
}

/// File extension from a content type's subtype (`image/jpeg` → `jpeg`).
fn extension_for(content_type: Option<&str>) -> &str {
    content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|mime| mime.split('/').nth(1))
        .map(str::trim)
        .filter(|sub| !sub.is_empty())
        .unwrap_or(DEFAULT_EXTENSION)
}

/// Relocate every candidate image and return the rewritten Markdown along
/// with one result per candidate.
pub async fn relocate_images(
    markdown: &str,
    target: RelocationTarget<'_>,
    progress: Option<&ProgressCallback>,
) -> (String, Vec<RelocationResult>) {
    let candidates = extract_candidates(markdown);
    let total = candidates.len();
    info!("Found {} relocatable images", total);

    if let Some(cb) = progress {
        cb.on_relocation_start(total);
    }

    let mut results = Vec::with_capacity(total);
    for (i, candidate) in candidates.iter().enumerate() {
        let index = i + 1;
        if let Some(cb) = progress {
            cb.on_image_start(index, total, &candidate.alt);
        }

        let result = relocate_one(candidate, target).await;

        if let Some(cb) = progress {
            match (&result.destination_url, &result.error) {
                (Some(url), _) => cb.on_image_complete(index, total, url),
                (None, Some(e)) => cb.on_image_error(index, total, &candidate.alt, &e.to_string()),
                (None, None) => {}
            }
        }
        results.push(result);
    }

    let rewritten = rewrite_spans(markdown, &candidates, &results);
    (rewritten, results)
}

/// Fetch and upload one candidate. Never fails: errors are recorded in the
/// result so the caller can move on to the next image.
async fn relocate_one(candidate: &Candidate, target: RelocationTarget<'_>) -> RelocationResult {
    let mut result = RelocationResult {
        alt: candidate.alt.clone(),
        source_url: candidate.url.clone(),
        key: None,
        destination_url: None,
        error: None,
    };

    let image = match target.fetcher.fetch(&candidate.url).await {
        Ok(image) => image,
        Err(e) => {
            warn!("Image '{}': {}", candidate.alt, e);
            result.error = Some(e);
            return result;
        }
    };

    let key = object_key(
        &target.location.prefix,
        &candidate.url,
        image.content_type.as_deref(),
    );
    debug!("Image '{}': {} bytes → {}", candidate.alt, image.bytes.len(), key);

    match target
        .store
        .upload(target.location, &key, image.bytes, image.content_type.as_deref())
        .await
    {
        Ok(url) => result.destination_url = Some(url),
        Err(e) => {
            warn!("Image '{}': {}", candidate.alt, e);
            result.error = Some(e);
        }
    }
    result.key = Some(key);
    result
}

/// Replace each successfully relocated candidate at its own span.
fn rewrite_spans(markdown: &str, candidates: &[Candidate], results: &[RelocationResult]) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut cursor = 0;

    for (candidate, result) in candidates.iter().zip(results) {
        let Some(ref destination) = result.destination_url else {
            continue;
        };
        out.push_str(&markdown[cursor..candidate.span.start]);
        out.push_str(&format!("![{}]({})", candidate.alt, destination));
        cursor = candidate.span.end;
    }

    out.push_str(&markdown[cursor..]);
    out
}

/// Count of failed results.
pub(crate) fn failures(results: &[RelocationResult]) -> usize {
    results.iter().filter(|r| r.error.is_some()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageError;
    use crate::storage::FetchedImage;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct StaticFetcher {
        content_type: Option<&'static str>,
        fail_on: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        fn new(content_type: Option<&'static str>) -> Self {
            Self {
                content_type,
                fail_on: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.fail_on.map_or(false, |f| url.contains(f)) {
                return Err(ImageError::FetchFailed {
                    url: url.to_string(),
                    detail: "HTTP 404".into(),
                });
            }
            Ok(FetchedImage {
                bytes: Bytes::from_static(b"\x89PNG"),
                content_type: self.content_type.map(str::to_string),
            })
        }
    }

    struct MemoryStore {
        fail: bool,
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn upload(
            &self,
            location: &StorageLocation,
            key: &str,
            _body: Bytes,
            _content_type: Option<&str>,
        ) -> Result<String, ImageError> {
            self.keys.lock().unwrap().push(key.to_string());
            if self.fail {
                return Err(ImageError::UploadFailed {
                    key: key.to_string(),
                    detail: "HTTP 403".into(),
                });
            }
            Ok(location.object_url(key))
        }
    }

    fn store(fail: bool) -> MemoryStore {
        MemoryStore {
            fail,
            keys: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn extracts_only_transient_links() {
        let md = "![a](https://s3.amazonaws.com/x/a.png) ![b](https://cdn.example.org/b.png)\n\
                  ![](https://www.notion.so/image/c.png) [link](https://notion.so/x)";
        let found = extract_candidates(md);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].alt, "a");
        assert_eq!(found[1].alt, "");
        assert_eq!(found[1].url, "https://www.notion.so/image/c.png");
        assert_eq!(&md[found[0].span.clone()], "![a](https://s3.amazonaws.com/x/a.png)");
    }

    #[test]
    fn no_candidates_in_plain_markdown() {
        let md = "# Intro\n\nHello **world**\n\n- [x] done\n\n![ok](https://mybucket.cos.ap-1.myqcloud.com/a.png)";
        assert!(extract_candidates(md).is_empty());
    }

    #[tokio::test]
    async fn image_free_markdown_passes_through_untouched() {
        let md = "# Intro\n\nHello **world**\n\n```python\nprint(1)\n```\n\n\
                  ![ok](https://mybucket.cos.ap-1.myqcloud.com/a.png)";
        let location = StorageLocation::new("mybucket", "ap-1");
        let fetcher = StaticFetcher::new(Some("image/png"));
        let store = store(false);
        let target = RelocationTarget {
            location: &location,
            fetcher: &fetcher,
            store: &store,
        };

        let (out, results) = relocate_images(md, target, None).await;
        assert_eq!(out, md);
        assert!(results.is_empty());
        assert!(fetcher.calls.lock().unwrap().is_empty());
        assert!(store.keys.lock().unwrap().is_empty());
    }

    #[test]
    fn key_is_stable_and_uses_subtype() {
        let url = "https://s3.amazonaws.com/x/cat.png";
        let a = object_key("", url, Some("image/jpeg"));
        let b = object_key("", url, Some("image/jpeg"));
        assert_eq!(a, b);
        assert!(a.ends_with(".jpeg"));
        assert_eq!(a.len(), 32 + ".jpeg".len());

        assert!(object_key("notion/", url, None).starts_with("notion/"));
        assert!(object_key("", url, None).ends_with(".png"));
        assert!(object_key("", url, Some("image/webp; charset=binary")).ends_with(".webp"));
        assert!(object_key("", url, Some("application")).ends_with(".png"));
    }

    #[test]
    fn key_hashes_the_url() {
        // md5("") is well known.
        assert_eq!(object_key("", "", None), "d41d8cd98f00b204e9800998ecf8427e.png");
        assert_ne!(
            object_key("", "https://s3.amazonaws.com/a.png", None),
            object_key("", "https://s3.amazonaws.com/b.png", None)
        );
    }

    #[tokio::test]
    async fn rewrites_successful_uploads() {
        let md = "Intro\n\n![cat](https://s3.amazonaws.com/x/cat.png)\n\nEnd";
        let location = StorageLocation::new("mybucket", "ap-1");
        let fetcher = StaticFetcher::new(Some("image/png"));
        let store = store(false);
        let target = RelocationTarget {
            location: &location,
            fetcher: &fetcher,
            store: &store,
        };

        let (out, results) = relocate_images(md, target, None).await;
        let key = object_key("", "https://s3.amazonaws.com/x/cat.png", Some("image/png"));
        assert_eq!(
            out,
            format!("Intro\n\n![cat](https://mybucket.cos.ap-1.myqcloud.com/{key})\n\nEnd")
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key.as_deref(), Some(key.as_str()));
        assert_eq!(failures(&results), 0);
    }

    #[tokio::test]
    async fn failed_upload_keeps_original_link() {
        let md = "![cat](https://s3.amazonaws.com/x/cat.png)";
        let location = StorageLocation::new("mybucket", "ap-1");
        let fetcher = StaticFetcher::new(None);
        let store = store(true);
        let target = RelocationTarget {
            location: &location,
            fetcher: &fetcher,
            store: &store,
        };

        let (out, results) = relocate_images(md, target, None).await;
        assert_eq!(out, md);
        assert_eq!(failures(&results), 1);
        assert!(matches!(results[0].error, Some(ImageError::UploadFailed { .. })));
        assert!(results[0].destination_url.is_none());
    }

    #[tokio::test]
    async fn failure_does_not_stop_later_images() {
        let md = "![a](https://s3.amazonaws.com/bad.png)\n![b](https://s3.amazonaws.com/good.png)";
        let location = StorageLocation::new("b", "r");
        let fetcher = StaticFetcher {
            fail_on: Some("bad"),
            ..StaticFetcher::new(Some("image/gif"))
        };
        let store = store(false);
        let target = RelocationTarget {
            location: &location,
            fetcher: &fetcher,
            store: &store,
        };

        let (out, results) = relocate_images(md, target, None).await;
        assert!(out.starts_with("![a](https://s3.amazonaws.com/bad.png)\n![b](https://b.cos.r.myqcloud.com/"));
        assert!(out.ends_with(".gif)"));
        assert_eq!(failures(&results), 1);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_links_upload_per_occurrence_and_rewrite_by_span() {
        let md = "![x](https://s3.amazonaws.com/same.png) and ![x](https://s3.amazonaws.com/same.png)";
        let location = StorageLocation::new("b", "r");
        let fetcher = StaticFetcher::new(Some("image/png"));
        let store = store(false);
        let target = RelocationTarget {
            location: &location,
            fetcher: &fetcher,
            store: &store,
        };

        let (out, results) = relocate_images(md, target, None).await;
        assert_eq!(results.len(), 2);
        let keys = store.keys.lock().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], keys[1]);
        assert!(!out.contains("amazonaws.com"));
        assert_eq!(out.matches("https://b.cos.r.myqcloud.com/").count(), 2);
    }
}
