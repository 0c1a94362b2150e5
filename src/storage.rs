//! Network capabilities used by the image relocation pass.
//!
//! The relocator never talks to the network directly. It receives an
//! [`ImageFetcher`] (download bytes + content type) and an [`ObjectStore`]
//! (upload bytes under a key), so tests and embedders can swap either side.
//!
//! The production implementations are [`HttpImageFetcher`] (plain `GET`) and
//! [`CosObjectStore`], which signs `PUT` requests with the COS
//! `q-sign-algorithm=sha1` scheme:
//!
//! ```text
//! KeyTime      = "<start>;<end>"                       (unix seconds)
//! SignKey      = hex(HMAC-SHA1(SecretKey, KeyTime))
//! HttpString   = "put\n<path>\n<params>\n<headers>\n"
//! StringToSign = "sha1\n<KeyTime>\n" + hex(SHA1(HttpString)) + "\n"
//! Signature    = hex(HMAC-SHA1(SignKey, StringToSign))
//! ```

use crate::config::StorageConfig;
use crate::error::ImageError;
use async_trait::async_trait;
use bytes::Bytes;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Validity window of a request signature, in seconds.
const SIGNATURE_TTL_SECS: u64 = 3600;

/// Where relocated objects go. Contains no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub bucket: String,
    pub region: String,
    /// Prepended verbatim to every object key.
    pub prefix: String,
}

impl StorageLocation {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Virtual-host of the bucket: `<bucket>.cos.<region>.myqcloud.com`.
    pub fn host(&self) -> String {
        format!("{}.cos.{}.myqcloud.com", self.bucket, self.region)
    }

    /// Public URL of an object: `https://<host>/<key>`.
    pub fn object_url(&self, key: &str) -> String {
        format!("https://{}/{}", self.host(), key)
    }
}

/// A downloaded image.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Bytes,
    /// Raw `Content-Type` header value, if any.
    pub content_type: Option<String>,
}

/// Downloads image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError>;
}

/// Stores bytes under a key and returns the object's public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        location: &StorageLocation,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, ImageError>;
}

// ── HTTP fetcher ─────────────────────────────────────────────────────────

/// Fetches images with a plain `GET`.
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpImageFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError> {
        let fetch_err = |e: reqwest::Error| {
            if e.is_timeout() {
                ImageError::FetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                ImageError::FetchFailed {
                    url: url.to_string(),
                    detail: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(fetch_err)?;

        if !response.status().is_success() {
            return Err(ImageError::FetchFailed {
                url: url.to_string(),
                detail: format!("HTTP {}", response.status()),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(fetch_err)?;
        debug!("Fetched {} bytes ({:?}) from {}", bytes.len(), content_type, url);

        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

// ── COS object store ─────────────────────────────────────────────────────

/// Uploads objects to a COS bucket with signed `PUT` requests.
#[derive(Clone)]
pub struct CosObjectStore {
    client: reqwest::Client,
    secret_id: String,
    secret_key: String,
}

impl std::fmt::Debug for CosObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosObjectStore")
            .field("secret_id", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl CosObjectStore {
    pub fn new(storage: &StorageConfig, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            secret_id: storage.secret_id.clone(),
            secret_key: storage.secret_key.clone(),
        })
    }

    fn authorization(&self, method: &str, path: &str, host: &str) -> Result<String, InvalidLength> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        sign_request(
            &self.secret_id,
            &self.secret_key,
            method,
            path,
            host,
            now.saturating_sub(60),
            now + SIGNATURE_TTL_SECS,
        )
    }
}

#[async_trait]
impl ObjectStore for CosObjectStore {
    async fn upload(
        &self,
        location: &StorageLocation,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<String, ImageError> {
        let upload_err = |detail: String| ImageError::UploadFailed {
            key: key.to_string(),
            detail,
        };

        let host = location.host();
        let path = format!("/{key}");
        let url = format!("https://{host}{}", encode_path(&path));
        let authorization = self
            .authorization("put", &path, &host)
            .map_err(|e| upload_err(format!("signing failed: {e}")))?;

        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .body(body);
        if let Some(ct) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, ct);
        }

        let response = request.send().await.map_err(|e| upload_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(upload_err(format!("HTTP {status}: {}", text.trim())));
        }

        debug!("Uploaded {} to {}", key, host);
        Ok(location.object_url(key))
    }
}

/// Build a COS `Authorization` header value signing only the `host` header.
pub fn sign_request(
    secret_id: &str,
    secret_key: &str,
    method: &str,
    path: &str,
    host: &str,
    start: u64,
    end: u64,
) -> Result<String, InvalidLength> {
    let key_time = format!("{start};{end}");
    let sign_key = hex(&hmac_sha1(secret_key.as_bytes(), key_time.as_bytes())?);

    let http_headers = format!("host={}", urlencoding::encode(host));
    let http_string = format!("{}\n{}\n\n{}\n", method.to_lowercase(), path, http_headers);
    let string_to_sign = format!(
        "sha1\n{}\n{}\n",
        key_time,
        hex(&Sha1::digest(http_string.as_bytes()))
    );
    let signature = hex(&hmac_sha1(sign_key.as_bytes(), string_to_sign.as_bytes())?);

    Ok(format!(
        "q-sign-algorithm=sha1&q-ak={secret_id}&q-sign-time={key_time}&q-key-time={key_time}\
         &q-header-list=host&q-url-param-list=&q-signature={signature}"
    ))
}

fn hmac_sha1(key: &[u8], message: &[u8]) -> Result<Vec<u8>, InvalidLength> {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Lowercase hex encoding.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Percent-encode each path segment, keeping the `/` separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
