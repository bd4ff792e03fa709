//! S3-compatible object storage for uploaded media.
//!
//! Objects are addressed path-style (`{endpoint}/{bucket}/{key}`) and every
//! request is signed with AWS Signature Version 4.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::{StorageConfig, StorageCredentials};

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "s3";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

/// Errors from object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Object key or endpoint did not form a valid URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Key is empty or escapes the configured prefix.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

/// Client for one bucket.
#[derive(Clone)]
pub struct ObjectStorage {
    client: reqwest::Client,
    endpoint: String,
    region: String,
    bucket: String,
    prefix: Option<String>,
    public_url: String,
    credentials: StorageCredentials,
}

impl ObjectStorage {
    /// Create a client with resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(
        config: &StorageConfig,
        credentials: StorageCredentials,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            region: config.region.clone(),
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            public_url: config.public_url.clone(),
            credentials,
        })
    }

    /// Build a fresh key for an upload: `{prefix}/{folder}/{timestamp}-{name}`.
    ///
    /// Empty segments are skipped.
    #[must_use]
    pub fn object_key(&self, folder: &str, filename: &str, now: DateTime<Utc>) -> String {
        let name = format!("{}-{}", now.timestamp_millis(), sanitize_filename(filename));
        [
            self.prefix.as_deref().unwrap_or(""),
            folder.trim_matches('/'),
            name.as_str(),
        ]
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
    }

    /// Public URL an object is served from.
    #[must_use]
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key.trim_start_matches('/'))
    }

    /// Upload an object and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or storage rejects it.
    #[instrument(skip(self, body), fields(size = body.len()))]
    pub async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = self.object_url(key)?;
        let mut headers = self.sign("PUT", &url, &body, Utc::now());
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(CONTENT_TYPE, value);
        }

        let response = self
            .client
            .put(url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        check_status(response).await?;

        tracing::info!("Object uploaded");
        Ok(self.public_url(key))
    }

    /// Delete an object. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or storage rejects it.
    #[instrument(skip(self))]
    pub async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let url = self.object_url(key)?;
        let headers = self.sign("DELETE", &url, &[], Utc::now());

        let response = self.client.delete(url).headers(headers).send().await?;
        check_status(response).await?;

        tracing::info!("Object deleted");
        Ok(())
    }

    /// Path-style URL for a key, each segment percent-encoded.
    fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() || key.split('/').any(|s| s == "..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        if let Some(prefix) = &self.prefix
            && !key.starts_with(&format!("{prefix}/"))
        {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(Url::parse(&format!(
            "{}/{}/{encoded}",
            self.endpoint, self.bucket
        ))?)
    }

    /// Signature V4 headers for a request with the given payload.
    fn sign(&self, method: &str, url: &Url, payload: &[u8], now: DateTime<Utc>) -> HeaderMap {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(payload));
        let host = host_header(url);

        let canonical_request = format!(
            "{method}\n{path}\n\nhost:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{payload_hash}",
            path = url.path(),
        );
        let scope = format!("{date_stamp}/{}/{SERVICE}/aws4_request", self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = signing_key(
            self.credentials.secret_access_key.expose_secret(),
            &date_stamp,
            &self.region,
            SERVICE,
        );
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));
        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            self.credentials.access_key_id
        );

        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("x-amz-date", amz_date),
            ("x-amz-content-sha256", payload_hash),
        ] {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(name, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&authorization) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}

/// Replace everything outside `[A-Za-z0-9._-]` with `-`.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    #[allow(clippy::expect_used)]
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

async fn check_status(response: reqwest::Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use secrecy::SecretString;

    fn storage(prefix: Option<&str>) -> ObjectStorage {
        let config = StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            region: "ap-south-1".to_string(),
            bucket: "atelier".to_string(),
            prefix: prefix.map(str::to_string),
            public_url: "https://cdn.atelier.test".to_string(),
            credentials: None,
        };
        ObjectStorage::new(
            &config,
            StorageCredentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: SecretString::from("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            },
        )
        .unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Raku Bowl (1).JPG"), "Raku-Bowl--1-.JPG");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\glaze.png"), "glaze.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename("café menu.png"), "caf--menu.png");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn test_object_key_skips_empty_segments() {
        let now = fixed_time();
        let ts = now.timestamp_millis();

        assert_eq!(
            storage(Some("media")).object_key("courses", "wheel.png", now),
            format!("media/courses/{ts}-wheel.png")
        );
        assert_eq!(
            storage(None).object_key("", "wheel.png", now),
            format!("{ts}-wheel.png")
        );
    }

    #[test]
    fn test_object_url_rejects_keys_outside_prefix() {
        let storage = storage(Some("media"));
        assert!(storage.object_url("media/courses/1-a.png").is_ok());
        assert!(matches!(
            storage.object_url("other/1-a.png"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.object_url("media/../secrets"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.object_url(""),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            storage(None).public_url("media/a.png"),
            "https://cdn.atelier.test/media/a.png"
        );
    }

    #[test]
    fn test_signing_key_matches_published_vector() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_sign_headers() {
        let storage = storage(None);
        let url = storage.object_url("a.png").unwrap();
        let headers = storage.sign("PUT", &url, b"hello", fixed_time());

        assert_eq!(headers["x-amz-date"], "20240309T103000Z");
        assert_eq!(
            headers["x-amz-content-sha256"],
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        let auth = headers[AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240309/ap-south-1/s3/aws4_request, "
        ));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));

        // Same input, same signature.
        let again = storage.sign("PUT", &url, b"hello", fixed_time());
        assert_eq!(again[AUTHORIZATION], headers[AUTHORIZATION]);
    }

    #[test]
    fn test_host_header_keeps_port() {
        let url = Url::parse("http://localhost:9000/atelier/a.png").unwrap();
        assert_eq!(host_header(&url), "localhost:9000");
        let url = Url::parse("https://s3.ap-south-1.amazonaws.com/atelier/a.png").unwrap();
        assert_eq!(host_header(&url), "s3.ap-south-1.amazonaws.com");
    }
}
