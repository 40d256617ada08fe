//! Core data types for stowage

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::uri;
use crate::{Result, StowageError};

pub const MIN_BUCKET_NAME_LEN: usize = 3;
pub const MAX_BUCKET_NAME_LEN: usize = 255;

/// Longest bucket name that can still be used as a DNS label
const MAX_DNS_BUCKET_NAME_LEN: usize = 63;

/// Validated bucket name, as required when creating a bucket
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketName(String);

impl BucketName {
    /// Create a new bucket name with validation
    pub fn new(name: &str) -> Result<Self> {
        let invalid = |reason: &str| StowageError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&name.len()) {
            return Err(invalid(&format!(
                "must be between {} and {} characters long",
                MIN_BUCKET_NAME_LEN, MAX_BUCKET_NAME_LEN
            )));
        }

        // Lowercase letters, digits, dots, hyphens and underscores only
        if !name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'))
        {
            return Err(invalid("contains invalid characters"));
        }

        if name.parse::<Ipv4Addr>().is_ok() {
            return Err(invalid("cannot be an IP address"));
        }

        Ok(BucketName(name.to_string()))
    }

    /// Get the bucket name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name can be used as a virtual-host label
    pub fn is_dns_compatible(&self) -> bool {
        is_dns_compatible(&self.0)
    }
}

impl std::fmt::Display for BucketName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether `name` can be used as the leading label of a virtual-host name
pub fn is_dns_compatible(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.len() < MIN_BUCKET_NAME_LEN || bytes.len() > MAX_DNS_BUCKET_NAME_LEN {
        return false;
    }
    if !bytes
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return false;
    }
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    edge_ok(bytes[0])
        && edge_ok(bytes[bytes.len() - 1])
        && !name.contains("..")
        && !name.contains(".-")
        && !name.contains("-.")
        && name.parse::<Ipv4Addr>().is_err()
}

/// A `bucket` or `bucket/key` reference as accepted by the client API
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    bucket: String,
    key: String,
}

impl ObjectPath {
    /// Split `bucket/key` and check that both halves can be placed in a URI.
    ///
    /// Bucket naming rules are not applied here: a name only has to survive
    /// URI construction. Creating a bucket goes through [`BucketName::new`].
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.trim_start_matches('/');
        let (bucket, key) = match path.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (path, ""),
        };

        uri::check_segment(bucket)?;

        if key.chars().any(|c| c.is_control()) {
            return Err(StowageError::InvalidKey(
                "control characters not allowed".to_string(),
            ));
        }

        Ok(ObjectPath {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Like [`ObjectPath::parse`], but the path must name an object
    pub fn parse_object(path: &str) -> Result<Self> {
        let parsed = Self::parse(path)?;
        if !parsed.has_key() {
            return Err(StowageError::InvalidKey(format!(
                "'{}' does not name an object",
                path
            )));
        }
        Ok(parsed)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key, empty when the path names a bucket
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    /// Path-style request path with the key percent-encoded
    pub fn request_path(&self) -> String {
        if self.has_key() {
            format!("/{}/{}", self.bucket, uri::encode_key(&self.key))
        } else {
            format!("/{}", self.bucket)
        }
    }
}

impl std::fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_key() {
            write!(f, "{}/{}", self.bucket, self.key)
        } else {
            write!(f, "{}", self.bucket)
        }
    }
}

/// MD5 digest of object content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Hash data using MD5
    pub fn new(data: &[u8]) -> Self {
        ContentHash(Md5::digest(data).into())
    }

    /// Create from existing digest bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        ContentHash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Get hash as lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Base64 form used by the `Content-MD5` header
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn etag(&self) -> ETag {
        ETag(self.to_hex())
    }
}

/// Entity tag: hex MD5 of the content, rendered with surrounding quotes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ETag(String);

impl ETag {
    /// Compute the ETag of `data`
    pub fn compute(data: &[u8]) -> Self {
        ContentHash::new(data).etag()
    }

    /// Parse an `ETag` header value, quoted or not
    pub fn parse(value: &str) -> Self {
        ETag(value.trim().trim_matches('"').to_ascii_lowercase())
    }

    /// Hex digest without quotes
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Header form, e.g. `"5d41402abc4b2a76b9719d911017c592"`
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        *self == ETag::compute(data)
    }
}

impl std::fmt::Display for ETag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// Header carrying the canned access-control policy on put
pub const ACL_HEADER: &str = "x-amz-acl";

/// Prefix of user metadata headers
pub const META_HEADER_PREFIX: &str = "x-amz-meta-";

/// Canned access-control policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
}

impl Acl {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
        }
    }

    /// Whether an unauthenticated caller may read objects under this policy
    pub fn allows_anonymous_read(&self) -> bool {
        matches!(self, Acl::PublicRead | Acl::PublicReadWrite)
    }
}

impl FromStr for Acl {
    type Err = StowageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            other => Err(StowageError::InvalidAcl(other.to_string())),
        }
    }
}

impl std::fmt::Display for Acl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object information as reported by a HEAD request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub etag: ETag,
    pub size: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// User metadata from `x-amz-meta-*` headers, prefix stripped
    pub metadata: BTreeMap<String, String>,
}

/// HTTP date format used by `Date` and `Last-Modified`
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Render a timestamp as an HTTP date
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date, accepting the RFC 2822 variants servers emit
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value.trim()) {
        return Some(parsed.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
