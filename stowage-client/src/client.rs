//! Main client implementation

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::BTreeMap;
use std::path::Path;
use stowage_core::auth::CanonicalRequest;
use stowage_core::mime::{content_type_for, DEFAULT_CONTENT_TYPE};
use stowage_core::*;
use tracing::{debug, warn};

use crate::config::{AddressingStyle, ClientConfig};
use crate::{xml, ClientError, Result};

/// Options for storing an object
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// `None` guesses the type from the object key (or the file name for `put_file`)
    pub content_type: Option<String>,
    /// `None` leaves the endpoint default, which is private
    pub acl: Option<Acl>,
    pub metadata: BTreeMap<String, String>,
}

impl PutOptions {
    pub fn new() -> Self {
        PutOptions::default()
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }

    pub fn meta(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }
}

/// Options for listing a bucket
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    /// Upper bound on the number of keys returned across all pages
    pub max_keys: Option<usize>,
}

/// A request before it is addressed and signed
struct S3Request {
    method: Method,
    target: Option<ObjectPath>,
    query: Vec<(&'static str, String)>,
    headers: Vec<(String, String)>,
    body: Bytes,
    signed: bool,
}

impl S3Request {
    fn new(method: Method, target: Option<ObjectPath>) -> Self {
        S3Request {
            method,
            target,
            query: Vec::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            signed: true,
        }
    }

    fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn query(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    fn anonymous(mut self) -> Self {
        self.signed = false;
        self
    }

    /// Path-style resource, also used as the signed resource
    fn resource(&self) -> String {
        match &self.target {
            Some(target) => target.request_path(),
            None => "/".to_string(),
        }
    }
}

struct S3Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl S3Response {
    fn header(&self, name: impl hyper::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Client for an S3-compatible endpoint.
///
/// Every operation is a single request/response cycle with no retries.
/// Remote "does not exist" outcomes are reported as `false` or `None`;
/// errors are reserved for invalid input and transport failures.
#[derive(Debug, Clone)]
pub struct S3Client {
    config: ClientConfig,
    scheme: String,
    authority: String,
    http: Client<HttpConnector, Full<Bytes>>,
}

impl S3Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let uri: Uri = config
            .endpoint
            .parse()
            .map_err(|e| ClientError::Config(format!("Invalid endpoint '{}': {}", config.endpoint, e)))?;

        let scheme = uri
            .scheme_str()
            .ok_or_else(|| ClientError::Config(format!("endpoint '{}' has no scheme", config.endpoint)))?;
        if scheme != "http" {
            return Err(ClientError::Config(format!(
                "unsupported endpoint scheme '{}'",
                scheme
            )));
        }
        let authority = uri
            .authority()
            .ok_or_else(|| ClientError::Config(format!("endpoint '{}' has no host", config.endpoint)))?
            .to_string();

        let http = Client::builder(TokioExecutor::new()).build_http();

        Ok(S3Client {
            scheme: scheme.to_string(),
            authority,
            config,
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a bucket after checking its name; re-creating an owned bucket succeeds
    pub async fn create_bucket(&self, name: &str) -> Result<bool> {
        let name = BucketName::new(name)?;
        let target = ObjectPath::parse(name.as_str())?;
        let response = self.send(S3Request::new(Method::PUT, Some(target))).await?;
        Ok(response.status == StatusCode::OK)
    }

    pub async fn is_bucket_available(&self, name: &str) -> Result<bool> {
        let target = bucket_path(name)?;
        let response = self.send(S3Request::new(Method::HEAD, Some(target))).await?;
        Ok(response.status == StatusCode::OK)
    }

    pub async fn is_object_available(&self, path: &str) -> Result<bool> {
        let target = ObjectPath::parse_object(path)?;
        let response = self.send(S3Request::new(Method::HEAD, Some(target))).await?;
        Ok(response.status == StatusCode::OK)
    }

    /// Store `data` at `bucket/key`.
    ///
    /// Returns true only when the endpoint accepted the object and reported
    /// the ETag of exactly the bytes sent.
    pub async fn put_object(&self, path: &str, data: impl Into<Bytes>, options: &PutOptions) -> Result<bool> {
        let target = ObjectPath::parse_object(path)?;
        let data: Bytes = data.into();
        let content_type = options
            .content_type
            .clone()
            .unwrap_or_else(|| content_type_for(target.key()).to_string());
        let expected = ContentHash::new(&data);

        let mut request = S3Request::new(Method::PUT, Some(target))
            .header("content-md5", expected.to_base64())
            .header(CONTENT_TYPE.as_str(), content_type);
        if let Some(acl) = options.acl {
            request = request.header(ACL_HEADER, acl.as_str());
        }
        for (name, value) in &options.metadata {
            request = request.header(format!("{}{}", META_HEADER_PREFIX, name), value.as_str());
        }

        let response = self.send(request.body(data)).await?;
        if response.status != StatusCode::OK {
            return Ok(false);
        }

        match response.header(ETAG) {
            Some(etag) => Ok(ETag::parse(etag) == expected.etag()),
            None => {
                warn!("PUT {} succeeded without an ETag", path);
                Ok(false)
            }
        }
    }

    /// Upload a local file; a `None` content type is guessed from the file name
    pub async fn put_file(&self, file: impl AsRef<Path>, path: &str, options: &PutOptions) -> Result<bool> {
        let file = file.as_ref();
        ObjectPath::parse_object(path)?;
        let data = tokio::fs::read(file)
            .await
            .map_err(|source| ClientError::FileAccess {
                path: file.to_path_buf(),
                source,
            })?;

        let mut options = options.clone();
        if options.content_type.is_none() {
            let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            options.content_type = Some(content_type_for(&name).to_string());
        }

        self.put_object(path, data, &options).await
    }

    pub async fn get_object(&self, path: &str) -> Result<Option<Bytes>> {
        let target = ObjectPath::parse_object(path)?;
        let response = self.send(S3Request::new(Method::GET, Some(target))).await?;
        Ok((response.status == StatusCode::OK).then_some(response.body))
    }

    pub async fn get_info(&self, path: &str) -> Result<Option<ObjectInfo>> {
        let target = ObjectPath::parse_object(path)?;
        let response = self.send(S3Request::new(Method::HEAD, Some(target))).await?;
        if response.status != StatusCode::OK {
            return Ok(None);
        }

        let etag = response
            .header(ETAG)
            .map(ETag::parse)
            .ok_or_else(|| ClientError::InvalidResponse(format!("HEAD {} returned no ETag", path)))?;
        let size = response
            .header(CONTENT_LENGTH)
            .and_then(|len| len.parse().ok())
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!("HEAD {} returned no valid Content-Length", path))
            })?;

        Ok(Some(ObjectInfo {
            etag,
            size,
            content_type: response
                .header(CONTENT_TYPE)
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
            last_modified: response.header(LAST_MODIFIED).and_then(parse_http_date),
            metadata: user_metadata(&response.headers),
        }))
    }

    /// All keys of a bucket, or `None` when the bucket cannot be listed
    pub async fn get_objects_by_bucket(&self, name: &str) -> Result<Option<Vec<String>>> {
        self.get_objects_by_bucket_with(name, &ListOptions::default()).await
    }

    /// Keys of a bucket, following truncated listings until exhausted
    pub async fn get_objects_by_bucket_with(
        &self,
        name: &str,
        options: &ListOptions,
    ) -> Result<Option<Vec<String>>> {
        let target = bucket_path(name)?;
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = S3Request::new(Method::GET, Some(target.clone()));
            if let Some(prefix) = &options.prefix {
                request = request.query("prefix", prefix.as_str());
            }
            if let Some(marker) = &marker {
                request = request.query("marker", marker.as_str());
            }
            if let Some(max_keys) = options.max_keys {
                request = request.query("max-keys", (max_keys - keys.len()).to_string());
            }

            let response = self.send(request).await?;
            if response.status != StatusCode::OK {
                return Ok(None);
            }

            let page = xml::parse_list_bucket(&response.body)?;
            let next = page.continuation().map(str::to_string);
            keys.extend(page.keys);

            if options.max_keys.is_some_and(|max| keys.len() >= max) {
                break;
            }
            match next {
                // An endpoint repeating the marker would loop forever
                Some(next) if marker.as_deref() != Some(next.as_str()) => marker = Some(next),
                _ => break,
            }
        }

        // Endpoints are free to ignore max-keys
        if let Some(max) = options.max_keys {
            keys.truncate(max);
        }

        debug!(bucket = name, count = keys.len(), "Listed bucket");
        Ok(Some(keys))
    }

    pub async fn get_buckets(&self) -> Result<Option<Vec<String>>> {
        let response = self.send(S3Request::new(Method::GET, None)).await?;
        if response.status != StatusCode::OK {
            return Ok(None);
        }
        Ok(Some(xml::parse_bucket_names(&response.body)?))
    }

    pub async fn remove_object(&self, path: &str) -> Result<bool> {
        let target = ObjectPath::parse_object(path)?;
        let response = self.send(S3Request::new(Method::DELETE, Some(target))).await?;
        Ok(response.status == StatusCode::NO_CONTENT)
    }

    /// Remove an empty bucket
    pub async fn remove_bucket(&self, name: &str) -> Result<bool> {
        let target = bucket_path(name)?;
        let response = self.send(S3Request::new(Method::DELETE, Some(target))).await?;
        Ok(response.status == StatusCode::NO_CONTENT)
    }

    /// Remove every object in a bucket, leaving the bucket itself.
    ///
    /// Returns false when the bucket cannot be listed or any object could
    /// not be removed; the remaining objects are still attempted.
    pub async fn clean_bucket(&self, name: &str) -> Result<bool> {
        let Some(keys) = self.get_objects_by_bucket(name).await? else {
            return Ok(false);
        };
        let mut all_removed = true;
        for key in keys {
            if !self.remove_object(&format!("{}/{}", name, key)).await? {
                warn!(bucket = name, key = key.as_str(), "Could not remove object");
                all_removed = false;
            }
        }
        Ok(all_removed)
    }

    /// Unauthenticated URL of an object
    pub fn public_url(&self, path: &str) -> Result<String> {
        let target = ObjectPath::parse_object(path)?;
        Ok(self.url_for(Some(&target), &[]))
    }

    /// Fetch an object without credentials; `None` unless the object is publicly readable
    pub async fn fetch_public(&self, path: &str) -> Result<Option<Bytes>> {
        let target = ObjectPath::parse_object(path)?;
        let response = self
            .send(S3Request::new(Method::GET, Some(target)).anonymous())
            .await?;
        Ok((response.status == StatusCode::OK).then_some(response.body))
    }

    fn url_for(&self, target: Option<&ObjectPath>, query: &[(&'static str, String)]) -> String {
        let mut url = match (self.config.addressing, target) {
            (AddressingStyle::VirtualHost, Some(target)) if is_dns_compatible(target.bucket()) => {
                let key = if target.has_key() {
                    uri::encode_key(target.key())
                } else {
                    String::new()
                };
                format!("{}://{}.{}/{}", self.scheme, target.bucket(), self.authority, key)
            }
            (_, Some(target)) => {
                format!("{}://{}{}", self.scheme, self.authority, target.request_path())
            }
            (_, None) => format!("{}://{}/", self.scheme, self.authority),
        };

        for (i, (name, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(name);
            url.push('=');
            url.push_str(&uri::encode_query_value(value));
        }
        url
    }

    async fn send(&self, request: S3Request) -> Result<S3Response> {
        let url = self.url_for(request.target.as_ref(), &request.query);
        let date = http_date(chrono::Utc::now());

        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(url.as_str())
            .header("date", date.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if request.signed {
            let mut canonical = CanonicalRequest::new(request.method.as_str(), request.resource());
            canonical.add_header("date", &date);
            for (name, value) in &request.headers {
                canonical.add_header(name, value);
            }
            builder = builder.header("authorization", canonical.sign(&self.config.credentials)?);
        }

        let http_request = builder
            .body(Full::new(request.body))
            .map_err(|e| ClientError::Http(e.to_string()))?;

        let exchange = async {
            let response = self
                .http
                .request(http_request)
                .await
                .map_err(|e| ClientError::Connection(e.to_string()))?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| ClientError::Http(e.to_string()))?
                .to_bytes();
            Ok::<_, ClientError>(S3Response {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        let response = tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout(self.config.timeout))??;

        if response.status.is_client_error() || response.status.is_server_error() {
            let code = xml::error_code(&response.body).unwrap_or_default();
            debug!(
                method = %request.method,
                url = %url,
                status = response.status.as_u16(),
                code = code.as_str(),
                "S3 request failed"
            );
        } else {
            debug!(
                method = %request.method,
                url = %url,
                status = response.status.as_u16(),
                "S3 request"
            );
        }

        Ok(response)
    }
}

/// `x-amz-meta-*` headers with the prefix stripped
fn user_metadata(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().strip_prefix(META_HEADER_PREFIX)?;
            Some((name.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect()
}

/// A bare bucket name as a request target
fn bucket_path(name: &str) -> Result<ObjectPath> {
    uri::check_segment(name)?;
    Ok(ObjectPath::parse(name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::auth::Credentials;

    fn client(addressing: AddressingStyle) -> S3Client {
        let config = ClientConfig::new("http://s3.example.test:9000", Credentials::new("AKID", "secret"))
            .with_addressing(addressing);
        S3Client::new(config).unwrap()
    }

    #[test]
    fn test_path_style_urls() {
        let client = client(AddressingStyle::Path);
        assert_eq!(
            client.public_url("photos/2024/cat one.jpg").unwrap(),
            "http://s3.example.test:9000/photos/2024/cat%20one.jpg"
        );
        let target = ObjectPath::parse("photos").unwrap();
        assert_eq!(
            client.url_for(Some(&target), &[("prefix", "a b".to_string()), ("max-keys", "2".to_string())]),
            "http://s3.example.test:9000/photos?prefix=a%20b&max-keys=2"
        );
        assert_eq!(client.url_for(None, &[]), "http://s3.example.test:9000/");
    }

    #[test]
    fn test_virtual_host_urls() {
        let client = client(AddressingStyle::VirtualHost);
        assert_eq!(
            client.public_url("photos/cat.jpg").unwrap(),
            "http://photos.s3.example.test:9000/cat.jpg"
        );
        // Not DNS compatible, so path style is kept
        assert_eq!(
            client.public_url("my_photos/cat.jpg").unwrap(),
            "http://s3.example.test:9000/my_photos/cat.jpg"
        );
    }

    #[test]
    fn test_bad_bucket_segment_is_a_uri_error() {
        let client = client(AddressingStyle::Path);
        let err = client.public_url("This is a Very Bad Name/And It Gets Worse").unwrap_err();
        assert!(matches!(err, ClientError::Core(ref e) if e.is_uri()));
        assert!(err.to_string().contains("Invalid URI"));
    }

    #[test]
    fn test_endpoint_must_be_http() {
        let config = ClientConfig::new("https://s3.amazonaws.com", Credentials::new("AKID", "secret"));
        assert!(matches!(S3Client::new(config), Err(ClientError::Config(_))));
        let config = ClientConfig::new("not a uri", Credentials::new("AKID", "secret"));
        assert!(S3Client::new(config).is_err());
    }

    #[test]
    fn test_put_options_builder() {
        let options = PutOptions::new()
            .content_type("text/plain")
            .acl(Acl::PublicRead)
            .meta("Author", "someone");
        assert_eq!(options.content_type.as_deref(), Some("text/plain"));
        assert_eq!(options.acl, Some(Acl::PublicRead));
        assert_eq!(options.metadata.get("author").map(String::as_str), Some("someone"));
    }
}
