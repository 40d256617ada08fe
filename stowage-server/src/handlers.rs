//! HTTP request handlers for the local S3 endpoint

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use hyper::{Method, Request, Response, StatusCode};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tracing::{debug, info, warn};

use stowage_core::auth::{CanonicalRequest, Credentials};
use stowage_core::mime::DEFAULT_CONTENT_TYPE;
use stowage_core::*;

use crate::store::{ListQuery, ObjectStore, StoredObject};
use crate::{xml, Result, ServerError};

type BoxBody = Full<Bytes>;

/// Shared state handed to every request
#[derive(Debug, Clone)]
pub struct Endpoint {
    store: ObjectStore,
    credentials: Credentials,
}

impl Endpoint {
    pub fn new(store: ObjectStore, credentials: Credentials) -> Self {
        Endpoint { store, credentials }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }
}

/// Who sent the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    Authenticated,
    Anonymous,
}

/// What the request path addresses
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Service,
    Bucket(String),
    Object(String, String),
}

/// Main request handler
pub async fn handle_request<B>(req: Request<B>, endpoint: Endpoint) -> std::result::Result<Response<BoxBody>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("Handling {} {}", method, path);

    let response = match dispatch(req, &endpoint).await {
        Ok(response) => response,
        Err(e) => {
            if e.status().is_server_error() {
                warn!("{} {} failed: {}", method, path, e);
            } else {
                debug!("{} {} rejected: {} ({})", method, path, e.code(), e);
            }
            error_response(&e, &path, method == Method::HEAD)
        }
    };

    info!("{} {} -> {}", method, path, response.status());
    Ok(response)
}

async fn dispatch<B>(req: Request<B>, endpoint: &Endpoint) -> Result<Response<BoxBody>>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let caller = authenticate(&req, &endpoint.credentials)?;
    let target = parse_target(req.uri().path());
    let query = parse_query(req.uri().query());
    let method = req.method().clone();

    // Anonymous callers may only read public objects
    if caller == Caller::Anonymous {
        return match (&method, &target) {
            (&Method::GET, Target::Object(bucket, key)) => {
                get_object(endpoint, bucket, key, caller, false)
            }
            (&Method::HEAD, Target::Object(bucket, key)) => {
                get_object(endpoint, bucket, key, caller, true)
            }
            _ => Err(ServerError::AccessDenied),
        };
    }

    match (method, target) {
        (Method::GET, Target::Service) => {
            let buckets = endpoint.store.list_buckets()?;
            Ok(xml_response(StatusCode::OK, xml::list_all_my_buckets(&buckets)))
        }

        (Method::PUT, Target::Bucket(bucket)) => {
            let name = BucketName::new(&bucket)?;
            if endpoint.store.create_bucket(&name)? {
                info!("Created bucket {}", name);
            }
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("location", format!("/{}", name))
                .body(Full::new(Bytes::new()))
                .map_err(internal)?)
        }
        (Method::HEAD, Target::Bucket(bucket)) => {
            if !endpoint.store.bucket_exists(&bucket)? {
                return Err(ServerError::NoSuchBucket(bucket));
            }
            empty_response(StatusCode::OK)
        }
        (Method::GET, Target::Bucket(bucket)) => {
            let list_query = ListQuery {
                prefix: query.get("prefix").cloned().unwrap_or_default(),
                marker: query.get("marker").cloned().filter(|m| !m.is_empty()),
                max_keys: match query.get("max-keys") {
                    Some(value) => Some(value.parse().map_err(|_| {
                        ServerError::InvalidArgument(format!("max-keys: {}", value))
                    })?),
                    None => None,
                },
            };
            let listing = endpoint.store.list_objects(&bucket, &list_query)?;
            Ok(xml_response(StatusCode::OK, xml::list_bucket_result(&listing)))
        }
        (Method::DELETE, Target::Bucket(bucket)) => {
            endpoint.store.delete_bucket(&bucket)?;
            info!("Removed bucket {}", bucket);
            empty_response(StatusCode::NO_CONTENT)
        }

        (Method::PUT, Target::Object(bucket, key)) => put_object(req, endpoint, &bucket, &key).await,
        (Method::GET, Target::Object(bucket, key)) => get_object(endpoint, &bucket, &key, caller, false),
        (Method::HEAD, Target::Object(bucket, key)) => get_object(endpoint, &bucket, &key, caller, true),
        (Method::DELETE, Target::Object(bucket, key)) => {
            endpoint.store.delete_object(&bucket, &key)?;
            empty_response(StatusCode::NO_CONTENT)
        }

        _ => Err(ServerError::MethodNotAllowed),
    }
}

/// Verify the SigV2 signature when one is supplied
fn authenticate<B>(req: &Request<B>, credentials: &Credentials) -> Result<Caller> {
    let Some(authorization) = req.headers().get(hyper::header::AUTHORIZATION) else {
        return Ok(Caller::Anonymous);
    };
    let authorization = authorization
        .to_str()
        .map_err(|_| ServerError::SignatureDoesNotMatch)?;

    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)));
    let canonical = CanonicalRequest::from_request(
        req.method().as_str(),
        req.uri().path(),
        req.uri().query(),
        headers,
    );

    if canonical.verify(credentials, authorization)? {
        Ok(Caller::Authenticated)
    } else {
        debug!(string_to_sign = ?canonical.to_string_to_sign(), "Signature mismatch");
        Err(ServerError::SignatureDoesNotMatch)
    }
}

async fn put_object<B>(req: Request<B>, endpoint: &Endpoint, bucket: &str, key: &str) -> Result<Response<BoxBody>>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let headers = req.headers().clone();
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| ServerError::InvalidArgument(format!("failed to read body: {}", e)))?
        .to_bytes();

    if let Some(expected) = header_str(&headers, "content-md5") {
        if ContentHash::new(&body).to_base64() != expected {
            return Err(ServerError::BadDigest);
        }
    }

    let content_type = header_str(&headers, CONTENT_TYPE.as_str())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let acl = match header_str(&headers, ACL_HEADER) {
        Some(value) => value.parse::<Acl>()?,
        None => Acl::default(),
    };
    let metadata: BTreeMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().strip_prefix(META_HEADER_PREFIX)?;
            Some((name.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect();

    let size = body.len();
    let object = StoredObject::new(body, content_type, acl).with_metadata(metadata);
    let etag = endpoint.store.put_object(bucket, key, object)?;
    debug!(bucket, key, size, %etag, %acl, "Stored object");

    Response::builder()
        .status(StatusCode::OK)
        .header(ETAG, etag.quoted())
        .body(Full::new(Bytes::new()))
        .map_err(internal)
}

fn get_object(
    endpoint: &Endpoint,
    bucket: &str,
    key: &str,
    caller: Caller,
    head_only: bool,
) -> Result<Response<BoxBody>> {
    let object = match endpoint.store.get_object(bucket, key) {
        Ok(object) => object,
        // Do not reveal what exists to anonymous callers
        Err(_) if caller == Caller::Anonymous => return Err(ServerError::AccessDenied),
        Err(e) => return Err(e),
    };

    if caller == Caller::Anonymous && !object.acl.allows_anonymous_read() {
        return Err(ServerError::AccessDenied);
    }

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, object.content_type.as_str())
        .header(CONTENT_LENGTH, object.size())
        .header(ETAG, object.etag.quoted())
        .header(LAST_MODIFIED, http_date(object.last_modified));
    for (name, value) in &object.metadata {
        builder = builder.header(format!("{}{}", META_HEADER_PREFIX, name), value.as_str());
    }

    let body = if head_only { Bytes::new() } else { object.data };
    builder.body(Full::new(body)).map_err(internal)
}

/// Split a path-style request path into its target
fn parse_target(path: &str) -> Target {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Target::Service;
    }
    match trimmed.split_once('/') {
        Some((bucket, key)) if !key.is_empty() => {
            Target::Object(uri::decode(bucket), uri::decode(key))
        }
        Some((bucket, _)) => Target::Bucket(uri::decode(bucket)),
        None => Target::Bucket(uri::decode(trimmed)),
    }
}

fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    query
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (uri::decode(k), uri::decode(v)),
            None => (uri::decode(pair), String::new()),
        })
        .collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn internal(e: hyper::http::Error) -> ServerError {
    ServerError::Internal(e.to_string())
}

fn empty_response(status: StatusCode) -> Result<Response<BoxBody>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .map_err(internal)
}

fn xml_response(status: StatusCode, body: String) -> Response<BoxBody> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
    response
}

fn error_response(error: &ServerError, resource: &str, head_only: bool) -> Response<BoxBody> {
    let body = if head_only {
        String::new()
    } else {
        xml::error_document(error.code(), &error.to_string(), resource)
    };
    xml_response(error.status(), body)
}
