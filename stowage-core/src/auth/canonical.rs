//! Canonical request construction for Signature Version 2
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                CanonicalizedAmzHeaders +
//!                CanonicalizedResource
//! ```

use std::collections::BTreeMap;

use crate::auth::Credentials;
use crate::{Result, StowageError};

/// Scheme prefix of the `Authorization` header
pub const AUTH_SCHEME: &str = "AWS";

/// Query parameters that are part of the signed resource
const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "restore",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Canonical request for signing
#[derive(Debug, Clone, Default)]
pub struct CanonicalRequest {
    pub method: String,
    pub content_md5: String,
    pub content_type: String,
    pub date: String,
    pub amz_headers: BTreeMap<String, Vec<String>>,
    pub resource: String,
}

impl CanonicalRequest {
    /// Create a new canonical request for `resource` (see [`canonical_resource`])
    pub fn new(method: &str, resource: impl Into<String>) -> Self {
        CanonicalRequest {
            method: method.to_ascii_uppercase(),
            resource: resource.into(),
            ..Default::default()
        }
    }

    /// Build from the pieces of a received request
    pub fn from_request<'a>(
        method: &str,
        path: &str,
        query: Option<&str>,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut request = CanonicalRequest::new(method, canonical_resource(path, query));
        for (name, value) in headers {
            request.add_header(name, value);
        }
        request
    }

    /// Add a header; only the ones that take part in signing are kept
    pub fn add_header(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let value = value.trim().to_string();
        match name.as_str() {
            "content-md5" => self.content_md5 = value,
            "content-type" => self.content_type = value,
            "date" => self.date = value,
            n if n.starts_with("x-amz-") => {
                self.amz_headers.entry(name).or_default().push(value);
            }
            _ => {}
        }
    }

    /// Build the string to sign
    pub fn to_string_to_sign(&self) -> String {
        // x-amz-date replaces the Date line
        let date = if self.amz_headers.contains_key("x-amz-date") {
            ""
        } else {
            self.date.as_str()
        };

        let mut canonical = format!(
            "{}\n{}\n{}\n{}\n",
            self.method, self.content_md5, self.content_type, date
        );

        for (name, values) in &self.amz_headers {
            canonical.push_str(name);
            canonical.push(':');
            canonical.push_str(&values.join(","));
            canonical.push('\n');
        }

        canonical.push_str(&self.resource);
        canonical
    }

    /// Produce the `Authorization` header value
    pub fn sign(&self, credentials: &Credentials) -> Result<String> {
        let signature = credentials.signature(&self.to_string_to_sign())?;
        Ok(format!(
            "{} {}:{}",
            AUTH_SCHEME,
            credentials.access_key_id(),
            signature
        ))
    }

    /// Check an `Authorization` header value against these credentials
    pub fn verify(&self, credentials: &Credentials, authorization: &str) -> Result<bool> {
        let (access_key_id, signature) = parse_authorization(authorization)?;
        if access_key_id != credentials.access_key_id() {
            return Ok(false);
        }
        credentials.verify(&self.to_string_to_sign(), signature)
    }
}

/// Split `AWS AKID:Signature` into its parts
pub fn parse_authorization(header: &str) -> Result<(&str, &str)> {
    let rest = header
        .strip_prefix(AUTH_SCHEME)
        .and_then(|rest| rest.strip_prefix(' '))
        .ok_or_else(|| StowageError::Signature("unsupported authorization scheme".to_string()))?;

    match rest.split_once(':') {
        Some((id, sig)) if !id.is_empty() && !sig.is_empty() => Ok((id, sig)),
        _ => Err(StowageError::Signature("malformed authorization header".to_string())),
    }
}

/// Path plus the signed sub-resources of the query string, sorted
pub fn canonical_resource(path: &str, query: Option<&str>) -> String {
    let mut sub_params: Vec<(&str, Option<String>)> = query
        .unwrap_or("")
        .split('&')
        .filter(|param| !param.is_empty())
        .filter_map(|param| {
            let (key, value) = match param.split_once('=') {
                Some((k, v)) => (k, Some(crate::uri::decode(v)).filter(|v| !v.is_empty())),
                None => (param, None),
            };
            SUB_RESOURCES.contains(&key).then_some((key, value))
        })
        .collect();

    if sub_params.is_empty() {
        return path.to_string();
    }

    sub_params.sort_by(|a, b| a.0.cmp(b.0));
    let params = sub_params
        .iter()
        .map(|(k, v)| match v {
            Some(val) => format!("{}={}", k, val),
            None => k.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", path, params)
}
