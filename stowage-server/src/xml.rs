//! XML response documents

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::fmt::Write;

use crate::store::Listing;

pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Owner reported for every bucket and object
const OWNER_ID: &str = "stowage";

fn timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `GET /` response body
pub fn list_all_my_buckets(buckets: &[(String, DateTime<Utc>)]) -> String {
    let mut out = format!(
        "{DECLARATION}<ListAllMyBucketsResult xmlns=\"{S3_NAMESPACE}\">\
         <Owner><ID>{OWNER_ID}</ID><DisplayName>{OWNER_ID}</DisplayName></Owner><Buckets>"
    );
    for (name, created_at) in buckets {
        let _ = write!(
            out,
            "<Bucket><Name>{}</Name><CreationDate>{}</CreationDate></Bucket>",
            escape(name.as_str()),
            timestamp(created_at)
        );
    }
    out.push_str("</Buckets></ListAllMyBucketsResult>");
    out
}

/// `GET /{bucket}` response body
pub fn list_bucket_result(listing: &Listing) -> String {
    let mut out = format!(
        "{DECLARATION}<ListBucketResult xmlns=\"{S3_NAMESPACE}\">\
         <Name>{}</Name><Prefix>{}</Prefix><Marker>{}</Marker>\
         <MaxKeys>{}</MaxKeys><IsTruncated>{}</IsTruncated>",
        escape(listing.bucket.as_str()),
        escape(listing.prefix.as_str()),
        escape(listing.marker.as_deref().unwrap_or("")),
        listing.max_keys,
        listing.is_truncated
    );
    for (key, object) in &listing.objects {
        let _ = write!(
            out,
            "<Contents><Key>{}</Key><LastModified>{}</LastModified>\
             <ETag>{}</ETag><Size>{}</Size><StorageClass>STANDARD</StorageClass></Contents>",
            escape(key.as_str()),
            timestamp(&object.last_modified),
            escape(object.etag.quoted().as_str()),
            object.size()
        );
    }
    out.push_str("</ListBucketResult>");
    out
}

/// Error document returned with every non-success status
pub fn error_document(code: &str, message: &str, resource: &str) -> String {
    format!(
        "{DECLARATION}<Error><Code>{}</Code><Message>{}</Message><Resource>{}</Resource></Error>",
        escape(code),
        escape(message),
        escape(resource)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_document_escapes() {
        let doc = error_document("NoSuchKey", "missing <key>", "/bucket/a&b");
        assert!(doc.contains("<Code>NoSuchKey</Code>"));
        assert!(doc.contains("missing &lt;key&gt;"));
        assert!(doc.contains("/bucket/a&amp;b"));
    }

    #[test]
    fn test_bucket_list() {
        let doc = list_all_my_buckets(&[("alpha".to_string(), Utc::now())]);
        assert!(doc.starts_with(DECLARATION));
        assert!(doc.contains("<Bucket><Name>alpha</Name>"));
    }
}
