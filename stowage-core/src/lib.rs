//! Core data models and types for stowage

pub mod auth;
pub mod error;
pub mod mime;
pub mod types;
pub mod uri;

pub use error::*;
pub use types::*;

/// Result type alias for stowage operations
pub type Result<T> = std::result::Result<T, StowageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_name_creation() {
        let bucket = BucketName::new("test-bucket").unwrap();
        assert_eq!(bucket.as_str(), "test-bucket");
        assert!(bucket.is_dns_compatible());
    }

    #[test]
    fn test_bucket_name_validation() {
        // Valid bucket names
        assert!(BucketName::new("bucket").is_ok());
        assert!(BucketName::new("bucket-123").is_ok());
        assert!(BucketName::new("bucket_123").is_ok());
        assert!(BucketName::new("my.bucket").is_ok());

        // Invalid bucket names
        assert!(BucketName::new("").is_err());
        assert!(BucketName::new("ab").is_err());
        assert!(BucketName::new(&"a".repeat(256)).is_err());
        assert!(BucketName::new("bucket/with/slashes").is_err());
        assert!(BucketName::new("192.168.1.1").is_err());
    }

    #[test]
    fn test_bad_bucket_name_reports_invalid_characters() {
        let err = BucketName::new("This is a Very Bad Name").unwrap_err();
        assert!(err.is_naming());
        assert!(err.to_string().contains("contains invalid characters"));
        assert!(err.to_string().contains("This is a Very Bad Name"));
    }

    #[test]
    fn test_dns_compatibility() {
        assert!(!BucketName::new("under_score").unwrap().is_dns_compatible());
        assert!(!BucketName::new("-leading").unwrap().is_dns_compatible());
        assert!(!BucketName::new("double..dot").unwrap().is_dns_compatible());
        assert!(!BucketName::new(&"a".repeat(64)).unwrap().is_dns_compatible());
    }

    #[test]
    fn test_object_path_parsing() {
        let path = ObjectPath::parse("bucket/dir/file name.txt").unwrap();
        assert_eq!(path.bucket(), "bucket");
        assert_eq!(path.key(), "dir/file name.txt");
        assert_eq!(path.request_path(), "/bucket/dir/file%20name.txt");
        assert_eq!(path.to_string(), "bucket/dir/file name.txt");

        let bucket_only = ObjectPath::parse("bucket").unwrap();
        assert!(!bucket_only.has_key());
        assert_eq!(bucket_only.request_path(), "/bucket");

        // Leading slash is tolerated
        assert_eq!(ObjectPath::parse("/bucket/key").unwrap().key(), "key");
    }

    #[test]
    fn test_object_operations_need_a_key() {
        for path in ["bucket", "bucket/", "/bucket"] {
            let err = ObjectPath::parse_object(path).unwrap_err();
            assert!(matches!(err, StowageError::InvalidKey(_)), "{}: {}", path, err);
        }
        let path = ObjectPath::parse_object("bucket/key").unwrap();
        assert_eq!(path.request_path(), "/bucket/key");
    }

    #[test]
    fn test_object_path_rejects_uri_unsafe_bucket() {
        let err = ObjectPath::parse("This is a Very Bad Name/And It Gets Worse").unwrap_err();
        assert!(err.is_uri());
        assert!(err.to_string().contains("Invalid URI"));

        // Keys are encoded, not rejected
        assert!(ObjectPath::parse("bucket/And It Gets Worse").is_ok());
        assert!(ObjectPath::parse("bucket/bad\u{0007}key").is_err());
    }

    #[test]
    fn test_etag() {
        let etag = ETag::compute(b"hello");
        assert_eq!(etag.as_hex(), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(etag.quoted(), "\"5d41402abc4b2a76b9719d911017c592\"");
        assert_eq!(etag.to_string(), etag.quoted());
        assert_eq!(ETag::parse("\"5D41402ABC4B2A76B9719D911017C592\""), etag);
        assert!(etag.matches(b"hello"));
        assert!(!etag.matches(b"hello!"));

        assert_eq!(
            ETag::compute(b"").as_hex(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_content_md5_header() {
        // base64 of the raw digest of ""
        assert_eq!(ContentHash::new(b"").to_base64(), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn test_acl_parsing() {
        assert_eq!("public-read".parse::<Acl>().unwrap(), Acl::PublicRead);
        assert_eq!(Acl::default(), Acl::Private);
        assert!(Acl::PublicRead.allows_anonymous_read());
        assert!(!Acl::AuthenticatedRead.allows_anonymous_read());
        assert!("world-writable".parse::<Acl>().is_err());
    }

    #[test]
    fn test_http_date_roundtrip() {
        let parsed = parse_http_date("Tue, 27 Mar 2007 19:36:42 GMT").unwrap();
        assert_eq!(http_date(parsed), "Tue, 27 Mar 2007 19:36:42 GMT");
        assert_eq!(
            parse_http_date("Tue, 27 Mar 2007 19:36:42 +0000"),
            Some(parsed)
        );
        assert!(parse_http_date("yesterday").is_none());
    }
}
