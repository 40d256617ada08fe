//! URI construction helpers

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{Result, StowageError};

/// Everything except RFC 3986 unreserved characters is escaped in key segments
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Same as [`KEY_SEGMENT`] for query parameter values
const QUERY_VALUE: &AsciiSet = KEY_SEGMENT;

/// Percent-encode an object key, keeping `/` separators intact
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Decode a percent-encoded path or query component
pub fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// RFC 3986 `pchar` without percent-escapes
fn is_segment_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+'
                | b',' | b';' | b'=' | b':' | b'@'
        )
}

/// Check that a bucket segment can be placed verbatim in a request URI
pub fn check_segment(segment: &str) -> Result<&str> {
    if segment.is_empty() {
        return Err(StowageError::InvalidUri("empty bucket segment".to_string()));
    }
    if !segment.bytes().all(is_segment_char) {
        return Err(StowageError::InvalidUri(format!(
            "'{}' is not a valid path segment",
            segment
        )));
    }
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_keeps_separators() {
        assert_eq!(encode_key("photos/2024/cat.jpg"), "photos/2024/cat.jpg");
        assert_eq!(encode_key("And It Gets Worse"), "And%20It%20Gets%20Worse");
        assert_eq!(encode_key("a+b/c&d"), "a%2Bb/c%26d");
    }

    #[test]
    fn test_decode_inverts_encode() {
        let key = "dir/some file (1).txt";
        assert_eq!(decode(&encode_key(key)), key);
    }

    #[test]
    fn test_check_segment() {
        assert!(check_segment("my-bucket").is_ok());
        assert!(check_segment("MixedCase_Bucket").is_ok());

        let err = check_segment("This is a Very Bad Name").unwrap_err();
        assert!(err.to_string().contains("Invalid URI"));
        assert!(check_segment("").is_err());
        assert!(check_segment("bad%name").is_err());
    }
}
