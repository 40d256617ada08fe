//! Content-type sniffing from file extensions

/// Type reported when nothing better is known
pub const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

/// Guess the content type of `path` from its extension.
///
/// Only the last path component is considered, so directory names with dots
/// do not leak into the guess.
pub fn content_type_for(path: &str) -> &'static str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return DEFAULT_CONTENT_TYPE,
    };

    match ext.as_str() {
        "asc" | "txt" | "text" => "text/plain",
        "avi" => "video/x-msvideo",
        "bin" | "class" | "dll" | "exe" | "so" => "application/octet-stream",
        "bmp" => "image/bmp",
        "css" => "text/css",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "dvi" => "application/x-dvi",
        "gif" => "image/gif",
        "gz" | "gzip" | "tgz" => "application/x-gzip",
        "htm" | "html" => "text/html",
        "ico" => "image/x-icon",
        "jpe" | "jpeg" | "jpg" => "image/jpeg",
        "js" => "application/x-javascript",
        "json" => "application/json",
        "mov" | "qt" => "video/quicktime",
        "mp3" | "mpga" => "audio/mpeg",
        "mp4" => "video/mp4",
        "mpe" | "mpeg" | "mpg" => "video/mpeg",
        "ogg" => "application/ogg",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "ppt" => "application/vnd.ms-powerpoint",
        "ps" | "eps" | "ai" => "application/postscript",
        "rtf" => "text/rtf",
        "svg" => "image/svg+xml",
        "swf" => "application/x-shockwave-flash",
        "tar" => "application/x-tar",
        "tif" | "tiff" => "image/tiff",
        "wav" => "audio/x-wav",
        "xls" => "application/vnd.ms-excel",
        "xml" | "xsl" => "text/xml",
        "zip" => "application/zip",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type_for("bucket/zftest.jpg"), "image/jpeg");
        assert_eq!(content_type_for("/tmp/testdata.html"), "text/html");
        assert_eq!(content_type_for("REPORT.PDF"), "application/pdf");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(content_type_for("bucket/zftest"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for("some.dir/testdata"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for(".hidden"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for("archive.unknownext"), DEFAULT_CONTENT_TYPE);
    }
}
