//! Storage key normalization
//!
//! Callers may hand us either a bare object key or a full URL pointing at the object
//! (including presigned URLs). Both reduce to the final path segment.

use crate::error::{Result, TryOnError};

/// Reduce a key or object URL to its bare object key.
///
/// Idempotent: the output never contains `/`, so normalizing it again is a no-op.
pub fn normalize_key(raw: &str) -> Result<String> {
    let invalid = || TryOnError::BadRequest(format!("Invalid storage key: {:?}", raw));
    let mut key = raw;

    if let Some(scheme_end) = key.find("://") {
        if let Some(end) = key.find(['?', '#']) {
            key = &key[..end];
        }
        // Drop scheme and authority; a URL without a path names no object
        let rest = &key[scheme_end + 3..];
        key = rest.find('/').map(|start| &rest[start..]).ok_or_else(invalid)?;
    }

    let key = key.trim_end_matches('/');
    let segment = key.rsplit('/').next().unwrap_or(key);

    if segment.trim().is_empty() {
        return Err(invalid());
    }

    Ok(segment.to_string())
}

/// Check that `key` can be used as-is as one object name
pub fn check_key_segment(key: &str) -> Result<()> {
    if key.trim().is_empty() || key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(TryOnError::BadRequest(format!("Invalid object key: {:?}", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_reduces_to_last_segment() {
        assert_eq!(normalize_key("http://x/y/key.jpg").unwrap(), "key.jpg");
        assert_eq!(normalize_key("bucket/bodies/abc.jpg").unwrap(), "abc.jpg");
    }

    #[test]
    fn test_presigned_query_is_dropped() {
        let url = "http://minio:9000/garments/def.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Expires=604800";
        assert_eq!(normalize_key(url).unwrap(), "def.jpg");
    }

    #[test]
    fn test_bare_key_unchanged() {
        assert_eq!(normalize_key("abc.jpg").unwrap(), "abc.jpg");
        assert_eq!(normalize_key("abc?v=1").unwrap(), "abc?v=1");
    }

    #[test]
    fn test_trailing_slash() {
        assert_eq!(normalize_key("bodies/abc.jpg/").unwrap(), "abc.jpg");
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(normalize_key("").unwrap_err().is_bad_request());
        assert!(normalize_key("///").unwrap_err().is_bad_request());
        assert!(normalize_key("bodies/  ").unwrap_err().is_bad_request());
    }

    #[test]
    fn test_url_without_path_is_rejected() {
        assert!(normalize_key("http://minio:9000/").unwrap_err().is_bad_request());
        assert!(normalize_key("http://minio:9000").unwrap_err().is_bad_request());
        assert!(normalize_key("https://minio:9000?X-Amz-Expires=1").unwrap_err().is_bad_request());
        assert_eq!(normalize_key("http://minio:9000/abc.jpg").unwrap(), "abc.jpg");
    }

    #[test]
    fn test_check_key_segment() {
        assert!(check_key_segment("s1.png").is_ok());
        assert!(check_key_segment("session-42").is_ok());
        for bad in ["", " ", ".", "..", "a/b", "a\\b", "../escape"] {
            assert!(check_key_segment(bad).unwrap_err().is_bad_request(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "abc.jpg",
            "bucket/bodies/abc.jpg",
            "http://x/y/key.jpg",
            "https://minio:9000/body-images/u1/photo.png?X-Amz-Signature=ff",
            "a/b/c/",
            "weird name.jpeg",
            "nested/dir/file#frag",
        ];
        for input in inputs {
            let once = normalize_key(input).unwrap();
            let twice = normalize_key(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }
}
