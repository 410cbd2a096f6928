//! Upload policy checks: pure, no side effects.

use docsift_core::RejectReason;

use crate::mime_detect::image_mime_type;

/// One file as received from the caller, before any processing.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Check an upload against the policy. Returns the detected MIME type on
/// acceptance; a rejected upload must leave no trace anywhere.
pub fn validate(upload: &Upload, policy: &UploadPolicy) -> Result<&'static str, RejectReason> {
    if upload.bytes.is_empty() {
        return Err(RejectReason::Empty);
    }
    if upload.bytes.len() > policy.max_bytes {
        return Err(RejectReason::TooLarge);
    }
    image_mime_type(&upload.filename).ok_or(RejectReason::UnsupportedType)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(filename: &str, len: usize) -> Upload {
        Upload {
            filename: filename.to_string(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn accepts_a_small_png() {
        let result = validate(&upload("scan.png", 1024), &UploadPolicy::default());
        assert_eq!(result, Ok("image/png"));
    }

    #[test]
    fn rejects_empty_payloads() {
        let result = validate(&upload("scan.png", 0), &UploadPolicy::default());
        assert_eq!(result, Err(RejectReason::Empty));
    }

    #[test]
    fn rejects_oversized_payloads() {
        let policy = UploadPolicy { max_bytes: 10 };
        assert_eq!(
            validate(&upload("scan.png", 11), &policy),
            Err(RejectReason::TooLarge)
        );
        // Exactly at the cap is still allowed.
        assert_eq!(validate(&upload("scan.png", 10), &policy), Ok("image/png"));
    }

    #[test]
    fn rejects_unsupported_extensions() {
        let result = validate(&upload("malware.exe", 1024), &UploadPolicy::default());
        assert_eq!(result, Err(RejectReason::UnsupportedType));
    }
}
