use std::convert::TryFrom;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::models::Target;
use crate::text::{effective_post_limit, grapheme_length};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Body is required")]
    EmptyBody,
    #[error("Body is too long ({length} characters, limit is {limit})")]
    BodyTooLong { length: usize, limit: usize },
    #[error("Invalid image data")]
    MalformedDataUrl,
    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),
}

/// A composer body that is non-empty and fits every requested platform.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBody(String);

impl ValidatedBody {
    pub fn new(raw: &str, targets: &[Target]) -> Result<Self, ValidationError> {
        let body = raw.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyBody);
        }

        let length = grapheme_length(body);
        let limit = effective_post_limit(targets);
        if length > limit {
            return Err(ValidationError::BodyTooLong { length, limit });
        }

        Ok(ValidatedBody(body.to_string()))
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// An inline image as sent by the composer: `data:image/png;base64,....`
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    /// always `image/*`
    pub mime: String,

    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        DataUrl::try_from(value)
    }

    /// File name used for multipart uploads, derived from the mime subtype.
    pub fn file_name(&self) -> String {
        let extension = match self.mime.trim_start_matches("image/") {
            "jpeg" => "jpg",
            "svg+xml" => "svg",
            other => other,
        };
        format!("image.{extension}")
    }
}

impl TryFrom<&str> for DataUrl {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let rest = value
            .strip_prefix("data:")
            .ok_or(ValidationError::MalformedDataUrl)?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or(ValidationError::MalformedDataUrl)?;

        let mime = mime.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(ValidationError::UnsupportedImageType(mime));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| ValidationError::MalformedDataUrl)?;
        if bytes.is_empty() {
            return Err(ValidationError::MalformedDataUrl);
        }

        Ok(DataUrl { mime, bytes })
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Body tests
    #[test]
    fn test_body_is_trimmed() {
        let body = ValidatedBody::new("  hello  ", &[]).unwrap();
        assert_eq!(body.into_inner(), "hello");
    }

    #[test]
    fn test_blank_body_returns_empty_error() {
        assert!(matches!(
            ValidatedBody::new("   \n ", &[]),
            Err(ValidationError::EmptyBody)
        ));
    }

    #[test]
    fn test_body_limit_depends_on_targets() {
        let body = "a".repeat(400);
        assert!(ValidatedBody::new(&body, &[]).is_ok());
        assert!(ValidatedBody::new(&body, &[Target::Mastodon]).is_ok());
        assert!(matches!(
            ValidatedBody::new(&body, &[Target::Mastodon, Target::Bluesky]),
            Err(ValidationError::BodyTooLong {
                length: 400,
                limit: 300
            })
        ));
    }

    #[test]
    fn test_body_limit_counts_graphemes() {
        // 300 flags are 600 scalar values but 300 characters
        let body = "🇫🇷".repeat(300);
        assert!(ValidatedBody::new(&body, &[Target::Bluesky]).is_ok());
    }

    #[test]
    fn test_journal_limit_applies_without_targets() {
        let body = "a".repeat(1001);
        assert!(matches!(
            ValidatedBody::new(&body, &[]),
            Err(ValidationError::BodyTooLong { limit: 1000, .. })
        ));
    }

    // Data URL tests
    #[test]
    fn test_parse_png_data_url() {
        let data_url = DataUrl::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(data_url.mime, "image/png");
        assert_eq!(data_url.bytes, b"hello");
        assert_eq!(data_url.file_name(), "image.png");
    }

    #[test]
    fn test_jpeg_file_name() {
        let data_url = DataUrl::parse("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(data_url.file_name(), "image.jpg");
    }

    #[test]
    fn test_data_url_without_prefix_is_malformed() {
        assert!(matches!(
            DataUrl::parse("https://example.com/image.png"),
            Err(ValidationError::MalformedDataUrl)
        ));
    }

    #[test]
    fn test_non_base64_data_url_is_malformed() {
        assert!(matches!(
            DataUrl::parse("data:image/png,rawbytes"),
            Err(ValidationError::MalformedDataUrl)
        ));
        assert!(matches!(
            DataUrl::parse("data:image/png;base64,!!!"),
            Err(ValidationError::MalformedDataUrl)
        ));
    }

    #[test]
    fn test_non_image_data_url_is_rejected() {
        assert!(matches!(
            DataUrl::parse("data:text/html;base64,PGI+aGk8L2I+"),
            Err(ValidationError::UnsupportedImageType(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let raw = "data:image/gif;base64,R0lGODlh";
        assert_eq!(DataUrl::parse(raw).unwrap().to_string(), raw);
    }
}
