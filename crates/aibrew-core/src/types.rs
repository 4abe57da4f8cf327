use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Transcript entries
// =============================================================================

/// Author of a transcript entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label shown next to the bubble in the rendered transcript.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Chatbot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One immutable transcript entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Images
// =============================================================================

/// Errors raised while accepting an uploaded image.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image upload is empty")]
    Empty,
    #[error("unsupported image type '{0}': expected jpg, jpeg or png")]
    UnsupportedType(String),
    #[error("file contents do not match the {0} format")]
    FormatMismatch(ImageFormat),
}

/// Accepted upload formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    const PNG_MAGIC: &'static [u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG_MAGIC: &'static [u8] = &[0xFF, 0xD8, 0xFF];

    /// Resolve the format from a file name's extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Result<Self, ImageError> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            _ => Err(ImageError::UnsupportedType(name.to_string())),
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// Whether `data` starts with this format's signature.
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            ImageFormat::Png => data.starts_with(Self::PNG_MAGIC),
            ImageFormat::Jpeg => data.starts_with(Self::JPEG_MAGIC),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// The image currently attached to a session.
///
/// Cloning is cheap: the payload is reference-counted and shared by every
/// turn that reuses it.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub file_name: String,
    pub format: ImageFormat,
    pub data: Bytes,
}

impl ImageAttachment {
    /// Validate an upload by extension and magic bytes.
    pub fn from_upload(file_name: impl Into<String>, data: Bytes) -> Result<Self, ImageError> {
        let file_name = file_name.into();
        let format = ImageFormat::from_file_name(&file_name)?;
        if data.is_empty() {
            return Err(ImageError::Empty);
        }
        if !format.matches(&data) {
            return Err(ImageError::FormatMismatch(format));
        }
        Ok(Self {
            file_name,
            format,
            data,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

// =============================================================================
// Gateway input
// =============================================================================

/// One item of the ordered content list sent to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image(ImageAttachment),
}

/// Content of a single outgoing turn: one text item, then at most one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnContents {
    text: String,
    image: Option<ImageAttachment>,
}

impl TurnContents {
    pub fn new(text: impl Into<String>, image: Option<ImageAttachment>) -> Self {
        Self {
            text: text.into(),
            image,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    /// The ordered content list: text first, image (if any) second.
    pub fn parts(&self) -> Vec<ContentPart> {
        let mut parts = vec![ContentPart::Text(self.text.clone())];
        if let Some(image) = &self.image {
            parts.push(ContentPart::Image(image.clone()));
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Bytes {
        let mut data = ImageFormat::PNG_MAGIC.to_vec();
        data.extend_from_slice(&[0u8; 16]);
        Bytes::from(data)
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn test_role_display_names() {
        assert_eq!(Role::User.display_name(), "You");
        assert_eq!(Role::Assistant.display_name(), "Chatbot");
    }

    #[test]
    fn test_message_constructors() {
        let m = Message::user("hi");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content, "hi");
        let m = Message::assistant("hello");
        assert_eq!(m.role, Role::Assistant);
    }

    #[test]
    fn test_image_format_from_extension() {
        assert_eq!(ImageFormat::from_file_name("cat.png").unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::from_file_name("CAT.JPG").unwrap(), ImageFormat::Jpeg);
        assert_eq!(
            ImageFormat::from_file_name("photo.jpeg").unwrap(),
            ImageFormat::Jpeg
        );
        assert!(matches!(
            ImageFormat::from_file_name("anim.gif"),
            Err(ImageError::UnsupportedType(_))
        ));
        assert!(matches!(
            ImageFormat::from_file_name("noext"),
            Err(ImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_attachment_accepts_valid_png() {
        let img = ImageAttachment::from_upload("cat.png", png_bytes()).unwrap();
        assert_eq!(img.format, ImageFormat::Png);
        assert_eq!(img.mime_type(), "image/png");
        assert_eq!(img.len(), 24);
    }

    #[test]
    fn test_attachment_rejects_mismatched_bytes() {
        let err = ImageAttachment::from_upload("cat.jpg", png_bytes()).unwrap_err();
        assert_eq!(err, ImageError::FormatMismatch(ImageFormat::Jpeg));
    }

    #[test]
    fn test_attachment_rejects_empty() {
        let err = ImageAttachment::from_upload("cat.png", Bytes::new()).unwrap_err();
        assert_eq!(err, ImageError::Empty);
    }

    #[test]
    fn test_attachment_debug_omits_payload() {
        let img = ImageAttachment::from_upload("cat.png", png_bytes()).unwrap();
        let dbg = format!("{:?}", img);
        assert!(dbg.contains("cat.png"));
        assert!(dbg.contains("bytes: 24"));
    }

    #[test]
    fn test_turn_contents_parts_order() {
        let img = ImageAttachment::from_upload("cat.png", png_bytes()).unwrap();
        let contents = TurnContents::new("What is this?", Some(img.clone()));
        let parts = contents.parts();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], ContentPart::Text("What is this?".to_string()));
        assert_eq!(parts[1], ContentPart::Image(img));
    }

    #[test]
    fn test_turn_contents_text_only() {
        let contents = TurnContents::new("hello", None);
        assert_eq!(contents.parts().len(), 1);
        assert!(contents.image().is_none());
        assert_eq!(contents.text(), "hello");
    }
}
