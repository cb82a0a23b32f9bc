//! Invoice image payload handed to the gateway.

/// Raw image bytes plus the declared media type (e.g. `image/jpeg`).
///
/// Owned by the call that loaded it and only borrowed by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceImage {
    bytes: Vec<u8>,
    media_type: String,
}

impl InvoiceImage {
    /// Media type declared when the caller cannot tell.
    pub const DEFAULT_MEDIA_TYPE: &'static str = "image/jpeg";

    /// Wrap already-loaded bytes.
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
        }
    }

    /// Image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared media type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let image = InvoiceImage::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg");
        assert_eq!(image.len(), 3);
        assert!(!image.is_empty());
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.bytes(), &[0xFF, 0xD8, 0xFF]);
    }
}
