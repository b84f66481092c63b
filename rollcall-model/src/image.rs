//! Image payloads forwarded to the external image service.

/// A resize/crop instruction producing one named image variant.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageOperation {
    pub version_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub width: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub height: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub crop: bool,
}

impl ImageOperation {
    pub fn new(
        version_name: impl Into<String>,
        width: u32,
        height: u32,
        crop: bool,
    ) -> Self {
        Self {
            version_name: version_name.into(),
            width,
            height,
            crop,
        }
    }

    /// Variants requested when the caller does not specify any.
    pub fn default_ops() -> Vec<ImageOperation> {
        vec![
            ImageOperation::new("thumbnail", 120, 120, true),
            ImageOperation::new("large", 640, 640, false),
        ]
    }
}

/// Raw image supplied with a create or update call.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageUpload {
    pub filename: String,
    /// Image bytes; base64 encoded on the wire
    #[cfg_attr(feature = "serde", serde(with = "base64_bytes"))]
    pub data: Vec<u8>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ops: Vec<ImageOperation>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
            ops: Vec::new(),
        }
    }

    /// Operations to send, falling back to [`ImageOperation::default_ops`].
    pub fn effective_ops(&self) -> Vec<ImageOperation> {
        if self.ops.is_empty() {
            ImageOperation::default_ops()
        } else {
            self.ops.clone()
        }
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("filename", &self.filename)
            .field("bytes", &self.data.len())
            .field("ops", &self.ops)
            .finish()
    }
}

#[cfg(feature = "serde")]
pub mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &[u8],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        STANDARD.decode(raw.as_bytes()).map_err(serde::de::Error::custom)
    }
}
