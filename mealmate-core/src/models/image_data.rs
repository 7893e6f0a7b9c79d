use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Raw image bytes (cover or step photo), encoded as base64 in JSON.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ImageData(Vec<u8>);

impl ImageData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ImageData {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData({} bytes)", self.0.len())
    }
}

impl Serialize for ImageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for ImageData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(ImageData)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_base64() {
        let data = ImageData::new(b"photo".to_vec());
        assert_eq!(serde_json::to_string(&data).unwrap(), "\"cGhvdG8=\"");

        let parsed: ImageData = serde_json::from_str("\"cGhvdG8=\"").unwrap();
        assert_eq!(parsed.as_bytes(), b"photo");
    }

    #[test]
    fn test_rejects_invalid_base64() {
        let result: Result<ImageData, _> = serde_json::from_str("\"not base64!\"");
        assert!(result.is_err());
    }
}
