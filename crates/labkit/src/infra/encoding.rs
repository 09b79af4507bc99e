//! Text decoding for script files.

use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::domain::errors::DomainError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Strict decoder for a single named encoding.
#[derive(Debug, Clone, Copy)]
pub struct TextDecoder {
    encoding: &'static Encoding,
}

impl TextDecoder {
    /// Resolve a WHATWG encoding label such as `UTF-8` or `latin1`.
    pub fn for_label(label: &str) -> Result<Self, DomainError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(|encoding| Self { encoding })
            .ok_or_else(|| DomainError::UnknownEncoding(label.to_owned()))
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode `bytes`, failing on malformed input rather than substituting replacement
    /// characters.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let bytes = if self.encoding == UTF_8 {
            bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
        } else {
            bytes
        };

        self.encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or_else(|| anyhow!("content is not valid {}", self.encoding.name()))
    }

    /// Read and decode a whole file.
    pub fn read_file(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        self.decode(&bytes)
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_common_labels() {
        assert_eq!(TextDecoder::for_label("UTF-8").unwrap().name(), "UTF-8");
        assert_eq!(TextDecoder::for_label("utf8").unwrap().name(), "UTF-8");
        assert_eq!(
            TextDecoder::for_label("latin1").unwrap().name(),
            "windows-1252"
        );
    }

    #[test]
    fn rejects_unknown_label() {
        let err = TextDecoder::for_label("klingon").unwrap_err();
        assert!(matches!(err, DomainError::UnknownEncoding(label) if label == "klingon"));
    }

    #[test]
    fn strict_utf8_rejects_invalid_bytes() {
        let decoder = TextDecoder::default();
        assert!(decoder.decode(b"ok \xff\xfe bad").is_err());
        assert_eq!(decoder.decode(b"\xEF\xBB\xBFx <- 1").unwrap(), "x <- 1");
    }

    #[test]
    fn latin1_decodes_high_bytes() {
        let decoder = TextDecoder::for_label("latin1").unwrap();
        assert_eq!(decoder.decode(b"caf\xe9").unwrap(), "caf\u{e9}");
    }
}
