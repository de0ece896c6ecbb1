//! Zlib codec implementation.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::{Codec, initial_capacity};
use crate::{Error, Result};

/// Zlib-framed deflate codec.
#[derive(Debug, Clone, Copy)]
pub struct ZlibCodec {
    level: u32,
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl ZlibCodec {
    /// Creates a codec with the given compression level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCompression`] if `level` is above 9.
    pub fn with_level(level: u32) -> Result<Self> {
        if level > 9 {
            return Err(Error::UnsupportedCompression {
                method: format!("zlib level {} (must be 0-9)", level),
            });
        }
        Ok(Self { level })
    }

    /// Returns the compression level.
    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn decompress(&self, input: &[u8], size_hint: Option<u64>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(initial_capacity(size_hint));
        ZlibDecoder::new(input).read_to_end(&mut output)?;
        Ok(output)
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(input)?;
        Ok(encoder.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_zlib_roundtrip() {
        let data = b"Hello, World! This is a test of zlib compression.".repeat(20);
        let codec = ZlibCodec::default();
        let compressed = codec.compress(&data).unwrap();
        assert!(compressed.len() < data.len());
        let decompressed = codec
            .decompress(&compressed, Some(data.len() as u64))
            .unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_zlib_header() {
        let compressed = ZlibCodec::default().compress(b"abc").unwrap();
        // CMF byte: deflate with 32K window.
        assert_eq!(compressed[0], 0x78);
    }

    #[test]
    fn test_zlib_levels() {
        assert_eq!(ZlibCodec::default().level(), 6);
        assert_eq!(ZlibCodec::with_level(9).unwrap().level(), 9);
        let err = ZlibCodec::with_level(10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedCompression);
    }

    #[test]
    fn test_zlib_garbage_input_fails() {
        let err = ZlibCodec::default()
            .decompress(b"definitely not zlib", None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
