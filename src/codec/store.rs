//! Store codec (no compression).

use super::Codec;
use crate::Result;

/// A codec that passes data through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCodec;

impl Codec for StoreCodec {
    fn name(&self) -> &'static str {
        "store"
    }

    fn decompress(&self, input: &[u8], _size_hint: Option<u64>) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        Ok(input.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_passthrough() {
        let data = b"Hello, World!";
        assert_eq!(StoreCodec.compress(data).unwrap(), data);
        assert_eq!(StoreCodec.decompress(data, None).unwrap(), data);
    }

    #[test]
    fn test_store_empty() {
        assert!(StoreCodec.decompress(&[], Some(0)).unwrap().is_empty());
    }
}
