//! Compression codecs for entry data.
//!
//! Every entry carries the codec of its container kind. The table never
//! compresses or decompresses by itself; it calls through [`Codec`] so that
//! format crates can plug in whatever their containers use.
//!
//! Two codecs ship with the crate:
//!
//! - [`StoreCodec`]: bytes are stored as-is
//! - [`ZlibCodec`]: zlib-framed deflate, the usual choice for game asset
//!   containers

mod store;
mod zlib;

use std::fmt;
use std::sync::Arc;

use crate::Result;

pub use store::StoreCodec;
pub use zlib::ZlibCodec;

/// Compression hook used by entries.
///
/// Implementations must be safe to call from several threads at once on
/// different entries. Calls for the same archive-resident entry are
/// serialized by the entry itself.
///
/// Errors are passed to the caller unchanged.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Decompresses `input`.
    ///
    /// `size_hint` is the expected decompressed size when the container
    /// records it.
    fn decompress(&self, input: &[u8], size_hint: Option<u64>) -> Result<Vec<u8>>;

    /// Compresses `input`.
    fn compress(&self, input: &[u8]) -> Result<Vec<u8>>;
}

/// Returns the codec used when none is configured.
pub fn default_codec() -> Arc<dyn Codec> {
    Arc::new(ZlibCodec::default())
}

/// Caps pre-allocation for a decompression buffer.
///
/// A corrupted size field must not make us reserve gigabytes up front.
pub(crate) fn initial_capacity(size_hint: Option<u64>) -> usize {
    const MAX_PREALLOC: u64 = 64 * 1024 * 1024;
    size_hint.unwrap_or(0).min(MAX_PREALLOC) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_codec_is_zlib() {
        assert_eq!(default_codec().name(), "zlib");
    }

    #[test]
    fn test_initial_capacity_is_capped() {
        assert_eq!(initial_capacity(None), 0);
        assert_eq!(initial_capacity(Some(10)), 10);
        assert_eq!(initial_capacity(Some(u64::MAX)), 64 * 1024 * 1024);
    }
}
