//! Table configuration.

use std::sync::Arc;

use crate::codec::{self, Codec};

/// Options for a [`Table`](super::Table).
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use assetpak::TableOptions;
/// use assetpak::codec::StoreCodec;
///
/// let options = TableOptions::new()
///     .lock_files(true)
///     .codec(Arc::new(StoreCodec));
/// assert!(options.lock_files);
/// assert_eq!(options.codec.name(), "store");
/// ```
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Hold an open read handle on the external source of every staged
    /// addition until it is saved, removed, or replaced.
    pub lock_files: bool,
    /// Codec given to entries the table creates.
    pub codec: Arc<dyn Codec>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            lock_files: false,
            codec: codec::default_codec(),
        }
    }
}

impl TableOptions {
    /// Creates options with default settings: no file locking, zlib codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables locking of staged source files.
    pub fn lock_files(mut self, enabled: bool) -> Self {
        self.lock_files = enabled;
        self
    }

    /// Sets the codec for entries created by the table.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = codec;
        self
    }
}
