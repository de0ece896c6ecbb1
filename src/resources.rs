//! Handle table for staged in-memory buffers.

use std::collections::HashMap;
use std::sync::Arc;

/// Maps sequential integer handles to in-memory byte buffers.
///
/// Staged additions whose bytes only exist in memory are registered here so
/// the session can release all of them at once. [`clear`](Self::clear) must
/// run whenever the owning session is discarded or reopened.
///
/// ```rust
/// use assetpak::ResourceRegistry;
///
/// let mut registry = ResourceRegistry::new();
/// let a = registry.create_handle(b"first".to_vec());
/// let b = registry.create_handle(b"second".to_vec());
/// assert_eq!((a, b), (0, 1));
/// assert_eq!(&*registry.resolve(b).unwrap(), b"second");
///
/// registry.clear();
/// assert!(registry.resolve(a).is_none());
/// assert_eq!(registry.create_handle(Vec::<u8>::new()), 0);
/// ```
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    buffers: HashMap<u32, Arc<[u8]>>,
    next_handle: u32,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a buffer and returns its handle.
    ///
    /// Handles are issued in sequence. After `u32::MAX` the sequence wraps to
    /// 0 and skips handles that are still registered, so a live buffer is
    /// never replaced.
    pub fn create_handle(&mut self, buffer: impl Into<Arc<[u8]>>) -> u32 {
        let mut handle = self.next_handle;
        while self.buffers.contains_key(&handle) {
            handle = handle.wrapping_add(1);
        }
        self.next_handle = handle.wrapping_add(1);
        self.buffers.insert(handle, buffer.into());
        handle
    }

    /// Returns the buffer registered under `handle`.
    pub fn resolve(&self, handle: u32) -> Option<Arc<[u8]>> {
        self.buffers.get(&handle).cloned()
    }

    /// Releases one buffer. Returns false if the handle was unknown.
    pub fn release(&mut self, handle: u32) -> bool {
        self.buffers.remove(&handle).is_some()
    }

    /// Number of registered buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns true if no buffer is registered.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Releases every buffer and restarts handle numbering at 0.
    ///
    /// Entries that still reference a released buffer keep it alive; the
    /// registry only drops its own reference.
    pub fn clear(&mut self) {
        if !self.buffers.is_empty() {
            log::debug!("Releasing {} staged buffers", self.buffers.len());
        }
        self.buffers.clear();
        self.next_handle = 0;
    }
}
