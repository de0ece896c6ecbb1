//! Ownership of one opened container's in-memory state.

use std::sync::Arc;

use crate::resources::ResourceRegistry;
use crate::state::ArchiveState;
use crate::table::{Table, TableOptions};
use crate::Result;

/// A table together with the buffers staged into it and the session's
/// health.
///
/// Discarding or resetting the session releases every staged buffer and
/// every file lock.
///
/// ```rust
/// use assetpak::{ArchiveState, Session, TableOptions};
///
/// let mut session = Session::new(TableOptions::new());
/// let handle = session.stage_buffer("data\\a.txt", b"hello".to_vec())?;
/// assert!(session.table().contains_file("data\\a.txt"));
/// assert!(session.resources().resolve(handle).is_some());
///
/// session.set_state(ArchiveState::ERROR);
/// session.reset();
/// assert!(session.table().is_empty());
/// assert!(session.resources().is_empty());
/// assert!(session.state().is_normal());
/// # Ok::<(), assetpak::Error>(())
/// ```
#[derive(Debug)]
pub struct Session {
    table: Table,
    resources: ResourceRegistry,
    state: ArchiveState,
}

impl Session {
    /// Creates a session with an empty table.
    pub fn new(options: TableOptions) -> Self {
        Self::with_table(Table::with_options(options))
    }

    /// Creates a session around an already populated table.
    pub fn with_table(table: Table) -> Self {
        Self {
            table,
            resources: ResourceRegistry::new(),
            state: ArchiveState::NORMAL,
        }
    }

    /// The session's table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Mutable access to the session's table.
    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    /// The staged buffer registry.
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Mutable access to the staged buffer registry.
    pub fn resources_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.resources
    }

    /// Current health.
    pub fn state(&self) -> ArchiveState {
        self.state
    }

    /// Replaces the health flags. Transition rules are up to the caller.
    pub fn set_state(&mut self, state: ArchiveState) {
        self.state = state;
    }

    /// Registers `data` and stages it at `path`, replacing any existing row.
    /// Returns the buffer's handle.
    pub fn stage_buffer(&mut self, path: &str, data: impl Into<Arc<[u8]>>) -> Result<u32> {
        let data: Arc<[u8]> = data.into();
        self.table.add_bytes(path, Arc::clone(&data), true)?;
        Ok(self.resources.create_handle(data))
    }

    /// Drops every entry, lock, and staged buffer and returns to
    /// [`ArchiveState::NORMAL`].
    pub fn reset(&mut self) {
        log::debug!("Resetting session");
        self.table.clear();
        self.resources.clear();
        self.state = ArchiveState::NORMAL;
    }

    /// Ends the session and hands back its table. Staged buffers stay alive
    /// through the entries that reference them.
    pub fn into_table(mut self) -> Table {
        self.resources.clear();
        std::mem::take(&mut self.table)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.resources.clear();
    }
}
