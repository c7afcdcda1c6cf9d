//! Client pixel buffers.
//!
//! The core never touches pixel data. It only tracks a buffer's size and how
//! many surfaces currently hold it, so the client can be told when it may
//! reuse the memory.

use std::fmt;

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::event::CoreAction;
use crate::Compositor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buf:{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Buffer {
    pub id: BufferId,
    pub width: i32,
    pub height: i32,
    /// Number of surfaces currently displaying this buffer.
    pub(crate) busy_count: u32,
    pub(crate) mappable: bool,
}

impl Buffer {
    pub const fn busy_count(&self) -> u32 {
        self.busy_count
    }
}

impl Compositor {
    /// Register a client buffer of the given size.
    pub fn buffer_create(&mut self, width: i32, height: i32) -> CoreResult<BufferId> {
        self.insert_buffer(width, height, true)
    }

    /// Register a buffer whose backing memory cannot be mapped. Attaching
    /// it is refused.
    pub fn buffer_create_unmappable(&mut self, width: i32, height: i32) -> CoreResult<BufferId> {
        self.insert_buffer(width, height, false)
    }

    fn insert_buffer(&mut self, width: i32, height: i32, mappable: bool) -> CoreResult<BufferId> {
        self.buffers
            .try_reserve(1)
            .map_err(|_| CoreError::OutOfMemory)?;
        let id = BufferId(self.ids.next_buffer());
        self.buffers.insert(
            id,
            Buffer {
                id,
                width,
                height,
                busy_count: 0,
                mappable,
            },
        );
        Ok(id)
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    /// The client destroyed the buffer. Surfaces still showing it forget
    /// the reference but keep their current contents mapped.
    pub fn buffer_destroy(&mut self, id: BufferId) -> CoreResult<()> {
        self.buffers
            .remove(&id)
            .ok_or(CoreError::UnknownBuffer(id))?;
        for surface in self.surfaces.values_mut() {
            if surface.buffer == Some(id) {
                surface.buffer = None;
            }
        }
        debug!("Buffer {} destroyed", id);
        Ok(())
    }

    /// Drop one hold on `id`; at zero the client gets the buffer back.
    pub(crate) fn buffer_release(&mut self, id: BufferId) {
        let Some(buffer) = self.buffers.get_mut(&id) else {
            return;
        };
        buffer.busy_count = buffer.busy_count.saturating_sub(1);
        if buffer.busy_count == 0 {
            self.actions.push(CoreAction::BufferReleased { buffer: id });
        }
    }
}
