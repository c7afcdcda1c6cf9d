//! Z-ordered layers.
//!
//! Each layer is a front-to-back [`LinkList`] of surfaces. The stack walks
//! layers from the top (fade) down to the background.

use serde::{Deserialize, Serialize};

use crate::list::LinkList;
use crate::surface::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Fade,
    Cursor,
    Lock,
    Fullscreen,
    Panel,
    Normal,
    Background,
}

impl LayerKind {
    /// All layers, top to bottom.
    pub const STACK: [Self; 7] = [
        Self::Fade,
        Self::Cursor,
        Self::Lock,
        Self::Fullscreen,
        Self::Panel,
        Self::Normal,
        Self::Background,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
pub struct Layers {
    lists: [LinkList<SurfaceId>; 7],
}

impl Layers {
    pub fn list(&self, kind: LayerKind) -> &LinkList<SurfaceId> {
        &self.lists[kind.index()]
    }

    pub(crate) fn list_mut(&mut self, kind: LayerKind) -> &mut LinkList<SurfaceId> {
        &mut self.lists[kind.index()]
    }

    /// Remove `id` from whichever layer holds it.
    pub(crate) fn remove(&mut self, id: SurfaceId) -> bool {
        self.lists.iter_mut().any(|l| l.remove(id))
    }

    /// Number of layers currently holding `id`.
    pub fn membership(&self, id: SurfaceId) -> usize {
        self.lists.iter().filter(|l| l.contains(id)).count()
    }

    /// Every surface, front to back across the whole stack.
    pub fn iter(&self) -> impl Iterator<Item = SurfaceId> + '_ {
        LayerKind::STACK
            .iter()
            .flat_map(move |kind| self.lists[kind.index()].iter())
    }
}
