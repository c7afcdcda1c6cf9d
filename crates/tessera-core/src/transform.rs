//! Per-surface transform chains and local/global coordinate mapping.
//!
//! Every surface owns an ordered chain of matrices. The chain always holds
//! the implicit position link (the translation by the surface's x/y); extra
//! links are inserted by rotation, animations or scaling policy. While the
//! chain is exactly `[Position]` the surface takes the integer fast path and
//! its transform is "disabled".

use std::collections::HashMap;
use std::fmt;

use tracing::{error, warn};

use crate::error::{CoreError, CoreResult};
use crate::matrix::{Matrix, Vector};
use crate::region::{Rect, Region};
use crate::surface::{Surface, SurfaceId};
use crate::Compositor;

/// Homogeneous `w` below this is treated as a degenerate projection.
const W_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub u32);

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xf:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainLink {
    /// Translation by the surface position.
    Position,
    Custom(TransformId),
}

/// Where a new matrix joins the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPlacement {
    /// Head of the chain, applied in surface-local space before the
    /// position translation.
    BeforePosition,
    /// Tail of the chain, applied in global space after the position.
    AfterPosition,
}

#[derive(Debug, Clone)]
pub struct TransformChain {
    links: Vec<ChainLink>,
    matrices: HashMap<TransformId, Matrix>,
    next_id: u32,
}

impl Default for TransformChain {
    fn default() -> Self {
        Self {
            links: vec![ChainLink::Position],
            matrices: HashMap::new(),
            next_id: 1,
        }
    }
}

impl TransformChain {
    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn is_position_only(&self) -> bool {
        self.links.len() == 1
    }

    pub fn matrix(&self, id: TransformId) -> Option<&Matrix> {
        self.matrices.get(&id)
    }

    pub(crate) fn insert(&mut self, matrix: Matrix, placement: ChainPlacement) -> CoreResult<TransformId> {
        self.links.try_reserve(1).map_err(|_| CoreError::OutOfMemory)?;
        self.matrices
            .try_reserve(1)
            .map_err(|_| CoreError::OutOfMemory)?;
        let id = TransformId(self.next_id);
        self.next_id += 1;
        match placement {
            ChainPlacement::BeforePosition => self.links.insert(0, ChainLink::Custom(id)),
            ChainPlacement::AfterPosition => self.links.push(ChainLink::Custom(id)),
        }
        self.matrices.insert(id, matrix);
        Ok(id)
    }

    pub(crate) fn set(&mut self, id: TransformId, matrix: Matrix) -> bool {
        match self.matrices.get_mut(&id) {
            Some(m) => {
                *m = matrix;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, id: TransformId) -> bool {
        if self.matrices.remove(&id).is_none() {
            return false;
        }
        self.links.retain(|l| *l != ChainLink::Custom(id));
        true
    }

    /// Product of the chain in order, with the position link at `(x, y)`.
    pub fn compose(&self, x: f32, y: f32) -> Matrix {
        let mut out = Matrix::identity();
        for link in &self.links {
            match link {
                ChainLink::Position => out.translate(x, y, 0.0),
                ChainLink::Custom(id) => {
                    if let Some(m) = self.matrices.get(id) {
                        out.multiply(m);
                    }
                }
            }
        }
        out
    }
}

/// Cached result of the last transform update.
#[derive(Debug, Clone, Default)]
pub struct TransformState {
    pub enabled: bool,
    pub matrix: Matrix,
    pub inverse: Matrix,
    /// Global-space bounding box.
    pub bbox: Region,
    /// Global-space opaque region; only populated on the fast path.
    pub opaque: Region,
}

// ── Coordinate mapping ───────────────────────────────────────────────

impl Surface {
    /// Integer position used by the fast path.
    pub(crate) fn int_position(&self) -> (i32, i32) {
        (
            self.geometry.x.round() as i32,
            self.geometry.y.round() as i32,
        )
    }

    pub fn to_global(&self, sx: f32, sy: f32) -> (f32, f32) {
        if self.transform.enabled {
            let v = self.transform.matrix.transform(Vector::point(sx, sy));
            if v.f[3].abs() < W_EPSILON {
                warn!("numerical instability in to_global on {}", self.id);
                return (0.0, 0.0);
            }
            (v.f[0] / v.f[3], v.f[1] / v.f[3])
        } else {
            let (x, y) = self.int_position();
            (sx + x as f32, sy + y as f32)
        }
    }

    pub fn from_global(&self, x: f32, y: f32) -> (f32, f32) {
        if self.transform.enabled {
            let v = self.transform.inverse.transform(Vector::point(x, y));
            if v.f[3].abs() < W_EPSILON {
                warn!("numerical instability in from_global on {}", self.id);
                return (0.0, 0.0);
            }
            (v.f[0] / v.f[3], v.f[1] / v.f[3])
        } else {
            let (ix, iy) = self.int_position();
            (x - ix as f32, y - iy as f32)
        }
    }

    /// Integer variant of [`from_global`](Self::from_global); rounds down.
    pub fn from_global_i32(&self, x: i32, y: i32) -> (i32, i32) {
        if self.transform.enabled {
            let (sx, sy) = self.from_global(x as f32, y as f32);
            (sx.floor() as i32, sy.floor() as i32)
        } else {
            let (ix, iy) = self.int_position();
            (x - ix, y - iy)
        }
    }

    /// Global bounding box of the local rectangle `(x, y, w, h)`.
    pub(crate) fn compute_bbox(&self, x: f32, y: f32, w: f32, h: f32) -> Region {
        let corners = [(x, y), (x, y + h), (x + w, y), (x + w, y + h)];
        let mut min = (f32::MAX, f32::MAX);
        let mut max = (f32::MIN, f32::MIN);
        for (cx, cy) in corners {
            let (gx, gy) = self.to_global(cx, cy);
            min = (min.0.min(gx), min.1.min(gy));
            max = (max.0.max(gx), max.1.max(gy));
        }
        let x1 = min.0.floor() as i32;
        let y1 = min.1.floor() as i32;
        let x2 = max.0.ceil() as i32;
        let y2 = max.1.ceil() as i32;
        Region::from_rect(Rect::from_corners(x1, y1, x2, y2))
    }

    pub(crate) fn local_rect(&self) -> Rect {
        Rect::new(0, 0, self.geometry.width, self.geometry.height)
    }

    fn update_transform_disable(&mut self) {
        self.transform.enabled = false;
        let (x, y) = self.int_position();
        self.transform.bbox = Region::from_rect(Rect::new(
            x,
            y,
            self.geometry.width,
            self.geometry.height,
        ));
        if self.alpha >= 1.0 {
            self.transform.opaque = self.opaque.translated(x, y);
        }
    }

    /// General path. Returns false when the chain is singular.
    fn update_transform_enable(&mut self) -> bool {
        let matrix = self.chain.compose(self.geometry.x, self.geometry.y);
        let Some(inverse) = matrix.invert() else {
            error!("{} has a non-invertible transform", self.id);
            return false;
        };
        self.transform.matrix = matrix;
        self.transform.inverse = inverse;
        self.transform.enabled = true;
        self.transform.bbox = self.compute_bbox(
            0.0,
            0.0,
            self.geometry.width as f32,
            self.geometry.height as f32,
        );
        true
    }
}

// ── Compositor operations ────────────────────────────────────────────

impl Compositor {
    /// Flag the surface's cached transform as stale.
    pub fn mark_dirty(&mut self, id: SurfaceId) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.geometry.dirty = true;
        }
    }

    /// Recompute matrix, inverse and bounding box if the geometry is dirty.
    pub fn update_transform(&mut self, id: SurfaceId) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return;
        };
        if !surface.geometry.dirty {
            return;
        }
        surface.geometry.dirty = false;

        let below = surface.transform.bbox.subtract(&surface.clip);
        self.damage.union_with(&below);

        let Some(surface) = self.surfaces.get_mut(&id) else {
            return;
        };
        if surface.input.is_none() {
            surface.input = Some(Region::from_rect(surface.local_rect()));
        }
        surface.transform.opaque.clear();

        if surface.chain.is_position_only() || !surface.update_transform_enable() {
            surface.update_transform_disable();
        }

        let full = surface.local_rect();
        surface.damage.union_rect(full);
        let mapped = surface.is_mapped();

        if mapped {
            self.surface_assign_output(id);
        }
        self.schedule_repaint_all();
    }

    pub fn surface_to_global(&self, id: SurfaceId, sx: f32, sy: f32) -> CoreResult<(f32, f32)> {
        self.surface(id).map(|s| s.to_global(sx, sy))
    }

    pub fn surface_from_global(&self, id: SurfaceId, x: f32, y: f32) -> CoreResult<(f32, f32)> {
        self.surface(id).map(|s| s.from_global(x, y))
    }

    pub fn surface_from_global_i32(&self, id: SurfaceId, x: i32, y: i32) -> CoreResult<(i32, i32)> {
        self.surface(id).map(|s| s.from_global_i32(x, y))
    }

    pub fn transform_insert(
        &mut self,
        id: SurfaceId,
        matrix: Matrix,
        placement: ChainPlacement,
    ) -> CoreResult<TransformId> {
        let surface = self.surface_mut(id)?;
        let tid = surface.chain.insert(matrix, placement)?;
        surface.geometry.dirty = true;
        Ok(tid)
    }

    /// Replace the matrix of an existing chain link. Returns false when the
    /// link no longer exists.
    pub fn transform_set(&mut self, id: SurfaceId, tid: TransformId, matrix: Matrix) -> CoreResult<bool> {
        let surface = self.surface_mut(id)?;
        let found = surface.chain.set(tid, matrix);
        if found {
            surface.geometry.dirty = true;
        }
        Ok(found)
    }

    pub fn transform_remove(&mut self, id: SurfaceId, tid: TransformId) -> CoreResult<bool> {
        let surface = self.surface_mut(id)?;
        let found = surface.chain.remove(tid);
        if found {
            surface.geometry.dirty = true;
        }
        Ok(found)
    }
}
