//! Surface registry.
//!
//! Surfaces are stored by [`SurfaceId`] in the compositor. Ids are never
//! reused, so a stale id held by a grab, a focus slot or an animation simply
//! fails to resolve once the surface is gone.

use std::fmt;

use tracing::{debug, warn};

use crate::buffer::BufferId;
use crate::error::{CoreError, CoreResult};
use crate::event::CoreAction;
use crate::input::SeatId;
use crate::layer::LayerKind;
use crate::matrix::Matrix;
use crate::output::OutputId;
use crate::region::{Rect, Region};
use crate::transform::{TransformChain, TransformId, TransformState};
use crate::Compositor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surf:{}", self.0)
    }
}

/// Owner of a client surface. Compositor-internal surfaces have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    pub x: f32,
    pub y: f32,
    pub width: i32,
    pub height: i32,
    /// Cached transform data is stale.
    pub dirty: bool,
}

impl Default for SurfaceGeometry {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0,
            height: 0,
            dirty: true,
        }
    }
}

/// What happens when a buffer is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceRole {
    #[default]
    None,
    /// Sized to its buffer and mapped into `layer` on first attach.
    Toplevel { layer: LayerKind },
    /// Pointer sprite of `seat`, positioned at pointer minus hotspot.
    Cursor { seat: SeatId, hotspot: (i32, i32) },
    /// Drag and drop icon of `seat`, carried along with the pointer.
    DragIcon { seat: SeatId },
}

/// Where to move a surface in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stacking {
    /// Front of its current layer.
    Top,
    /// Directly in front of the sibling, in the sibling's layer.
    Above(SurfaceId),
    /// Directly behind the sibling, in the sibling's layer.
    Below(SurfaceId),
}

#[derive(Debug, Clone)]
pub struct Surface {
    pub id: SurfaceId,
    pub client: Option<ClientId>,
    pub geometry: SurfaceGeometry,
    pub role: SurfaceRole,
    pub(crate) chain: TransformChain,
    pub(crate) transform: TransformState,
    /// Pending damage in surface-local coordinates.
    pub(crate) damage: Region,
    pub(crate) opaque: Region,
    /// `None` until the next transform update defines it.
    pub(crate) input: Option<Region>,
    /// Global region hidden by opaque surfaces in front, from the last frame.
    pub(crate) clip: Region,
    pub(crate) buffer: Option<BufferId>,
    pub(crate) color: Option<[f32; 4]>,
    pub(crate) alpha: f32,
    pub(crate) output: Option<OutputId>,
    pub(crate) output_mask: u32,
    pub(crate) frame_callbacks: Vec<CallbackId>,
    pub(crate) layer: Option<LayerKind>,
    /// Accumulated interactive rotation and its chain link.
    pub(crate) rotation: Matrix,
    pub(crate) rotation_transform: Option<TransformId>,
}

impl Surface {
    fn new(id: SurfaceId, client: Option<ClientId>) -> Self {
        Self {
            id,
            client,
            geometry: SurfaceGeometry::default(),
            role: SurfaceRole::None,
            chain: TransformChain::default(),
            transform: TransformState::default(),
            damage: Region::new(),
            opaque: Region::new(),
            input: None,
            clip: Region::new(),
            buffer: None,
            color: None,
            alpha: 1.0,
            output: None,
            output_mask: 0,
            frame_callbacks: Vec::new(),
            layer: None,
            rotation: Matrix::identity(),
            rotation_transform: None,
        }
    }

    pub const fn is_mapped(&self) -> bool {
        self.output.is_some()
    }

    pub const fn output(&self) -> Option<OutputId> {
        self.output
    }

    pub const fn output_mask(&self) -> u32 {
        self.output_mask
    }

    pub const fn layer(&self) -> Option<LayerKind> {
        self.layer
    }

    pub const fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    pub const fn color(&self) -> Option<[f32; 4]> {
        self.color
    }

    pub const fn transform_enabled(&self) -> bool {
        self.transform.enabled
    }

    pub const fn transform_matrix(&self) -> &Matrix {
        &self.transform.matrix
    }

    pub const fn bounding_box(&self) -> &Region {
        &self.transform.bbox
    }

    pub const fn opaque_region(&self) -> &Region {
        &self.opaque
    }

    pub const fn input_region(&self) -> Option<&Region> {
        self.input.as_ref()
    }

    pub const fn pending_damage(&self) -> &Region {
        &self.damage
    }

    pub const fn clip(&self) -> &Region {
        &self.clip
    }

    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    /// Input hit test in surface-local coordinates.
    pub fn accepts_input_at(&self, sx: i32, sy: i32) -> bool {
        match &self.input {
            Some(region) => region.contains_point(sx, sy),
            None => self.local_rect().contains_point(sx, sy),
        }
    }
}

impl Compositor {
    // ── Lookup ───────────────────────────────────────────────────────

    pub fn surface(&self, id: SurfaceId) -> CoreResult<&Surface> {
        self.surfaces.get(&id).ok_or(CoreError::UnknownSurface(id))
    }

    pub(crate) fn surface_mut(&mut self, id: SurfaceId) -> CoreResult<&mut Surface> {
        self.surfaces
            .get_mut(&id)
            .ok_or(CoreError::UnknownSurface(id))
    }

    pub fn surface_exists(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Create a client surface. It starts unmapped with zero geometry.
    pub fn surface_create(&mut self, client: ClientId) -> CoreResult<SurfaceId> {
        self.insert_surface(Some(client))
    }

    /// Create a compositor-owned surface. Internal surfaces never receive
    /// output enter/leave notifications.
    pub fn surface_create_internal(&mut self) -> CoreResult<SurfaceId> {
        self.insert_surface(None)
    }

    fn insert_surface(&mut self, client: Option<ClientId>) -> CoreResult<SurfaceId> {
        self.surfaces
            .try_reserve(1)
            .map_err(|_| CoreError::OutOfMemory)?;
        let id = SurfaceId(self.ids.next_surface());
        self.surfaces.insert(id, Surface::new(id, client));
        debug!("Surface {} created", id);
        Ok(id)
    }

    /// Destroy a surface. It is unmapped first so outputs and focus slots
    /// let go of it, then grabs and animations drop their references.
    pub fn surface_destroy(&mut self, id: SurfaceId) -> CoreResult<()> {
        let surface = self.surface(id)?;
        if surface.is_mapped() || surface.layer.is_some() {
            self.surface_unmap(id)?;
        }

        self.forget_surface_in_seats(id);
        self.cancel_surface_animations(id);

        if let Some(surface) = self.surfaces.remove(&id) {
            if let Some(buffer) = surface.buffer {
                self.buffer_release(buffer);
            }
        }
        if self.fade.surface == Some(id) {
            self.fade.surface = None;
        }
        self.surface_list_dirty = true;
        debug!("Surface {} destroyed", id);
        Ok(())
    }

    pub fn surface_set_role(&mut self, id: SurfaceId, role: SurfaceRole) -> CoreResult<()> {
        self.surface_mut(id)?.role = role;
        Ok(())
    }

    // ── Buffers ──────────────────────────────────────────────────────

    /// Attach a buffer, or detach with `None`.
    ///
    /// An unknown or unmappable buffer is refused and leaves the surface
    /// untouched.
    pub fn surface_attach(&mut self, id: SurfaceId, buffer: Option<BufferId>) -> CoreResult<()> {
        let size = match buffer {
            Some(bid) => {
                let b = self.buffers.get(&bid).ok_or(CoreError::UnknownBuffer(bid))?;
                if !b.mappable {
                    return Err(CoreError::BufferNotMappable(bid));
                }
                Some((b.width, b.height))
            }
            None => None,
        };
        let previous = self.surface(id)?.buffer;

        if previous != buffer {
            if let Some(old) = previous {
                self.buffer_release(old);
            }
            if let Some(new) = buffer {
                if let Some(b) = self.buffers.get_mut(&new) {
                    b.busy_count += 1;
                }
            }
        }
        self.surface_mut(id)?.buffer = buffer;

        let Some((width, height)) = size else {
            if self.surface(id)?.is_mapped() {
                self.surface_unmap(id)?;
            }
            self.actions
                .push(CoreAction::ReleaseSurfaceResources { surface: id });
            return Ok(());
        };

        let surface = self.surface_mut(id)?;
        if surface.geometry.width != width || surface.geometry.height != height {
            surface.input = None;
            surface.opaque.clear();
        }

        let role = surface.role;
        match role {
            SurfaceRole::None => {}
            SurfaceRole::Toplevel { layer } => self.toplevel_configure(id, layer, width, height)?,
            SurfaceRole::Cursor { seat, hotspot } => {
                self.cursor_configure(id, seat, hotspot, width, height)?;
            }
            SurfaceRole::DragIcon { seat } => self.drag_icon_configure(id, seat, width, height)?,
        }
        Ok(())
    }

    fn toplevel_configure(
        &mut self,
        id: SurfaceId,
        layer: LayerKind,
        width: i32,
        height: i32,
    ) -> CoreResult<()> {
        let surface = self.surface(id)?;
        let geometry = surface.geometry;
        if !surface.is_mapped() {
            self.surface_configure(id, geometry.x, geometry.y, width, height)?;
            self.surface_map(id, layer)?;
        } else if geometry.width != width || geometry.height != height {
            self.surface_configure(id, geometry.x, geometry.y, width, height)?;
        }
        Ok(())
    }

    // ── Geometry ─────────────────────────────────────────────────────

    pub fn surface_configure(
        &mut self,
        id: SurfaceId,
        x: f32,
        y: f32,
        width: i32,
        height: i32,
    ) -> CoreResult<()> {
        let surface = self.surface_mut(id)?;
        surface.geometry.x = x;
        surface.geometry.y = y;
        surface.geometry.width = width;
        surface.geometry.height = height;
        surface.geometry.dirty = true;
        Ok(())
    }

    pub fn surface_set_position(&mut self, id: SurfaceId, x: f32, y: f32) -> CoreResult<()> {
        let surface = self.surface_mut(id)?;
        surface.geometry.x = x;
        surface.geometry.y = y;
        surface.geometry.dirty = true;
        Ok(())
    }

    /// Opaque region, clipped to the surface. `None` resets to empty.
    pub fn surface_set_opaque_region(&mut self, id: SurfaceId, region: Option<&Region>) -> CoreResult<()> {
        let surface = self.surface_mut(id)?;
        surface.opaque = match region {
            Some(r) => {
                let mut r = r.clone();
                r.intersect_rect(surface.local_rect());
                r
            }
            None => Region::new(),
        };
        surface.geometry.dirty = true;
        Ok(())
    }

    /// Input region, clipped to the surface. `None` resets to the full
    /// surface rectangle.
    pub fn surface_set_input_region(&mut self, id: SurfaceId, region: Option<&Region>) -> CoreResult<()> {
        let surface = self.surface_mut(id)?;
        let full = surface.local_rect();
        surface.input = Some(match region {
            Some(r) => {
                let mut r = r.clone();
                r.intersect_rect(full);
                r
            }
            None => Region::from_rect(full),
        });
        Ok(())
    }

    pub fn surface_set_alpha(&mut self, id: SurfaceId, alpha: f32) -> CoreResult<()> {
        let surface = self.surface_mut(id)?;
        surface.alpha = alpha.clamp(0.0, 1.0);
        surface.geometry.dirty = true;
        self.surface_damage_all(id)
    }

    /// Turn the surface into a solid color fill.
    pub fn surface_set_color(&mut self, id: SurfaceId, rgba: [f32; 4]) -> CoreResult<()> {
        self.surface_mut(id)?.color = Some(rgba);
        self.surface_damage_all(id)
    }

    // ── Damage and frames ────────────────────────────────────────────

    /// Add `rect` (surface-local) to the pending damage.
    pub fn surface_damage(&mut self, id: SurfaceId, rect: Rect) -> CoreResult<()> {
        self.surface_mut(id)?.damage.union_rect(rect);
        self.schedule_repaint_all();
        Ok(())
    }

    pub fn surface_damage_all(&mut self, id: SurfaceId) -> CoreResult<()> {
        let surface = self.surface_mut(id)?;
        let full = surface.local_rect();
        surface.damage.union_rect(full);
        self.schedule_repaint_all();
        Ok(())
    }

    /// Request a one-shot callback after the next paint of the surface's
    /// output.
    pub fn surface_frame(&mut self, id: SurfaceId) -> CoreResult<CallbackId> {
        let callback = CallbackId(self.ids.next_callback());
        let surface = self.surface_mut(id)?;
        surface
            .frame_callbacks
            .try_reserve(1)
            .map_err(|_| CoreError::OutOfMemory)?;
        surface.frame_callbacks.push(callback);
        Ok(callback)
    }

    // ── Stacking ─────────────────────────────────────────────────────

    /// Put the surface at the top of `layer` and assign it an output.
    pub fn surface_map(&mut self, id: SurfaceId, layer: LayerKind) -> CoreResult<()> {
        self.surface(id)?;
        if self.outputs.is_empty() {
            warn!("Cannot map {} without outputs", id);
            return Ok(());
        }
        self.layers.remove(id);
        self.layers.list_mut(layer).push_front(id);
        self.surface_mut(id)?.layer = Some(layer);
        self.surface_list_dirty = true;

        self.update_transform(id);
        self.surface_assign_output(id);
        self.surface_damage_all(id)?;
        debug!("Surface {} mapped into {:?}", id, layer);
        Ok(())
    }

    /// Move a mapped surface within the stack.
    pub fn surface_restack(&mut self, id: SurfaceId, stacking: Stacking) -> CoreResult<()> {
        let layer = self.surface(id)?.layer;
        let Some(layer) = layer else {
            return Err(CoreError::SurfaceNotMapped(id));
        };
        let sibling_layer = |comp: &Self, sib: SurfaceId| -> CoreResult<LayerKind> {
            comp.surface(sib)?
                .layer
                .ok_or(CoreError::SurfaceNotMapped(sib))
        };

        self.damage_below(id);
        let new_layer = match stacking {
            Stacking::Top => {
                self.layers.list_mut(layer).push_front(id);
                layer
            }
            Stacking::Above(sib) => {
                let target = sibling_layer(self, sib)?;
                self.layers.remove(id);
                self.layers.list_mut(target).insert_before(sib, id);
                target
            }
            Stacking::Below(sib) => {
                let target = sibling_layer(self, sib)?;
                self.layers.remove(id);
                self.layers.list_mut(target).insert_after(sib, id);
                target
            }
        };
        self.surface_mut(id)?.layer = Some(new_layer);
        self.surface_list_dirty = true;
        self.surface_damage_all(id)
    }

    /// Hide the surface: damage what it covered, drop its output and its
    /// layer slot, and clear any focus pointing at it.
    pub fn surface_unmap(&mut self, id: SurfaceId) -> CoreResult<()> {
        self.surface(id)?;
        self.damage_below(id);
        self.layers.remove(id);
        let surface = self.surface_mut(id)?;
        surface.output = None;
        surface.layer = None;
        self.surface_list_dirty = true;
        self.update_output_mask(id, 0);
        self.drop_focus_to(id);
        self.schedule_repaint_all();
        debug!("Surface {} unmapped", id);
        Ok(())
    }

    /// Pick the primary output by largest overlap and refresh the
    /// per-output visibility mask.
    pub fn surface_assign_output(&mut self, id: SurfaceId) {
        let Some(surface) = self.surfaces.get(&id) else {
            return;
        };
        let bbox = &surface.transform.bbox;
        let mut max = 0i64;
        let mut primary = None;
        let mut mask = 0u32;
        for (oid, output) in &self.outputs {
            let overlap = bbox.intersect(&output.region).extents();
            let area = overlap.area();
            if area > 0 {
                mask |= 1 << oid.0;
            }
            if area >= max {
                primary = Some(*oid);
                max = area;
            }
        }
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.output = primary;
        }
        self.update_output_mask(id, mask);
    }

    fn update_output_mask(&mut self, id: SurfaceId, mask: u32) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return;
        };
        let old = surface.output_mask;
        surface.output_mask = mask;
        if surface.client.is_none() {
            return;
        }
        let different = old ^ mask;
        if different == 0 {
            return;
        }
        let entered = mask & different;
        let left = old & different;
        for oid in self.outputs.keys() {
            let bit = 1u32 << oid.0;
            if entered & bit != 0 {
                self.actions.push(CoreAction::SurfaceEnter {
                    surface: id,
                    output: *oid,
                });
            }
            if left & bit != 0 {
                self.actions.push(CoreAction::SurfaceLeave {
                    surface: id,
                    output: *oid,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_util::{headless_output, NullBackend};
    use pretty_assertions::assert_eq;

    fn setup() -> Compositor {
        let mut comp = Compositor::new(Config::empty());
        comp.output_init(headless_output("O1", 0, 0, 1024, 768), Box::new(NullBackend))
            .unwrap();
        comp.take_actions();
        comp
    }

    #[test]
    fn create_starts_unmapped_with_undefined_input() {
        let mut comp = setup();
        let id = comp.surface_create(ClientId(1)).unwrap();
        let s = comp.surface(id).unwrap();
        assert!(!s.is_mapped());
        assert!(s.geometry.dirty);
        assert!(s.input_region().is_none());
        assert_eq!(s.chain().links().len(), 1);
        assert_eq!(s.alpha(), 1.0);
    }

    #[test]
    fn ids_are_not_reused() {
        let mut comp = setup();
        let a = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_destroy(a).unwrap();
        let b = comp.surface_create(ClientId(1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(comp.surface(a).unwrap_err(), CoreError::UnknownSurface(a));
    }

    #[test]
    fn toplevel_maps_on_first_attach() {
        let mut comp = setup();
        let id = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_set_role(id, SurfaceRole::Toplevel { layer: LayerKind::Normal })
            .unwrap();
        comp.surface_set_position(id, 10.0, 10.0).unwrap();
        let buf = comp.buffer_create(200, 100).unwrap();
        comp.surface_attach(id, Some(buf)).unwrap();

        let s = comp.surface(id).unwrap();
        assert!(s.is_mapped());
        assert_eq!(s.layer(), Some(LayerKind::Normal));
        assert_eq!(s.bounding_box(), &Region::from_rect(Rect::new(10, 10, 200, 100)));
        let enters: Vec<_> = comp
            .take_actions()
            .into_iter()
            .filter(|a| matches!(a, CoreAction::SurfaceEnter { .. }))
            .collect();
        assert_eq!(enters.len(), 1);
    }

    #[test]
    fn busy_count_released_once_per_replacement() {
        let mut comp = setup();
        let id = comp.surface_create(ClientId(1)).unwrap();
        let a = comp.buffer_create(10, 10).unwrap();
        let b = comp.buffer_create(10, 10).unwrap();

        comp.surface_attach(id, Some(a)).unwrap();
        comp.surface_attach(id, Some(a)).unwrap();
        assert_eq!(comp.buffer(a).unwrap().busy_count(), 1);

        comp.take_actions();
        comp.surface_attach(id, Some(b)).unwrap();
        assert_eq!(comp.buffer(a).unwrap().busy_count(), 0);
        assert_eq!(comp.buffer(b).unwrap().busy_count(), 1);
        assert_eq!(
            comp.take_actions(),
            vec![CoreAction::BufferReleased { buffer: a }]
        );

        comp.surface_attach(id, None).unwrap();
        assert_eq!(
            comp.take_actions(),
            vec![
                CoreAction::BufferReleased { buffer: b },
                CoreAction::ReleaseSurfaceResources { surface: id },
            ]
        );
    }

    #[test]
    fn unmappable_buffer_leaves_state_unchanged() {
        let mut comp = setup();
        let id = comp.surface_create(ClientId(1)).unwrap();
        let good = comp.buffer_create(10, 10).unwrap();
        let bad = comp.buffer_create_unmappable(20, 20).unwrap();
        comp.surface_attach(id, Some(good)).unwrap();
        assert_eq!(
            comp.surface_attach(id, Some(bad)),
            Err(CoreError::BufferNotMappable(bad))
        );
        assert_eq!(comp.surface(id).unwrap().buffer(), Some(good));
        assert_eq!(comp.buffer(good).unwrap().busy_count(), 1);
    }

    #[test]
    fn size_change_resets_input_and_opaque() {
        let mut comp = setup();
        let id = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_configure(id, 0.0, 0.0, 10, 10).unwrap();
        comp.surface_set_opaque_region(id, Some(&Region::from_rect(Rect::new(0, 0, 5, 5))))
            .unwrap();
        comp.surface_set_input_region(id, None).unwrap();
        let buf = comp.buffer_create(20, 20).unwrap();
        comp.surface_attach(id, Some(buf)).unwrap();
        let s = comp.surface(id).unwrap();
        assert!(s.opaque_region().is_empty());
        assert!(s.input_region().is_none());
    }

    #[test]
    fn regions_are_clipped_to_the_surface() {
        let mut comp = setup();
        let id = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_configure(id, 0.0, 0.0, 100, 50).unwrap();
        let big = Region::from_rect(Rect::new(-20, -20, 500, 500));
        comp.surface_set_opaque_region(id, Some(&big)).unwrap();
        comp.surface_set_input_region(id, Some(&big)).unwrap();
        let s = comp.surface(id).unwrap();
        assert_eq!(s.opaque_region(), &Region::from_rect(Rect::new(0, 0, 100, 50)));
        assert_eq!(
            s.input_region(),
            Some(&Region::from_rect(Rect::new(0, 0, 100, 50)))
        );
        comp.surface_set_opaque_region(id, None).unwrap();
        assert!(comp.surface(id).unwrap().opaque_region().is_empty());
    }

    #[test]
    fn unmap_clears_output_and_layer() {
        let mut comp = setup();
        let id = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_configure(id, 0.0, 0.0, 10, 10).unwrap();
        comp.surface_map(id, LayerKind::Normal).unwrap();
        comp.take_actions();
        comp.surface_unmap(id).unwrap();
        let s = comp.surface(id).unwrap();
        assert!(!s.is_mapped());
        assert_eq!(s.layer(), None);
        assert_eq!(comp.layers.membership(id), 0);
        assert!(comp
            .take_actions()
            .contains(&CoreAction::SurfaceLeave { surface: id, output: OutputId(0) }));
    }

    #[test]
    fn restack_moves_between_siblings() {
        let mut comp = setup();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let id = comp.surface_create(ClientId(1)).unwrap();
            comp.surface_configure(id, 0.0, 0.0, 10, 10).unwrap();
            comp.surface_map(id, LayerKind::Normal).unwrap();
            ids.push(id);
        }
        let order = |c: &Compositor| c.layers.list(LayerKind::Normal).iter().collect::<Vec<_>>();
        assert_eq!(order(&comp), vec![ids[2], ids[1], ids[0]]);

        comp.surface_restack(ids[0], Stacking::Top).unwrap();
        assert_eq!(order(&comp), vec![ids[0], ids[2], ids[1]]);

        comp.surface_restack(ids[0], Stacking::Below(ids[1])).unwrap();
        assert_eq!(order(&comp), vec![ids[2], ids[1], ids[0]]);

        comp.surface_restack(ids[0], Stacking::Above(ids[1])).unwrap();
        assert_eq!(order(&comp), vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn map_without_outputs_stays_unmapped() {
        let mut comp = Compositor::new(Config::empty());
        let id = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_map(id, LayerKind::Normal).unwrap();
        assert!(!comp.surface(id).unwrap().is_mapped());
        assert_eq!(comp.layers.membership(id), 0);
    }
}
