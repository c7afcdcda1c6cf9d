//! Damage accumulation and the per-output repaint state machine.
//!
//! ```text
//!   Idle ──schedule──▶ Pending ──idle dispatch──▶ Painting
//!    ▲                                              │
//!    └──── finish_frame, nothing new ◀──────────────┤
//!                                                   │
//!          finish_frame, repaint_needed ────────────┘ (paint again)
//! ```
//!
//! Each paint walks the stack front to back. A surface's pending damage is
//! moved to global space, anything already hidden by opaque surfaces in
//! front is dropped, and the rest joins the frame's new damage. The output
//! then repaints the union of that and the previous frame's damage, since
//! the back buffer still holds the frame before last.

use serde::Serialize;
use tracing::trace;

use crate::event::CoreAction;
use crate::idle::CompositorState;
use crate::output::{OutputId, PaintFrame, PaintItem};
use crate::region::Region;
use crate::surface::{CallbackId, SurfaceId};
use crate::{Compositor, CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RepaintPhase {
    #[default]
    Idle,
    /// An idle dispatch has been requested from the backend.
    Pending,
    /// Frame submitted, waiting for `finish_frame`.
    Painting,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RepaintState {
    pub phase: RepaintPhase,
    pub needed: bool,
}

impl Compositor {
    pub fn repaint_phase(&self, id: OutputId) -> CoreResult<RepaintPhase> {
        self.output(id).map(|o| o.repaint.phase)
    }

    pub fn repaint_needed(&self, id: OutputId) -> CoreResult<bool> {
        self.output(id).map(|o| o.repaint.needed)
    }

    /// Compositor-wide damage not yet painted by any output.
    pub const fn pending_damage(&self) -> &Region {
        &self.damage
    }

    // ── Scheduling ───────────────────────────────────────────────────

    pub fn schedule_repaint(&mut self, id: OutputId) {
        if self.state == CompositorState::Sleeping {
            return;
        }
        let Some(output) = self.outputs.get_mut(&id) else {
            return;
        };
        output.repaint.needed = true;
        if output.repaint.phase != RepaintPhase::Idle {
            return;
        }
        output.repaint.phase = RepaintPhase::Pending;
        trace!("Repaint scheduled on {}", id);
        self.actions.push(CoreAction::ScheduleIdleRepaint { output: id });
        if self.input_dispatch_armed {
            self.input_dispatch_armed = false;
            self.actions.push(CoreAction::DisarmInputDispatch);
        }
    }

    pub fn schedule_repaint_all(&mut self) {
        for id in self.output_ids() {
            self.schedule_repaint(id);
        }
    }

    /// Damage the whole output and schedule it.
    pub fn damage_output(&mut self, id: OutputId) {
        let Some(output) = self.outputs.get(&id) else {
            return;
        };
        self.damage.union_with(&output.region);
        self.schedule_repaint(id);
    }

    pub fn damage_all(&mut self) {
        for id in self.output_ids() {
            self.damage_output(id);
        }
    }

    /// Runs from the backend's idle source after `ScheduleIdleRepaint`.
    pub fn idle_repaint(&mut self, id: OutputId, msecs: u32) {
        let pending = self
            .outputs
            .get(&id)
            .is_some_and(|o| o.repaint.phase == RepaintPhase::Pending);
        if pending {
            self.finish_frame(id, msecs);
        }
    }

    /// The previous frame is on screen. Paint again right away if damage
    /// arrived meanwhile, otherwise go idle and let input flow.
    pub fn finish_frame(&mut self, id: OutputId, msecs: u32) {
        let Some(output) = self.outputs.get_mut(&id) else {
            return;
        };
        output.frame_time = msecs;
        if output.repaint.needed {
            self.repaint(id, msecs);
            return;
        }
        output.repaint.phase = RepaintPhase::Idle;
        if !self.input_dispatch_armed {
            self.input_dispatch_armed = true;
            self.actions.push(CoreAction::ArmInputDispatch);
        }
    }

    // ── Surface list ─────────────────────────────────────────────────

    /// Rebuild the back-to-front list from the layer stack, bringing every
    /// surface's transform up to date on the way.
    fn rebuild_surface_list(&mut self) {
        let ids: Vec<SurfaceId> = self.layers.iter().collect();
        for &id in &ids {
            self.update_transform(id);
        }
        self.surface_list = ids;
        self.surface_list.reverse();
        self.surface_list_dirty = false;
    }

    pub(crate) fn ensure_surface_list(&mut self) {
        if self.surface_list_dirty {
            self.rebuild_surface_list();
        }
    }

    /// Visible surfaces, front to back.
    pub fn stacking_order(&mut self) -> Vec<SurfaceId> {
        self.ensure_surface_list();
        self.surface_list.iter().rev().copied().collect()
    }

    /// Add the part of the surface's footprint that nothing in front hid
    /// last frame to the compositor damage.
    pub(crate) fn damage_below(&mut self, id: SurfaceId) {
        if let Some(surface) = self.surfaces.get(&id) {
            let below = surface.transform.bbox.subtract(&surface.clip);
            self.damage.union_with(&below);
        }
    }

    // ── Paint ────────────────────────────────────────────────────────

    fn accumulate_damage(&mut self, id: SurfaceId, new_damage: &mut Region, opaque: &mut Region) {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            return;
        };
        if surface.damage.is_not_empty() {
            let mut global = if surface.transform.enabled {
                let e = surface.damage.extents();
                surface.compute_bbox(
                    e.x1 as f32,
                    e.y1 as f32,
                    e.width() as f32,
                    e.height() as f32,
                )
            } else {
                let (x, y) = surface.int_position();
                surface.damage.translated(x, y)
            };
            global.subtract_with(opaque);
            new_damage.union_with(&global);
            surface.damage.clear();
        }
        surface.clip.clone_from(opaque);
        opaque.union_with(&surface.transform.opaque);
    }

    fn repaint(&mut self, id: OutputId, msecs: u32) {
        match self.outputs.get_mut(&id) {
            Some(output) => output.repaint.phase = RepaintPhase::Painting,
            None => return,
        }

        self.update_drag_icons();
        self.rebuild_surface_list();
        let list = self.surface_list.clone();

        let mut callbacks: Vec<(SurfaceId, CallbackId)> = Vec::new();
        for sid in &list {
            if let Some(surface) = self.surfaces.get_mut(sid) {
                if surface.output == Some(id) {
                    callbacks.extend(surface.frame_callbacks.drain(..).map(|cb| (*sid, cb)));
                }
            }
        }

        let mut new_damage = Region::new();
        let mut opaque = Region::new();
        for &sid in list.iter().rev() {
            self.accumulate_damage(sid, &mut new_damage, &mut opaque);
        }
        self.damage.union_with(&new_damage);

        let Some(output) = self.outputs.get_mut(&id) else {
            return;
        };
        let mut output_damage = self.damage.union(&output.previous_damage);
        output_damage.intersect_with(&output.region);
        output.previous_damage.clone_from(&self.damage);
        self.damage.subtract_with(&output.region);

        let zoom_moving = output.dirty && output.update_matrix();

        let items: Vec<PaintItem> = list
            .iter()
            .filter_map(|sid| {
                let s = self.surfaces.get(sid)?;
                let mut region = output_damage.intersect(&s.transform.bbox);
                region.subtract_with(&s.clip);
                region.is_not_empty().then(|| PaintItem {
                    surface: *sid,
                    region,
                    transform: s.transform.enabled.then_some(s.transform.matrix),
                    position: s.int_position(),
                    buffer: s.buffer,
                    color: s.color,
                    alpha: s.alpha,
                })
            })
            .collect();

        let frame = PaintFrame {
            output: id,
            msecs,
            damage: output_damage,
            matrix: output.matrix,
            items,
        };
        trace!(
            "Painting {} with {} items, damage {}",
            id,
            frame.items.len(),
            frame.damage
        );
        output.backend.repaint(&frame);
        output.repaint.needed = false;

        if zoom_moving {
            self.schedule_repaint(id);
        }

        self.repick_all();

        for (surface, callback) in callbacks {
            self.actions.push(CoreAction::FrameDone {
                callback,
                surface,
                time: msecs,
            });
        }

        self.run_animations(id, msecs);
    }
}

impl Compositor {
    /// Paint immediately, bypassing the idle dispatch. Used by tests and
    /// benchmarks that drive frames by hand.
    pub fn repaint_now(&mut self, id: OutputId, msecs: u32) -> CoreResult<()> {
        if !self.outputs.contains_key(&id) {
            return Err(CoreError::UnknownOutput(id));
        }
        self.repaint(id, msecs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layer::LayerKind;
    use crate::region::Rect;
    use crate::surface::ClientId;
    use crate::test_util::{headless_output, RecordingBackend};
    use pretty_assertions::assert_eq;

    fn setup() -> (Compositor, OutputId, RecordingBackend) {
        let mut comp = Compositor::new(Config::empty());
        let backend = RecordingBackend::default();
        let out = comp
            .output_init(headless_output("A", 0, 0, 400, 300), Box::new(backend.clone()))
            .unwrap();
        (comp, out, backend)
    }

    fn opaque_surface(comp: &mut Compositor, rect: Rect) -> SurfaceId {
        let id = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_configure(id, rect.x1 as f32, rect.y1 as f32, rect.width(), rect.height())
            .unwrap();
        let full = Region::from_rect(Rect::new(0, 0, rect.width(), rect.height()));
        comp.surface_set_opaque_region(id, Some(&full)).unwrap();
        comp.surface_map(id, LayerKind::Normal).unwrap();
        id
    }

    /// Paint frames until both the compositor damage and the carried
    /// damage are empty.
    fn settle(comp: &mut Compositor, out: OutputId, t: &mut u32) {
        for _ in 0..3 {
            *t += 16;
            comp.repaint_now(out, *t).unwrap();
        }
    }

    #[test]
    fn schedule_moves_idle_to_pending_once() {
        let (mut comp, out, _) = setup();
        comp.take_actions();
        comp.finish_frame(out, 0);
        comp.finish_frame(out, 16);
        assert_eq!(comp.repaint_phase(out).unwrap(), RepaintPhase::Idle);
        comp.take_actions();

        comp.schedule_repaint(out);
        comp.schedule_repaint(out);
        assert_eq!(comp.repaint_phase(out).unwrap(), RepaintPhase::Pending);
        assert_eq!(
            comp.take_actions(),
            vec![
                CoreAction::ScheduleIdleRepaint { output: out },
                CoreAction::DisarmInputDispatch,
            ]
        );
    }

    #[test]
    fn damage_during_paint_repaints_on_finish() {
        let (mut comp, out, backend) = setup();
        comp.idle_repaint(out, 0);
        assert_eq!(comp.repaint_phase(out).unwrap(), RepaintPhase::Painting);
        assert_eq!(backend.frames().len(), 1);

        comp.schedule_repaint(out);
        comp.finish_frame(out, 16);
        assert_eq!(backend.frames().len(), 2);
        assert_eq!(comp.repaint_phase(out).unwrap(), RepaintPhase::Painting);

        comp.take_actions();
        comp.finish_frame(out, 32);
        assert_eq!(backend.frames().len(), 2);
        assert_eq!(comp.repaint_phase(out).unwrap(), RepaintPhase::Idle);
        assert_eq!(comp.take_actions(), vec![CoreAction::ArmInputDispatch]);
    }

    #[test]
    fn occluded_damage_produces_empty_frame() {
        let (mut comp, out, backend) = setup();
        let b = opaque_surface(&mut comp, Rect::new(50, 50, 100, 100));
        let _a = opaque_surface(&mut comp, Rect::new(0, 0, 200, 200));
        let mut t = 0;
        settle(&mut comp, out, &mut t);

        comp.surface_damage(b, Rect::new(10, 10, 20, 20)).unwrap();
        comp.repaint_now(out, t + 16).unwrap();
        let frame = backend.last_frame().unwrap();
        assert!(frame.damage.is_empty());
        assert!(frame.items.is_empty());
    }

    #[test]
    fn partially_covered_surface_yields_l_shape() {
        let (mut comp, out, backend) = setup();
        let b = opaque_surface(&mut comp, Rect::new(50, 50, 100, 100));
        let _a = opaque_surface(&mut comp, Rect::new(0, 0, 100, 100));
        let mut t = 0;
        settle(&mut comp, out, &mut t);

        comp.surface_damage_all(b).unwrap();
        comp.repaint_now(out, t + 16).unwrap();
        let expected = Region::from_rects([Rect::new(100, 50, 50, 100), Rect::new(50, 100, 50, 50)]);
        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.damage, expected);
        assert_eq!(frame.items.len(), 1);
        assert_eq!(frame.items[0].surface, b);
        assert_eq!(frame.items[0].region, expected);
    }

    #[test]
    fn damage_is_carried_one_extra_frame() {
        let (mut comp, out, backend) = setup();
        let s = opaque_surface(&mut comp, Rect::new(0, 0, 50, 50));
        let mut t = 0;
        settle(&mut comp, out, &mut t);

        let rect = Rect::new(5, 5, 10, 10);
        comp.surface_damage(s, rect).unwrap();
        comp.repaint_now(out, 100).unwrap();
        assert_eq!(backend.last_frame().unwrap().damage, Region::from_rect(rect));

        comp.repaint_now(out, 116).unwrap();
        assert_eq!(backend.last_frame().unwrap().damage, Region::from_rect(rect));

        comp.repaint_now(out, 132).unwrap();
        assert!(backend.last_frame().unwrap().damage.is_empty());
    }

    #[test]
    fn frame_callbacks_fire_once_after_paint() {
        let (mut comp, out, _) = setup();
        let s = opaque_surface(&mut comp, Rect::new(0, 0, 10, 10));
        let cb = comp.surface_frame(s).unwrap();
        comp.take_actions();
        comp.repaint_now(out, 40).unwrap();
        let done: Vec<_> = comp
            .take_actions()
            .into_iter()
            .filter(|a| matches!(a, CoreAction::FrameDone { .. }))
            .collect();
        assert_eq!(
            done,
            vec![CoreAction::FrameDone {
                callback: cb,
                surface: s,
                time: 40
            }]
        );
        comp.repaint_now(out, 56).unwrap();
        assert!(!comp
            .take_actions()
            .iter()
            .any(|a| matches!(a, CoreAction::FrameDone { .. })));
    }

    #[test]
    fn moving_a_surface_repaints_the_vacated_area() {
        let (mut comp, out, backend) = setup();
        let s = opaque_surface(&mut comp, Rect::new(0, 0, 20, 20));
        let mut t = 0;
        settle(&mut comp, out, &mut t);

        comp.surface_set_position(s, 100.0, 0.0).unwrap();
        comp.repaint_now(out, t + 16).unwrap();
        let damage = &backend.last_frame().unwrap().damage;
        assert!(damage.contains_point(5, 5));
        assert!(damage.contains_point(105, 5));
    }
}
