//! Output manager.
//!
//! Outputs are laid out in global space by their `(x, y)` and current mode.
//! Each carries the damage of the previous frame for double-buffered
//! composition, its projection matrix, zoom state and the per-output
//! animation list.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::animation::Animation;
use crate::buffer::BufferId;
use crate::error::{CoreError, CoreResult};
use crate::matrix::Matrix;
use crate::region::{Rect, Region};
use crate::repaint::RepaintState;
use crate::surface::SurfaceId;
use crate::zoom::Zoom;
use crate::Compositor;

/// Small-integer output id taken from a 32-slot pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutputId(pub u32);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "out:{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OutputFlags: u32 {
        /// Scanout is upside down; the projection flips y.
        const FLIPPED = 0b0001;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeFlags: u32 {
        const CURRENT   = 0b0001;
        const PREFERRED = 0b0010;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub width: i32,
    pub height: i32,
    /// Millihertz.
    pub refresh: u32,
    pub flags: ModeFlags,
}

impl Mode {
    pub const fn new(width: i32, height: i32, refresh: u32) -> Self {
        Self {
            width,
            height,
            refresh,
            flags: ModeFlags::empty(),
        }
    }
}

/// Request for [`Compositor::switch_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeSelector {
    pub width: i32,
    pub height: i32,
    /// Any refresh rate when `None`.
    pub refresh: Option<u32>,
}

impl ModeSelector {
    fn matches(&self, mode: &Mode) -> bool {
        mode.width == self.width
            && mode.height == self.height
            && self.refresh.map_or(true, |r| r == mode.refresh)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Border {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpmsLevel {
    On,
    Standby,
    Suspend,
    Off,
}

/// Display head description reported by a backend.
#[derive(Debug, Clone)]
pub struct OutputInfo {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub mm_width: i32,
    pub mm_height: i32,
    pub flags: OutputFlags,
    pub modes: Vec<Mode>,
}

/// One surface's contribution to a frame, back to front.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintItem {
    pub surface: SurfaceId,
    /// Global region to redraw: frame damage within the bounding box,
    /// minus what opaque surfaces in front hide.
    pub region: Region,
    /// Full surface matrix when the transform is enabled.
    pub transform: Option<Matrix>,
    pub position: (i32, i32),
    pub buffer: Option<BufferId>,
    pub color: Option<[f32; 4]>,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintFrame {
    pub output: OutputId,
    pub msecs: u32,
    pub damage: Region,
    pub matrix: Matrix,
    pub items: Vec<PaintItem>,
}

/// Operations a backend provides per display head.
pub trait OutputBackend {
    /// Draw the frame. Completion is reported later via
    /// [`Compositor::finish_frame`].
    fn repaint(&mut self, frame: &PaintFrame);

    /// Switch to `mode`. Returns false when unsupported.
    fn switch_mode(&mut self, _mode: &Mode) -> bool {
        false
    }

    fn set_dpms(&mut self, _level: DpmsLevel) {}
}

pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub mm_width: i32,
    pub mm_height: i32,
    pub flags: OutputFlags,
    pub border: Border,
    pub(crate) modes: Vec<Mode>,
    pub(crate) current: usize,
    /// Global footprint.
    pub region: Region,
    pub(crate) previous_damage: Region,
    pub(crate) matrix: Matrix,
    pub(crate) dirty: bool,
    pub zoom: Zoom,
    pub(crate) repaint: RepaintState,
    pub(crate) frame_time: u32,
    pub(crate) animations: Vec<Animation>,
    pub(crate) backend: Box<dyn OutputBackend>,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("mode", &self.current_mode())
            .field("phase", &self.repaint.phase)
            .finish_non_exhaustive()
    }
}

impl Output {
    pub fn current_mode(&self) -> Mode {
        self.modes[self.current]
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub const fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub const fn previous_damage(&self) -> &Region {
        &self.previous_damage
    }

    pub const fn frame_time(&self) -> u32 {
        self.frame_time
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    fn refresh_region(&mut self) {
        let mode = self.current_mode();
        self.region = Region::from_rect(Rect::new(self.x, self.y, mode.width, mode.height));
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.region.contains_point(x, y)
    }

    /// Recompute the projection. Returns true while a zoom animation is
    /// still moving and another frame is needed.
    pub(crate) fn update_matrix(&mut self) -> bool {
        let animating = self.zoom.advance(self.frame_time);
        let mode = self.current_mode();
        let b = self.border;
        let flip = if self.flags.contains(OutputFlags::FLIPPED) {
            -1.0
        } else {
            1.0
        };

        let mut matrix = Matrix::identity();
        matrix.translate(
            -(self.x as f32 + (b.right + mode.width - b.left) as f32 / 2.0),
            -(self.y as f32 + (b.bottom + mode.height - b.top) as f32 / 2.0),
            0.0,
        );
        matrix.scale(
            2.0 / (mode.width + b.left + b.right) as f32,
            flip * 2.0 / (mode.height + b.top + b.bottom) as f32,
            1.0,
        );

        if self.zoom.active {
            let (fx, fy) = self.zoom.focus;
            let focus = matrix.transform(crate::matrix::Vector::point(fx as f32, fy as f32));
            self.zoom.set_translation(focus.f[0], focus.f[1]);
            let magnification = self.zoom.magnification();
            let mut camera = Matrix::from_translation(-self.zoom.trans_x, -self.zoom.trans_y, 0.0);
            camera.scale(magnification, magnification, 1.0);
            matrix.multiply(&camera);
        }

        self.matrix = matrix;
        self.dirty = animating;
        animating
    }
}

impl Compositor {
    pub fn output(&self, id: OutputId) -> CoreResult<&Output> {
        self.outputs.get(&id).ok_or(CoreError::UnknownOutput(id))
    }

    pub(crate) fn output_mut(&mut self, id: OutputId) -> CoreResult<&mut Output> {
        self.outputs
            .get_mut(&id)
            .ok_or(CoreError::UnknownOutput(id))
    }

    pub fn output_ids(&self) -> Vec<OutputId> {
        self.outputs.keys().copied().collect()
    }

    /// Output whose footprint contains the global point.
    pub fn output_at(&self, x: i32, y: i32) -> Option<OutputId> {
        self.outputs
            .values()
            .find(|o| o.contains_point(x, y))
            .map(|o| o.id)
    }

    /// Bring up a display head and damage all of it.
    pub fn output_init(
        &mut self,
        info: OutputInfo,
        backend: Box<dyn OutputBackend>,
    ) -> CoreResult<OutputId> {
        let slot = (0..32u32)
            .find(|i| self.output_id_pool & (1 << i) == 0)
            .ok_or(CoreError::OutputPoolExhausted)?;
        let id = OutputId(slot);

        let mut modes = info.modes;
        if modes.is_empty() {
            modes.push(Mode::new(1024, 768, 60_000));
        }
        let current = modes
            .iter()
            .position(|m| m.flags.contains(ModeFlags::PREFERRED))
            .or_else(|| modes.iter().position(|m| m.flags.contains(ModeFlags::CURRENT)))
            .unwrap_or(0);
        for (i, mode) in modes.iter_mut().enumerate() {
            mode.flags.set(ModeFlags::CURRENT, i == current);
        }

        let mut output = Output {
            id,
            name: info.name,
            x: info.x,
            y: info.y,
            mm_width: info.mm_width,
            mm_height: info.mm_height,
            flags: info.flags,
            border: Border::default(),
            modes,
            current,
            region: Region::new(),
            previous_damage: Region::new(),
            matrix: Matrix::identity(),
            dirty: true,
            zoom: Zoom::new(&self.config.zoom),
            repaint: RepaintState::default(),
            frame_time: 0,
            animations: Vec::new(),
            backend,
        };
        output.refresh_region();
        output.update_matrix();
        output.dirty = true;

        let mode = output.current_mode();
        info!(
            "Output {} '{}' at {},{} {}x{}@{}",
            id,
            output.name,
            output.x,
            output.y,
            mode.width,
            mode.height,
            mode.refresh
        );
        self.outputs.insert(id, output);
        self.output_id_pool |= 1 << slot;

        self.reassign_mapped_surfaces();
        self.damage_output(id);
        Ok(id)
    }

    /// Reposition an output. The carried damage no longer applies.
    pub fn output_move(&mut self, id: OutputId, x: i32, y: i32) -> CoreResult<()> {
        let output = self.output_mut(id)?;
        output.x = x;
        output.y = y;
        output.previous_damage.clear();
        output.refresh_region();
        output.dirty = true;
        self.reassign_mapped_surfaces();
        self.damage_output(id);
        Ok(())
    }

    pub fn output_set_border(&mut self, id: OutputId, border: Border) -> CoreResult<()> {
        let output = self.output_mut(id)?;
        output.border = border;
        output.dirty = true;
        self.damage_output(id);
        Ok(())
    }

    /// Hot-unplug. Surfaces move to the remaining outputs, or are unmapped
    /// when none are left.
    pub fn output_destroy(&mut self, id: OutputId) -> CoreResult<()> {
        let mut output = self
            .outputs
            .shift_remove(&id)
            .ok_or(CoreError::UnknownOutput(id))?;
        self.output_id_pool &= !(1 << id.0);
        info!("Output {} '{}' removed", id, output.name);

        let orphaned = std::mem::take(&mut output.animations);
        if let Some(first) = self.outputs.values_mut().next() {
            first.animations.extend(orphaned);
        } else {
            for animation in orphaned {
                self.finish_animation(animation);
            }
        }

        if self.outputs.is_empty() {
            let mapped: Vec<SurfaceId> = self
                .surfaces
                .values()
                .filter(|s| s.is_mapped() || s.layer.is_some())
                .map(|s| s.id)
                .collect();
            for sid in mapped {
                self.surface_unmap(sid)?;
            }
        } else {
            self.reassign_mapped_surfaces();
            self.schedule_repaint_all();
        }
        Ok(())
    }

    pub(crate) fn reassign_mapped_surfaces(&mut self) {
        let mapped: Vec<SurfaceId> = self
            .surfaces
            .values()
            .filter(|s| s.is_mapped())
            .map(|s| s.id)
            .collect();
        for sid in mapped {
            self.surface_assign_output(sid);
        }
    }

    /// Ask the backend for another mode. On refusal nothing changes and the
    /// caller must fall back to presenting without a mode switch.
    pub fn switch_mode(&mut self, id: OutputId, selector: ModeSelector) -> CoreResult<()> {
        let output = self.output_mut(id)?;
        let index = output
            .modes
            .iter()
            .position(|m| selector.matches(m))
            .ok_or(CoreError::NoMatchingMode(id))?;
        let mode = output.modes[index];
        if !output.backend.switch_mode(&mode) {
            return Err(CoreError::ModeSwitchUnsupported(id));
        }
        let previous = output.current;
        output.modes[previous].flags.remove(ModeFlags::CURRENT);
        output.modes[index].flags.insert(ModeFlags::CURRENT);
        output.current = index;
        output.refresh_region();
        output.previous_damage.clear();
        output.dirty = true;
        debug!("Output {} switched to {}x{}", id, mode.width, mode.height);

        self.reassign_mapped_surfaces();
        self.damage_output(id);
        Ok(())
    }

    pub fn set_dpms(&mut self, level: DpmsLevel) {
        for output in self.outputs.values_mut() {
            output.backend.set_dpms(level);
        }
    }

    /// Recompute the projection of `id` if it is dirty.
    pub fn update_matrix(&mut self, id: OutputId) -> CoreResult<()> {
        let output = self.output_mut(id)?;
        if output.dirty && output.update_matrix() {
            self.schedule_repaint(id);
        }
        Ok(())
    }

    /// Step the zoom level of `id` by `delta` increments.
    pub fn zoom_by(&mut self, id: OutputId, delta: f32) -> CoreResult<()> {
        let output = self.output_mut(id)?;
        output.zoom.step(delta);
        output.dirty = true;
        self.schedule_repaint(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::matrix::Vector;
    use crate::test_util::{headless_output, FailingModes, NullBackend};
    use pretty_assertions::assert_eq;

    fn ndc(output: &Output, x: f32, y: f32) -> (f32, f32) {
        let v = output.matrix().transform(Vector::point(x, y));
        (v.f[0], v.f[1])
    }

    fn assert_near(got: (f32, f32), want: (f32, f32)) {
        assert!(
            (got.0 - want.0).abs() < 1e-5 && (got.1 - want.1).abs() < 1e-5,
            "{got:?} != {want:?}"
        );
    }

    #[test]
    fn ids_come_from_the_first_free_slot() {
        let mut comp = Compositor::new(Config::empty());
        let a = comp
            .output_init(headless_output("A", 0, 0, 800, 600), Box::new(NullBackend))
            .unwrap();
        let b = comp
            .output_init(headless_output("B", 800, 0, 800, 600), Box::new(NullBackend))
            .unwrap();
        assert_eq!((a, b), (OutputId(0), OutputId(1)));
        comp.output_destroy(a).unwrap();
        let c = comp
            .output_init(headless_output("C", 0, 0, 800, 600), Box::new(NullBackend))
            .unwrap();
        assert_eq!(c, OutputId(0));
    }

    #[test]
    fn unplug_moves_surfaces_then_unmaps_them() {
        let mut comp = Compositor::new(Config::empty());
        let a = comp
            .output_init(headless_output("A", 0, 0, 800, 600), Box::new(NullBackend))
            .unwrap();
        let b = comp
            .output_init(headless_output("B", 800, 0, 800, 600), Box::new(NullBackend))
            .unwrap();
        let s = comp.surface_create(crate::surface::ClientId(1)).unwrap();
        comp.surface_configure(s, 700.0, 0.0, 200, 100).unwrap();
        comp.surface_map(s, crate::layer::LayerKind::Normal).unwrap();
        assert_eq!(comp.surface(s).unwrap().output(), Some(b));

        comp.output_destroy(b).unwrap();
        let surface = comp.surface(s).unwrap();
        assert_eq!(surface.output(), Some(a));
        assert!(surface.is_mapped());
        assert_eq!(crate::invariants::validate(&comp), Ok(()));

        comp.output_destroy(a).unwrap();
        let surface = comp.surface(s).unwrap();
        assert_eq!(surface.output(), None);
        assert_eq!(surface.layer(), None);
        assert!(comp.stacking_order().is_empty());
        assert_eq!(crate::invariants::validate(&comp), Ok(()));
    }

    #[test]
    fn pool_exhaustion_is_an_error() {
        let mut comp = Compositor::new(Config::empty());
        for i in 0..32 {
            comp.output_init(headless_output("X", i * 10, 0, 10, 10), Box::new(NullBackend))
                .unwrap();
        }
        let err = comp
            .output_init(headless_output("Y", 0, 0, 10, 10), Box::new(NullBackend))
            .unwrap_err();
        assert_eq!(err, CoreError::OutputPoolExhausted);
    }

    #[test]
    fn init_damages_the_whole_output() {
        let mut comp = Compositor::new(Config::empty());
        let id = comp
            .output_init(headless_output("A", 100, 0, 640, 480), Box::new(NullBackend))
            .unwrap();
        assert_eq!(comp.damage, Region::from_rect(Rect::new(100, 0, 640, 480)));
        assert_eq!(comp.output(id).unwrap().region, comp.damage);
    }

    #[test]
    fn projection_maps_corners_to_ndc() {
        let mut comp = Compositor::new(Config::empty());
        let id = comp
            .output_init(headless_output("A", 100, 50, 200, 100), Box::new(NullBackend))
            .unwrap();
        comp.update_matrix(id).unwrap();
        let out = comp.output(id).unwrap();
        assert_near(ndc(out, 100.0, 50.0), (-1.0, -1.0));
        assert_near(ndc(out, 300.0, 150.0), (1.0, 1.0));
        assert_near(ndc(out, 200.0, 100.0), (0.0, 0.0));
    }

    #[test]
    fn flipped_output_inverts_y() {
        let mut comp = Compositor::new(Config::empty());
        let mut info = headless_output("A", 0, 0, 200, 100);
        info.flags = OutputFlags::FLIPPED;
        let id = comp.output_init(info, Box::new(NullBackend)).unwrap();
        comp.update_matrix(id).unwrap();
        assert_near(ndc(comp.output(id).unwrap(), 0.0, 0.0), (-1.0, 1.0));
    }

    #[test]
    fn mode_switch_refused_by_backend() {
        let mut comp = Compositor::new(Config::empty());
        let mut info = headless_output("A", 0, 0, 800, 600);
        info.modes.push(Mode::new(640, 480, 60_000));
        let id = comp.output_init(info, Box::new(FailingModes)).unwrap();
        let selector = ModeSelector {
            width: 640,
            height: 480,
            refresh: None,
        };
        assert_eq!(
            comp.switch_mode(id, selector),
            Err(CoreError::ModeSwitchUnsupported(id))
        );
        assert_eq!(comp.output(id).unwrap().current_mode().width, 800);

        let missing = ModeSelector {
            width: 1,
            height: 1,
            refresh: None,
        };
        assert_eq!(comp.switch_mode(id, missing), Err(CoreError::NoMatchingMode(id)));
    }

    #[test]
    fn move_resets_previous_damage() {
        let mut comp = Compositor::new(Config::empty());
        let id = comp
            .output_init(headless_output("A", 0, 0, 100, 100), Box::new(NullBackend))
            .unwrap();
        comp.output_mut(id).unwrap().previous_damage = Region::from_rect(Rect::new(0, 0, 5, 5));
        comp.output_move(id, 50, 0).unwrap();
        let out = comp.output(id).unwrap();
        assert!(out.previous_damage().is_empty());
        assert_eq!(out.region, Region::from_rect(Rect::new(50, 0, 100, 100)));
    }
}
