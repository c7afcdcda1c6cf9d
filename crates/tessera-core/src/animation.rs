//! Spring-damped animations advanced once per painted frame.
//!
//! Every output owns a list of animations. After each paint of that output
//! the list is walked, each entry's frame counter is bumped, and the entry
//! is stepped with the frame timestamp. An entry that settles is removed
//! and reported with [`CoreAction::AnimationDone`].

use std::fmt;

use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::event::CoreAction;
use crate::matrix::Matrix;
use crate::output::OutputId;
use crate::surface::SurfaceId;
use crate::transform::{ChainPlacement, TransformId};
use crate::Compositor;

/// Simulation step of the spring integrator, in milliseconds.
const SPRING_STEP_MS: u32 = 4;
const SPRING_EPSILON: f64 = 0.0002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

impl fmt::Display for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim:{}", self.0)
    }
}

/// A damped spring pulling `current` toward `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    pub k: f64,
    pub friction: f64,
    pub current: f64,
    pub target: f64,
    pub previous: f64,
    pub timestamp: u32,
}

impl Spring {
    pub const fn new(k: f64, current: f64, target: f64) -> Self {
        Self {
            k,
            friction: 400.0,
            current,
            target,
            previous: current,
            timestamp: 0,
        }
    }

    /// Integrate in fixed steps up to `msec`.
    pub fn update(&mut self, msec: u32) {
        if msec < self.timestamp {
            self.timestamp = msec;
        }
        let step = 0.01;
        while msec - self.timestamp > SPRING_STEP_MS {
            let current = self.current;
            let v = current - self.previous;
            let force = self.k * (self.target - current) / 10.0 + (self.previous - current)
                - v * self.friction;
            self.current = current + (current - self.previous) + force * step * step;
            self.previous = current;
            self.timestamp += SPRING_STEP_MS;
        }
    }

    pub fn done(&self) -> bool {
        (self.previous - self.target).abs() < SPRING_EPSILON
            && (self.current - self.target).abs() < SPRING_EPSILON
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEffect {
    /// Scale about the surface center from `start` to `stop`, fading in.
    Zoom { start: f32, stop: f32 },
    Fade,
    /// Vertical offset from `start` to `stop`.
    Slide { start: f32, stop: f32 },
}

#[derive(Debug, Clone)]
pub(crate) struct SurfaceAnimation {
    pub surface: SurfaceId,
    pub effect: SurfaceEffect,
    pub spring: Spring,
    pub transform: TransformId,
}

#[derive(Debug, Clone)]
pub(crate) enum AnimationKind {
    /// The compositor-wide fade to black.
    Fade,
    Surface(SurfaceAnimation),
}

#[derive(Debug, Clone)]
pub struct Animation {
    pub id: AnimationId,
    pub frame_counter: u32,
    pub(crate) kind: AnimationKind,
}

impl Animation {
    pub fn surface(&self) -> Option<SurfaceId> {
        match &self.kind {
            AnimationKind::Fade => None,
            AnimationKind::Surface(sa) => Some(sa.surface),
        }
    }
}

impl Compositor {
    pub fn surface_zoom_run(&mut self, id: SurfaceId, start: f32, stop: f32) -> CoreResult<AnimationId> {
        let spring = self.surface_spring(None);
        self.surface_animation_run(id, SurfaceEffect::Zoom { start, stop }, spring)
    }

    pub fn surface_fade_run(&mut self, id: SurfaceId) -> CoreResult<AnimationId> {
        let spring = self.surface_spring(None);
        self.surface_animation_run(id, SurfaceEffect::Fade, spring)
    }

    pub fn surface_slide_run(&mut self, id: SurfaceId, start: f32, stop: f32) -> CoreResult<AnimationId> {
        let cfg = &self.config.animation;
        let spring = self.surface_spring(Some((cfg.slide_k, cfg.slide_friction)));
        self.surface_animation_run(id, SurfaceEffect::Slide { start, stop }, spring)
    }

    fn surface_spring(&self, tuning: Option<(f64, f64)>) -> Spring {
        let cfg = &self.config.animation;
        let (k, friction) = tuning.unwrap_or((cfg.surface_k, cfg.surface_friction));
        let mut spring = Spring::new(k, 0.0, 1.0);
        spring.friction = friction;
        spring
    }

    fn surface_animation_run(
        &mut self,
        id: SurfaceId,
        effect: SurfaceEffect,
        spring: Spring,
    ) -> CoreResult<AnimationId> {
        let output = self
            .surface(id)?
            .output
            .ok_or(CoreError::SurfaceNotMapped(id))?;
        let transform = self.transform_insert(id, Matrix::identity(), ChainPlacement::BeforePosition)?;

        let mut animation = Animation {
            id: AnimationId(self.ids.next_animation()),
            frame_counter: 0,
            kind: AnimationKind::Surface(SurfaceAnimation {
                surface: id,
                effect,
                spring,
                transform,
            }),
        };
        let animation_id = animation.id;
        self.step_animation(&mut animation, 0);

        let list = &mut self.output_mut(output)?.animations;
        list.try_reserve(1).map_err(|_| CoreError::OutOfMemory)?;
        list.push(animation);
        debug!("Animation {} started on {}", animation_id, id);
        Ok(animation_id)
    }

    /// Advance every animation of `output` by one frame.
    pub(crate) fn run_animations(&mut self, output: OutputId, msecs: u32) {
        let Some(out) = self.outputs.get_mut(&output) else {
            return;
        };
        let current = std::mem::take(&mut out.animations);
        let mut keep = Vec::with_capacity(current.len());
        for mut animation in current {
            animation.frame_counter += 1;
            if self.step_animation(&mut animation, msecs) {
                keep.push(animation);
            } else {
                self.finish_animation(animation);
            }
        }
        // Entries started while stepping were pushed onto the emptied list.
        if let Some(out) = self.outputs.get_mut(&output) {
            keep.append(&mut out.animations);
            out.animations = keep;
        }
    }

    /// One tick. Returns false once the animation has settled.
    fn step_animation(&mut self, animation: &mut Animation, msecs: u32) -> bool {
        let counter = animation.frame_counter;
        match &mut animation.kind {
            AnimationKind::Fade => self.fade_frame(counter, msecs),
            AnimationKind::Surface(sa) => {
                if !self.surfaces.contains_key(&sa.surface) {
                    return false;
                }
                if counter <= 1 {
                    sa.spring.timestamp = msecs;
                }
                sa.spring.update(msecs);
                if sa.spring.done() {
                    return false;
                }
                self.apply_surface_effect(sa);
                self.mark_dirty(sa.surface);
                self.schedule_repaint_all();
                true
            }
        }
    }

    fn apply_surface_effect(&mut self, sa: &SurfaceAnimation) {
        let Some(surface) = self.surfaces.get_mut(&sa.surface) else {
            return;
        };
        let current = sa.spring.current as f32;
        let lerp = |start: f32, stop: f32| start + (stop - start) * current;
        let matrix = match sa.effect {
            SurfaceEffect::Zoom { start, stop } => {
                let scale = lerp(start, stop);
                let (hw, hh) = (
                    0.5 * surface.geometry.width as f32,
                    0.5 * surface.geometry.height as f32,
                );
                surface.alpha = current.min(1.0);
                let mut m = Matrix::from_translation(-hw, -hh, 0.0);
                m.scale(scale, scale, scale);
                m.translate(hw, hh, 0.0);
                Some(m)
            }
            SurfaceEffect::Fade => {
                surface.alpha = current.clamp(0.0, 1.0);
                None
            }
            SurfaceEffect::Slide { start, stop } => {
                Some(Matrix::from_translation(0.0, lerp(start, stop), 0.0))
            }
        };
        if let Some(m) = matrix {
            surface.chain.set(sa.transform, m);
        }
    }

    /// Tear down a settled or orphaned animation.
    pub(crate) fn finish_animation(&mut self, animation: Animation) {
        match animation.kind {
            AnimationKind::Fade => self.fade.animation = None,
            AnimationKind::Surface(sa) => {
                if let Some(surface) = self.surfaces.get_mut(&sa.surface) {
                    surface.chain.remove(sa.transform);
                    surface.geometry.dirty = true;
                }
                self.actions.push(CoreAction::AnimationDone {
                    animation: animation.id,
                    surface: Some(sa.surface),
                });
                debug!("Animation {} done", animation.id);
            }
        }
    }

    /// Drop every animation bound to a surface that is going away.
    pub(crate) fn cancel_surface_animations(&mut self, id: SurfaceId) {
        let mut cancelled = Vec::new();
        for output in self.outputs.values_mut() {
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut output.animations)
                .into_iter()
                .partition(|a| a.surface() == Some(id));
            output.animations = kept;
            cancelled.extend(gone);
        }
        for animation in cancelled {
            self.finish_animation(animation);
        }
    }
}
