//! Idle tracking and the fade to black.
//!
//! Input activity resets the idle timer. When the timer fires and nothing
//! inhibits idling, a full-screen black surface in the fade layer is
//! animated in; once it is fully opaque the compositor goes to sleep and
//! asks for the session to be locked. Activity while asleep turns the
//! displays back on, unlocks and fades back in.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::animation::{Animation, AnimationId, AnimationKind, Spring};
use crate::event::CoreAction;
use crate::layer::LayerKind;
use crate::output::DpmsLevel;
use crate::region::Region;
use crate::surface::SurfaceId;
use crate::Compositor;

/// Side of the fade surface; large enough to cover any output layout.
const FADE_EXTENT: i32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CompositorState {
    #[default]
    Active,
    /// Faded out; scheduling is suppressed until woken.
    Sleeping,
}

#[derive(Debug, Clone)]
pub(crate) struct FadeState {
    pub spring: Spring,
    pub surface: Option<SurfaceId>,
    pub animation: Option<AnimationId>,
}

impl FadeState {
    pub fn new(k: f64) -> Self {
        Self {
            spring: Spring::new(k, 0.0, 0.0),
            surface: None,
            animation: None,
        }
    }
}

impl Compositor {
    pub const fn state(&self) -> CompositorState {
        self.state
    }

    pub const fn idle_inhibit_count(&self) -> u32 {
        self.idle_inhibit
    }

    /// Current opacity of the fade overlay, `0` when fully visible.
    pub fn fade_level(&self) -> f64 {
        self.fade.spring.current
    }

    /// Something happened on an input device.
    pub fn activity(&mut self) {
        if self.state == CompositorState::Active {
            self.wake();
        } else {
            info!("Waking from sleep");
            self.set_dpms(DpmsLevel::On);
            self.actions.push(CoreAction::Unlock);
            self.wake();
        }
    }

    /// Fade back to full visibility and restart the idle timer.
    pub fn wake(&mut self) {
        self.state = CompositorState::Active;
        self.fade(0.0);
        self.actions.push(CoreAction::ResetIdleTimer {
            timeout_ms: self.config.general.idle_timeout_ms,
        });
    }

    /// The idle timer expired.
    pub fn idle_timeout(&mut self) {
        if self.idle_inhibit > 0 {
            return;
        }
        debug!("Idle timeout");
        if self.config.animation.fade {
            self.fade(1.0);
        } else {
            self.fall_asleep();
        }
    }

    pub fn idle_inhibit(&mut self) {
        self.activity();
        self.idle_inhibit += 1;
    }

    pub fn idle_release(&mut self) {
        self.idle_inhibit = self.idle_inhibit.saturating_sub(1);
        self.activity();
    }

    fn fall_asleep(&mut self) {
        info!("Compositor sleeping");
        self.state = CompositorState::Sleeping;
        self.actions.push(CoreAction::Lock);
    }

    /// Animate the black overlay toward `tint` (0 clear, 1 black).
    pub fn fade(&mut self, tint: f64) {
        let Some(first) = self.outputs.keys().next().copied() else {
            return;
        };
        self.fade.spring.target = tint;
        if self.fade.spring.done() {
            return;
        }

        if self.fade.surface.is_none() {
            match self.create_fade_surface() {
                Ok(id) => self.fade.surface = Some(id),
                Err(e) => {
                    tracing::error!("Cannot create fade surface: {}", e);
                    return;
                }
            }
        }
        if let Some(id) = self.fade.surface {
            if let Err(e) = self.surface_damage_all(id) {
                warn!("Fade surface not damaged: {}", e);
            }
        }

        if self.fade.animation.is_none() {
            let id = AnimationId(self.ids.next_animation());
            if let Some(output) = self.outputs.get_mut(&first) {
                output.animations.push(Animation {
                    id,
                    frame_counter: 0,
                    kind: AnimationKind::Fade,
                });
                self.fade.animation = Some(id);
            }
        }
    }

    fn create_fade_surface(&mut self) -> crate::CoreResult<SurfaceId> {
        let id = self.surface_create_internal()?;
        self.surface_configure(id, 0.0, 0.0, FADE_EXTENT, FADE_EXTENT)?;
        let surface = self.surface_mut(id)?;
        surface.color = Some([0.0, 0.0, 0.0, 0.0]);
        surface.input = Some(Region::new());
        self.surface_map(id, LayerKind::Fade)?;
        Ok(id)
    }

    /// One tick of the fade. Returns false once it has settled.
    pub(crate) fn fade_frame(&mut self, frame_counter: u32, msecs: u32) -> bool {
        if frame_counter <= 1 {
            self.fade.spring.timestamp = msecs;
        }
        self.fade.spring.update(msecs);
        let level = self.fade.spring.current;

        if let Some(id) = self.fade.surface {
            if let Some(surface) = self.surfaces.get_mut(&id) {
                surface.color = Some([0.0, 0.0, 0.0, level.clamp(0.0, 1.0) as f32]);
            }
            if let Err(e) = self.surface_damage_all(id) {
                warn!("Fade surface not damaged: {}", e);
            }
        }

        if !self.fade.spring.done() {
            return true;
        }
        self.fade.spring.current = self.fade.spring.target;
        if self.fade.spring.current < 0.001 {
            if let Some(id) = self.fade.surface.take() {
                if let Err(e) = self.surface_destroy(id) {
                    warn!("Fade surface not destroyed: {}", e);
                }
            }
        } else if self.fade.spring.current > 0.999 {
            self.fall_asleep();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_util::{headless_output, NullBackend};
    use pretty_assertions::assert_eq;

    fn compositor() -> (Compositor, crate::OutputId) {
        let mut comp = Compositor::new(Config::empty());
        let out = comp
            .output_init(headless_output("A", 0, 0, 640, 480), Box::new(NullBackend))
            .unwrap();
        comp.take_actions();
        (comp, out)
    }

    fn run_until_settled(comp: &mut Compositor, out: crate::OutputId, t: &mut u32) {
        while comp.output(out).unwrap().animation_count() > 0 && *t < 60_000 {
            *t += 16;
            comp.run_animations(out, *t);
        }
    }

    #[test]
    fn idle_fades_to_sleep_and_activity_wakes() {
        let (mut comp, out) = compositor();
        comp.idle_timeout();
        let fade_surface = comp.fade.surface.expect("fade surface");
        assert_eq!(comp.surface(fade_surface).unwrap().layer(), Some(LayerKind::Fade));
        assert!(!comp.surface(fade_surface).unwrap().accepts_input_at(10, 10));

        let mut t = 0;
        run_until_settled(&mut comp, out, &mut t);
        assert_eq!(comp.state(), CompositorState::Sleeping);
        assert!(comp.take_actions().contains(&CoreAction::Lock));

        comp.activity();
        assert_eq!(comp.state(), CompositorState::Active);
        let actions = comp.take_actions();
        assert!(actions.contains(&CoreAction::Unlock));
        assert!(actions
            .iter()
            .any(|a| matches!(a, CoreAction::ResetIdleTimer { .. })));

        run_until_settled(&mut comp, out, &mut t);
        assert_eq!(comp.fade.surface, None);
        assert!(!comp.surface_exists(fade_surface));
        assert_eq!(comp.fade_level(), 0.0);
    }

    #[test]
    fn inhibited_idle_does_nothing() {
        let (mut comp, _) = compositor();
        comp.idle_inhibit();
        comp.idle_timeout();
        assert!(comp.fade.surface.is_none());
        comp.idle_release();
        assert_eq!(comp.idle_inhibit_count(), 0);
        comp.idle_timeout();
        assert!(comp.fade.surface.is_some());
    }

    #[test]
    fn sleeping_suppresses_repaint_scheduling() {
        let mut config = Config::empty();
        config.animation.fade = false;
        let mut comp = Compositor::new(config);
        let out = comp
            .output_init(headless_output("A", 0, 0, 640, 480), Box::new(NullBackend))
            .unwrap();
        comp.idle_repaint(out, 0);
        comp.finish_frame(out, 16);
        comp.idle_timeout();
        assert_eq!(comp.state(), CompositorState::Sleeping);
        comp.take_actions();
        comp.damage_all();
        assert!(comp.take_actions().is_empty());
    }
}
