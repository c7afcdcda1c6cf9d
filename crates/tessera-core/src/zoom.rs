//! Output magnification.
//!
//! `level` is the requested zoom in `[0, max_level]`; a spring eases the
//! applied value toward it. The magnification factor is
//! `1 / (1 - spring.current)`, and the camera is shifted so the focus point
//! stays put on screen.

use crate::animation::Spring;
use crate::config::ZoomConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Zoom {
    pub active: bool,
    pub increment: f32,
    pub max_level: f32,
    pub level: f32,
    pub spring: Spring,
    /// Camera translation in normalized device coordinates.
    pub trans_x: f32,
    pub trans_y: f32,
    /// Global point kept fixed while zoomed, normally the pointer.
    pub focus: (f64, f64),
    /// The spring clock restarts at the next frame.
    restart: bool,
}

impl Zoom {
    pub fn new(config: &ZoomConfig) -> Self {
        let mut spring = Spring::new(config.spring_k, 0.0, 0.0);
        spring.friction = config.friction;
        Self {
            active: false,
            increment: config.increment,
            max_level: config.max_level,
            level: 0.0,
            spring,
            trans_x: 0.0,
            trans_y: 0.0,
            focus: (0.0, 0.0),
            restart: false,
        }
    }

    /// Change the level by `steps` increments, clamped to the valid range.
    pub fn step(&mut self, steps: f32) {
        if !self.active || self.spring.done() {
            self.restart = true;
        }
        self.level = (self.level + self.increment * steps).clamp(0.0, self.max_level);
        self.active = true;
        self.spring.target = f64::from(self.level);
    }

    pub fn magnification(&self) -> f32 {
        (1.0 / (1.0 - self.spring.current)) as f32
    }

    /// Camera offset for a focus at `(nx, ny)` in device coordinates.
    pub(crate) fn set_translation(&mut self, nx: f32, ny: f32) {
        let applied = self.spring.current as f32;
        self.trans_x = nx * applied;
        self.trans_y = ny * applied;
    }

    /// Step the spring to `msecs`. Returns true while it is still moving.
    /// A spring settled at zero switches zoom off.
    pub(crate) fn advance(&mut self, msecs: u32) -> bool {
        if !self.active {
            return false;
        }
        if self.restart {
            self.spring.timestamp = msecs;
            self.restart = false;
        }
        self.spring.update(msecs);
        if !self.spring.done() {
            return true;
        }
        self.spring.current = self.spring.target;
        self.spring.previous = self.spring.target;
        if self.level <= 0.0 {
            self.active = false;
            self.trans_x = 0.0;
            self.trans_y = 0.0;
        }
        false
    }
}
