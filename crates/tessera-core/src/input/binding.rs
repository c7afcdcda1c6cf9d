//! Global bindings
//!
//! A binding pairs an exact modifier state with a key, button or axis
//! trigger. Bindings run before the event reaches the grab. A key binding
//! that leaves the keyboard in its default grab installs a binding grab so
//! the matching release never reaches the client.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};

use super::grab::{KeyboardGrab, PointerGrab, ResizeEdges};
use super::keys::*;
use super::{Axis, ButtonState, KeyState, Modifiers, SeatId};
use crate::config::BindingConfig;
use crate::error::{CoreError, CoreResult};
use crate::event::CoreAction;
use crate::surface::SurfaceRole;
use crate::Compositor;

/// Opacity change per axis unit.
const OPACITY_STEP: f32 = 0.05;

/// Binding parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingParseError {
    #[error("Invalid trigger: {0}")]
    Trigger(String),
    #[error("Invalid binding: {0}")]
    Binding(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u64);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Key(u32),
    Button(u32),
    Axis(Axis),
}

impl Trigger {
    /// Parse a single trigger name: a key, a `BTN_*` button or an axis.
    pub fn from_name(name: &str) -> Result<Self, BindingParseError> {
        let lower = name.trim().to_lowercase();
        if let Ok(axis) = Axis::from_str(&lower) {
            return Ok(Self::Axis(axis));
        }
        let button = match lower.as_str() {
            "btn_left" | "button1" => Some(BTN_LEFT),
            "btn_middle" | "button2" => Some(BTN_MIDDLE),
            "btn_right" | "button3" => Some(BTN_RIGHT),
            _ => None,
        };
        if let Some(button) = button {
            return Ok(Self::Button(button));
        }
        key_from_name(&lower)
            .map(Self::Key)
            .ok_or_else(|| BindingParseError::Trigger(name.to_string()))
    }
}

/// Evdev code for a key name.
fn key_from_name(name: &str) -> Option<u32> {
    const LETTERS: [(char, u32); 26] = [
        ('q', 16),
        ('w', 17),
        ('e', 18),
        ('r', 19),
        ('t', 20),
        ('y', 21),
        ('u', 22),
        ('i', 23),
        ('o', 24),
        ('p', 25),
        ('a', 30),
        ('s', 31),
        ('d', 32),
        ('f', 33),
        ('g', 34),
        ('h', 35),
        ('j', 36),
        ('k', 37),
        ('l', 38),
        ('z', 44),
        ('x', 45),
        ('c', 46),
        ('v', 47),
        ('b', 48),
        ('n', 49),
        ('m', 50),
    ];

    if let Some(code) = name.strip_prefix("key:") {
        return code.parse().ok();
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return match c {
            '1'..='9' => Some(c as u32 - '1' as u32 + 2),
            '0' => Some(11),
            _ => LETTERS.iter().find(|(l, _)| *l == c).map(|(_, code)| *code),
        };
    }
    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
        return match n {
            1..=10 => Some(KEY_F1 + n - 1),
            11 => Some(87),
            12 => Some(88),
            _ => None,
        };
    }
    let code = match name {
        "escape" | "esc" => KEY_ESC,
        "backspace" => KEY_BACKSPACE,
        "tab" => KEY_TAB,
        "return" | "enter" => KEY_ENTER,
        "space" => KEY_SPACE,
        "up" => KEY_UP,
        "down" => KEY_DOWN,
        "left" => KEY_LEFT,
        "right" => KEY_RIGHT,
        "pageup" | "prior" => KEY_PAGEUP,
        "pagedown" | "next" => KEY_PAGEDOWN,
        _ => return None,
    };
    Some(code)
}

/// What a binding does when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingAction {
    Move,
    Resize,
    Rotate,
    ClickToActivate,
    ZoomIn,
    ZoomOut,
    ZoomAxis,
    Opacity,
    Terminate,
    /// Handled outside the core; reported as `BindingTriggered`.
    Custom(String),
}

impl BindingAction {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "move" => Self::Move,
            "resize" => Self::Resize,
            "rotate" => Self::Rotate,
            "click-to-activate" | "activate" => Self::ClickToActivate,
            "zoom-in" => Self::ZoomIn,
            "zoom-out" => Self::ZoomOut,
            "zoom-axis" | "zoom" => Self::ZoomAxis,
            "opacity" => Self::Opacity,
            "terminate" | "exit" => Self::Terminate,
            _ => Self::Custom(s.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub trigger: Trigger,
    pub modifiers: Modifiers,
    pub action: BindingAction,
}

impl Binding {
    pub const fn new(trigger: Trigger, modifiers: Modifiers, action: BindingAction) -> Self {
        Self {
            trigger,
            modifiers,
            action,
        }
    }

    /// Parse a chord like "Super+Shift+PageUp". `$mod` stands for
    /// `binding_modifier`.
    pub fn parse(chord: &str, action: &str, binding_modifier: &str) -> Result<Self, BindingParseError> {
        let chord = chord.replace("$mod", binding_modifier);
        let mut modifiers = Modifiers::empty();
        let mut trigger_part: Option<&str> = None;

        for part in chord.split('+') {
            let part = part.trim();
            if part.is_empty() {
                return Err(BindingParseError::Binding(chord.clone()));
            }
            match Modifiers::parse_name(part) {
                Some(m) => modifiers.insert(m),
                None if trigger_part.is_none() => trigger_part = Some(part),
                None => return Err(BindingParseError::Binding(chord.clone())),
            }
        }

        let trigger = match trigger_part {
            Some(t) => Trigger::from_name(t)?,
            None => return Err(BindingParseError::Binding(chord.clone())),
        };

        Ok(Self::new(trigger, modifiers, BindingAction::parse(action)))
    }
}

impl Compositor {
    // ── Registration ─────────────────────────────────────────────────

    pub fn add_binding(&mut self, binding: Binding) -> CoreResult<BindingId> {
        self.bindings
            .try_reserve(1)
            .map_err(|_| CoreError::OutOfMemory)?;
        let id = BindingId(self.ids.next_binding());
        debug!("Binding {} added: {:?}", id, binding);
        self.bindings.push((id, binding));
        Ok(id)
    }

    /// Returns false if the binding was already gone.
    pub fn remove_binding(&mut self, id: BindingId) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|(bid, _)| *bid != id);
        self.bindings.len() != before
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings.iter().map(|(id, b)| (*id, b))
    }

    /// Register bindings from configuration. Chords that fail to parse are
    /// logged and skipped.
    pub fn load_bindings(&mut self, configs: &[BindingConfig]) -> CoreResult<()> {
        let modifier = self.config.general.binding_modifier.clone();
        for config in configs {
            match Binding::parse(&config.keys, &config.action, &modifier) {
                Ok(binding) => {
                    self.add_binding(binding)?;
                }
                Err(e) => warn!("Skipping binding '{}': {}", config.keys, e),
            }
        }
        Ok(())
    }

    fn matching_actions(&self, seat: SeatId, trigger: Trigger) -> Vec<BindingAction> {
        let Ok(seat) = self.seat(seat) else {
            return Vec::new();
        };
        self.bindings
            .iter()
            .filter(|(_, b)| b.trigger == trigger && b.modifiers == seat.modifiers)
            .map(|(_, b)| b.action.clone())
            .collect()
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    pub(crate) fn run_key_bindings(&mut self, seat: SeatId, time: u32, key: u32, state: KeyState) {
        if state == KeyState::Released {
            return;
        }
        for action in self.matching_actions(seat, Trigger::Key(key)) {
            self.run_binding_action(seat, time, key, 0.0, &action);

            let default_grab = self
                .seat(seat)
                .ok()
                .and_then(|s| s.keyboard.as_ref())
                .is_some_and(|k| k.grab == KeyboardGrab::Default);
            if default_grab {
                if let Err(e) = self.start_keyboard_grab(seat, KeyboardGrab::Binding { key }) {
                    warn!("Seat {} binding grab not started: {}", seat, e);
                }
            }
        }
    }

    pub(crate) fn run_button_bindings(&mut self, seat: SeatId, time: u32, button: u32, state: ButtonState) {
        if state == ButtonState::Released {
            return;
        }
        for action in self.matching_actions(seat, Trigger::Button(button)) {
            self.run_binding_action(seat, time, 0, 0.0, &action);
        }
    }

    pub(crate) fn run_axis_bindings(&mut self, seat: SeatId, time: u32, axis: Axis, value: f64) {
        for action in self.matching_actions(seat, Trigger::Axis(axis)) {
            let value = if axis == Axis::Vertical { value } else { 0.0 };
            self.run_binding_action(seat, time, 0, value, &action);
        }
    }

    fn run_binding_action(&mut self, seat: SeatId, time: u32, key: u32, value: f64, action: &BindingAction) {
        debug!("Seat {} binding {:?} at {}", seat, action, time);
        let result = match action {
            BindingAction::Move => self.move_binding(seat),
            BindingAction::Resize => self.resize_binding(seat),
            BindingAction::Rotate => self.rotate_binding(seat),
            BindingAction::ClickToActivate => self.click_to_activate_binding(seat),
            BindingAction::ZoomIn => self.zoom_binding(seat, 1.0),
            BindingAction::ZoomOut => self.zoom_binding(seat, -1.0),
            BindingAction::ZoomAxis => self.zoom_binding(seat, value as f32),
            BindingAction::Opacity => self.opacity_binding(seat, value),
            BindingAction::Terminate => {
                self.should_exit = true;
                self.actions.push(CoreAction::Terminate);
                Ok(())
            }
            BindingAction::Custom(name) => {
                self.actions.push(CoreAction::BindingTriggered {
                    seat,
                    name: name.clone(),
                    key,
                });
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("Binding {:?} failed: {}", action, e);
        }
    }

    /// Pointer focus if it is a shell window.
    fn focused_window(&self, seat: SeatId) -> CoreResult<Option<crate::SurfaceId>> {
        let focus = self
            .seat(seat)?
            .pointer
            .as_ref()
            .and_then(|p| p.focus);
        Ok(focus.filter(|id| {
            self.surfaces
                .get(id)
                .is_some_and(|s| matches!(s.role, SurfaceRole::Toplevel { .. }))
        }))
    }

    fn move_binding(&mut self, seat: SeatId) -> CoreResult<()> {
        match self.focused_window(seat)? {
            Some(surface) => self.surface_move(seat, surface),
            None => Ok(()),
        }
    }

    /// Grab the edges nearest the press point, by thirds of the surface.
    fn resize_binding(&mut self, seat: SeatId) -> CoreResult<()> {
        let Some(surface) = self.focused_window(seat)? else {
            return Ok(());
        };
        let pointer = self.pointer_mut(seat)?;
        let (gx, gy) = (pointer.grab_x as i32, pointer.grab_y as i32);
        let s = self.surface(surface)?;
        let (x, y) = s.from_global_i32(gx, gy);
        let (w, h) = (s.geometry.width, s.geometry.height);

        let mut edges = ResizeEdges::empty();
        if x < w / 3 {
            edges |= ResizeEdges::LEFT;
        } else if x >= 2 * w / 3 {
            edges |= ResizeEdges::RIGHT;
        }
        if y < h / 3 {
            edges |= ResizeEdges::TOP;
        } else if y >= 2 * h / 3 {
            edges |= ResizeEdges::BOTTOM;
        }
        self.surface_resize(seat, surface, edges)
    }

    fn rotate_binding(&mut self, seat: SeatId) -> CoreResult<()> {
        match self.focused_window(seat)? {
            Some(surface) => self.surface_rotate(seat, surface),
            None => Ok(()),
        }
    }

    fn click_to_activate_binding(&mut self, seat: SeatId) -> CoreResult<()> {
        if !self.config.general.click_to_activate {
            return Ok(());
        }
        let Some(surface) = self.focused_window(seat)? else {
            return Ok(());
        };
        let default_grab = self
            .seat(seat)?
            .pointer
            .as_ref()
            .is_some_and(|p| p.grab == PointerGrab::Default);
        if !default_grab {
            return Ok(());
        }
        self.surface_activate(surface, seat)?;
        if self.surface(surface)?.layer.is_some() {
            self.surface_restack(surface, crate::surface::Stacking::Top)?;
        }
        Ok(())
    }

    /// Zoom every output under the pointer by `steps` increments.
    fn zoom_binding(&mut self, seat: SeatId, steps: f32) -> CoreResult<()> {
        if steps == 0.0 {
            return Ok(());
        }
        let pointer = self.pointer_mut(seat)?;
        let (x, y) = (pointer.x, pointer.y);
        let targets: Vec<_> = self
            .outputs
            .values()
            .filter(|o| o.contains_point(x.floor() as i32, y.floor() as i32))
            .map(|o| o.id)
            .collect();
        for id in targets {
            self.output_mut(id)?.zoom.focus = (x, y);
            self.zoom_by(id, steps)?;
        }
        Ok(())
    }

    fn opacity_binding(&mut self, seat: SeatId, value: f64) -> CoreResult<()> {
        let Some(surface) = self.focused_window(seat)? else {
            return Ok(());
        };
        let alpha = self.surface(surface)?.alpha + value as f32 * OPACITY_STEP;
        self.surface_set_alpha(surface, alpha.clamp(OPACITY_STEP, 1.0))
    }
}
