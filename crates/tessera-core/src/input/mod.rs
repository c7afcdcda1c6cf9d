//! Input routing
//!
//! Seats own a pointer, a keyboard and a touch device. Raw device events
//! enter through the `notify_*` methods, are matched against the binding
//! table and then handed to the device's active grab. Grabs, not hit
//! testing, decide which surface ends up focused.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub mod binding;
mod grab;
mod notify;
mod seat;

pub use binding::{Binding, BindingAction, BindingId, BindingParseError, Trigger};
pub use grab::{GrabControl, KeyboardGrab, PointerGrab, ResizeEdges};
pub use seat::{Keyboard, Pointer, Seat, Touch};

bitflags! {
    /// Modifier state used for binding lookup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const CTRL  = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const SUPER = 0b0000_0100;
        const SHIFT = 0b0000_1000;
    }
}

impl Modifiers {
    /// Parse modifiers from a string like "Super+Shift". Unknown parts are
    /// skipped so the same string may carry a key name.
    pub fn from_str_list(s: &str) -> Self {
        let mut mods = Self::empty();

        for part in s.split('+') {
            if let Some(m) = Self::parse_name(part) {
                mods.insert(m);
            }
        }

        mods
    }

    pub(crate) fn parse_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "shift" => Some(Self::SHIFT),
            "ctrl" | "control" => Some(Self::CTRL),
            "alt" | "mod1" => Some(Self::ALT),
            "super" | "mod4" | "logo" | "win" => Some(Self::SUPER),
            _ => None,
        }
    }

    /// Modifier bit driven by an evdev keycode, for automatic tracking.
    pub const fn from_keycode(key: u32) -> Option<Self> {
        match key {
            keys::KEY_LEFTCTRL | keys::KEY_RIGHTCTRL => Some(Self::CTRL),
            keys::KEY_LEFTALT | keys::KEY_RIGHTALT => Some(Self::ALT),
            keys::KEY_LEFTMETA | keys::KEY_RIGHTMETA => Some(Self::SUPER),
            keys::KEY_LEFTSHIFT | keys::KEY_RIGHTSHIFT => Some(Self::SHIFT),
            _ => None,
        }
    }
}

/// Linux evdev codes the core knows by name.
pub mod keys {
    pub const KEY_ESC: u32 = 1;
    pub const KEY_BACKSPACE: u32 = 14;
    pub const KEY_TAB: u32 = 15;
    pub const KEY_ENTER: u32 = 28;
    pub const KEY_LEFTCTRL: u32 = 29;
    pub const KEY_LEFTSHIFT: u32 = 42;
    pub const KEY_RIGHTSHIFT: u32 = 54;
    pub const KEY_LEFTALT: u32 = 56;
    pub const KEY_SPACE: u32 = 57;
    pub const KEY_F1: u32 = 59;
    pub const KEY_RIGHTCTRL: u32 = 97;
    pub const KEY_RIGHTALT: u32 = 100;
    pub const KEY_UP: u32 = 103;
    pub const KEY_PAGEUP: u32 = 104;
    pub const KEY_LEFT: u32 = 105;
    pub const KEY_RIGHT: u32 = 106;
    pub const KEY_DOWN: u32 = 108;
    pub const KEY_PAGEDOWN: u32 = 109;
    pub const KEY_LEFTMETA: u32 = 125;
    pub const KEY_RIGHTMETA: u32 = 126;

    pub const BTN_LEFT: u32 = 0x110;
    pub const BTN_RIGHT: u32 = 0x111;
    pub const BTN_MIDDLE: u32 = 0x112;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SeatId(pub u32);

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Vertical,
    Horizontal,
}

impl FromStr for Axis {
    type Err = BindingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "axis" | "vertical" | "wheel" => Ok(Self::Vertical),
            "horizontal" | "hwheel" => Ok(Self::Horizontal),
            _ => Err(BindingParseError::Trigger(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchType {
    Down,
    Motion,
    Up,
}

/// Whether the core derives modifier state from key events itself, or the
/// backend reports it separately through `notify_modifiers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStateUpdate {
    #[default]
    Automatic,
    None,
}
