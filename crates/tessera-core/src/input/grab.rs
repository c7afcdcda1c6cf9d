//! Pointer and keyboard grabs.
//!
//! A device has exactly one grab slot. `Default` routes events to the
//! focused surface; the other variants take over the device for an
//! interactive operation and end themselves, usually when the last button
//! is released. Grabs hold surfaces as plain ids: when the surface is
//! destroyed the id is cleared and the grab keeps running without it.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ButtonState, KeyState, SeatId};
use crate::error::CoreResult;
use crate::event::CoreAction;
use crate::layer::LayerKind;
use crate::matrix::Matrix;
use crate::surface::SurfaceId;
use crate::transform::ChainPlacement;
use crate::Compositor;

/// Pointer must travel this far from the rotation center before the
/// angle is taken into account.
const ROTATE_DEAD_ZONE: f32 = 20.0;

/// A popup stays open if its button is released within this many
/// milliseconds of the press that opened it.
const POPUP_CLICK_MS: u32 = 500;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ResizeEdges: u32 {
        const TOP    = 1;
        const BOTTOM = 2;
        const LEFT   = 4;
        const RIGHT  = 8;
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PointerGrab {
    /// Focus follows the surface under the pointer, except while buttons
    /// are held.
    #[default]
    Default,
    /// Surface follows the pointer, keeping the initial offset.
    Move {
        surface: Option<SurfaceId>,
        dx: f64,
        dy: f64,
    },
    /// Sends size requests for the grabbed edges.
    Resize {
        surface: Option<SurfaceId>,
        edges: ResizeEdges,
        width: i32,
        height: i32,
    },
    /// Spins the surface about `center` following the pointer angle.
    Rotate {
        surface: Option<SurfaceId>,
        center: (f32, f32),
        rotation: Matrix,
    },
    /// Confines pointer focus to the popup's client. A click outside
    /// dismisses the popup.
    Popup {
        surface: Option<SurfaceId>,
        initial_up: bool,
    },
}

impl PointerGrab {
    pub fn surface(&self) -> Option<SurfaceId> {
        match self {
            Self::Default => None,
            Self::Move { surface, .. }
            | Self::Resize { surface, .. }
            | Self::Rotate { surface, .. }
            | Self::Popup { surface, .. } => *surface,
        }
    }

    pub(crate) fn forget_surface(&mut self, id: SurfaceId) {
        match self {
            Self::Default => {}
            Self::Move { surface, .. }
            | Self::Resize { surface, .. }
            | Self::Rotate { surface, .. }
            | Self::Popup { surface, .. } => {
                if *surface == Some(id) {
                    *surface = None;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyboardGrab {
    #[default]
    Default,
    /// Installed after a key binding fired so its release is swallowed.
    Binding { key: u32 },
}

/// What a grab wants after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabControl {
    Continue,
    End,
}

impl Compositor {
    // ── Grab slots ───────────────────────────────────────────────────

    /// Install `grab`, replacing whatever was running. Focus is cleared
    /// and the new grab gets a chance to pick it up again.
    pub fn start_pointer_grab(&mut self, seat: SeatId, grab: PointerGrab) -> CoreResult<()> {
        self.pointer_mut(seat)?;
        self.set_pointer_focus(seat, None, 0.0, 0.0);
        let pointer = self.pointer_mut(seat)?;
        debug!("Seat {} pointer grab {:?}", seat, grab);
        pointer.grab = grab;
        pointer.grab_generation += 1;
        let (current, sx, sy) = (pointer.current, pointer.current_sx, pointer.current_sy);
        if current.is_some() {
            self.pointer_grab_focus(seat, current, sx, sy);
        }
        Ok(())
    }

    /// Back to default dispatch. Focus is recomputed at once.
    pub fn end_pointer_grab(&mut self, seat: SeatId) -> CoreResult<()> {
        let pointer = self.pointer_mut(seat)?;
        pointer.grab = PointerGrab::Default;
        pointer.grab_generation += 1;
        let (current, sx, sy) = (pointer.current, pointer.current_sx, pointer.current_sy);
        self.pointer_grab_focus(seat, current, sx, sy);
        self.repick(seat);
        Ok(())
    }

    pub fn start_keyboard_grab(&mut self, seat: SeatId, grab: KeyboardGrab) -> CoreResult<()> {
        self.keyboard_mut(seat)?.grab = grab;
        Ok(())
    }

    pub fn end_keyboard_grab(&mut self, seat: SeatId) -> CoreResult<()> {
        self.keyboard_mut(seat)?.grab = KeyboardGrab::Default;
        Ok(())
    }

    /// Put a grab taken out for dispatch back, unless the handler asked to
    /// end it or another grab was started meanwhile.
    fn restore_pointer_grab(&mut self, seat: SeatId, generation: u64, grab: PointerGrab, control: GrabControl) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        if pointer.grab_generation != generation {
            return;
        }
        match control {
            GrabControl::Continue => pointer.grab = grab,
            GrabControl::End => {
                if let Err(e) = self.end_pointer_grab(seat) {
                    warn!("Seat {} pointer grab not ended: {}", seat, e);
                }
            }
        }
    }

    // ── Pointer dispatch ─────────────────────────────────────────────

    /// The surface under the pointer changed.
    pub(crate) fn pointer_grab_focus(&mut self, seat: SeatId, surface: Option<SurfaceId>, sx: f64, sy: f64) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        match pointer.grab.clone() {
            PointerGrab::Default => {
                if pointer.button_count > 0 {
                    return;
                }
                self.set_pointer_focus(seat, surface, sx, sy);
            }
            PointerGrab::Move { .. } | PointerGrab::Resize { .. } | PointerGrab::Rotate { .. } => {
                pointer.grab_focus = None;
            }
            PointerGrab::Popup { surface: popup, .. } => {
                let client = popup.and_then(|p| self.surfaces.get(&p)).and_then(|p| p.client);
                let same_client = surface
                    .and_then(|s| self.surfaces.get(&s))
                    .is_some_and(|s| client.is_some() && s.client == client);
                if same_client {
                    self.set_pointer_focus(seat, surface, sx, sy);
                } else {
                    self.set_pointer_focus(seat, None, 0.0, 0.0);
                }
            }
        }
    }

    pub(crate) fn pointer_grab_motion(&mut self, seat: SeatId, time: u32) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        let generation = pointer.grab_generation;
        let mut grab = pointer.grab.clone();
        let control = match &mut grab {
            PointerGrab::Default | PointerGrab::Popup { .. } => {
                self.send_pointer_motion(seat, time);
                GrabControl::Continue
            }
            PointerGrab::Move { surface, dx, dy } => {
                self.move_grab_motion(seat, *surface, *dx, *dy);
                GrabControl::Continue
            }
            PointerGrab::Resize {
                surface,
                edges,
                width,
                height,
            } => {
                self.resize_grab_motion(seat, *surface, *edges, *width, *height);
                GrabControl::Continue
            }
            PointerGrab::Rotate {
                surface,
                center,
                rotation,
            } => {
                self.rotate_grab_motion(seat, *surface, *center, rotation);
                GrabControl::Continue
            }
        };
        self.restore_pointer_grab(seat, generation, grab, control);
    }

    pub(crate) fn pointer_grab_button(&mut self, seat: SeatId, time: u32, button: u32, state: ButtonState) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        let generation = pointer.grab_generation;
        let released_all = pointer.button_count == 0 && state == ButtonState::Released;
        let mut grab = pointer.grab.clone();
        let control = match &mut grab {
            PointerGrab::Default => {
                self.send_pointer_button(seat, time, button, state);
                if released_all {
                    if let Ok(pointer) = self.pointer_mut(seat) {
                        let (current, sx, sy) = (pointer.current, pointer.current_sx, pointer.current_sy);
                        self.set_pointer_focus(seat, current, sx, sy);
                    }
                }
                GrabControl::Continue
            }
            PointerGrab::Move { .. } | PointerGrab::Resize { .. } => {
                if released_all {
                    GrabControl::End
                } else {
                    GrabControl::Continue
                }
            }
            PointerGrab::Rotate {
                surface, rotation, ..
            } => {
                if released_all {
                    if let Some(s) = surface.and_then(|id| self.surfaces.get_mut(&id)) {
                        s.rotation.multiply(rotation);
                    }
                    GrabControl::End
                } else {
                    GrabControl::Continue
                }
            }
            PointerGrab::Popup {
                surface,
                initial_up,
            } => self.popup_grab_button(seat, time, button, state, *surface, initial_up),
        };
        self.restore_pointer_grab(seat, generation, grab, control);
    }

    fn send_pointer_motion(&mut self, seat: SeatId, time: u32) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        if let Some(surface) = pointer.grab_focus {
            let (sx, sy) = (pointer.grab_sx, pointer.grab_sy);
            self.actions.push(CoreAction::PointerMotion {
                seat,
                surface,
                time,
                sx,
                sy,
            });
        }
    }

    fn send_pointer_button(&mut self, seat: SeatId, time: u32, button: u32, state: ButtonState) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        if let Some(surface) = pointer.focus {
            let serial = self.ids.next_serial();
            self.actions.push(CoreAction::PointerButton {
                seat,
                surface,
                serial,
                time,
                button,
                state,
            });
        }
    }

    // ── Keyboard dispatch ────────────────────────────────────────────

    pub(crate) fn keyboard_grab_key(&mut self, seat: SeatId, time: u32, key: u32, state: KeyState) {
        let Ok(keyboard) = self.keyboard_mut(seat) else {
            return;
        };
        if let KeyboardGrab::Binding { key: bound } = keyboard.grab {
            if key == bound {
                if state == KeyState::Released {
                    keyboard.grab = KeyboardGrab::Default;
                }
                return;
            }
        }
        if let Some(surface) = keyboard.focus {
            let serial = self.ids.next_serial();
            self.actions.push(CoreAction::KeyboardKey {
                seat,
                surface,
                serial,
                time,
                key,
                state,
            });
        }
    }

    pub(crate) fn keyboard_grab_modifiers(&mut self, seat: SeatId) {
        let Ok(seat_ref) = self.seat(seat) else {
            return;
        };
        let modifiers = seat_ref.modifiers;
        let Some(surface) = seat_ref.keyboard.as_ref().and_then(|k| k.focus) else {
            return;
        };
        let serial = self.ids.next_serial();
        self.actions.push(CoreAction::KeyboardModifiers {
            seat,
            surface,
            serial,
            modifiers,
        });
    }

    // ── Interactive operations ───────────────────────────────────────

    /// Start moving `surface` with the pointer. Fullscreen surfaces stay put.
    pub fn surface_move(&mut self, seat: SeatId, surface: SurfaceId) -> CoreResult<()> {
        let s = self.surface(surface)?;
        if s.layer == Some(LayerKind::Fullscreen) {
            return Ok(());
        }
        let (x, y) = (f64::from(s.geometry.x), f64::from(s.geometry.y));
        let pointer = self.pointer_mut(seat)?;
        let grab = PointerGrab::Move {
            surface: Some(surface),
            dx: x - pointer.grab_x,
            dy: y - pointer.grab_y,
        };
        self.start_pointer_grab(seat, grab)
    }

    pub fn surface_resize(&mut self, seat: SeatId, surface: SurfaceId, edges: ResizeEdges) -> CoreResult<()> {
        let s = self.surface(surface)?;
        if s.layer == Some(LayerKind::Fullscreen) || edges.is_empty() {
            return Ok(());
        }
        let grab = PointerGrab::Resize {
            surface: Some(surface),
            edges,
            width: s.geometry.width,
            height: s.geometry.height,
        };
        self.pointer_mut(seat)?;
        self.start_pointer_grab(seat, grab)
    }

    /// Start rotating `surface` about its center.
    pub fn surface_rotate(&mut self, seat: SeatId, surface: SurfaceId) -> CoreResult<()> {
        self.update_transform(surface);
        let s = self.surface(surface)?;
        if s.layer == Some(LayerKind::Fullscreen) {
            return Ok(());
        }
        let center = s.to_global(
            0.5 * s.geometry.width as f32,
            0.5 * s.geometry.height as f32,
        );
        let pointer = self.pointer_mut(seat)?;
        let dx = pointer.x as f32 - center.0;
        let dy = pointer.y as f32 - center.1;
        let r = dx.hypot(dy);

        let rotation = if r > ROTATE_DEAD_ZONE {
            let inverse = Matrix::from_rotation(dx / r, -dy / r);
            self.surface_mut(surface)?.rotation.multiply(&inverse);
            Matrix::from_rotation(dx / r, dy / r)
        } else {
            self.surface_mut(surface)?.rotation = Matrix::identity();
            Matrix::identity()
        };

        self.start_pointer_grab(
            seat,
            PointerGrab::Rotate {
                surface: Some(surface),
                center,
                rotation,
            },
        )
    }

    /// Open a popup grab for `surface`. The grab only starts if `serial`
    /// is still the serial of the click that asked for it; otherwise the
    /// popup is dismissed right away.
    pub fn popup_grab_start(&mut self, seat: SeatId, surface: SurfaceId, serial: u32) -> CoreResult<()> {
        self.surface(surface)?;
        if self.pointer_mut(seat)?.grab_serial == serial {
            self.start_pointer_grab(
                seat,
                PointerGrab::Popup {
                    surface: Some(surface),
                    initial_up: false,
                },
            )
        } else {
            self.actions.push(CoreAction::PopupDone { surface });
            Ok(())
        }
    }

    fn move_grab_motion(&mut self, seat: SeatId, surface: Option<SurfaceId>, dx: f64, dy: f64) {
        let Some(id) = surface else {
            return;
        };
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        let x = (pointer.x + dx) as i32;
        let y = (pointer.y + dy) as i32;
        let Ok(s) = self.surface(id) else {
            return;
        };
        let (width, height) = (s.geometry.width, s.geometry.height);
        if let Err(e) = self.surface_configure(id, x as f32, y as f32, width, height) {
            warn!("Move of {} failed: {}", id, e);
            return;
        }
        self.schedule_repaint_all();
    }

    fn resize_grab_motion(
        &mut self,
        seat: SeatId,
        surface: Option<SurfaceId>,
        edges: ResizeEdges,
        width: i32,
        height: i32,
    ) {
        let Some(id) = surface else {
            return;
        };
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        let (gx, gy, px, py) = (pointer.grab_x, pointer.grab_y, pointer.x, pointer.y);
        let Ok(s) = self.surface(id) else {
            return;
        };
        let (from_x, from_y) = s.from_global(gx as f32, gy as f32);
        let (to_x, to_y) = s.from_global(px as f32, py as f32);

        let mut width = width;
        if edges.contains(ResizeEdges::LEFT) {
            width += (from_x - to_x) as i32;
        } else if edges.contains(ResizeEdges::RIGHT) {
            width += (to_x - from_x) as i32;
        }
        let mut height = height;
        if edges.contains(ResizeEdges::TOP) {
            height += (from_y - to_y) as i32;
        } else if edges.contains(ResizeEdges::BOTTOM) {
            height += (to_y - from_y) as i32;
        }

        self.actions.push(CoreAction::Configure {
            surface: id,
            edges,
            width,
            height,
        });
    }

    fn rotate_grab_motion(
        &mut self,
        seat: SeatId,
        surface: Option<SurfaceId>,
        center: (f32, f32),
        rotation: &mut Matrix,
    ) {
        let Some(id) = surface else {
            return;
        };
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        let (px, py) = (pointer.x as f32, pointer.y as f32);
        let Some(s) = self.surfaces.get_mut(&id) else {
            return;
        };
        let cx = 0.5 * s.geometry.width as f32;
        let cy = 0.5 * s.geometry.height as f32;
        let dx = px - center.0;
        let dy = py - center.1;
        let r = dx.hypot(dy);

        if let Some(link) = s.rotation_transform.take() {
            s.chain.remove(link);
        }
        s.geometry.dirty = true;

        if r > ROTATE_DEAD_ZONE {
            *rotation = Matrix::from_rotation(dx / r, dy / r);
            let mut matrix = Matrix::from_translation(-cx, -cy, 0.0);
            matrix.multiply(&s.rotation);
            matrix.multiply(rotation);
            matrix.translate(cx, cy, 0.0);
            if let Ok(link) = s.chain.insert(matrix, ChainPlacement::BeforePosition) {
                s.rotation_transform = Some(link);
            }
        } else {
            s.rotation = Matrix::identity();
            *rotation = Matrix::identity();
        }

        // Keep the center under the grab point if the surface was resized
        // while rotated.
        let dposx = center.0 - (s.geometry.x + cx);
        let dposy = center.1 - (s.geometry.y + cy);
        if dposx != 0.0 || dposy != 0.0 {
            s.geometry.x += dposx;
            s.geometry.y += dposy;
        }
        self.schedule_repaint_all();
    }

    fn popup_grab_button(
        &mut self,
        seat: SeatId,
        time: u32,
        button: u32,
        state: ButtonState,
        surface: Option<SurfaceId>,
        initial_up: &mut bool,
    ) -> GrabControl {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return GrabControl::Continue;
        };
        let mut control = GrabControl::Continue;
        if pointer.focus.is_some() {
            self.send_pointer_button(seat, time, button, state);
        } else if state == ButtonState::Released
            && (*initial_up || time.wrapping_sub(pointer.grab_time) > POPUP_CLICK_MS)
        {
            if let Some(surface) = surface {
                self.actions.push(CoreAction::PopupDone { surface });
            }
            control = GrabControl::End;
        }
        if state == ButtonState::Released {
            *initial_up = true;
        }
        control
    }
}
