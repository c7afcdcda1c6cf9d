//! Seats and their devices.

use tracing::{debug, warn};

use super::grab::{KeyboardGrab, PointerGrab};
use super::{Modifiers, SeatId};
use crate::error::{CoreError, CoreResult};
use crate::event::CoreAction;
use crate::layer::LayerKind;
use crate::region::Region;
use crate::surface::{Stacking, SurfaceId, SurfaceRole};
use crate::Compositor;

#[derive(Debug, Clone, Default)]
pub struct Pointer {
    /// Global position.
    pub x: f64,
    pub y: f64,
    /// Surface receiving pointer events.
    pub focus: Option<SurfaceId>,
    /// Surface under the pointer, whatever the grab decided.
    pub current: Option<SurfaceId>,
    pub current_sx: f64,
    pub current_sy: f64,
    pub(crate) grab: PointerGrab,
    /// Bumped whenever a grab starts or ends.
    pub(crate) grab_generation: u64,
    /// Surface the grab reports motion against, with local coordinates.
    pub(crate) grab_focus: Option<SurfaceId>,
    pub(crate) grab_sx: f64,
    pub(crate) grab_sy: f64,
    pub button_count: u32,
    pub grab_serial: u32,
    pub grab_button: u32,
    pub grab_time: u32,
    /// Position of the first button press of the current click.
    pub grab_x: f64,
    pub grab_y: f64,
}

impl Pointer {
    pub const fn grab(&self) -> &PointerGrab {
        &self.grab
    }
}

#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    pub focus: Option<SurfaceId>,
    /// Keys currently held, in press order.
    pub keys: Vec<u32>,
    pub(crate) grab: KeyboardGrab,
    pub grab_key: u32,
    pub grab_time: u32,
    /// Focus remembered across a focus-out of the whole compositor.
    pub saved_focus: Option<SurfaceId>,
}

impl Keyboard {
    pub const fn grab(&self) -> &KeyboardGrab {
        &self.grab
    }
}

#[derive(Debug, Clone, Default)]
pub struct Touch {
    /// Surface picked by the first finger of the session.
    pub focus: Option<SurfaceId>,
    pub points: u32,
}

#[derive(Debug, Clone)]
pub struct Seat {
    pub id: SeatId,
    pub name: String,
    pub(crate) pointer: Option<Pointer>,
    pub(crate) keyboard: Option<Keyboard>,
    pub(crate) touch: Option<Touch>,
    pub(crate) modifiers: Modifiers,
    pub(crate) sprite: Option<SurfaceId>,
    pub(crate) hotspot: (i32, i32),
    /// Icon dragged along with the pointer during a drag and drop.
    pub(crate) drag_icon: Option<SurfaceId>,
}

impl Seat {
    pub const fn pointer(&self) -> Option<&Pointer> {
        self.pointer.as_ref()
    }

    pub const fn keyboard(&self) -> Option<&Keyboard> {
        self.keyboard.as_ref()
    }

    pub const fn touch(&self) -> Option<&Touch> {
        self.touch.as_ref()
    }

    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub const fn sprite(&self) -> Option<SurfaceId> {
        self.sprite
    }

    pub const fn hotspot(&self) -> (i32, i32) {
        self.hotspot
    }

    pub const fn drag_icon(&self) -> Option<SurfaceId> {
        self.drag_icon
    }
}

impl Compositor {
    // ── Lookup ───────────────────────────────────────────────────────

    pub fn seat(&self, id: SeatId) -> CoreResult<&Seat> {
        self.seats.get(&id).ok_or(CoreError::UnknownSeat(id))
    }

    pub(crate) fn seat_mut(&mut self, id: SeatId) -> CoreResult<&mut Seat> {
        self.seats.get_mut(&id).ok_or(CoreError::UnknownSeat(id))
    }

    pub fn seat_ids(&self) -> Vec<SeatId> {
        self.seats.keys().copied().collect()
    }

    pub(crate) fn pointer_mut(&mut self, id: SeatId) -> CoreResult<&mut Pointer> {
        self.seat_mut(id)?
            .pointer
            .as_mut()
            .ok_or(CoreError::MissingCapability {
                seat: id,
                capability: "pointer",
            })
    }

    pub(crate) fn keyboard_mut(&mut self, id: SeatId) -> CoreResult<&mut Keyboard> {
        self.seat_mut(id)?
            .keyboard
            .as_mut()
            .ok_or(CoreError::MissingCapability {
                seat: id,
                capability: "keyboard",
            })
    }

    pub(crate) fn touch_mut(&mut self, id: SeatId) -> CoreResult<&mut Touch> {
        self.seat_mut(id)?
            .touch
            .as_mut()
            .ok_or(CoreError::MissingCapability {
                seat: id,
                capability: "touch",
            })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Add a seat without any devices.
    pub fn seat_create(&mut self, name: &str) -> CoreResult<SeatId> {
        self.seats
            .try_reserve(1)
            .map_err(|_| CoreError::OutOfMemory)?;
        let id = SeatId(self.ids.next_seat());
        self.seats.insert(
            id,
            Seat {
                id,
                name: name.to_string(),
                pointer: None,
                keyboard: None,
                touch: None,
                modifiers: Modifiers::empty(),
                sprite: None,
                hotspot: (0, 0),
                drag_icon: None,
            },
        );
        debug!("Seat {} '{}' created", id, name);
        Ok(id)
    }

    pub fn seat_init_pointer(&mut self, id: SeatId) -> CoreResult<()> {
        let seat = self.seat_mut(id)?;
        if seat.pointer.is_none() {
            seat.pointer = Some(Pointer::default());
        }
        Ok(())
    }

    pub fn seat_init_keyboard(&mut self, id: SeatId) -> CoreResult<()> {
        let seat = self.seat_mut(id)?;
        if seat.keyboard.is_none() {
            seat.keyboard = Some(Keyboard::default());
        }
        Ok(())
    }

    pub fn seat_init_touch(&mut self, id: SeatId) -> CoreResult<()> {
        let seat = self.seat_mut(id)?;
        if seat.touch.is_none() {
            seat.touch = Some(Touch::default());
        }
        Ok(())
    }

    // ── Focus ────────────────────────────────────────────────────────

    /// Move pointer focus, sending leave/enter when it changes.
    pub(crate) fn set_pointer_focus(&mut self, seat: SeatId, surface: Option<SurfaceId>, sx: f64, sy: f64) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        pointer.grab_focus = surface;
        let old = pointer.focus;
        if old == surface {
            return;
        }
        pointer.focus = surface;

        if let Some(old) = old.filter(|s| self.surfaces.contains_key(s)) {
            let serial = self.ids.next_serial();
            self.actions.push(CoreAction::PointerLeave {
                seat,
                surface: old,
                serial,
            });
        }
        if let Some(new) = surface {
            let serial = self.ids.next_serial();
            self.actions.push(CoreAction::PointerEnter {
                seat,
                surface: new,
                serial,
                sx,
                sy,
            });
        }
    }

    /// Move keyboard focus, sending leave/enter when it changes.
    pub(crate) fn set_keyboard_focus(&mut self, seat: SeatId, surface: Option<SurfaceId>) {
        let Ok(keyboard) = self.keyboard_mut(seat) else {
            return;
        };
        let old = keyboard.focus;
        if old == surface {
            return;
        }
        keyboard.focus = surface;
        let keys = keyboard.keys.clone();

        if let Some(old) = old.filter(|s| self.surfaces.contains_key(s)) {
            let serial = self.ids.next_serial();
            self.actions.push(CoreAction::KeyboardLeave {
                seat,
                surface: old,
                serial,
            });
        }
        if let Some(new) = surface {
            let serial = self.ids.next_serial();
            self.actions.push(CoreAction::KeyboardEnter {
                seat,
                surface: new,
                serial,
                keys,
            });
        }
    }

    /// Clear pointer and keyboard focus held by `id` on every seat.
    pub(crate) fn drop_focus_to(&mut self, id: SurfaceId) {
        for seat in self.seat_ids() {
            let Some(s) = self.seats.get(&seat) else {
                continue;
            };
            let keyboard = s.keyboard.as_ref().is_some_and(|k| k.focus == Some(id));
            let pointer = s.pointer.as_ref().is_some_and(|p| p.focus == Some(id));
            if keyboard {
                self.set_keyboard_focus(seat, None);
            }
            if pointer {
                self.set_pointer_focus(seat, None, 0.0, 0.0);
            }
        }
    }

    /// Let go of every reference a seat holds to a destroyed surface.
    /// Running grabs keep going without their surface.
    pub(crate) fn forget_surface_in_seats(&mut self, id: SurfaceId) {
        let forget = |slot: &mut Option<SurfaceId>| {
            if *slot == Some(id) {
                *slot = None;
            }
        };
        for seat in self.seats.values_mut() {
            if let Some(pointer) = seat.pointer.as_mut() {
                forget(&mut pointer.focus);
                forget(&mut pointer.current);
                forget(&mut pointer.grab_focus);
                pointer.grab.forget_surface(id);
            }
            if let Some(keyboard) = seat.keyboard.as_mut() {
                forget(&mut keyboard.focus);
                forget(&mut keyboard.saved_focus);
            }
            if let Some(touch) = seat.touch.as_mut() {
                forget(&mut touch.focus);
            }
            forget(&mut seat.sprite);
            forget(&mut seat.drag_icon);
        }
    }

    // ── Cursor sprite ────────────────────────────────────────────────

    /// Use `surface` as the pointer image of `seat`, or hide it with `None`.
    pub fn seat_set_cursor(
        &mut self,
        seat: SeatId,
        surface: Option<SurfaceId>,
        hotspot: (i32, i32),
    ) -> CoreResult<()> {
        let old = self.seat(seat)?.sprite;
        if let Some(id) = surface {
            self.surface(id)?;
        }

        if let Some(old) = old.filter(|o| Some(*o) != surface) {
            if self.surface(old)?.is_mapped() {
                self.surface_unmap(old)?;
            }
            self.surface_set_role(old, SurfaceRole::None)?;
        }

        let s = self.seat_mut(seat)?;
        s.sprite = surface;
        s.hotspot = hotspot;
        let Some(id) = surface else {
            return Ok(());
        };

        self.surface_set_role(id, SurfaceRole::Cursor { seat, hotspot })?;
        let buffer = self.surface(id)?.buffer;
        if let Some(size) = buffer.and_then(|b| self.buffers.get(&b)).map(|b| (b.width, b.height)) {
            self.cursor_configure(id, seat, hotspot, size.0, size.1)?;
        }
        Ok(())
    }

    /// Place the sprite at the pointer minus the hotspot, in the cursor
    /// layer. Sprites never take input.
    pub(crate) fn cursor_configure(
        &mut self,
        id: SurfaceId,
        seat: SeatId,
        hotspot: (i32, i32),
        width: i32,
        height: i32,
    ) -> CoreResult<()> {
        let (px, py) = {
            let pointer = self.pointer_mut(seat)?;
            (pointer.x as i32, pointer.y as i32)
        };
        self.seat_mut(seat)?.hotspot = hotspot;
        self.surface_configure(
            id,
            (px - hotspot.0) as f32,
            (py - hotspot.1) as f32,
            width,
            height,
        )?;
        self.surface_mut(id)?.input = Some(Region::new());
        if !self.surface(id)?.is_mapped() {
            self.surface_map(id, LayerKind::Cursor)?;
        }
        Ok(())
    }

    // ── Drag icon ────────────────────────────────────────────────────

    /// Drag `icon` along with the pointer of `seat`, or drop the current
    /// icon with `None`. The icon must not have a role yet.
    pub fn seat_set_drag_icon(&mut self, seat: SeatId, icon: Option<SurfaceId>) -> CoreResult<()> {
        let old = self.seat(seat)?.drag_icon;
        if old == icon {
            return Ok(());
        }
        if let Some(id) = icon {
            if self.surface(id)?.role != SurfaceRole::None {
                return Err(CoreError::RoleTaken(id));
            }
        }
        let (x, y) = {
            let pointer = self.pointer_mut(seat)?;
            (pointer.x, pointer.y)
        };

        self.release_drag_icon(seat)?;
        let Some(id) = icon else {
            return Ok(());
        };
        self.seat_mut(seat)?.drag_icon = Some(id);
        self.surface_set_role(id, SurfaceRole::DragIcon { seat })?;
        let buffer = self.surface(id)?.buffer;
        match buffer.and_then(|b| self.buffers.get(&b)).map(|b| (b.width, b.height)) {
            Some((width, height)) => self.surface_configure(id, x as f32, y as f32, width, height)?,
            None => self.surface_set_position(id, x as f32, y as f32)?,
        }
        debug!("Seat {} drags icon {}", seat, id);
        self.update_drag_icon(seat, 0.0, 0.0)
    }

    fn release_drag_icon(&mut self, seat: SeatId) -> CoreResult<()> {
        let Some(id) = self.seat_mut(seat)?.drag_icon.take() else {
            return Ok(());
        };
        let surface = self.surface_mut(id)?;
        surface.role = SurfaceRole::None;
        surface.input = None;
        if surface.is_mapped() {
            self.surface_unmap(id)?;
        }
        Ok(())
    }

    /// Map the icon once it has a buffer. It goes right behind a mapped
    /// cursor sprite, or to the front of the cursor layer.
    fn map_drag_icon(&mut self, seat: SeatId, id: SurfaceId) -> CoreResult<()> {
        let surface = self.surface(id)?;
        if surface.is_mapped() || surface.buffer.is_none() {
            return Ok(());
        }
        self.surface_map(id, LayerKind::Cursor)?;
        if !self.surface(id)?.is_mapped() {
            return Ok(());
        }

        let sprite = self
            .seat(seat)?
            .sprite
            .filter(|s| self.surfaces.get(s).is_some_and(|s| s.layer == Some(LayerKind::Cursor)));
        if let Some(sprite) = sprite {
            self.surface_restack(id, Stacking::Below(sprite))?;
        }
        self.surface_mut(id)?.input = Some(Region::new());
        Ok(())
    }

    /// Map the icon of `seat` if it can be, then move it by `(dx, dy)`.
    pub(crate) fn update_drag_icon(&mut self, seat: SeatId, dx: f64, dy: f64) -> CoreResult<()> {
        let Some(id) = self.seat(seat)?.drag_icon else {
            return Ok(());
        };
        self.map_drag_icon(seat, id)?;

        // A buffer of another size resets the input region.
        let surface = self.surface_mut(id)?;
        if surface.input.is_none() {
            surface.input = Some(Region::new());
        }
        if dx == 0.0 && dy == 0.0 {
            return Ok(());
        }
        let (x, y) = (surface.geometry.x, surface.geometry.y);
        self.surface_set_position(id, x + dx as f32, y + dy as f32)?;
        self.schedule_repaint_all();
        Ok(())
    }

    pub(crate) fn update_drag_icons(&mut self) {
        for seat in self.seat_ids() {
            if let Err(e) = self.update_drag_icon(seat, 0.0, 0.0) {
                warn!("Drag icon of seat {} not updated: {}", seat, e);
            }
        }
    }

    /// Size the icon to its new buffer, keeping its position.
    pub(crate) fn drag_icon_configure(
        &mut self,
        id: SurfaceId,
        seat: SeatId,
        width: i32,
        height: i32,
    ) -> CoreResult<()> {
        let geometry = self.surface(id)?.geometry;
        self.surface_configure(id, geometry.x, geometry.y, width, height)?;
        self.update_drag_icon(seat, 0.0, 0.0)
    }
}
