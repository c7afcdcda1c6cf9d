//! Raw device events.
//!
//! Backends report input through these methods. Each one does the idle
//! bookkeeping, updates device state, runs bindings and then hands the
//! event to the device's grab.

use tracing::{debug, trace};

use super::grab::KeyboardGrab;
use super::{Axis, ButtonState, KeyState, KeyStateUpdate, Modifiers, SeatId, TouchType};
use crate::error::CoreResult;
use crate::event::CoreAction;
use crate::output::OutputId;
use crate::surface::SurfaceId;
use crate::Compositor;

impl Compositor {
    // ── Hit testing ──────────────────────────────────────────────────

    /// Front-most surface whose input region contains the global point,
    /// with the point in that surface's coordinates.
    pub fn pick_surface(&mut self, x: f64, y: f64) -> Option<(SurfaceId, f64, f64)> {
        self.ensure_surface_list();
        let order: Vec<SurfaceId> = self.surface_list.iter().rev().copied().collect();
        for id in order {
            self.update_transform(id);
            let Some(surface) = self.surfaces.get(&id) else {
                continue;
            };
            let (sx, sy) = surface.from_global(x as f32, y as f32);
            if surface.accepts_input_at(sx.floor() as i32, sy.floor() as i32) {
                return Some((id, f64::from(sx), f64::from(sy)));
            }
        }
        None
    }

    /// Recompute the surface under the pointer. The grab is told when it
    /// changed; its focus coordinates are refreshed either way.
    pub fn repick(&mut self, seat: SeatId) {
        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        let (x, y) = (pointer.x, pointer.y);
        let (current, sx, sy) = match self.pick_surface(x, y) {
            Some((id, sx, sy)) => (Some(id), sx, sy),
            None => (None, 0.0, 0.0),
        };

        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        let changed = pointer.current != current;
        pointer.current = current;
        pointer.current_sx = sx;
        pointer.current_sy = sy;
        if changed {
            trace!("Seat {} pointer over {:?}", seat, current);
            self.pointer_grab_focus(seat, current, sx, sy);
        }

        let Ok(pointer) = self.pointer_mut(seat) else {
            return;
        };
        if let Some(focus) = pointer.grab_focus {
            let (x, y) = (pointer.x as f32, pointer.y as f32);
            if let Some(surface) = self.surfaces.get(&focus) {
                let (gx, gy) = surface.from_global(x, y);
                if let Ok(pointer) = self.pointer_mut(seat) {
                    pointer.grab_sx = f64::from(gx);
                    pointer.grab_sy = f64::from(gy);
                }
            }
        }
    }

    /// Repick every seat. Does nothing while the compositor has no input
    /// focus.
    pub fn repick_all(&mut self) {
        if !self.focus {
            return;
        }
        for seat in self.seat_ids() {
            self.repick(seat);
        }
    }

    /// Keep the pointer on screen. A point outside every output is clamped
    /// to the output that held the previous position.
    fn clip_pointer_motion(&self, seat: SeatId, x: f64, y: f64) -> CoreResult<(f64, f64)> {
        let pointer = self.seat(seat)?.pointer.as_ref();
        let (old_x, old_y) = pointer.map_or((0.0, 0.0), |p| (p.x, p.y));
        let (ix, iy) = (x.floor() as i32, y.floor() as i32);

        if self.outputs.values().any(|o| o.contains_point(ix, iy)) {
            return Ok((x, y));
        }
        let Some(prev) = self
            .outputs
            .values()
            .find(|o| o.contains_point(old_x.floor() as i32, old_y.floor() as i32))
        else {
            return Ok((x, y));
        };

        let mode = prev.current_mode();
        let (mut x, mut y) = (x, y);
        if ix < prev.x {
            x = f64::from(prev.x);
        } else if ix >= prev.x + mode.width {
            x = f64::from(prev.x + mode.width - 1);
        }
        if iy < prev.y {
            y = f64::from(prev.y);
        } else if iy >= prev.y + mode.height {
            y = f64::from(prev.y + mode.height - 1);
        }
        Ok((x, y))
    }

    // ── Pointer ──────────────────────────────────────────────────────

    pub fn notify_motion(&mut self, seat: SeatId, time: u32, x: f64, y: f64) -> CoreResult<()> {
        self.pointer_mut(seat)?;
        self.activity();

        let (x, y) = self.clip_pointer_motion(seat, x, y)?;
        let (old_x, old_y) = {
            let pointer = self.pointer_mut(seat)?;
            (pointer.x, pointer.y)
        };
        self.update_drag_icon(seat, x - old_x, y - old_y)?;
        let pointer = self.pointer_mut(seat)?;
        pointer.x = x;
        pointer.y = y;

        let (ix, iy) = (x.floor() as i32, y.floor() as i32);
        let zoomed: Vec<OutputId> = self
            .outputs
            .values_mut()
            .filter(|o| o.zoom.active && o.contains_point(ix, iy))
            .map(|o| {
                o.zoom.focus = (x, y);
                o.dirty = true;
                o.id
            })
            .collect();
        for id in zoomed {
            self.schedule_repaint(id);
        }

        self.repick(seat);
        self.pointer_grab_motion(seat, time);

        let s = self.seat(seat)?;
        if let Some(sprite) = s.sprite {
            let (hx, hy) = s.hotspot;
            self.surface_set_position(sprite, (ix - hx) as f32, (iy - hy) as f32)?;
            self.schedule_repaint_all();
        }
        Ok(())
    }

    pub fn notify_button(&mut self, seat: SeatId, time: u32, button: u32, state: ButtonState) -> CoreResult<()> {
        self.pointer_mut(seat)?;
        match state {
            ButtonState::Pressed => {
                self.idle_inhibit();
                let pointer = self.pointer_mut(seat)?;
                if pointer.button_count == 0 {
                    pointer.grab_button = button;
                    pointer.grab_time = time;
                    pointer.grab_x = pointer.x;
                    pointer.grab_y = pointer.y;
                }
                pointer.button_count += 1;
            }
            ButtonState::Released => {
                self.idle_release();
                let pointer = self.pointer_mut(seat)?;
                pointer.button_count = pointer.button_count.saturating_sub(1);
            }
        }

        self.run_button_bindings(seat, time, button, state);
        self.pointer_grab_button(seat, time, button, state);

        let serial = self.ids.serial();
        let pointer = self.pointer_mut(seat)?;
        if pointer.button_count == 1 {
            pointer.grab_serial = serial;
        }
        Ok(())
    }

    pub fn notify_axis(&mut self, seat: SeatId, time: u32, axis: Axis, value: f64) -> CoreResult<()> {
        let focus = self.pointer_mut(seat)?.focus;
        self.activity();
        if value == 0.0 {
            return Ok(());
        }

        self.run_axis_bindings(seat, time, axis, value);

        if let Some(surface) = focus.filter(|s| self.surfaces.contains_key(s)) {
            self.actions.push(CoreAction::PointerAxis {
                seat,
                surface,
                time,
                axis,
                value,
            });
        }
        Ok(())
    }

    /// The pointer entered (`Some`) or left (`None`) the compositor's
    /// outputs. While it is away, repicking stops.
    pub fn notify_pointer_focus(
        &mut self,
        seat: SeatId,
        output: Option<OutputId>,
        x: f64,
        y: f64,
    ) -> CoreResult<()> {
        match output {
            Some(_) => {
                let pointer = self.pointer_mut(seat)?;
                let (dx, dy) = (x - pointer.x, y - pointer.y);
                self.update_drag_icon(seat, dx, dy)?;
                let pointer = self.pointer_mut(seat)?;
                pointer.x = x;
                pointer.y = y;
                self.focus = true;
            }
            None => {
                self.seat(seat)?;
                self.focus = false;
            }
        }
        debug!("Compositor focus {}", self.focus);
        self.repick_all();
        Ok(())
    }

    // ── Keyboard ─────────────────────────────────────────────────────

    pub fn notify_key(
        &mut self,
        seat: SeatId,
        time: u32,
        key: u32,
        state: KeyState,
        update: KeyStateUpdate,
    ) -> CoreResult<()> {
        let keyboard = self.keyboard_mut(seat)?;
        // Repeats generated by the backend.
        if state == KeyState::Pressed && keyboard.keys.contains(&key) {
            return Ok(());
        }

        match state {
            KeyState::Pressed => {
                self.idle_inhibit();
                let keyboard = self.keyboard_mut(seat)?;
                keyboard.grab_key = key;
                keyboard.grab_time = time;
                keyboard.keys.push(key);
            }
            KeyState::Released => {
                self.idle_release();
                self.keyboard_mut(seat)?.keys.retain(|k| *k != key);
            }
        }

        if self.keyboard_mut(seat)?.grab == KeyboardGrab::Default {
            self.run_key_bindings(seat, time, key, state);
        }
        self.keyboard_grab_key(seat, time, key, state);

        if update == KeyStateUpdate::Automatic {
            self.update_modifier_state(seat)?;
        }
        Ok(())
    }

    /// Modifier state reported by the backend, for `KeyStateUpdate::None`.
    pub fn notify_modifiers(&mut self, seat: SeatId, modifiers: Modifiers) -> CoreResult<()> {
        let s = self.seat_mut(seat)?;
        if s.modifiers == modifiers {
            return Ok(());
        }
        s.modifiers = modifiers;
        self.keyboard_grab_modifiers(seat);
        Ok(())
    }

    /// Derive modifiers from the held keys.
    fn update_modifier_state(&mut self, seat: SeatId) -> CoreResult<()> {
        let modifiers = self
            .keyboard_mut(seat)?
            .keys
            .iter()
            .filter_map(|k| Modifiers::from_keycode(*k))
            .fold(Modifiers::empty(), |acc, m| acc | m);
        self.notify_modifiers(seat, modifiers)
    }

    /// The compositor regained keyboard focus with `keys` already held.
    /// Bindings for those keys run again and the focus saved at focus-out
    /// is restored if that surface still exists.
    pub fn notify_keyboard_focus_in(
        &mut self,
        seat: SeatId,
        keys: &[u32],
        update: KeyStateUpdate,
    ) -> CoreResult<()> {
        self.keyboard_mut(seat)?.keys = keys.to_vec();
        for _ in keys {
            self.idle_inhibit();
        }
        if update == KeyStateUpdate::Automatic {
            self.update_modifier_state(seat)?;
        }

        for &key in keys {
            self.run_key_bindings(seat, 0, key, KeyState::Pressed);
        }

        let saved = self.keyboard_mut(seat)?.saved_focus.take();
        if let Some(surface) = saved.filter(|s| self.surfaces.contains_key(s)) {
            self.set_keyboard_focus(seat, Some(surface));
        }
        Ok(())
    }

    pub fn notify_keyboard_focus_out(&mut self, seat: SeatId) -> CoreResult<()> {
        let keyboard = self.keyboard_mut(seat)?;
        let held = keyboard.keys.len();
        keyboard.saved_focus = keyboard.focus;
        for _ in 0..held {
            self.idle_release();
        }

        self.seat_mut(seat)?.modifiers = Modifiers::empty();
        self.set_keyboard_focus(seat, None);
        self.end_keyboard_grab(seat)
    }

    /// Give `surface` keyboard focus on `seat` and report the activation.
    pub fn surface_activate(&mut self, surface: SurfaceId, seat: SeatId) -> CoreResult<()> {
        self.surface(surface)?;
        if self.seat(seat)?.keyboard.is_some() {
            self.set_keyboard_focus(seat, Some(surface));
        }
        self.actions.push(CoreAction::Activated { seat, surface });
        Ok(())
    }

    // ── Touch ────────────────────────────────────────────────────────

    /// The first finger down picks the surface; every other finger goes to
    /// it until all points are up again.
    pub fn notify_touch(
        &mut self,
        seat: SeatId,
        time: u32,
        id: i32,
        x: f64,
        y: f64,
        kind: TouchType,
    ) -> CoreResult<()> {
        self.touch_mut(seat)?;
        match kind {
            TouchType::Down => {
                self.idle_inhibit();
                let touch = self.touch_mut(seat)?;
                touch.points += 1;
                let first = touch.points == 1;
                let focus = touch.focus;

                let target = if first {
                    let picked = self.pick_surface(x, y);
                    self.touch_mut(seat)?.focus = picked.map(|(s, _, _)| s);
                    picked
                } else {
                    focus.and_then(|s| self.surface_local(s, x, y))
                };

                if let Some((surface, sx, sy)) = target {
                    let serial = self.ids.next_serial();
                    self.actions.push(CoreAction::TouchDown {
                        seat,
                        surface,
                        serial,
                        time,
                        id,
                        sx,
                        sy,
                    });
                }
            }
            TouchType::Motion => {
                let focus = self.touch_mut(seat)?.focus;
                if let Some((surface, sx, sy)) = focus.and_then(|s| self.surface_local(s, x, y)) {
                    self.actions.push(CoreAction::TouchMotion {
                        seat,
                        surface,
                        time,
                        id,
                        sx,
                        sy,
                    });
                }
            }
            TouchType::Up => {
                self.idle_release();
                let touch = self.touch_mut(seat)?;
                touch.points = touch.points.saturating_sub(1);
                let focus = touch.focus;
                if touch.points == 0 {
                    touch.focus = None;
                }

                if let Some(surface) = focus.filter(|s| self.surfaces.contains_key(s)) {
                    let serial = self.ids.next_serial();
                    self.actions.push(CoreAction::TouchUp {
                        seat,
                        surface,
                        serial,
                        time,
                        id,
                    });
                }
            }
        }
        Ok(())
    }

    fn surface_local(&self, id: SurfaceId, x: f64, y: f64) -> Option<(SurfaceId, f64, f64)> {
        let surface = self.surfaces.get(&id)?;
        let (sx, sy) = surface.from_global(x as f32, y as f32);
        Some((id, f64::from(sx), f64::from(sy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::input::keys::*;
    use crate::input::{Binding, BindingAction, Trigger};
    use crate::layer::LayerKind;
    use crate::region::{Rect, Region};
    use crate::surface::{ClientId, SurfaceRole};
    use crate::test_util::{headless_output, NullBackend};
    use pretty_assertions::assert_eq;

    fn setup() -> (Compositor, SeatId) {
        let mut comp = Compositor::new(Config::empty());
        comp.output_init(headless_output("A", 0, 0, 800, 600), Box::new(NullBackend))
            .unwrap();
        let seat = comp.seat_create("seat0").unwrap();
        comp.seat_init_pointer(seat).unwrap();
        comp.seat_init_keyboard(seat).unwrap();
        comp.seat_init_touch(seat).unwrap();
        (comp, seat)
    }

    fn window(comp: &mut Compositor, client: u32, rect: Rect) -> SurfaceId {
        let id = comp.surface_create(ClientId(client)).unwrap();
        comp.surface_set_role(id, SurfaceRole::Toplevel { layer: LayerKind::Normal })
            .unwrap();
        comp.surface_configure(id, rect.x1 as f32, rect.y1 as f32, 0, 0)
            .unwrap();
        let buffer = comp.buffer_create(rect.width(), rect.height()).unwrap();
        comp.surface_attach(id, Some(buffer)).unwrap();
        id
    }

    fn press(comp: &mut Compositor, seat: SeatId, key: u32) {
        comp.notify_key(seat, 0, key, KeyState::Pressed, KeyStateUpdate::Automatic)
            .unwrap();
    }

    fn release(comp: &mut Compositor, seat: SeatId, key: u32) {
        comp.notify_key(seat, 0, key, KeyState::Released, KeyStateUpdate::Automatic)
            .unwrap();
    }

    #[test]
    fn pick_honours_stacking_and_input_region() {
        let (mut comp, _) = setup();
        let back = window(&mut comp, 1, Rect::new(0, 0, 200, 200));
        let front = window(&mut comp, 1, Rect::new(50, 50, 100, 100));

        assert_eq!(comp.pick_surface(60.5, 70.25), Some((front, 10.5, 20.25)));
        assert_eq!(comp.pick_surface(10.0, 10.0), Some((back, 10.0, 10.0)));
        assert_eq!(comp.pick_surface(500.0, 500.0), None);

        // Clicks fall through an empty input region.
        comp.surface_set_input_region(front, Some(&Region::new())).unwrap();
        assert_eq!(comp.pick_surface(60.0, 60.0), Some((back, 60.0, 60.0)));
    }

    #[test]
    fn motion_sends_enter_then_motion() {
        let (mut comp, seat) = setup();
        let s = window(&mut comp, 1, Rect::new(100, 100, 50, 50));
        comp.take_actions();

        comp.notify_motion(seat, 7, 110.0, 120.0).unwrap();
        let actions: Vec<_> = comp
            .take_actions()
            .into_iter()
            .filter(|a| !matches!(a, CoreAction::ResetIdleTimer { .. }))
            .collect();
        assert!(matches!(
            actions.as_slice(),
            [
                CoreAction::PointerEnter { surface, sx, sy, .. },
                CoreAction::PointerMotion { time: 7, sx: mx, sy: my, .. },
            ] if *surface == s && (*sx, *sy) == (10.0, 20.0) && (*mx, *my) == (10.0, 20.0)
        ));
    }

    #[test]
    fn pointer_is_clamped_to_previous_output() {
        let (mut comp, seat) = setup();
        comp.notify_motion(seat, 0, 790.0, 300.0).unwrap();
        comp.notify_motion(seat, 1, 900.0, -20.0).unwrap();
        let pointer = comp.seat(seat).unwrap().pointer().unwrap();
        assert_eq!((pointer.x, pointer.y), (799.0, 0.0));
    }

    #[test]
    fn held_buttons_keep_focus() {
        let (mut comp, seat) = setup();
        let a = window(&mut comp, 1, Rect::new(0, 0, 100, 100));
        let b = window(&mut comp, 1, Rect::new(200, 0, 100, 100));

        comp.notify_motion(seat, 0, 50.0, 50.0).unwrap();
        comp.notify_button(seat, 1, BTN_LEFT, ButtonState::Pressed).unwrap();
        comp.notify_motion(seat, 2, 250.0, 50.0).unwrap();
        assert_eq!(comp.seat(seat).unwrap().pointer().unwrap().focus, Some(a));

        comp.notify_button(seat, 3, BTN_LEFT, ButtonState::Released).unwrap();
        let pointer = comp.seat(seat).unwrap().pointer().unwrap();
        assert_eq!(pointer.focus, Some(b));
        assert_eq!(pointer.button_count, 0);
    }

    #[test]
    fn losing_compositor_focus_stops_repick() {
        let (mut comp, seat) = setup();
        let s = window(&mut comp, 1, Rect::new(0, 0, 100, 100));
        comp.notify_pointer_focus(seat, None, 0.0, 0.0).unwrap();
        comp.repick_all();
        assert_eq!(comp.seat(seat).unwrap().pointer().unwrap().current, None);

        let output = comp.output_ids()[0];
        comp.notify_pointer_focus(seat, Some(output), 10.0, 10.0).unwrap();
        assert_eq!(comp.seat(seat).unwrap().pointer().unwrap().focus, Some(s));
    }

    #[test]
    fn key_repeats_are_ignored() {
        let (mut comp, seat) = setup();
        let s = window(&mut comp, 1, Rect::new(0, 0, 10, 10));
        comp.surface_activate(s, seat).unwrap();
        press(&mut comp, seat, 30);
        comp.take_actions();

        press(&mut comp, seat, 30);
        assert!(comp.take_actions().is_empty());
        assert_eq!(comp.idle_inhibit_count(), 1);

        release(&mut comp, seat, 30);
        assert_eq!(comp.idle_inhibit_count(), 0);
        assert!(comp.seat(seat).unwrap().keyboard().unwrap().keys.is_empty());
    }

    #[test]
    fn modifiers_follow_held_keys() {
        let (mut comp, seat) = setup();
        press(&mut comp, seat, KEY_LEFTCTRL);
        press(&mut comp, seat, KEY_LEFTALT);
        assert_eq!(comp.seat(seat).unwrap().modifiers(), Modifiers::CTRL | Modifiers::ALT);
        release(&mut comp, seat, KEY_LEFTCTRL);
        assert_eq!(comp.seat(seat).unwrap().modifiers(), Modifiers::ALT);
    }

    #[test]
    fn key_binding_swallows_press_and_release() {
        let (mut comp, seat) = setup();
        let s = window(&mut comp, 1, Rect::new(0, 0, 10, 10));
        comp.surface_activate(s, seat).unwrap();
        comp.add_binding(Binding::new(
            Trigger::Key(KEY_BACKSPACE),
            Modifiers::CTRL | Modifiers::ALT,
            BindingAction::Terminate,
        ))
        .unwrap();

        press(&mut comp, seat, KEY_LEFTCTRL);
        press(&mut comp, seat, KEY_LEFTALT);
        comp.take_actions();
        press(&mut comp, seat, KEY_BACKSPACE);
        release(&mut comp, seat, KEY_BACKSPACE);

        let actions = comp.take_actions();
        assert!(actions.contains(&CoreAction::Terminate));
        assert!(!actions
            .iter()
            .any(|a| matches!(a, CoreAction::KeyboardKey { key: KEY_BACKSPACE, .. })));
        assert!(comp.should_exit());
        assert_eq!(*comp.seat(seat).unwrap().keyboard().unwrap().grab(), KeyboardGrab::Default);
    }

    #[test]
    fn binding_needs_exact_modifiers() {
        let (mut comp, seat) = setup();
        comp.add_binding(Binding::new(
            Trigger::Key(KEY_BACKSPACE),
            Modifiers::CTRL,
            BindingAction::Terminate,
        ))
        .unwrap();
        press(&mut comp, seat, KEY_LEFTCTRL);
        press(&mut comp, seat, KEY_LEFTSHIFT);
        press(&mut comp, seat, KEY_BACKSPACE);
        assert!(!comp.should_exit());
    }

    #[test]
    fn keyboard_focus_is_saved_across_focus_out() {
        let (mut comp, seat) = setup();
        let s = window(&mut comp, 1, Rect::new(0, 0, 10, 10));
        comp.surface_activate(s, seat).unwrap();
        press(&mut comp, seat, KEY_LEFTSHIFT);

        comp.notify_keyboard_focus_out(seat).unwrap();
        let keyboard = comp.seat(seat).unwrap().keyboard().unwrap();
        assert_eq!(keyboard.focus, None);
        assert_eq!(keyboard.saved_focus, Some(s));
        assert_eq!(comp.seat(seat).unwrap().modifiers(), Modifiers::empty());
        assert_eq!(comp.idle_inhibit_count(), 0);

        comp.notify_keyboard_focus_in(seat, &[KEY_LEFTSHIFT], KeyStateUpdate::Automatic)
            .unwrap();
        let keyboard = comp.seat(seat).unwrap().keyboard().unwrap();
        assert_eq!(keyboard.focus, Some(s));
        assert_eq!(keyboard.saved_focus, None);
        assert_eq!(comp.seat(seat).unwrap().modifiers(), Modifiers::SHIFT);
    }

    #[test]
    fn saved_focus_does_not_outlive_surface() {
        let (mut comp, seat) = setup();
        let s = window(&mut comp, 1, Rect::new(0, 0, 10, 10));
        comp.surface_activate(s, seat).unwrap();
        comp.notify_keyboard_focus_out(seat).unwrap();
        comp.surface_destroy(s).unwrap();
        comp.notify_keyboard_focus_in(seat, &[], KeyStateUpdate::Automatic)
            .unwrap();
        assert_eq!(comp.seat(seat).unwrap().keyboard().unwrap().focus, None);
    }

    #[test]
    fn touch_session_sticks_to_first_surface() {
        let (mut comp, seat) = setup();
        let a = window(&mut comp, 1, Rect::new(0, 0, 100, 100));
        let _b = window(&mut comp, 1, Rect::new(200, 0, 100, 100));
        comp.take_actions();

        comp.notify_touch(seat, 0, 0, 10.0, 10.0, TouchType::Down).unwrap();
        comp.notify_touch(seat, 1, 1, 250.0, 10.0, TouchType::Down).unwrap();
        let downs: Vec<_> = comp
            .take_actions()
            .into_iter()
            .filter_map(|a| match a {
                CoreAction::TouchDown { surface, sx, .. } => Some((surface, sx)),
                _ => None,
            })
            .collect();
        assert_eq!(downs, vec![(a, 10.0), (a, 250.0)]);

        comp.notify_touch(seat, 2, 0, 0.0, 0.0, TouchType::Up).unwrap();
        assert_eq!(comp.seat(seat).unwrap().touch().unwrap().focus, Some(a));
        comp.notify_touch(seat, 3, 1, 0.0, 0.0, TouchType::Up).unwrap();
        assert_eq!(comp.seat(seat).unwrap().touch().unwrap().focus, None);
        assert_eq!(comp.idle_inhibit_count(), 0);
    }

    #[test]
    fn cursor_sprite_follows_pointer() {
        let (mut comp, seat) = setup();
        let sprite = comp.surface_create(ClientId(1)).unwrap();
        let buffer = comp.buffer_create(16, 16).unwrap();
        comp.surface_attach(sprite, Some(buffer)).unwrap();
        comp.seat_set_cursor(seat, Some(sprite), (4, 4)).unwrap();

        comp.notify_motion(seat, 0, 100.0, 50.0).unwrap();
        let g = comp.surface(sprite).unwrap().geometry;
        assert_eq!((g.x, g.y), (96.0, 46.0));
        // The sprite never steals the pointer.
        assert_eq!(comp.seat(seat).unwrap().pointer().unwrap().focus, None);
    }
}
