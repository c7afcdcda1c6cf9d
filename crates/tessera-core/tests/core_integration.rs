//! Core-only integration tests.
//!
//! These tests drive tessera-core through its public API only, with a
//! recording output backend standing in for a display.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use tessera_core::config::{Config, OutputConfig};
use tessera_core::input::keys::{BTN_LEFT, KEY_LEFTMETA};
use tessera_core::input::{ButtonState, KeyState, KeyStateUpdate, PointerGrab, TouchType};
use tessera_core::layer::LayerKind;
use tessera_core::output::{OutputBackend, PaintFrame};
use tessera_core::region::{Rect, Region};
use tessera_core::surface::{ClientId, SurfaceRole};
use tessera_core::{Compositor, CoreAction, CoreEvent, OutputId, SeatId, SurfaceId};

#[derive(Clone, Default)]
struct Recorder {
    frames: Rc<RefCell<Vec<PaintFrame>>>,
}

impl Recorder {
    fn last_damage(&self) -> Region {
        self.frames
            .borrow()
            .last()
            .map(|f| f.damage.clone())
            .unwrap_or_default()
    }
}

impl OutputBackend for Recorder {
    fn repaint(&mut self, frame: &PaintFrame) {
        self.frames.borrow_mut().push(frame.clone());
    }
}

/// Helper: a compositor with one 1024×768 output at the origin.
fn test_compositor(config: Config) -> (Compositor, OutputId, Recorder) {
    let mut comp = Compositor::new(config);
    let recorder = Recorder::default();
    let info = OutputConfig {
        resolution: "1024x768".to_string(),
        ..OutputConfig::default()
    }
    .info()
    .unwrap();
    let output = comp.output_init(info, Box::new(recorder.clone())).unwrap();
    (comp, output, recorder)
}

fn input_seat(comp: &mut Compositor) -> SeatId {
    let seat = comp.seat_create("seat0").unwrap();
    comp.seat_init_pointer(seat).unwrap();
    comp.seat_init_keyboard(seat).unwrap();
    comp.seat_init_touch(seat).unwrap();
    seat
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

fn window(comp: &mut Compositor, x: f32, y: f32, width: i32, height: i32) -> SurfaceId {
    let id = comp.surface_create(ClientId(1)).unwrap();
    comp.surface_set_role(id, SurfaceRole::Toplevel { layer: LayerKind::Normal })
        .unwrap();
    comp.surface_set_position(id, x, y).unwrap();
    let buffer = comp.buffer_create(width, height).unwrap();
    comp.surface_attach(id, Some(buffer)).unwrap();
    id
}

/// Paint until no carried damage is left.
fn settle(comp: &mut Compositor, output: OutputId, msecs: &mut u32) {
    for _ in 0..3 {
        *msecs += 16;
        comp.repaint_now(output, *msecs).unwrap();
    }
}

// ── Scenario: surface on an output ───────────────────────────────

#[test]
fn attached_surface_enters_output() {
    let (mut comp, output, _) = test_compositor(Config::empty());
    comp.take_actions();

    let s = window(&mut comp, 10.0, 10.0, 200, 100);
    comp.stacking_order();

    let surface = comp.surface(s).unwrap();
    assert_eq!(surface.bounding_box().extents(), Rect::new(10, 10, 200, 100));
    assert_eq!(surface.output(), Some(output));

    let enters: Vec<_> = comp
        .take_actions()
        .into_iter()
        .filter(|a| matches!(a, CoreAction::SurfaceEnter { .. }))
        .collect();
    assert_eq!(enters, vec![CoreAction::SurfaceEnter { surface: s, output }]);
}

// ── Scenario: opaque occlusion ───────────────────────────────────

#[test]
fn front_opaque_surface_clips_damage_to_l_shape() {
    let (mut comp, output, recorder) = test_compositor(Config::empty());
    let b = opaque_surface(&mut comp, Rect::new(50, 50, 100, 100));
    let _a = opaque_surface(&mut comp, Rect::new(0, 0, 100, 100));
    let mut msecs = 0;
    settle(&mut comp, output, &mut msecs);

    comp.surface_damage_all(b).unwrap();
    comp.repaint_now(output, msecs + 16).unwrap();

    let expected = Region::from_rects([Rect::new(100, 50, 50, 100), Rect::new(50, 100, 50, 50)]);
    assert_eq!(recorder.last_damage(), expected);
}

#[test]
fn fully_covered_damage_paints_nothing() {
    let (mut comp, output, recorder) = test_compositor(Config::empty());
    let back = opaque_surface(&mut comp, Rect::new(20, 20, 50, 50));
    let _front = opaque_surface(&mut comp, Rect::new(0, 0, 200, 200));
    let mut msecs = 0;
    settle(&mut comp, output, &mut msecs);

    comp.surface_damage(back, Rect::new(5, 5, 10, 10)).unwrap();
    comp.repaint_now(output, msecs + 16).unwrap();
    assert!(recorder.last_damage().is_empty());
}

// ── Double-buffer carry ──────────────────────────────────────────

#[test]
fn damage_is_carried_for_exactly_one_frame() {
    let (mut comp, output, recorder) = test_compositor(Config::empty());
    let s = opaque_surface(&mut comp, Rect::new(300, 300, 40, 40));
    let mut msecs = 0;
    settle(&mut comp, output, &mut msecs);

    comp.surface_damage_all(s).unwrap();
    comp.repaint_now(output, 100).unwrap();
    let hit = Rect::new(300, 300, 40, 40);
    assert!(recorder.last_damage().contains_point(hit.x1, hit.y1));

    comp.repaint_now(output, 116).unwrap();
    assert!(recorder.last_damage().contains_point(hit.x1, hit.y1));

    comp.repaint_now(output, 132).unwrap();
    assert!(recorder.last_damage().is_empty());
}

// ── Grabs ────────────────────────────────────────────────────────

#[test]
fn move_grab_survives_surface_destruction() {
    let (mut comp, _, _) = test_compositor(Config::default());
    let seat = input_seat(&mut comp);
    let s = window(&mut comp, 0.0, 0.0, 200, 200);

    comp.handle_event(CoreEvent::PointerMotion {
        seat,
        time: 0,
        x: 50.0,
        y: 50.0,
    });
    comp.handle_event(CoreEvent::Key {
        seat,
        time: 1,
        key: KEY_LEFTMETA,
        state: KeyState::Pressed,
        update: KeyStateUpdate::Automatic,
    });
    comp.handle_event(CoreEvent::PointerButton {
        seat,
        time: 2,
        button: BTN_LEFT,
        state: ButtonState::Pressed,
    });
    assert!(matches!(
        comp.seat(seat).unwrap().pointer().unwrap().grab(),
        PointerGrab::Move { .. }
    ));

    comp.surface_destroy(s).unwrap();
    comp.handle_event(CoreEvent::PointerMotion {
        seat,
        time: 3,
        x: 80.0,
        y: 90.0,
    });
    comp.handle_event(CoreEvent::PointerButton {
        seat,
        time: 4,
        button: BTN_LEFT,
        state: ButtonState::Released,
    });

    let pointer = comp.seat(seat).unwrap().pointer().unwrap();
    assert_eq!(pointer.grab(), &PointerGrab::Default);
    assert_eq!(pointer.focus, None);
}

// ── Touch ────────────────────────────────────────────────────────

#[test]
fn second_finger_follows_first_surface() {
    let (mut comp, _, _) = test_compositor(Config::empty());
    let seat = input_seat(&mut comp);
    let left = window(&mut comp, 0.0, 0.0, 100, 100);
    let _right = window(&mut comp, 500.0, 0.0, 100, 100);
    comp.take_actions();

    let touch = |id, x, kind| CoreEvent::Touch {
        seat,
        time: 0,
        id,
        x,
        y: 50.0,
        kind,
    };
    comp.handle_event(touch(0, 50.0, TouchType::Down));
    let actions = comp.handle_event(touch(1, 550.0, TouchType::Down));
    assert!(actions
        .iter()
        .any(|a| matches!(a, CoreAction::TouchDown { surface, id: 1, .. } if *surface == left)));

    let actions = comp.handle_event(touch(1, 560.0, TouchType::Motion));
    assert!(actions
        .iter()
        .any(|a| matches!(a, CoreAction::TouchMotion { surface, .. } if *surface == left)));

    comp.handle_event(touch(0, 0.0, TouchType::Up));
    comp.handle_event(touch(1, 0.0, TouchType::Up));
    assert_eq!(comp.seat(seat).unwrap().touch().unwrap().focus, None);
}

// ── Coordinates ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn untransformed_coordinates_round_trip(
        x in -500.0f32..500.0,
        y in -500.0f32..500.0,
        sx in -1000i32..1000,
        sy in -1000i32..1000,
    ) {
        let (mut comp, _, _) = test_compositor(Config::empty());
        let s = comp.surface_create(ClientId(1)).unwrap();
        comp.surface_configure(s, x, y, 10, 10).unwrap();
        comp.surface_map(s, LayerKind::Normal).unwrap();
        comp.stacking_order();

        let surface = comp.surface(s).unwrap();
        let (gx, gy) = surface.to_global(sx as f32, sy as f32);
        prop_assert_eq!(gx, (x.round() as i32 + sx) as f32);
        prop_assert_eq!(gy, (y.round() as i32 + sy) as f32);
        prop_assert_eq!(surface.from_global_i32(gx as i32, gy as i32), (sx, sy));
    }
}
