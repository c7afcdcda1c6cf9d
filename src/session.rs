//! Scripted headless session.
//!
//! Maps one window with a fade-in, drags it with the move binding, then
//! zooms the output in.

use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;

use tessera_backend_headless::{FrameReport, HeadlessBackend};
use tessera_core::config::Config;
use tessera_core::input::keys::{BTN_LEFT, KEY_LEFTMETA, KEY_PAGEUP};
use tessera_core::input::{ButtonState, KeyState, KeyStateUpdate};
use tessera_core::layer::LayerKind;
use tessera_core::surface::{ClientId, SurfaceRole};
use tessera_core::{CoreEvent, SeatId};

const DRAG_STEPS: u32 = 24;

pub fn run(config: Config, frames: usize) -> Result<Vec<FrameReport>> {
    if config.outputs.is_empty() {
        bail!("No outputs configured");
    }
    let mut backend = HeadlessBackend::new(config)?;

    let comp = backend.compositor();
    let seat = comp.seat_create("seat0")?;
    comp.seat_init_pointer(seat)?;
    comp.seat_init_keyboard(seat)?;

    let window = comp.surface_create(ClientId(1))?;
    comp.surface_set_role(window, SurfaceRole::Toplevel { layer: LayerKind::Normal })?;
    comp.surface_set_position(window, 100.0, 100.0)?;
    let buffer = comp.buffer_create(320, 240)?;
    comp.surface_attach(window, Some(buffer))?;
    comp.surface_fade_run(window)?;
    info!("Window {} mapped", window);

    for event in script(seat) {
        backend.queue_input(event);
    }

    let deadline = Duration::from_millis(100 * frames as u64 + 1000);
    backend.run_frames(frames, deadline)?;
    Ok(backend.frames())
}

fn key(seat: SeatId, time: u32, key: u32, state: KeyState) -> CoreEvent {
    CoreEvent::Key {
        seat,
        time,
        key,
        state,
        update: KeyStateUpdate::Automatic,
    }
}

fn button(seat: SeatId, time: u32, state: ButtonState) -> CoreEvent {
    CoreEvent::PointerButton {
        seat,
        time,
        button: BTN_LEFT,
        state,
    }
}

fn script(seat: SeatId) -> Vec<CoreEvent> {
    let mut events = vec![
        CoreEvent::PointerMotion {
            seat,
            time: 0,
            x: 200.0,
            y: 150.0,
        },
        key(seat, 1, KEY_LEFTMETA, KeyState::Pressed),
        button(seat, 2, ButtonState::Pressed),
    ];

    let mut time = 3;
    for step in 1..=DRAG_STEPS {
        events.push(CoreEvent::PointerMotion {
            seat,
            time,
            x: 200.0 + f64::from(step) * 10.0,
            y: 150.0 + f64::from(step) * 4.0,
        });
        time += 16;
    }

    events.extend([
        button(seat, time, ButtonState::Released),
        key(seat, time + 1, KEY_PAGEUP, KeyState::Pressed),
        key(seat, time + 2, KEY_PAGEUP, KeyState::Released),
        key(seat, time + 3, KEY_LEFTMETA, KeyState::Released),
    ]);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tessera_core::config::OutputConfig;

    #[test]
    fn script_drags_with_super_held() {
        let events = script(SeatId(1));
        assert_eq!(events.len(), 3 + DRAG_STEPS as usize + 4);
        assert!(matches!(
            events[1],
            CoreEvent::Key {
                key: KEY_LEFTMETA,
                state: KeyState::Pressed,
                ..
            }
        ));
    }

    #[test]
    fn session_paints_frames() {
        let mut config = Config::default();
        config.outputs = vec![OutputConfig {
            refresh: 500_000,
            ..OutputConfig::default()
        }];
        let reports = run(config, 5).unwrap();
        assert!(reports.len() >= 5);
        assert!(reports.iter().skip(1).all(|r| r.msecs >= reports[0].msecs));
    }

    #[test]
    fn no_outputs_is_an_error() {
        assert!(run(Config::empty(), 1).is_err());
    }
}
