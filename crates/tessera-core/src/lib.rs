//! Tessera Core: compositing window-server core
//!
//! This crate owns the scene: surfaces and their transforms, the layer
//! stack, outputs, damage tracking and the repaint state machine, and the
//! input focus and grab machinery. It knows nothing about any display
//! protocol or device.
//!
//! Backends drive it through [`Compositor`] methods and
//! [`handle_event`](Compositor::handle_event), implement
//! [`OutputBackend`](output::OutputBackend) to put frames on screen, and
//! apply the [`CoreAction`]s the core queues.
//!
//! # Quick Start
//! ```
//! use tessera_core::config::Config;
//! use tessera_core::input::{keys::BTN_LEFT, ButtonState};
//! use tessera_core::{Compositor, CoreAction, CoreEvent};
//!
//! let mut comp = Compositor::new(Config::default());
//! let seat = comp.seat_create("seat0")?;
//! comp.seat_init_pointer(seat)?;
//!
//! // The backend reports a click
//! let actions = comp.handle_event(CoreEvent::PointerButton {
//!     seat,
//!     time: 0,
//!     button: BTN_LEFT,
//!     state: ButtonState::Pressed,
//! });
//! // Input counts as activity and restarts the idle timer
//! assert!(actions.contains(&CoreAction::ResetIdleTimer { timeout_ms: 300_000 }));
//! assert!(!comp.should_exit());
//! # Ok::<(), tessera_core::CoreError>(())
//! ```

pub mod animation;
pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod idle;
pub mod input;
pub mod invariants;
pub mod layer;
pub mod list;
pub mod matrix;
pub mod output;
pub mod region;
pub mod repaint;
pub mod surface;
pub mod transform;
pub mod zoom;

#[cfg(test)]
mod test_util;

// Re-export primary API types at crate root
pub use buffer::BufferId;
pub use error::{CoreError, CoreResult};
pub use event::{CoreAction, CoreEvent};
pub use input::SeatId;
pub use output::OutputId;
pub use region::{Rect, Region};
pub use surface::SurfaceId;

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use buffer::Buffer;
use config::Config;
use idle::{CompositorState, FadeState};
use input::{Binding, BindingId, Seat};
use layer::Layers;
use output::Output;
use surface::Surface;

/// Monotonic id and serial sources. Ids are never reused.
#[derive(Debug, Default)]
pub(crate) struct IdCounters {
    surface: u64,
    buffer: u64,
    callback: u64,
    animation: u64,
    binding: u64,
    seat: u32,
    serial: u32,
}

impl IdCounters {
    pub fn next_surface(&mut self) -> u64 {
        self.surface += 1;
        self.surface
    }

    pub fn next_buffer(&mut self) -> u64 {
        self.buffer += 1;
        self.buffer
    }

    pub fn next_callback(&mut self) -> u64 {
        self.callback += 1;
        self.callback
    }

    pub fn next_animation(&mut self) -> u64 {
        self.animation += 1;
        self.animation
    }

    pub fn next_binding(&mut self) -> u64 {
        self.binding += 1;
        self.binding
    }

    pub fn next_seat(&mut self) -> u32 {
        self.seat += 1;
        self.seat
    }

    /// New event serial. Serials wrap.
    pub fn next_serial(&mut self) -> u32 {
        self.serial = self.serial.wrapping_add(1);
        self.serial
    }

    /// Serial handed out last.
    pub const fn serial(&self) -> u32 {
        self.serial
    }
}

/// The compositor context.
///
/// Owns all scene and input state. Backends drive it via inbound methods
/// and [`handle_event`](Compositor::handle_event), then drain the queued
/// [`CoreAction`]s.
pub struct Compositor {
    pub(crate) config: Config,
    pub(crate) surfaces: HashMap<SurfaceId, Surface>,
    pub(crate) buffers: HashMap<BufferId, Buffer>,
    /// Outputs in creation order.
    pub(crate) outputs: IndexMap<OutputId, Output>,
    /// Bit `n` is set while `OutputId(n)` is live.
    pub(crate) output_id_pool: u32,
    pub(crate) layers: Layers,
    /// Mapped surfaces back to front, rebuilt lazily from `layers`.
    pub(crate) surface_list: Vec<SurfaceId>,
    pub(crate) surface_list_dirty: bool,
    /// Global damage not yet painted.
    pub(crate) damage: Region,
    pub(crate) seats: IndexMap<SeatId, Seat>,
    pub(crate) bindings: Vec<(BindingId, Binding)>,
    /// Whether the pointer is over one of our outputs.
    pub(crate) focus: bool,
    pub(crate) state: CompositorState,
    pub(crate) idle_inhibit: u32,
    pub(crate) fade: FadeState,
    pub(crate) input_dispatch_armed: bool,
    pub(crate) actions: Vec<CoreAction>,
    pub(crate) ids: IdCounters,
    should_exit: bool,
}

impl Compositor {
    /// Create a compositor with no outputs or seats. Bindings from the
    /// configuration are installed right away.
    pub fn new(config: Config) -> Self {
        let fade = FadeState::new(config.animation.fade_k);
        let bindings = config.bindings.clone();

        let mut comp = Self {
            config,
            surfaces: HashMap::new(),
            buffers: HashMap::new(),
            outputs: IndexMap::new(),
            output_id_pool: 0,
            layers: Layers::default(),
            surface_list: Vec::new(),
            surface_list_dirty: false,
            damage: Region::new(),
            seats: IndexMap::new(),
            bindings: Vec::new(),
            focus: true,
            state: CompositorState::Active,
            idle_inhibit: 0,
            fade,
            input_dispatch_armed: true,
            actions: Vec::new(),
            ids: IdCounters::default(),
            should_exit: false,
        };

        if let Err(e) = comp.load_bindings(&bindings) {
            warn!("Failed to install bindings: {}", e);
        }
        comp
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a binding asked the compositor to exit.
    pub const fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Drain the queued actions, oldest first.
    pub fn take_actions(&mut self) -> Vec<CoreAction> {
        std::mem::take(&mut self.actions)
    }

    // ── Event handling (backend → core) ──────────────────────────────

    /// Process a backend event. Returns the actions queued so far,
    /// including any queued by direct calls since the last drain.
    pub fn handle_event(&mut self, event: CoreEvent) -> Vec<CoreAction> {
        let result = match event {
            CoreEvent::PointerMotion { seat, time, x, y } => self.notify_motion(seat, time, x, y),

            CoreEvent::PointerButton {
                seat,
                time,
                button,
                state,
            } => self.notify_button(seat, time, button, state),

            CoreEvent::PointerAxis {
                seat,
                time,
                axis,
                value,
            } => self.notify_axis(seat, time, axis, value),

            CoreEvent::PointerFocus { seat, output, x, y } => {
                self.notify_pointer_focus(seat, output, x, y)
            }

            CoreEvent::Key {
                seat,
                time,
                key,
                state,
                update,
            } => self.notify_key(seat, time, key, state, update),

            CoreEvent::Modifiers { seat, modifiers } => self.notify_modifiers(seat, modifiers),

            CoreEvent::KeyboardFocusIn { seat, keys, update } => {
                self.notify_keyboard_focus_in(seat, &keys, update)
            }

            CoreEvent::KeyboardFocusOut { seat } => self.notify_keyboard_focus_out(seat),

            CoreEvent::Touch {
                seat,
                time,
                id,
                x,
                y,
                kind,
            } => self.notify_touch(seat, time, id, x, y, kind),

            CoreEvent::FrameFinished { output, msecs } => {
                self.finish_frame(output, msecs);
                Ok(())
            }

            CoreEvent::IdleRepaint { output, msecs } => {
                self.idle_repaint(output, msecs);
                Ok(())
            }

            CoreEvent::IdleTimeout => {
                debug!("Idle timeout");
                self.idle_timeout();
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!("Event failed: {}", e);
        }

        #[cfg(debug_assertions)]
        if let Err(e) = invariants::validate(self) {
            warn!("Invariant violation after handle_event: {}", e);
        }

        self.take_actions()
    }
}
