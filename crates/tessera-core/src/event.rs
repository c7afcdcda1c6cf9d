//! Events in, actions out.
//!
//! [`CoreEvent`] represents what the backend tells the core.
//! [`CoreAction`] represents what the core tells the embedding layer: client
//! notifications, backend requests and session control, in the order they
//! happened.

use crate::animation::AnimationId;
use crate::buffer::BufferId;
use crate::input::{Axis, ButtonState, KeyState, KeyStateUpdate, Modifiers, ResizeEdges, SeatId, TouchType};
use crate::output::OutputId;
use crate::surface::{CallbackId, SurfaceId};

/// Events that a backend sends to the core.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// Pointer moved to an absolute global position.
    PointerMotion { seat: SeatId, time: u32, x: f64, y: f64 },

    /// Pointer button press/release. `button` uses Linux event codes.
    PointerButton {
        seat: SeatId,
        time: u32,
        button: u32,
        state: ButtonState,
    },

    PointerAxis {
        seat: SeatId,
        time: u32,
        axis: Axis,
        value: f64,
    },

    /// The pointer entered an output (`Some`) or left all of them.
    PointerFocus {
        seat: SeatId,
        output: Option<OutputId>,
        x: f64,
        y: f64,
    },

    Key {
        seat: SeatId,
        time: u32,
        key: u32,
        state: KeyState,
        update: KeyStateUpdate,
    },

    Modifiers { seat: SeatId, modifiers: Modifiers },

    /// Keyboard focus came back with `keys` held.
    KeyboardFocusIn {
        seat: SeatId,
        keys: Vec<u32>,
        update: KeyStateUpdate,
    },

    KeyboardFocusOut { seat: SeatId },

    Touch {
        seat: SeatId,
        time: u32,
        id: i32,
        x: f64,
        y: f64,
        kind: TouchType,
    },

    /// The frame submitted for `output` is on screen.
    FrameFinished { output: OutputId, msecs: u32 },

    /// The idle source queued by `ScheduleIdleRepaint` ran.
    IdleRepaint { output: OutputId, msecs: u32 },

    /// The idle timer armed by `ResetIdleTimer` expired.
    IdleTimeout,
}

/// Actions that the core returns for execution.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreAction {
    // ── Surfaces and frames ──────────────────────────────────────────
    /// A frame callback is due.
    FrameDone {
        callback: CallbackId,
        surface: SurfaceId,
        time: u32,
    },
    SurfaceEnter { surface: SurfaceId, output: OutputId },
    SurfaceLeave { surface: SurfaceId, output: OutputId },
    /// The compositor is done reading the buffer.
    BufferReleased { buffer: BufferId },
    /// Renderer-side state of a destroyed surface can be freed.
    ReleaseSurfaceResources { surface: SurfaceId },
    AnimationDone {
        animation: AnimationId,
        surface: Option<SurfaceId>,
    },

    // ── Pointer ──────────────────────────────────────────────────────
    PointerEnter {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
        sx: f64,
        sy: f64,
    },
    PointerLeave {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
    },
    PointerMotion {
        seat: SeatId,
        surface: SurfaceId,
        time: u32,
        sx: f64,
        sy: f64,
    },
    PointerButton {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
        time: u32,
        button: u32,
        state: ButtonState,
    },
    PointerAxis {
        seat: SeatId,
        surface: SurfaceId,
        time: u32,
        axis: Axis,
        value: f64,
    },

    // ── Keyboard ─────────────────────────────────────────────────────
    KeyboardEnter {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
        keys: Vec<u32>,
    },
    KeyboardLeave {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
    },
    KeyboardKey {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
        time: u32,
        key: u32,
        state: KeyState,
    },
    KeyboardModifiers {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
        modifiers: Modifiers,
    },

    // ── Touch ────────────────────────────────────────────────────────
    TouchDown {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
        time: u32,
        id: i32,
        sx: f64,
        sy: f64,
    },
    TouchMotion {
        seat: SeatId,
        surface: SurfaceId,
        time: u32,
        id: i32,
        sx: f64,
        sy: f64,
    },
    TouchUp {
        seat: SeatId,
        surface: SurfaceId,
        serial: u32,
        time: u32,
        id: i32,
    },

    // ── Shell ────────────────────────────────────────────────────────
    /// A surface was activated from `seat`.
    Activated { seat: SeatId, surface: SurfaceId },
    /// The popup grab ended; the client should close the popup.
    PopupDone { surface: SurfaceId },
    /// An interactive resize asks the client for a new size.
    Configure {
        surface: SurfaceId,
        edges: ResizeEdges,
        width: i32,
        height: i32,
    },
    /// A binding with an action the core does not implement fired.
    BindingTriggered {
        seat: SeatId,
        name: String,
        key: u32,
    },

    // ── Backend and session ──────────────────────────────────────────
    /// Run `idle_repaint(output)` from an idle source.
    ScheduleIdleRepaint { output: OutputId },
    /// Resume reading input devices.
    ArmInputDispatch,
    /// Stop reading input devices until the pending frame is painted.
    DisarmInputDispatch,
    /// (Re)arm the idle timer.
    ResetIdleTimer { timeout_ms: u32 },
    Lock,
    Unlock,
    /// The compositor should exit.
    Terminate,
}
