//! Tessera Headless Backend: a calloop event loop around tessera-core.
//!
//! This crate:
//! - Creates one virtual output per `[[outputs]]` entry of the config.
//! - Feeds queued input and timer expiries to the core as `CoreEvent`s.
//! - Applies the returned `CoreAction`s: idle repaint sources, the vblank
//!   and idle timers, and input dispatch arming.
//! - Records every painted frame as a [`FrameReport`].
//!
//! Nothing is drawn. A frame "hits the screen" one refresh period after
//! the core hands it over.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use calloop::timer::{Timeout, Timer, TimerHandle};
use calloop::{EventLoop, LoopHandle, LoopSignal};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use tessera_core::config::Config;
use tessera_core::output::{Mode, OutputBackend, PaintFrame};
use tessera_core::region::Rect;
use tessera_core::{Compositor, CoreAction, CoreEvent, OutputId};

/// What a painted frame looked like.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    pub output: u32,
    pub msecs: u32,
    /// Extents of the damage repainted.
    pub damage: Rect,
    pub damage_area: i64,
    /// Surfaces drawn, back to front.
    pub surfaces: Vec<u64>,
}

impl FrameReport {
    fn from_frame(frame: &PaintFrame) -> Self {
        Self {
            output: frame.output.0,
            msecs: frame.msecs,
            damage: frame.damage.extents(),
            damage_area: frame.damage.area(),
            surfaces: frame.items.iter().map(|item| item.surface.0).collect(),
        }
    }
}

/// Timer payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    /// The frame submitted on this output is now on screen.
    Vblank(OutputId),
    IdleTimeout,
}

/// A virtual display head. Completes each frame after one refresh period.
struct HeadlessOutput {
    timers: TimerHandle<TimerEvent>,
    period: Duration,
    frames: Rc<RefCell<Vec<FrameReport>>>,
}

impl HeadlessOutput {
    fn refresh_period(refresh: u32) -> Duration {
        Duration::from_micros(1_000_000_000 / u64::from(refresh.max(1)))
    }
}

impl OutputBackend for HeadlessOutput {
    fn repaint(&mut self, frame: &PaintFrame) {
        self.frames.borrow_mut().push(FrameReport::from_frame(frame));
        self.timers
            .add_timeout(self.period, TimerEvent::Vblank(frame.output));
    }

    fn switch_mode(&mut self, mode: &Mode) -> bool {
        self.period = Self::refresh_period(mode.refresh);
        true
    }
}

/// Everything the event loop callbacks touch.
pub struct HeadlessState {
    pub comp: Compositor,
    handle: LoopHandle<'static, HeadlessState>,
    signal: LoopSignal,
    timers: TimerHandle<TimerEvent>,
    idle_timer: Option<Timeout>,
    input_armed: bool,
    pending_input: VecDeque<CoreEvent>,
    frames: Rc<RefCell<Vec<FrameReport>>>,
    start: Instant,
    locked: bool,
}

impl HeadlessState {
    /// Milliseconds since the backend started.
    pub fn now(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }

    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    pub const fn input_armed(&self) -> bool {
        self.input_armed
    }

    /// Process one event and apply what the core asks for.
    pub fn dispatch(&mut self, event: CoreEvent) {
        let actions = self.comp.handle_event(event);
        self.apply_actions(actions);
    }

    /// Apply actions queued by direct `Compositor` calls.
    pub fn flush(&mut self) {
        let actions = self.comp.take_actions();
        self.apply_actions(actions);
    }

    fn apply_actions(&mut self, actions: Vec<CoreAction>) {
        for action in actions {
            match action {
                CoreAction::ScheduleIdleRepaint { output } => {
                    self.handle.insert_idle(move |state: &mut HeadlessState| {
                        let msecs = state.now();
                        state.dispatch(CoreEvent::IdleRepaint { output, msecs });
                    });
                }
                CoreAction::ArmInputDispatch => {
                    trace!("Input dispatch armed");
                    self.input_armed = true;
                }
                CoreAction::DisarmInputDispatch => {
                    trace!("Input dispatch disarmed");
                    self.input_armed = false;
                }
                CoreAction::ResetIdleTimer { timeout_ms } => {
                    if let Some(timeout) = self.idle_timer.take() {
                        self.timers.cancel_timeout(&timeout);
                    }
                    if timeout_ms > 0 {
                        self.idle_timer = Some(self.timers.add_timeout(
                            Duration::from_millis(u64::from(timeout_ms)),
                            TimerEvent::IdleTimeout,
                        ));
                    }
                }
                CoreAction::Lock => {
                    info!("Session locked");
                    self.locked = true;
                }
                CoreAction::Unlock => {
                    info!("Session unlocked");
                    self.locked = false;
                }
                CoreAction::Terminate => {
                    info!("Exit requested by core");
                    self.signal.stop();
                }
                CoreAction::BindingTriggered { seat, name, key } => {
                    info!("Binding '{}' triggered on {} by {}", name, seat, key);
                }
                // No clients are connected; client-facing notifications
                // only get traced.
                other => trace!("{:?}", other),
            }
        }
    }

    /// Hand queued input to the core while dispatch is armed.
    fn drain_input(&mut self) {
        while self.input_armed {
            let Some(event) = self.pending_input.pop_front() else {
                break;
            };
            self.dispatch(event);
        }
    }

    fn on_timer(&mut self, event: TimerEvent) {
        let msecs = self.now();
        match event {
            TimerEvent::Vblank(output) => self.dispatch(CoreEvent::FrameFinished { output, msecs }),
            TimerEvent::IdleTimeout => {
                self.idle_timer = None;
                self.dispatch(CoreEvent::IdleTimeout);
            }
        }
    }
}

/// The backend adapter.
///
/// Owns the event loop and the core.
pub struct HeadlessBackend {
    event_loop: EventLoop<'static, HeadlessState>,
    state: HeadlessState,
}

impl HeadlessBackend {
    pub fn new(config: Config) -> Result<Self> {
        let event_loop: EventLoop<'static, HeadlessState> =
            EventLoop::try_new().context("Failed to create event loop")?;
        let timer = Timer::new().context("Failed to create timer")?;
        let timers = timer.handle();
        event_loop
            .handle()
            .insert_source(timer, |event, _, state: &mut HeadlessState| state.on_timer(event))
            .map_err(|e| anyhow!("Failed to register timer: {}", e.error))?;

        let outputs = config.outputs.clone();
        let frames = Rc::new(RefCell::new(Vec::new()));
        let mut state = HeadlessState {
            comp: Compositor::new(config),
            handle: event_loop.handle(),
            signal: event_loop.get_signal(),
            timers: timers.clone(),
            idle_timer: None,
            input_armed: true,
            pending_input: VecDeque::new(),
            frames: Rc::clone(&frames),
            start: Instant::now(),
            locked: false,
        };

        for output in &outputs {
            let info = output.info()?;
            let refresh = info.modes.first().map_or(60_000, |m| m.refresh);
            let backend = HeadlessOutput {
                timers: timers.clone(),
                period: HeadlessOutput::refresh_period(refresh),
                frames: Rc::clone(&frames),
            };
            let id = state
                .comp
                .output_init(info, Box::new(backend))
                .with_context(|| format!("Failed to create output {}", output.name))?;
            info!("Output {} created as {}", output.name, id);
        }

        // Arm the idle timer
        state.comp.activity();
        state.flush();

        Ok(Self { event_loop, state })
    }

    pub const fn state(&self) -> &HeadlessState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut HeadlessState {
        &mut self.state
    }

    pub fn compositor(&mut self) -> &mut Compositor {
        &mut self.state.comp
    }

    /// Queue input; it reaches the core the next time dispatch is armed.
    pub fn queue_input(&mut self, event: CoreEvent) {
        self.state.pending_input.push_back(event);
    }

    pub fn frames(&self) -> Vec<FrameReport> {
        self.state.frames.borrow().clone()
    }

    /// Run until `frames` more frames were painted, the core asked to
    /// exit, or `deadline` passed.
    pub fn run_frames(&mut self, frames: usize, deadline: Duration) -> Result<()> {
        let target = self.state.frames.borrow().len().saturating_add(frames);
        debug!("Running until {} frames or {:?}", target, deadline);
        self.run_until(|state| state.frames.borrow().len() >= target, deadline)?;
        Ok(())
    }

    /// Dispatch the loop until `done` holds, the core asked to exit, or
    /// `deadline` passed. Returns whether `done` was reached.
    pub fn run_until<F>(&mut self, mut done: F, deadline: Duration) -> Result<bool>
    where
        F: FnMut(&HeadlessState) -> bool,
    {
        let end = Instant::now() + deadline;
        loop {
            self.state.flush();
            self.state.drain_input();
            if done(&self.state) {
                return Ok(true);
            }
            if self.state.comp.should_exit() {
                return Ok(false);
            }
            let now = Instant::now();
            if now >= end {
                warn!(
                    "Deadline reached after {} frames",
                    self.state.frames.borrow().len()
                );
                return Ok(false);
            }
            let wait = (end - now).min(Duration::from_millis(50));
            self.event_loop
                .dispatch(Some(wait), &mut self.state)
                .context("Event loop dispatch failed")?;
        }
    }
}
