//! Shared fixtures for unit tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::output::{Mode, ModeFlags, OutputBackend, OutputFlags, OutputInfo, PaintFrame};

pub fn headless_output(name: &str, x: i32, y: i32, width: i32, height: i32) -> OutputInfo {
    let mut mode = Mode::new(width, height, 60_000);
    mode.flags = ModeFlags::PREFERRED;
    OutputInfo {
        name: name.to_string(),
        x,
        y,
        mm_width: width / 4,
        mm_height: height / 4,
        flags: OutputFlags::empty(),
        modes: vec![mode],
    }
}

/// Accepts every mode switch and discards frames.
pub struct NullBackend;

impl OutputBackend for NullBackend {
    fn repaint(&mut self, _frame: &PaintFrame) {}

    fn switch_mode(&mut self, _mode: &Mode) -> bool {
        true
    }
}

/// Refuses mode switches.
pub struct FailingModes;

impl OutputBackend for FailingModes {
    fn repaint(&mut self, _frame: &PaintFrame) {}
}

/// Keeps every painted frame for inspection.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    frames: Rc<RefCell<Vec<PaintFrame>>>,
}

impl RecordingBackend {
    pub fn frames(&self) -> Vec<PaintFrame> {
        self.frames.borrow().clone()
    }

    pub fn last_frame(&self) -> Option<PaintFrame> {
        self.frames.borrow().last().cloned()
    }
}

impl OutputBackend for RecordingBackend {
    fn repaint(&mut self, frame: &PaintFrame) {
        self.frames.borrow_mut().push(frame.clone());
    }
}
