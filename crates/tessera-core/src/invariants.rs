//! Invariant validation for the compositor state.
//!
//! Called after every `handle_event` in debug builds.

use crate::Compositor;

/// Error indicating which invariant was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantError {
    #[error("Surface {0} is mapped but sits in {1} layers")]
    MappedLayerCount(String, usize),

    #[error("Surface {0} is unmapped but still in a layer")]
    UnmappedInLayer(String),

    #[error("Surface {0} is assigned to missing output {1}")]
    MissingOutput(String, String),

    #[error("Layer entry {0} does not exist")]
    StaleLayerEntry(String),

    #[error("Buffer {0} busy count {1} does not match {2} holders")]
    BusyCountMismatch(String, u32, u32),

    #[error("Output id pool does not match live outputs")]
    OutputPoolMismatch,

    #[error("Seat {0} holds a reference to missing surface {1}")]
    DanglingFocus(String, String),
}

/// Validate all core invariants. Returns the first violation found.
pub fn validate(comp: &Compositor) -> Result<(), InvariantError> {
    // 1. Mapped surfaces live in exactly one layer and on a live output
    for (id, surface) in &comp.surfaces {
        let membership = comp.layers.membership(*id);
        match surface.output {
            Some(output) => {
                if membership != 1 {
                    return Err(InvariantError::MappedLayerCount(format!("{id}"), membership));
                }
                if !comp.outputs.contains_key(&output) {
                    return Err(InvariantError::MissingOutput(format!("{id}"), format!("{output}")));
                }
            }
            None => {
                if membership != 0 {
                    return Err(InvariantError::UnmappedInLayer(format!("{id}")));
                }
            }
        }
    }

    // 2. Layers only hold live surfaces
    if let Some(stale) = comp.layers.iter().find(|id| !comp.surfaces.contains_key(id)) {
        return Err(InvariantError::StaleLayerEntry(format!("{stale}")));
    }

    // 3. Busy counts equal the number of surfaces holding the buffer
    for (id, buffer) in &comp.buffers {
        let holders = comp
            .surfaces
            .values()
            .filter(|s| s.buffer == Some(*id))
            .count() as u32;
        if holders != buffer.busy_count {
            return Err(InvariantError::BusyCountMismatch(
                format!("{id}"),
                buffer.busy_count,
                holders,
            ));
        }
    }

    // 4. Every live output owns its pool bit, and nothing else is taken
    let expected = comp
        .outputs
        .keys()
        .fold(0u32, |pool, id| pool | (1 << id.0));
    if expected != comp.output_id_pool {
        return Err(InvariantError::OutputPoolMismatch);
    }

    // 5. Focus slots never point at destroyed surfaces
    for (seat_id, seat) in &comp.seats {
        let mut slots = vec![seat.sprite, seat.drag_icon];
        if let Some(pointer) = &seat.pointer {
            slots.extend([pointer.focus, pointer.current]);
        }
        if let Some(keyboard) = &seat.keyboard {
            slots.extend([keyboard.focus, keyboard.saved_focus]);
        }
        if let Some(touch) = &seat.touch {
            slots.push(touch.focus);
        }
        if let Some(missing) = slots
            .into_iter()
            .flatten()
            .find(|id| !comp.surfaces.contains_key(id))
        {
            return Err(InvariantError::DanglingFocus(format!("{seat_id}"), format!("{missing}")));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layer::LayerKind;
    use crate::surface::ClientId;
    use crate::test_util::{headless_output, NullBackend};

    #[test]
    fn fresh_state_is_valid() {
        let mut comp = Compositor::new(Config::empty());
        comp.output_init(headless_output("A", 0, 0, 640, 480), Box::new(NullBackend))
            .unwrap();
        let s = comp.surface_create(ClientId(1)).unwrap();
        let buffer = comp.buffer_create(10, 10).unwrap();
        comp.surface_attach(s, Some(buffer)).unwrap();
        comp.surface_map(s, LayerKind::Normal).unwrap();
        assert_eq!(validate(&comp), Ok(()));
    }

    #[test]
    fn detects_busy_count_drift() {
        let mut comp = Compositor::new(Config::empty());
        let buffer = comp.buffer_create(10, 10).unwrap();
        if let Some(b) = comp.buffers.get_mut(&buffer) {
            b.busy_count = 3;
        }
        assert!(matches!(
            validate(&comp),
            Err(InvariantError::BusyCountMismatch(_, 3, 0))
        ));
    }

    #[test]
    fn detects_layer_entry_without_output() {
        let mut comp = Compositor::new(Config::empty());
        let s = comp.surface_create(ClientId(1)).unwrap();
        comp.layers.list_mut(LayerKind::Normal).push_front(s);
        assert_eq!(
            validate(&comp),
            Err(InvariantError::UnmappedInLayer(format!("{s}")))
        );
    }
}
