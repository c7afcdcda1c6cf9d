//! Errors surfaced to callers of the core.
//!
//! Numeric trouble in the transform engine (singular matrices, near-zero
//! homogeneous `w`) is logged and recovered from, so it never shows up here.

use crate::buffer::BufferId;
use crate::input::SeatId;
use crate::output::OutputId;
use crate::surface::SurfaceId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("unknown surface {0}")]
    UnknownSurface(SurfaceId),

    #[error("unknown output {0}")]
    UnknownOutput(OutputId),

    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferId),

    #[error("unknown seat {0}")]
    UnknownSeat(SeatId),

    #[error("buffer {0} cannot be mapped")]
    BufferNotMappable(BufferId),

    #[error("surface {0} is not mapped")]
    SurfaceNotMapped(SurfaceId),

    #[error("surface {0} already has a role")]
    RoleTaken(SurfaceId),

    #[error("output {0} refused the mode switch")]
    ModeSwitchUnsupported(OutputId),

    #[error("output {0} has no mode matching the request")]
    NoMatchingMode(OutputId),

    #[error("all output ids are in use")]
    OutputPoolExhausted,

    #[error("seat {seat} has no {capability}")]
    MissingCapability {
        seat: SeatId,
        capability: &'static str,
    },
}

pub type CoreResult<T> = Result<T, CoreError>;
