// Canvas trait for frame output surfaces
use crate::domain::frame::Frame;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresentError {
    #[error("display backend disconnected: {0}")]
    BackendDisconnected(String),
    #[error("frame is {actual:?} but the display is {expected:?}")]
    DimensionMismatch {
        expected: (u16, u16),
        actual: (u16, u16),
    },
}

/// A surface that shows complete frames: an LED matrix or a desktop simulation.
pub trait Canvas {
    /// Present a full frame. Partial frames are never accepted.
    fn present(&mut self, frame: &Frame) -> Result<(), PresentError>;

    /// Whether the user or the backend asked to stop (quit key, window closed).
    fn poll_shutdown_requested(&mut self) -> bool;

    /// Blank the surface and give back any terminal or device resources.
    fn release(&mut self) {}
}

/// Reject frames that do not match the surface size.
pub fn check_dimensions(expected: (u16, u16), frame: &Frame) -> Result<(), PresentError> {
    if frame.dimensions() == expected {
        Ok(())
    } else {
        Err(PresentError::DimensionMismatch {
            expected,
            actual: frame.dimensions(),
        })
    }
}
