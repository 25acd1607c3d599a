use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Buttons held by a participant at the moment the input was sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub action: bool,
}

impl InputState {
    /// All buttons released.
    pub fn released() -> Self {
        Self::default()
    }

    /// Builds a directional input from per-axis signs.
    ///
    /// Each component must be -1, 0 or 1; anything else is rejected rather
    /// than guessed at.
    pub fn from_axes(fx: i32, fy: i32) -> Result<Self> {
        let (left, right) = match fx {
            -1 => (true, false),
            0 => (false, false),
            1 => (false, true),
            other => return Err(Error::InvalidDirection(other)),
        };
        let (up, down) = match fy {
            -1 => (true, false),
            0 => (false, false),
            1 => (false, true),
            other => return Err(Error::InvalidDirection(other)),
        };

        Ok(Self {
            up,
            down,
            left,
            right,
            action: false,
        })
    }

    /// Net direction on each axis, -1, 0 or 1. Opposing buttons cancel.
    pub fn axes(&self) -> (i32, i32) {
        let x = i32::from(self.right) - i32::from(self.left);
        let y = i32::from(self.down) - i32::from(self.up);
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_axes_diagonal() {
        let input = InputState::from_axes(-1, 1).unwrap();
        assert!(input.left);
        assert!(!input.right);
        assert!(input.down);
        assert!(!input.up);
        assert!(!input.action);
        assert_eq!(input.axes(), (-1, 1));
    }

    #[test]
    fn test_from_axes_still_is_released() {
        assert_eq!(InputState::from_axes(0, 0).unwrap(), InputState::released());
    }

    #[test]
    fn test_from_axes_rejects_out_of_range() {
        match InputState::from_axes(2, 0) {
            Err(Error::InvalidDirection(2)) => {}
            other => panic!("expected InvalidDirection, got {:?}", other),
        }
        assert!(InputState::from_axes(0, -3).is_err());
    }

    #[test]
    fn test_opposing_buttons_cancel() {
        let input = InputState {
            up: true,
            down: true,
            left: true,
            right: false,
            action: false,
        };
        assert_eq!(input.axes(), (-1, 0));
    }
}
