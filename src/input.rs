/// Lateral movement of the ball per frame while a direction key is held.
pub const KEY_SPEED: i16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeftRightDir {
    Left,
    Right,
    Neutral,
}

impl Default for LeftRightDir {
    fn default() -> Self {
        LeftRightDir::Neutral
    }
}

/// Player input gathered over one frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputState {
    pub horizontal: LeftRightDir,
    /// Horizontal mouse motion since the last frame.
    pub mouse_dx: i16,
    /// The player asked to leave the game.
    pub escape: bool,
}

impl InputState {
    pub fn new() -> Self {
        Default::default()
    }

    /// Ball movement requested for this frame.
    pub fn delta_x(&self) -> i16 {
        let keys = match self.horizontal {
            LeftRightDir::Left => -KEY_SPEED,
            LeftRightDir::Right => KEY_SPEED,
            LeftRightDir::Neutral => 0,
        };
        self.mouse_dx.saturating_add(keys)
    }

    /// Clears the per-frame motion, keeping held keys.
    pub fn end_frame(&mut self) {
        self.mouse_dx = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_x() {
        let mut input = InputState::new();
        assert_eq!(input.delta_x(), 0);
        input.horizontal = LeftRightDir::Left;
        input.mouse_dx = 10;
        assert_eq!(input.delta_x(), 10 - KEY_SPEED);
        input.end_frame();
        assert_eq!(input.delta_x(), -KEY_SPEED);
        assert_eq!(input.horizontal, LeftRightDir::Left);
    }
}
