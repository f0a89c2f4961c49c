use lockstep::{Frame, PackedInput};

const PATTERN: [PackedInput; 4] = [
    PackedInput::RIGHT,
    PackedInput::DOWN,
    PackedInput::LEFT,
    PackedInput::UP,
];

/// Stand-in for keyboard input: each local player walks a square, holding
/// every direction for `hold_frames` frames. Players start on different
/// sides so their inputs differ.
#[derive(Debug, Clone, Copy)]
pub struct InputScript {
    hold_frames: u32,
}

impl InputScript {
    pub fn new(hold_frames: u32) -> Self {
        Self { hold_frames }
    }

    pub fn input_for(&self, frame: Frame, player: usize) -> PackedInput {
        if self.hold_frames == 0 {
            return PackedInput::empty();
        }
        let leg = (frame / self.hold_frames) as usize + player;
        PATTERN[leg % PATTERN.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walks_a_square() {
        let script = InputScript::new(10);
        assert_eq!(script.input_for(0, 0), PackedInput::RIGHT);
        assert_eq!(script.input_for(9, 0), PackedInput::RIGHT);
        assert_eq!(script.input_for(10, 0), PackedInput::DOWN);
        assert_eq!(script.input_for(40, 0), PackedInput::RIGHT);
        assert_eq!(script.input_for(0, 1), PackedInput::DOWN);
    }

    #[test]
    fn test_idle_holds_nothing() {
        assert!(InputScript::new(0).input_for(123, 2).is_empty());
    }
}
