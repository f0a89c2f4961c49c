use bitflags::bitflags;

bitflags! {
    /// One player's input for one frame, exchanged as a single byte.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct PackedInput: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl PackedInput {
    pub const SIZE: usize = 1;

    pub fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let mut input = Self::empty();
        input.set(Self::UP, up);
        input.set(Self::DOWN, down);
        input.set(Self::LEFT, left);
        input.set(Self::RIGHT, right);
        input
    }

    #[inline]
    pub fn encode(self) -> u8 {
        self.bits()
    }

    /// Reserved high bits are discarded.
    #[inline]
    pub fn decode(byte: u8) -> Self {
        Self::from_bits_truncate(byte)
    }

    /// +1 right, -1 left, 0 when neither or both are held.
    #[inline]
    pub fn horizontal(self) -> i32 {
        self.contains(Self::RIGHT) as i32 - self.contains(Self::LEFT) as i32
    }

    /// Screen coordinates: +1 down, -1 up.
    #[inline]
    pub fn vertical(self) -> i32 {
        self.contains(Self::DOWN) as i32 - self.contains(Self::UP) as i32
    }
}
