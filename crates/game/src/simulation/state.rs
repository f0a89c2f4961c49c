use crate::fixed::Fix16;

pub const MAX_PLAYERS: usize = 4;

pub const PLAYFIELD_WIDTH: i32 = 640;
pub const PLAYFIELD_HEIGHT: i32 = 480;

const FIX16_BYTES: usize = 4;
const ACTIVE_OFFSET: usize = 0;
const POSITION_OFFSET: usize = ACTIVE_OFFSET + MAX_PLAYERS;
const VELOCITY_OFFSET: usize = POSITION_OFFSET + MAX_PLAYERS * 2 * FIX16_BYTES;

/// Encoded size of [`GameState`]: `active[4] | pos[4][2] | vel[4][2]`, each
/// flag one byte, each coordinate a little-endian `i32`.
pub const STATE_SIZE: usize = VELOCITY_OFFSET + MAX_PLAYERS * 2 * FIX16_BYTES;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("state buffer holds {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
    #[error("state buffer of {available} bytes cannot hold a {needed}-byte snapshot")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("slot {slot} has activity byte {value:#04x}")]
    InvalidActivity { slot: usize, value: u8 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PlayerState {
    pub active: bool,
    pub position: [Fix16; 2],
    pub velocity: [Fix16; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GameState {
    pub players: [PlayerState; MAX_PLAYERS],
}

impl GameState {
    /// Activates the first `num_players` slots at the centre of the playfield.
    pub fn new(num_players: usize) -> Self {
        let mut state = Self::default();
        let centre = [
            Fix16::from_int(PLAYFIELD_WIDTH / 2),
            Fix16::from_int(PLAYFIELD_HEIGHT / 2),
        ];
        for player in state.players.iter_mut().take(num_players) {
            player.active = true;
            player.position = centre;
        }
        state
    }

    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.active).count()
    }

    pub fn encode(&self) -> [u8; STATE_SIZE] {
        let mut bytes = [0u8; STATE_SIZE];
        for (i, player) in self.players.iter().enumerate() {
            bytes[ACTIVE_OFFSET + i] = player.active as u8;
            for axis in 0..2 {
                let at = POSITION_OFFSET + (i * 2 + axis) * FIX16_BYTES;
                bytes[at..at + FIX16_BYTES]
                    .copy_from_slice(&player.position[axis].to_bits().to_le_bytes());

                let at = VELOCITY_OFFSET + (i * 2 + axis) * FIX16_BYTES;
                bytes[at..at + FIX16_BYTES]
                    .copy_from_slice(&player.velocity[axis].to_bits().to_le_bytes());
            }
        }
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StateError> {
        if bytes.len() != STATE_SIZE {
            return Err(StateError::Length {
                expected: STATE_SIZE,
                actual: bytes.len(),
            });
        }

        let mut state = Self::default();
        for (i, player) in state.players.iter_mut().enumerate() {
            player.active = match bytes[ACTIVE_OFFSET + i] {
                0 => false,
                1 => true,
                value => return Err(StateError::InvalidActivity { slot: i, value }),
            };
            for axis in 0..2 {
                let at = POSITION_OFFSET + (i * 2 + axis) * FIX16_BYTES;
                player.position[axis] = read_fix16(&bytes[at..at + FIX16_BYTES]);

                let at = VELOCITY_OFFSET + (i * 2 + axis) * FIX16_BYTES;
                player.velocity[axis] = read_fix16(&bytes[at..at + FIX16_BYTES]);
            }
        }
        Ok(state)
    }
}

fn read_fix16(bytes: &[u8]) -> Fix16 {
    let mut raw = [0u8; FIX16_BYTES];
    raw.copy_from_slice(bytes);
    Fix16::from_bits(i32::from_le_bytes(raw))
}
