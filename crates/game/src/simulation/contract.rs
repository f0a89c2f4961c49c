use crate::fixed::Fix16;

use super::checksum::fletcher32;
use super::input::PackedInput;
use super::state::{GameState, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH, STATE_SIZE, StateError};

pub type Frame = u32;

/// Velocity retained per step, ≈0.9.
pub const DAMPING: Fix16 = Fix16::from_bits(0xE666);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedState {
    pub len: usize,
    pub checksum: u32,
}

/// The state a rollback scheduler saves, restores and steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    state: GameState,
    frame: Frame,
}

impl Simulation {
    pub fn new(num_players: usize) -> Self {
        Self::from_state(GameState::new(num_players))
    }

    pub fn from_state(state: GameState) -> Self {
        Self { state, frame: 0 }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// The next frame [`Simulation::advance`] expects.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub(crate) fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    pub fn save(&self, buffer: &mut [u8]) -> Result<SavedState, StateError> {
        if buffer.len() < STATE_SIZE {
            return Err(StateError::BufferTooSmall {
                needed: STATE_SIZE,
                available: buffer.len(),
            });
        }

        let bytes = self.state.encode();
        buffer[..STATE_SIZE].copy_from_slice(&bytes);

        Ok(SavedState {
            len: STATE_SIZE,
            checksum: fletcher32(&bytes),
        })
    }

    /// Replaces the live state; on error the live state is untouched.
    pub fn load(&mut self, buffer: &[u8]) -> Result<(), StateError> {
        self.state = GameState::decode(buffer)?;
        Ok(())
    }

    pub fn checksum(&self) -> u32 {
        fletcher32(&self.state.encode())
    }

    /// Steps every active slot once. Slots without an entry in `inputs` get an
    /// empty input.
    pub fn advance(&mut self, inputs: &[PackedInput], frame: Frame) {
        step(&mut self.state, inputs);
        self.frame = frame.wrapping_add(1);
    }
}

pub fn step(state: &mut GameState, inputs: &[PackedInput]) {
    let width = Fix16::from_int(PLAYFIELD_WIDTH);
    let height = Fix16::from_int(PLAYFIELD_HEIGHT);

    for (i, player) in state.players.iter_mut().enumerate() {
        if !player.active {
            continue;
        }
        let input = inputs.get(i).copied().unwrap_or_default();

        player.velocity[0] = player.velocity[0] * DAMPING + Fix16::from_int(input.horizontal());
        player.velocity[1] = player.velocity[1] * DAMPING + Fix16::from_int(input.vertical());

        player.position[0] = (player.position[0] + player.velocity[0]).clamp(Fix16::ZERO, width);
        player.position[1] = (player.position[1] + player.velocity[1]).clamp(Fix16::ZERO, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::state::PlayerState;

    #[test]
    fn test_save_load_round_trip() {
        let mut sim = Simulation::new(2);
        sim.advance(&[PackedInput::RIGHT, PackedInput::UP], 0);

        let mut buffer = [0u8; STATE_SIZE];
        let saved = sim.save(&mut buffer).unwrap();
        assert_eq!(saved.len, STATE_SIZE);
        assert_eq!(saved.checksum, sim.checksum());

        let snapshot = *sim.state();
        sim.advance(&[PackedInput::LEFT, PackedInput::DOWN], 1);
        assert_ne!(*sim.state(), snapshot);

        sim.load(&buffer).unwrap();
        assert_eq!(*sim.state(), snapshot);

        let mut again = [0u8; STATE_SIZE];
        sim.save(&mut again).unwrap();
        assert_eq!(again, buffer);
    }

    #[test]
    fn test_save_rejects_short_buffer() {
        let sim = Simulation::new(1);
        let mut buffer = [0u8; 8];
        assert!(matches!(
            sim.save(&mut buffer),
            Err(StateError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let mut sim = Simulation::new(2);
        let before = *sim.state();
        assert!(sim.load(&[0u8; 3]).is_err());
        assert_eq!(*sim.state(), before);
    }

    #[test]
    fn test_impulse_follows_direction_bits() {
        let mut sim = Simulation::new(1);
        sim.advance(&[PackedInput::RIGHT | PackedInput::DOWN], 0);

        let player = sim.state().players[0];
        assert_eq!(player.velocity, [Fix16::ONE, Fix16::ONE]);
        assert_eq!(player.position[0].to_int(), 321);
        assert_eq!(player.position[1].to_int(), 241);
        assert_eq!(sim.frame(), 1);
    }

    #[test]
    fn test_velocity_decays_without_input() {
        let mut sim = Simulation::new(1);
        sim.advance(&[PackedInput::LEFT], 0);
        let first = sim.state().players[0].velocity[0];
        sim.advance(&[], 1);
        let second = sim.state().players[0].velocity[0];
        assert!(second > first);
        assert!(second < Fix16::ZERO);
    }

    #[test]
    fn test_positions_clamp_to_playfield() {
        let mut sim = Simulation::new(1);
        for frame in 0..600 {
            sim.advance(&[PackedInput::LEFT | PackedInput::UP], frame);
        }
        let player = sim.state().players[0];
        assert_eq!(player.position, [Fix16::ZERO, Fix16::ZERO]);

        for frame in 600..1200 {
            sim.advance(&[PackedInput::RIGHT | PackedInput::DOWN], frame);
        }
        let player = sim.state().players[0];
        assert_eq!(
            player.position,
            [Fix16::from_int(PLAYFIELD_WIDTH), Fix16::from_int(PLAYFIELD_HEIGHT)]
        );
    }

    #[test]
    fn test_inactive_slots_do_not_move() {
        let mut sim = Simulation::new(1);
        sim.advance(&[PackedInput::empty(), PackedInput::RIGHT], 0);
        assert_eq!(sim.state().players[1], PlayerState::default());
    }
}
