mod checksum;
mod contract;
mod input;
mod state;

pub use checksum::fletcher32;
pub use contract::{DAMPING, Frame, SavedState, Simulation, step};
pub use input::PackedInput;
pub use state::{
    GameState, MAX_PLAYERS, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH, PlayerState, STATE_SIZE, StateError,
};
