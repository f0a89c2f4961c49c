use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::simulation::{PackedInput, STATE_SIZE};

pub type PlayerHandle = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerKind {
    Local,
    Remote(SocketAddr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub num_players: usize,
    pub max_spectators: usize,
    /// Frames a scheduler may run ahead on predicted input.
    pub input_prediction_window: u32,
    pub state_size: usize,
    pub input_size: usize,
    pub desync_detection: bool,
    /// Frames between sampling a local input and applying it.
    pub local_delay: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            num_players: 2,
            max_spectators: 0,
            input_prediction_window: 3,
            state_size: STATE_SIZE,
            input_size: PackedInput::SIZE,
            desync_detection: true,
            local_delay: 3,
        }
    }
}

impl SchedulerConfig {
    pub fn for_players(num_players: usize) -> Self {
        Self {
            num_players,
            // A lone player has nobody to wait for.
            local_delay: if num_players > 1 { 3 } else { 0 },
            ..Default::default()
        }
    }
}
