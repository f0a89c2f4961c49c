use crate::simulation::{Frame, PackedInput};

use super::config::PlayerHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    PlayerConnected {
        handle: PlayerHandle,
    },
    PlayerDisconnected {
        handle: PlayerHandle,
    },
    DesyncDetected {
        frame: Frame,
        remote_handle: PlayerHandle,
        local_checksum: u32,
        remote_checksum: u32,
    },
}

/// Work a scheduler hands to the game, to be carried out in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRequest {
    /// Snapshot the state the simulation holds at the start of `frame`.
    Save { frame: Frame },
    /// Restore the snapshot taken for `frame`.
    Load { frame: Frame },
    Advance {
        frame: Frame,
        inputs: Vec<PackedInput>,
    },
}
