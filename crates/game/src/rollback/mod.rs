//! The boundary between the simulation and a rollback scheduler.
//!
//! A scheduler decides which frames to save, restore and re-run; the
//! simulation only carries out [`GameRequest`]s in the order given.

mod config;
mod desync;
mod events;
mod sync_test;

use crate::simulation::{Frame, PackedInput, STATE_SIZE, Simulation, StateError};

pub use config::{PlayerHandle, PlayerKind, SchedulerConfig};
pub use desync::DesyncDetector;
pub use events::{GameRequest, SchedulerEvent};
pub use sync_test::SyncTestScheduler;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("no saved state for frame {0}")]
    MissingState(Frame),
    #[error("unknown player handle {0}")]
    InvalidPlayer(PlayerHandle),
    #[error("player {0} is not local")]
    NotLocal(PlayerHandle),
    #[error("no input from player {handle} for frame {frame}")]
    MissingInput { handle: PlayerHandle, frame: Frame },
    #[error("session is limited to {0} players")]
    TooManyPlayers(usize),
}

/// Fatal: the session must stop.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error(
        "desync at frame {frame} with player {remote_handle}: local {local_checksum:#010x}, remote {remote_checksum:#010x}"
    )]
    Desync {
        frame: Frame,
        remote_handle: PlayerHandle,
        local_checksum: u32,
        remote_checksum: u32,
    },
}

pub trait RollbackScheduler {
    fn add_player(&mut self, kind: PlayerKind) -> Result<PlayerHandle, SchedulerError>;

    fn add_local_input(
        &mut self,
        handle: PlayerHandle,
        input: PackedInput,
    ) -> Result<(), SchedulerError>;

    /// How far the local simulation runs ahead of the slowest peer.
    fn frames_ahead(&self) -> f32;

    fn events(&mut self) -> Vec<SchedulerEvent>;

    fn advance_frame(&mut self) -> Result<Vec<GameRequest>, SchedulerError>;

    fn store_state(&mut self, frame: Frame, data: Vec<u8>, checksum: u32);

    fn state_for(&self, frame: Frame) -> Option<&[u8]>;
}

impl Simulation {
    /// Carries out `requests` in order, handing snapshots to `scheduler`.
    pub fn fulfil<S>(
        &mut self,
        scheduler: &mut S,
        requests: Vec<GameRequest>,
    ) -> Result<(), SchedulerError>
    where
        S: RollbackScheduler + ?Sized,
    {
        for request in requests {
            match request {
                GameRequest::Save { frame } => {
                    let mut buffer = vec![0u8; STATE_SIZE];
                    let saved = self.save(&mut buffer)?;
                    buffer.truncate(saved.len);
                    scheduler.store_state(frame, buffer, saved.checksum);
                }
                GameRequest::Load { frame } => {
                    let data = scheduler
                        .state_for(frame)
                        .ok_or(SchedulerError::MissingState(frame))?;
                    self.load(data)?;
                    self.set_frame(frame);
                }
                GameRequest::Advance { frame, inputs } => self.advance(&inputs, frame),
            }
        }
        Ok(())
    }
}

/// Logs membership changes; a desync is returned as fatal.
pub fn check_events(events: &[SchedulerEvent]) -> Result<(), IntegrityError> {
    for event in events {
        match *event {
            SchedulerEvent::PlayerConnected { handle } => {
                log::info!("Player {} connected", handle);
            }
            SchedulerEvent::PlayerDisconnected { handle } => {
                log::warn!("Player {} disconnected", handle);
            }
            SchedulerEvent::DesyncDetected {
                frame,
                remote_handle,
                local_checksum,
                remote_checksum,
            } => {
                log::error!(
                    "Desync at frame {}: local {:#010x}, remote {:#010x}",
                    frame,
                    local_checksum,
                    remote_checksum
                );
                return Err(IntegrityError::Desync {
                    frame,
                    remote_handle,
                    local_checksum,
                    remote_checksum,
                });
            }
        }
    }
    Ok(())
}
