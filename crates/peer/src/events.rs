use log::Level;

use lockstep::{Frame, SchedulerEvent, SessionEvent};

#[derive(Debug, Clone)]
pub enum PeerEvent {
    Session(SessionEvent),
    Scheduler(SchedulerEvent),
    Finished { frame: Frame, checksum: u32 },
    Error { message: String },
}

impl PeerEvent {
    pub fn level(&self) -> Level {
        match self {
            PeerEvent::Session(SessionEvent::PlayerRejected { .. })
            | PeerEvent::Session(SessionEvent::PlayerDisconnected { .. })
            | PeerEvent::Scheduler(SchedulerEvent::PlayerDisconnected { .. }) => Level::Warn,
            PeerEvent::Scheduler(SchedulerEvent::DesyncDetected { .. })
            | PeerEvent::Error { .. } => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            PeerEvent::Session(event) => match event {
                SessionEvent::PlayerConnected { slot, peer } => {
                    format!("{} joined as player {}", peer, slot)
                }
                SessionEvent::PlayerRejected { peer } => {
                    format!("Turned away {}: session is full", peer)
                }
                SessionEvent::PlayerDisconnected { slot } => format!("Player {} left", slot),
                SessionEvent::Connected { slot, players } => {
                    format!("Joined as player {} (others: {:?})", slot, players)
                }
                SessionEvent::Ended { reason } => format!("Session ended: {}", reason.as_str()),
            },
            PeerEvent::Scheduler(event) => match event {
                SchedulerEvent::PlayerConnected { handle } => {
                    format!("Player {} added to the scheduler", handle)
                }
                SchedulerEvent::PlayerDisconnected { handle } => {
                    format!("Player {} dropped from the scheduler", handle)
                }
                SchedulerEvent::DesyncDetected {
                    frame,
                    remote_handle,
                    local_checksum,
                    remote_checksum,
                } => format!(
                    "DESYNC f:{} rh:{} lc:{:#010x} rc:{:#010x}",
                    frame, remote_handle, local_checksum, remote_checksum
                ),
            },
            PeerEvent::Finished { frame, checksum } => {
                format!("Stopped at frame {} (checksum {:#010x})", frame, checksum)
            }
            PeerEvent::Error { message } => message.clone(),
        }
    }
}
