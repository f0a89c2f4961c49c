use crate::net::PeerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host: a peer joined and was granted `slot`.
    PlayerConnected { slot: usize, peer: PeerId },
    /// Host: a peer linked while every slot was taken and was dropped.
    PlayerRejected { peer: PeerId },
    /// Host: the occupant of `slot` left; the slot is retired.
    PlayerDisconnected { slot: usize },
    /// Client: the host accepted us into `slot`; `players` are the other
    /// occupied slots.
    Connected { slot: usize, players: Vec<usize> },
    Ended { reason: EndReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Requested,
    HostLost,
    PeerLost,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Requested => "disconnected",
            EndReason::HostLost => "lost the host",
            EndReason::PeerLost => "lost the only peer",
        }
    }
}
