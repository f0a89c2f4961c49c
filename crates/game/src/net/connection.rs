use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::tracking::{ReliableReceiver, ReliableSender};

/// Opaque handle for one transport link, valid until that link is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Outbound link waiting for `Accept`.
    Connecting,
    Connected,
    /// Local graceful disconnect waiting for `DisconnectAck`.
    Disconnecting,
}

#[derive(Debug)]
pub struct PeerLink {
    pub id: PeerId,
    pub addr: SocketAddr,
    pub state: LinkState,
    pub sender: ReliableSender,
    pub receiver: ReliableReceiver,
    pub created_at: Instant,
    pub last_receive_time: Instant,
    pub last_send_time: Instant,
    pub last_handshake_time: Instant,
    pub closing_since: Option<Instant>,
}

impl PeerLink {
    pub fn new(id: PeerId, addr: SocketAddr, state: LinkState, now: Instant) -> Self {
        Self {
            id,
            addr,
            state,
            sender: ReliableSender::new(),
            receiver: ReliableReceiver::new(),
            created_at: now,
            last_receive_time: now,
            last_send_time: now,
            last_handshake_time: now,
            closing_since: None,
        }
    }

    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_receive_time) > timeout
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_receive_time = now;
    }
}

#[derive(Debug)]
pub struct PeerTable {
    by_addr: HashMap<SocketAddr, PeerId>,
    links: HashMap<PeerId, PeerLink>,
    next_id: u32,
    max_peers: usize,
}

impl PeerTable {
    pub fn new(max_peers: usize) -> Self {
        Self {
            by_addr: HashMap::new(),
            links: HashMap::new(),
            next_id: 1,
            max_peers,
        }
    }

    pub fn is_full(&self) -> bool {
        self.links.len() >= self.max_peers
    }

    /// `None` when the table is full.
    pub fn insert(&mut self, addr: SocketAddr, state: LinkState, now: Instant) -> Option<PeerId> {
        if self.is_full() {
            return None;
        }

        let id = PeerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        self.links.insert(id, PeerLink::new(id, addr, state, now));
        self.by_addr.insert(addr, id);
        Some(id)
    }

    pub fn id_of(&self, addr: &SocketAddr) -> Option<PeerId> {
        self.by_addr.get(addr).copied()
    }

    pub fn get(&self, id: PeerId) -> Option<&PeerLink> {
        self.links.get(&id)
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut PeerLink> {
        self.links.get_mut(&id)
    }

    pub fn remove(&mut self, id: PeerId) -> Option<PeerLink> {
        let link = self.links.remove(&id)?;
        self.by_addr.remove(&link.addr);
        Some(link)
    }

    pub fn ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.links.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn connected_count(&self) -> usize {
        self.links
            .values()
            .filter(|l| l.state == LinkState::Connected)
            .count()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
