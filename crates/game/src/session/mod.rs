//! Peer session lifecycle: hosting, joining, slot assignment and teardown on
//! top of a [`Transport`].

mod events;
mod handshake;
mod slots;

use std::collections::VecDeque;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::net::{
    Channel, NetworkStats, PeerId, Transport, TransportConfig, TransportError, TransportEvent,
    UdpTransport,
};
use crate::simulation::MAX_PLAYERS;

pub use events::{EndReason, SessionEvent};
pub use handshake::{HandshakeAccept, HandshakeError, PacketKind, peek_kind};
pub use slots::{Occupant, SlotState, SlotTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Slot the host takes for itself; 0 when unset.
    pub local_slot: Option<usize>,
    pub max_players: usize,
    pub poll_timeout_ms: u64,
    pub transport: TransportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_slot: None,
            max_players: MAX_PLAYERS,
            poll_timeout_ms: 1,
            transport: TransportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Idle,
    Host,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Hosting,
    Connecting,
    Active,
    Disconnecting,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Hosting => "hosting",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Disconnecting => "disconnecting",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("cannot resolve {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} resolved to no address")]
    NoAddress(String),
    #[error("local slot {slot} is outside 0..{max}")]
    LocalSlot { slot: usize, max: usize },
    #[error("session already running")]
    AlreadyRunning,
}

pub struct Session<T: Transport = UdpTransport> {
    config: SessionConfig,
    transport: Option<T>,
    role: Role,
    state: SessionState,
    slots: SlotTable,
    local_slot: Option<usize>,
    host_link: Option<PeerId>,
    host_link_up: bool,
    events: VecDeque<SessionEvent>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig) -> Self {
        let slots = SlotTable::new(config.max_players);
        Self {
            config,
            transport: None,
            role: Role::Idle,
            state: SessionState::Idle,
            slots,
            local_slot: None,
            host_link: None,
            host_link_up: false,
            events: VecDeque::new(),
        }
    }

    pub fn host(&mut self, port: u16) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyRunning);
        }

        let mut slots = SlotTable::new(self.config.max_players);
        let local = self.config.local_slot.unwrap_or(0);
        if !slots.occupy(local, Occupant::Local) {
            return Err(SessionError::LocalSlot {
                slot: local,
                max: slots.capacity(),
            });
        }

        let transport = T::open(port, &self.config.transport)?;
        log::info!("Hosting on {} in slot {}", transport.local_addr(), local);

        self.transport = Some(transport);
        self.slots = slots;
        self.local_slot = Some(local);
        self.role = Role::Host;
        self.state = SessionState::Hosting;
        Ok(())
    }

    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyRunning);
        }

        let label = format!("{}:{}", host, port);
        let mut addrs = (host, port)
            .to_socket_addrs()
            .map_err(|source| SessionError::Resolve {
                addr: label.clone(),
                source,
            })?;
        let addr = addrs.next().ok_or(SessionError::NoAddress(label))?;

        self.connect_addr(addr)
    }

    pub fn connect_addr(&mut self, addr: SocketAddr) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyRunning);
        }

        let mut transport = T::open(0, &self.config.transport)?;
        let host_link = match transport.connect(addr) {
            Ok(peer) => peer,
            Err(e) => {
                transport.close();
                return Err(e.into());
            }
        };
        log::info!("Connecting to {}", addr);

        self.transport = Some(transport);
        self.slots = SlotTable::new(MAX_PLAYERS);
        self.host_link = Some(host_link);
        self.host_link_up = false;
        self.role = Role::Client;
        self.state = SessionState::Connecting;
        Ok(())
    }

    /// Drains the transport, then processes what it returned. A teardown
    /// while processing drops the remaining events.
    pub fn poll(&mut self) -> Result<(), SessionError> {
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };
        let events = transport.poll(timeout)?;

        for event in events {
            if self.transport.is_none() {
                break;
            }
            self.handle_event(event);
        }
        Ok(())
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connect(peer) => match self.role {
                Role::Host => self.admit(peer),
                Role::Client if self.host_link == Some(peer) => {
                    log::debug!("Link to host up, awaiting handshake");
                    self.host_link_up = true;
                }
                _ => {
                    log::warn!("Unexpected link from {}", peer);
                    if let Some(transport) = self.transport.as_mut() {
                        transport.disconnect_now(peer);
                    }
                }
            },
            TransportEvent::Receive(peer, payload, channel) => {
                if self.state == SessionState::Disconnecting {
                    return;
                }
                self.handle_packet(peer, &payload, channel);
            }
            TransportEvent::Disconnect(peer) => self.handle_disconnect(peer),
        }
    }

    fn admit(&mut self, peer: PeerId) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let Some(slot) = self.slots.first_free() else {
            log::warn!("Session full, rejecting {}", peer);
            transport.disconnect_now(peer);
            self.events.push_back(SessionEvent::PlayerRejected { peer });
            return;
        };

        self.slots.occupy(slot, Occupant::Peer(peer));
        let accept = HandshakeAccept {
            slot: slot as u32,
            players: self
                .slots
                .active_slots()
                .filter(|&other| other != slot)
                .map(|other| other as u32)
                .collect(),
        };

        if let Err(e) = transport.send(peer, &accept.encode(), Channel::Reliable) {
            log::warn!("Handshake to {} failed: {}", peer, e);
            transport.disconnect_now(peer);
            self.slots.retire(slot);
            return;
        }

        log::info!("{} joined in slot {}", peer, slot);
        self.events
            .push_back(SessionEvent::PlayerConnected { slot, peer });
    }

    fn handle_packet(&mut self, peer: PeerId, payload: &[u8], channel: Channel) {
        match peek_kind(payload) {
            Ok(PacketKind::HostAcceptClient) => self.handle_accept(peer, payload, channel),
            Ok(PacketKind::Invalid) => log::warn!("Invalid packet from {}", peer),
            Err(e) => log::warn!("Ignoring packet from {}: {}", peer, e),
        }
    }

    fn handle_accept(&mut self, peer: PeerId, payload: &[u8], channel: Channel) {
        if self.role != Role::Client || self.host_link != Some(peer) {
            log::warn!("Ignoring handshake from {}", peer);
            return;
        }
        if channel != Channel::Reliable {
            log::warn!("Ignoring unreliable handshake");
            return;
        }
        if self.state == SessionState::Active {
            log::warn!("Handshake received while already active");
            return;
        }

        let accept = match HandshakeAccept::decode(payload) {
            Ok(accept) => accept,
            Err(e) => {
                log::warn!("Malformed handshake: {}", e);
                return;
            }
        };

        let slot = accept.slot as usize;
        let mut slots = SlotTable::new(MAX_PLAYERS);
        slots.occupy(slot, Occupant::Local);
        for &other in &accept.players {
            if !slots.occupy(other as usize, Occupant::Remote) {
                log::warn!("Handshake lists slot {} twice", other);
            }
        }

        self.slots = slots;
        self.local_slot = Some(slot);
        self.host_link_up = true;
        self.state = SessionState::Active;
        log::info!("Connected in slot {}", slot);
        self.events.push_back(SessionEvent::Connected {
            slot,
            players: accept.players.iter().map(|&p| p as usize).collect(),
        });
    }

    fn handle_disconnect(&mut self, peer: PeerId) {
        match self.role {
            Role::Client if self.host_link == Some(peer) => {
                let reason = if self.state == SessionState::Disconnecting {
                    EndReason::Requested
                } else {
                    EndReason::HostLost
                };
                self.host_link = None;
                self.teardown(reason);
            }
            Role::Host => {
                let Some(slot) = self.slots.slot_of(peer) else {
                    return;
                };
                self.slots.retire(slot);
                log::info!("{} left slot {}", peer, slot);
                self.events
                    .push_back(SessionEvent::PlayerDisconnected { slot });

                if self.config.max_players <= 2 {
                    self.teardown(EndReason::PeerLost);
                }
            }
            _ => {}
        }
    }

    /// Immediate teardown: every peer is force-disconnected and the transport
    /// closed.
    pub fn disconnect(&mut self) {
        self.teardown(EndReason::Requested);
    }

    /// Graceful for a client with a live link to the host; otherwise the same
    /// as [`Session::disconnect`].
    pub fn try_disconnect(&mut self) {
        if self.state == SessionState::Disconnecting {
            return;
        }

        let graceful = self.role == Role::Client && self.host_link_up;
        let (Some(host_link), true) = (self.host_link, graceful) else {
            self.disconnect();
            return;
        };

        let result = match self.transport.as_mut() {
            Some(transport) => transport.disconnect(host_link),
            None => Err(TransportError::UnknownPeer(host_link)),
        };
        match result {
            Ok(()) => {
                log::info!("Disconnecting");
                self.state = SessionState::Disconnecting;
            }
            Err(e) => {
                log::warn!("Graceful disconnect failed: {}", e);
                self.disconnect();
            }
        }
    }

    fn teardown(&mut self, reason: EndReason) {
        let was_running = self.state != SessionState::Idle;

        if let Some(mut transport) = self.transport.take() {
            for peer in self.slots.linked_peers() {
                transport.disconnect_now(peer);
            }
            if let Some(host_link) = self.host_link.take() {
                transport.disconnect_now(host_link);
            }
            transport.close();
        }

        self.slots = SlotTable::new(self.config.max_players);
        self.local_slot = None;
        self.host_link = None;
        self.host_link_up = false;
        self.role = Role::Idle;
        self.state = SessionState::Idle;

        if was_running {
            log::info!("Session ended: {}", reason.as_str());
            self.events.push_back(SessionEvent::Ended { reason });
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Hosts count as connected from the start; clients once accepted.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Hosting | SessionState::Active)
    }

    /// A transport is open.
    pub fn exists(&self) -> bool {
        self.transport.is_some()
    }

    pub fn local_slot(&self) -> Option<usize> {
        self.local_slot
    }

    pub fn slots(&self) -> &SlotTable {
        &self.slots
    }

    pub fn active_count(&self) -> usize {
        self.slots.active_count()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.as_ref().map(|t| t.local_addr())
    }

    pub fn stats(&self) -> Option<NetworkStats> {
        self.transport.as_ref().map(|t| t.stats())
    }
}
