use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::connection::{LinkState, PeerId, PeerTable};
use super::endpoint::NetworkEndpoint;
use super::protocol::{Datagram, DatagramBody, MAX_DATAGRAM_SIZE};
use super::stats::{NetworkStats, PacketLossSimulation};

/// Room left in a datagram for the envelope around a payload.
pub const MAX_PAYLOAD_SIZE: usize = MAX_DATAGRAM_SIZE - 100;

const POLL_SLEEP: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Ordered, delivered once.
    Reliable,
    /// Sent once, may be lost or reordered.
    Unreliable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connect(PeerId),
    Receive(PeerId, Vec<u8>, Channel),
    Disconnect(PeerId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub bind_address: String,
    pub max_peers: usize,
    pub connect_timeout_ms: u64,
    pub link_timeout_ms: u64,
    pub disconnect_timeout_ms: u64,
    pub ping_interval_ms: u64,
    pub handshake_resend_ms: u64,
    pub max_pending_reliable: usize,
    pub packet_loss: PacketLossSimulation,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            max_peers: 8,
            connect_timeout_ms: 5000,
            link_timeout_ms: 10_000,
            disconnect_timeout_ms: 3000,
            ping_interval_ms: 500,
            handshake_resend_ms: 250,
            max_pending_reliable: 256,
            packet_loss: PacketLossSimulation::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
    #[error("{0} is not connected")]
    NotConnected(PeerId),
    #[error("peer limit of {0} reached")]
    PeerLimit(usize),
    #[error("already linked to {0}")]
    AlreadyLinked(SocketAddr),
    #[error("payload of {0} bytes does not fit in a datagram")]
    PayloadTooLarge(usize),
    #[error("{peer} has {pending} unacknowledged reliable payloads")]
    Backlog { peer: PeerId, pending: usize },
}

/// A packet transport with one reliable-ordered and one unreliable channel,
/// addressed by [`PeerId`].
pub trait Transport: Sized {
    /// Port 0 binds an ephemeral port.
    fn open(port: u16, config: &TransportConfig) -> Result<Self, TransportError>;

    fn local_addr(&self) -> SocketAddr;

    /// Starts an outbound link. `Connect` is reported once the remote side
    /// accepts.
    fn connect(&mut self, addr: SocketAddr) -> Result<PeerId, TransportError>;

    /// Returns as soon as at least one event is ready, or once `timeout`
    /// has elapsed.
    fn poll(&mut self, timeout: Duration) -> Result<Vec<TransportEvent>, TransportError>;

    fn send(&mut self, peer: PeerId, payload: &[u8], channel: Channel)
    -> Result<(), TransportError>;

    /// Graceful: `Disconnect` is reported once the peer confirms or the
    /// confirmation times out.
    fn disconnect(&mut self, peer: PeerId) -> Result<(), TransportError>;

    /// Forced: notifies the peer at most once and forgets it. No local event.
    fn disconnect_now(&mut self, peer: PeerId);

    /// Force-disconnects every peer and releases the socket.
    fn close(self);

    fn stats(&self) -> NetworkStats;
}

pub struct UdpTransport {
    endpoint: NetworkEndpoint,
    peers: PeerTable,
    config: TransportConfig,
    events: VecDeque<TransportEvent>,
}

impl UdpTransport {
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn pump(&mut self, now: Instant) -> Result<(), TransportError> {
        for (datagram, addr) in self.endpoint.receive()? {
            self.handle_datagram(datagram.body, addr, now);
        }
        self.service(now);
        Ok(())
    }

    fn handle_datagram(&mut self, body: DatagramBody, addr: SocketAddr, now: Instant) {
        let Some(id) = self.peers.id_of(&addr) else {
            self.handle_stranger(body, addr, now);
            return;
        };
        let Some(link) = self.peers.get_mut(id) else {
            return;
        };
        link.touch(now);

        match body {
            DatagramBody::Connect => {
                // Our Accept was lost.
                if link.state == LinkState::Connected {
                    emit(&mut self.endpoint, addr, DatagramBody::Accept);
                }
            }
            DatagramBody::Accept => {
                if link.state == LinkState::Connecting {
                    link.state = LinkState::Connected;
                    log::debug!("{} accepted by {}", id, addr);
                    self.events.push_back(TransportEvent::Connect(id));
                }
            }
            DatagramBody::Reliable { sequence, payload } => {
                if link.state == LinkState::Connecting {
                    // Accept lost but data is flowing.
                    link.state = LinkState::Connected;
                    self.events.push_back(TransportEvent::Connect(id));
                }

                let ready = link.receiver.receive(sequence, payload);
                if let Some(data) = link.receiver.ack_data() {
                    emit(
                        &mut self.endpoint,
                        addr,
                        DatagramBody::Ack {
                            next_expected: data.next_expected,
                            ack: data.ack,
                            ack_bitfield: data.ack_bitfield,
                        },
                    );
                }
                for payload in ready {
                    self.events
                        .push_back(TransportEvent::Receive(id, payload, Channel::Reliable));
                }
            }
            DatagramBody::Unreliable { payload } => {
                if link.state == LinkState::Connecting {
                    link.state = LinkState::Connected;
                    self.events.push_back(TransportEvent::Connect(id));
                }
                self.events
                    .push_back(TransportEvent::Receive(id, payload, Channel::Unreliable));
            }
            DatagramBody::Ack {
                next_expected,
                ack,
                ack_bitfield,
            } => {
                link.sender.process_ack(next_expected, ack, ack_bitfield, now);
                let stats = self.endpoint.stats_mut();
                stats.rtt_ms = link.sender.srtt();
                stats.rtt_variance = link.sender.rtt_var();
            }
            DatagramBody::Ping => {
                emit(&mut self.endpoint, addr, DatagramBody::Pong);
                link.last_send_time = now;
            }
            DatagramBody::Pong => {}
            DatagramBody::Disconnect => {
                emit(&mut self.endpoint, addr, DatagramBody::DisconnectAck);
                self.peers.remove(id);
                log::debug!("{} at {} disconnected", id, addr);
                self.events.push_back(TransportEvent::Disconnect(id));
            }
            DatagramBody::DisconnectAck => {
                if link.state == LinkState::Disconnecting {
                    self.peers.remove(id);
                    self.events.push_back(TransportEvent::Disconnect(id));
                }
            }
        }
    }

    fn handle_stranger(&mut self, body: DatagramBody, addr: SocketAddr, now: Instant) {
        match body {
            DatagramBody::Connect => match self.peers.insert(addr, LinkState::Connected, now) {
                Some(id) => {
                    emit(&mut self.endpoint, addr, DatagramBody::Accept);
                    log::debug!("{} linked from {}", id, addr);
                    self.events.push_back(TransportEvent::Connect(id));
                }
                None => {
                    log::warn!("Refusing link from {}: peer limit reached", addr);
                    emit(&mut self.endpoint, addr, DatagramBody::Disconnect);
                }
            },
            // Lets a graceful disconnect finish after we already forgot the peer.
            DatagramBody::Disconnect => {
                emit(&mut self.endpoint, addr, DatagramBody::DisconnectAck);
            }
            _ => log::debug!("Ignoring datagram from unlinked {}", addr),
        }
    }

    /// Timers: handshake resends, reliable resends, keep-alive and timeouts.
    fn service(&mut self, now: Instant) {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let link_timeout = Duration::from_millis(self.config.link_timeout_ms);
        let disconnect_timeout = Duration::from_millis(self.config.disconnect_timeout_ms);
        let handshake_resend = Duration::from_millis(self.config.handshake_resend_ms);
        let ping_interval = Duration::from_millis(self.config.ping_interval_ms);

        for id in self.peers.ids() {
            let Some(link) = self.peers.get_mut(id) else {
                continue;
            };
            let addr = link.addr;

            match link.state {
                LinkState::Connecting => {
                    if now.saturating_duration_since(link.created_at) > connect_timeout {
                        log::warn!("{}: no answer from {}", id, addr);
                        self.peers.remove(id);
                        self.events.push_back(TransportEvent::Disconnect(id));
                    } else if now.saturating_duration_since(link.last_handshake_time)
                        >= handshake_resend
                    {
                        link.last_handshake_time = now;
                        emit(&mut self.endpoint, addr, DatagramBody::Connect);
                    }
                }
                LinkState::Disconnecting => {
                    let since = link.closing_since.unwrap_or(link.created_at);
                    if now.saturating_duration_since(since) > disconnect_timeout {
                        self.peers.remove(id);
                        self.events.push_back(TransportEvent::Disconnect(id));
                    } else if now.saturating_duration_since(link.last_handshake_time)
                        >= handshake_resend
                    {
                        link.last_handshake_time = now;
                        emit(&mut self.endpoint, addr, DatagramBody::Disconnect);
                    }
                }
                LinkState::Connected => {
                    if link.is_timed_out(now, link_timeout) {
                        log::warn!("{} at {} timed out", id, addr);
                        self.peers.remove(id);
                        self.events.push_back(TransportEvent::Disconnect(id));
                        continue;
                    }

                    for (sequence, payload) in link.sender.due_resends(now) {
                        emit(
                            &mut self.endpoint,
                            addr,
                            DatagramBody::Reliable { sequence, payload },
                        );
                        self.endpoint.stats_mut().resends += 1;
                        link.last_send_time = now;
                    }

                    if now.saturating_duration_since(link.last_send_time) >= ping_interval {
                        emit(&mut self.endpoint, addr, DatagramBody::Ping);
                        link.last_send_time = now;
                    }
                }
            }
        }
    }
}

/// Control traffic is fire-and-forget; timers cover a failed send.
fn emit(endpoint: &mut NetworkEndpoint, addr: SocketAddr, body: DatagramBody) {
    if let Err(e) = endpoint.send_to(&Datagram::new(body), addr) {
        log::warn!("Send to {} failed: {}", addr, e);
    }
}

impl Transport for UdpTransport {
    fn open(port: u16, config: &TransportConfig) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", config.bind_address, port);
        let mut endpoint =
            NetworkEndpoint::bind(addr.as_str()).map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;
        endpoint.set_packet_loss(config.packet_loss.clone());

        log::debug!("Transport open on {}", endpoint.local_addr());

        Ok(Self {
            endpoint,
            peers: PeerTable::new(config.max_peers),
            config: config.clone(),
            events: VecDeque::new(),
        })
    }

    fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    fn connect(&mut self, addr: SocketAddr) -> Result<PeerId, TransportError> {
        if self.peers.id_of(&addr).is_some() {
            return Err(TransportError::AlreadyLinked(addr));
        }

        let now = Instant::now();
        let id = self
            .peers
            .insert(addr, LinkState::Connecting, now)
            .ok_or(TransportError::PeerLimit(self.config.max_peers))?;

        self.endpoint
            .send_to(&Datagram::new(DatagramBody::Connect), addr)?;
        Ok(id)
    }

    fn poll(&mut self, timeout: Duration) -> Result<Vec<TransportEvent>, TransportError> {
        let deadline = Instant::now() + timeout;

        loop {
            let now = Instant::now();
            self.pump(now)?;

            if !self.events.is_empty() || now >= deadline {
                break;
            }
            thread::sleep(POLL_SLEEP.min(deadline - now));
        }

        Ok(self.events.drain(..).collect())
    }

    fn send(
        &mut self,
        peer: PeerId,
        payload: &[u8],
        channel: Channel,
    ) -> Result<(), TransportError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(TransportError::PayloadTooLarge(payload.len()));
        }

        let link = self
            .peers
            .get_mut(peer)
            .ok_or(TransportError::UnknownPeer(peer))?;
        if link.state != LinkState::Connected {
            return Err(TransportError::NotConnected(peer));
        }

        let now = Instant::now();
        let body = match channel {
            Channel::Reliable => {
                let pending = link.sender.unacked_count();
                if pending >= self.config.max_pending_reliable {
                    return Err(TransportError::Backlog { peer, pending });
                }
                let sequence = link.sender.push(payload.to_vec(), now);
                DatagramBody::Reliable {
                    sequence,
                    payload: payload.to_vec(),
                }
            }
            Channel::Unreliable => DatagramBody::Unreliable {
                payload: payload.to_vec(),
            },
        };

        link.last_send_time = now;
        self.endpoint.send_to(&Datagram::new(body), link.addr)?;
        Ok(())
    }

    fn disconnect(&mut self, peer: PeerId) -> Result<(), TransportError> {
        let link = self
            .peers
            .get_mut(peer)
            .ok_or(TransportError::UnknownPeer(peer))?;

        match link.state {
            LinkState::Connecting => {
                self.peers.remove(peer);
                self.events.push_back(TransportEvent::Disconnect(peer));
            }
            LinkState::Connected => {
                let now = Instant::now();
                link.state = LinkState::Disconnecting;
                link.closing_since = Some(now);
                link.last_handshake_time = now;
                let addr = link.addr;
                emit(&mut self.endpoint, addr, DatagramBody::Disconnect);
            }
            LinkState::Disconnecting => {}
        }
        Ok(())
    }

    fn disconnect_now(&mut self, peer: PeerId) {
        let Some(link) = self.peers.remove(peer) else {
            return;
        };
        // A link that never connected has nobody to notify.
        if link.state != LinkState::Connecting {
            emit(&mut self.endpoint, link.addr, DatagramBody::Disconnect);
        }
    }

    fn close(mut self) {
        for id in self.peers.ids() {
            self.disconnect_now(id);
        }
        log::debug!("Transport on {} closed", self.endpoint.local_addr());
    }

    fn stats(&self) -> NetworkStats {
        self.endpoint.stats().clone()
    }
}
