use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use super::protocol::{Datagram, MAX_DATAGRAM_SIZE};
use super::stats::{NetworkStats, PacketLossSimulation};

/// Non-blocking UDP socket speaking [`Datagram`]s.
pub struct NetworkEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stats: NetworkStats,
    loss: PacketLossSimulation,
    recv_buffer: [u8; MAX_DATAGRAM_SIZE],
}

impl NetworkEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: NetworkStats::default(),
            loss: PacketLossSimulation::default(),
            recv_buffer: [0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut NetworkStats {
        &mut self.stats
    }

    pub fn set_packet_loss(&mut self, loss: PacketLossSimulation) {
        self.loss = loss;
    }

    pub fn send_to(&mut self, datagram: &Datagram, addr: SocketAddr) -> io::Result<usize> {
        let data = datagram.serialize().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Serialization error: {}", e),
            )
        })?;

        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Datagram exceeds MTU",
            ));
        }

        if self.loss.should_drop() {
            self.stats.packets_dropped += 1;
            return Ok(data.len());
        }

        let bytes = self.socket.send_to(&data, addr)?;

        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes as u64;

        Ok(bytes)
    }

    /// Drains the socket. Undecodable datagrams and foreign magic/version are
    /// skipped.
    pub fn receive(&mut self) -> io::Result<Vec<(Datagram, SocketAddr)>> {
        let mut datagrams = Vec::new();

        loop {
            match self.socket.recv_from(&mut self.recv_buffer) {
                Ok((size, addr)) => match Datagram::deserialize(&self.recv_buffer[..size]) {
                    Ok(datagram) if datagram.header.is_valid() => {
                        self.stats.packets_received += 1;
                        self.stats.bytes_received += size as u64;
                        datagrams.push((datagram, addr));
                    }
                    Ok(_) => {
                        log::debug!("Ignoring datagram with foreign header from {}", addr);
                    }
                    Err(e) => {
                        log::debug!("Ignoring malformed datagram from {}: {}", addr, e);
                    }
                },
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                // ICMP port unreachable surfaces here on some platforms.
                Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(datagrams)
    }
}
