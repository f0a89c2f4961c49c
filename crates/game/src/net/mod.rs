mod connection;
mod endpoint;
mod protocol;
mod stats;
mod tracking;
mod transport;

pub use connection::{LinkState, PeerId, PeerLink, PeerTable};
pub use endpoint::NetworkEndpoint;
pub use protocol::{
    DEFAULT_PORT, Datagram, DatagramBody, DatagramError, DatagramHeader, MAX_DATAGRAM_SIZE,
    PROTOCOL_MAGIC, PROTOCOL_VERSION, sequence_greater_than,
};
pub use stats::{NetworkStats, PacketLossSimulation, rand_percent, rand_u64};
pub use tracking::{AckData, PendingReliable, ReliableReceiver, ReliableSender};
pub use transport::{
    Channel, MAX_PAYLOAD_SIZE, Transport, TransportConfig, TransportError, TransportEvent,
    UdpTransport,
};
