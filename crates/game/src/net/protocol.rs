use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

pub const MAX_DATAGRAM_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x4C4B_5350;
pub const DEFAULT_PORT: u16 = 6969;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct DatagramHeader {
    pub magic: u32,
    pub version: u32,
}

impl DatagramHeader {
    pub fn new() -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

impl Default for DatagramHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum DatagramBody {
    Connect,
    Accept,
    Reliable { sequence: u32, payload: Vec<u8> },
    Unreliable { payload: Vec<u8> },
    /// `next_expected` acknowledges every sequence before it.
    Ack {
        next_expected: u32,
        ack: u32,
        ack_bitfield: u32,
    },
    Ping,
    Pong,
    Disconnect,
    DisconnectAck,
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Datagram {
    pub header: DatagramHeader,
    pub body: DatagramBody,
}

#[derive(Debug, thiserror::Error)]
pub enum DatagramError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
}

impl Datagram {
    pub fn new(body: DatagramBody) -> Self {
        Self {
            header: DatagramHeader::new(),
            body,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, DatagramError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(DatagramError::Serialize)
    }

    /// Receive buffers carry no alignment guarantee, so the bytes are copied
    /// into an aligned buffer before validation.
    pub fn deserialize(data: &[u8]) -> Result<Self, DatagramError> {
        let mut aligned = AlignedVec::<16>::with_capacity(data.len());
        aligned.extend_from_slice(data);
        rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(DatagramError::Deserialize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_comparison() {
        assert!(sequence_greater_than(2, 1));
        assert!(!sequence_greater_than(1, 2));
        assert!(sequence_greater_than(0, u32::MAX));
        assert!(!sequence_greater_than(u32::MAX, 0));
        assert!(!sequence_greater_than(7, 7));
    }

    #[test]
    fn test_datagram_serialization() {
        let datagram = Datagram::new(DatagramBody::Reliable {
            sequence: 42,
            payload: vec![1, 0, 0, 0, 3],
        });

        let bytes = datagram.serialize().unwrap();
        assert!(bytes.len() <= MAX_DATAGRAM_SIZE);

        let decoded = Datagram::deserialize(&bytes).unwrap();
        assert!(decoded.header.is_valid());
        assert_eq!(decoded, datagram);
    }

    #[test]
    fn test_unaligned_input() {
        let bytes = Datagram::new(DatagramBody::Ack {
            next_expected: 7,
            ack: 9,
            ack_bitfield: 0b101,
        })
        .serialize()
        .unwrap();

        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&bytes);
        let decoded = Datagram::deserialize(&shifted[1..]).unwrap();
        assert_eq!(
            decoded.body,
            DatagramBody::Ack {
                next_expected: 7,
                ack: 9,
                ack_bitfield: 0b101
            }
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(Datagram::deserialize(&[0xAB; 3]).is_err());
    }
}
