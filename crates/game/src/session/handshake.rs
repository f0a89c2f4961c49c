//! Session packets carried on the reliable channel. Byte 0 is the packet
//! kind; the rest is little-endian.

use crate::simulation::MAX_PLAYERS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    Invalid = 0,
    HostAcceptClient = 1,
}

impl PacketKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Invalid),
            1 => Some(Self::HostAcceptClient),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("empty packet")]
    Empty,
    #[error("unexpected packet kind {0}")]
    UnexpectedKind(u8),
    #[error("packet truncated at {actual} of {needed} bytes")]
    Truncated { needed: usize, actual: usize },
    #[error("{0} trailing bytes after packet")]
    TrailingBytes(usize),
    #[error("{0} other players exceeds the session limit")]
    TooManyPlayers(u32),
    #[error("slot {0} out of range")]
    SlotOutOfRange(u32),
}

/// Sent by the host to a newly linked peer: the slot it was granted and the
/// other occupied slots.
///
/// Layout: `kind: u8 | slot: u32 | count: u32 | players: [u32; count]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeAccept {
    pub slot: u32,
    pub players: Vec<u32>,
}

impl HandshakeAccept {
    const HEADER_LEN: usize = 1 + 4 + 4;

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::HEADER_LEN + self.players.len() * 4);
        bytes.push(PacketKind::HostAcceptClient as u8);
        bytes.extend_from_slice(&self.slot.to_le_bytes());
        bytes.extend_from_slice(&(self.players.len() as u32).to_le_bytes());
        for slot in &self.players {
            bytes.extend_from_slice(&slot.to_le_bytes());
        }
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, HandshakeError> {
        let tag = *bytes.first().ok_or(HandshakeError::Empty)?;
        if PacketKind::from_tag(tag) != Some(PacketKind::HostAcceptClient) {
            return Err(HandshakeError::UnexpectedKind(tag));
        }
        if bytes.len() < Self::HEADER_LEN {
            return Err(HandshakeError::Truncated {
                needed: Self::HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let slot = read_u32(bytes, 1);
        let count = read_u32(bytes, 5);
        if slot as usize >= MAX_PLAYERS {
            return Err(HandshakeError::SlotOutOfRange(slot));
        }
        if count as usize > MAX_PLAYERS - 1 {
            return Err(HandshakeError::TooManyPlayers(count));
        }

        let needed = Self::HEADER_LEN + count as usize * 4;
        if bytes.len() < needed {
            return Err(HandshakeError::Truncated {
                needed,
                actual: bytes.len(),
            });
        }
        if bytes.len() > needed {
            return Err(HandshakeError::TrailingBytes(bytes.len() - needed));
        }

        let mut players = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let other = read_u32(bytes, Self::HEADER_LEN + i * 4);
            if other as usize >= MAX_PLAYERS {
                return Err(HandshakeError::SlotOutOfRange(other));
            }
            players.push(other);
        }

        Ok(Self { slot, players })
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

/// The kind of an incoming session packet, without decoding the body.
pub fn peek_kind(bytes: &[u8]) -> Result<PacketKind, HandshakeError> {
    let tag = *bytes.first().ok_or(HandshakeError::Empty)?;
    PacketKind::from_tag(tag).ok_or(HandshakeError::UnexpectedKind(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_layout() {
        let accept = HandshakeAccept {
            slot: 2,
            players: vec![0, 1],
        };
        assert_eq!(
            accept.encode(),
            vec![1, 2, 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]
        );
        assert_eq!(HandshakeAccept::decode(&accept.encode()), Ok(accept));
    }

    #[test]
    fn test_rejects_truncated() {
        assert_eq!(HandshakeAccept::decode(&[]), Err(HandshakeError::Empty));
        assert!(matches!(
            HandshakeAccept::decode(&[1, 0, 0]),
            Err(HandshakeError::Truncated { .. })
        ));

        let mut bytes = HandshakeAccept {
            slot: 1,
            players: vec![0, 2],
        }
        .encode();
        bytes.pop();
        assert!(matches!(
            HandshakeAccept::decode(&bytes),
            Err(HandshakeError::Truncated { needed: 17, actual: 16 })
        ));
    }

    #[test]
    fn test_rejects_oversized() {
        let accept = HandshakeAccept {
            slot: 0,
            players: vec![1, 2, 3, 3],
        };
        assert_eq!(
            HandshakeAccept::decode(&accept.encode()),
            Err(HandshakeError::TooManyPlayers(4))
        );

        let mut bytes = HandshakeAccept {
            slot: 0,
            players: vec![],
        }
        .encode();
        bytes.push(9);
        assert_eq!(
            HandshakeAccept::decode(&bytes),
            Err(HandshakeError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_rejects_bad_slots_and_kinds() {
        let accept = HandshakeAccept {
            slot: 4,
            players: vec![],
        };
        assert_eq!(
            HandshakeAccept::decode(&accept.encode()),
            Err(HandshakeError::SlotOutOfRange(4))
        );

        let mut bytes = HandshakeAccept {
            slot: 1,
            players: vec![0],
        }
        .encode();
        bytes[0] = PacketKind::Invalid as u8;
        assert_eq!(
            HandshakeAccept::decode(&bytes),
            Err(HandshakeError::UnexpectedKind(0))
        );
        assert_eq!(peek_kind(&[7]), Err(HandshakeError::UnexpectedKind(7)));
        assert_eq!(peek_kind(&[1]), Ok(PacketKind::HostAcceptClient));
    }
}
