use crate::net::PeerId;
use crate::simulation::MAX_PLAYERS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    Local,
    /// Directly linked peer.
    Peer(PeerId),
    /// Announced by the host's handshake; reached through the host.
    Remote,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Free,
    Occupied(Occupant),
    /// Vacated during this session; not granted again until reset.
    Retired,
}

#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: [SlotState; MAX_PLAYERS],
    capacity: usize,
}

impl SlotTable {
    /// Only the first `capacity` slots (at most `MAX_PLAYERS`) are granted.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: [SlotState::Free; MAX_PLAYERS],
            capacity: capacity.min(MAX_PLAYERS),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn first_free(&self) -> Option<usize> {
        self.slots[..self.capacity]
            .iter()
            .position(|s| *s == SlotState::Free)
    }

    /// Fails unless the slot is free and within capacity.
    pub fn occupy(&mut self, slot: usize, occupant: Occupant) -> bool {
        if slot >= self.capacity || self.slots[slot] != SlotState::Free {
            return false;
        }
        self.slots[slot] = SlotState::Occupied(occupant);
        true
    }

    pub fn retire(&mut self, slot: usize) -> Option<Occupant> {
        match self.slots.get(slot).copied() {
            Some(SlotState::Occupied(occupant)) => {
                self.slots[slot] = SlotState::Retired;
                Some(occupant)
            }
            _ => None,
        }
    }

    pub fn slot_of(&self, peer: PeerId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| *s == SlotState::Occupied(Occupant::Peer(peer)))
    }

    pub fn state(&self, slot: usize) -> SlotState {
        self.slots.get(slot).copied().unwrap_or(SlotState::Free)
    }

    pub fn active_count(&self) -> usize {
        self.active_slots().count()
    }

    pub fn active_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s, SlotState::Occupied(_)))
            .map(|(i, _)| i)
    }

    pub fn linked_peers(&self) -> Vec<PeerId> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                SlotState::Occupied(Occupant::Peer(peer)) => Some(*peer),
                _ => None,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, SlotState)> + '_ {
        self.slots.iter().copied().enumerate()
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new(MAX_PLAYERS)
    }
}
