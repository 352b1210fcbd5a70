use dashmap::DashMap;
use duet_core::{PartyId, RoomId};
use thiserror::Error;
use tracing::debug;

/// A join was attempted on a room that already holds two parties. The
/// party was not added; it may retry with another room.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("room is full")]
pub struct RoomFull;

/// Result of a successful join: the members that were already present,
/// excluding the joiner itself. At most one entry under the two-party cap.
#[derive(Debug, PartialEq, Eq)]
pub struct JoinOutcome {
    pub existing: Vec<PartyId>,
}

const ROOM_CAPACITY: usize = 2;

/// Tracks which room each party occupies and enforces the two-party cap.
/// Constructed once at server start and shared behind an `Arc`; all
/// mutation goes through `join`/`leave`.
pub struct RendezvousRegistry {
    rooms: DashMap<RoomId, Vec<PartyId>>,
}

impl RendezvousRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Atomically check capacity and add the party. The dashmap entry
    /// guard is held across the check and the insert, so two concurrent
    /// joiners can never both observe a single-member room.
    pub fn join(&self, room: &RoomId, party: PartyId) -> Result<JoinOutcome, RoomFull> {
        let mut members = self.rooms.entry(room.clone()).or_default();

        if members.contains(&party) {
            let existing = members.iter().filter(|p| **p != party).cloned().collect();
            return Ok(JoinOutcome { existing });
        }

        if members.len() >= ROOM_CAPACITY {
            return Err(RoomFull);
        }

        let existing = members.clone();
        members.push(party);
        Ok(JoinOutcome { existing })
    }

    /// Remove the party from the room. Idempotent: a party or room that
    /// is not present is a no-op. Returns whether a member was actually
    /// removed, so callers notify peers at most once.
    pub fn leave(&self, room: &RoomId, party: &PartyId) -> bool {
        let Some(mut members) = self.rooms.get_mut(room) else {
            return false;
        };

        let before = members.len();
        members.retain(|p| p != party);
        let removed = members.len() != before;
        let emptied = members.is_empty();
        drop(members);

        if emptied {
            // Re-checked under the entry lock: a join may have landed
            // between dropping the guard and the removal.
            self.rooms.remove_if(room, |_, members| members.is_empty());
            debug!("Room {room} emptied and removed");
        }

        removed
    }

    pub fn members_of(&self, room: &RoomId) -> Vec<PartyId> {
        self.rooms
            .get(room)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    /// Every room the party currently occupies. Used to turn a transport
    /// disconnect into implicit leaves.
    pub fn rooms_of(&self, party: &PartyId) -> Vec<RoomId> {
        self.rooms
            .iter()
            .filter(|entry| entry.value().contains(party))
            .map(|entry| entry.key().clone())
            .collect()
    }
}

impl Default for RendezvousRegistry {
    fn default() -> Self {
        Self::new()
    }
}
