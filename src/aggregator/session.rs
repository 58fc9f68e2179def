//! Session-scoped state tracked by the aggregator.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::action::{CardState, PlayerInfo, Zone};

use super::job::BoardSnapshot;

/// Identity of one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionKey {
    pub session_id: String,
    pub build_id: String,
}

/// Last-seen state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerState {
    pub info: PlayerInfo,
    pub next_level_xp: Option<i32>,
}

impl PlayerState {
    #[must_use]
    pub fn new(info: PlayerInfo) -> Self {
        Self {
            info,
            next_level_xp: None,
        }
    }
}

/// Cards collected during one brawl phase.
#[derive(Debug, Default)]
pub(crate) struct BrawlBuffers {
    boards: BoardSnapshot,
    seen_slots: HashMap<(String, Zone), HashSet<u32>>,
}

impl BrawlBuffers {
    pub(crate) fn new<'a>(players: impl IntoIterator<Item = &'a str>) -> Self {
        let mut buffers = Self::default();
        for player in players {
            buffers.boards.entry(player.to_string()).or_default();
        }
        buffers
    }

    /// Record a card. Character slots are kept first-wins per player and
    /// zone; other zones are appended as they come.
    pub(crate) fn record(&mut self, card: CardState) -> bool {
        if card.zone == Zone::Character {
            let key = (card.player_id.clone(), card.zone.clone());
            if !self.seen_slots.entry(key).or_default().insert(card.slot) {
                return false;
            }
        }
        self.boards
            .entry(card.player_id.clone())
            .or_default()
            .push(card);
        true
    }

    pub(crate) fn card_count(&self) -> usize {
        self.boards.values().map(Vec::len).sum()
    }

    pub(crate) fn into_snapshot(self) -> BoardSnapshot {
        self.boards
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(player: &str, zone: Zone, slot: u32, content: &str) -> CardState {
        CardState {
            player_id: player.to_string(),
            unit_id: None,
            content_id: content.to_string(),
            zone,
            slot,
            attack: 1,
            health: 1,
            golden: false,
            counter: -1,
            subtypes: Vec::new(),
            cost: 0,
            flags: crate::action::UnitFlags::default(),
            is_current: false,
        }
    }

    #[test]
    fn test_character_slots_first_wins() {
        let mut buffers = BrawlBuffers::new(["P1", "P2"]);
        assert!(buffers.record(card("P1", Zone::Character, 3, "first")));
        assert!(!buffers.record(card("P1", Zone::Character, 3, "echo")));
        assert!(buffers.record(card("P2", Zone::Character, 3, "other player")));

        let snapshot = buffers.into_snapshot();
        assert_eq!(snapshot["P1"].len(), 1);
        assert_eq!(snapshot["P1"][0].content_id, "first");
        assert_eq!(snapshot["P2"].len(), 1);
    }

    #[test]
    fn test_other_zones_append_unconditionally() {
        let mut buffers = BrawlBuffers::new(["P1"]);
        assert!(buffers.record(card("P1", Zone::Treasure, 0, "a")));
        assert!(buffers.record(card("P1", Zone::Treasure, 0, "b")));
        assert_eq!(buffers.card_count(), 2);
    }

    #[test]
    fn test_participants_start_with_empty_boards() {
        let buffers = BrawlBuffers::new(["P1", "P2"]);
        let snapshot = buffers.into_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.values().all(Vec::is_empty));
    }
}
