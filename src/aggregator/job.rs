//! Consumer-facing jobs emitted by the aggregator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::action::{Action, CardState};

/// Board contents gathered during one brawl phase, keyed by player id.
pub type BoardSnapshot = BTreeMap<String, Vec<CardState>>;

/// Kind tag of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    NewGame,
    EndGame,
    RoundInfo,
    PlayerInfo,
    HealthUpdate,
    BoardInfo,
    EndCombat,
    CardUpdate,
    HeroDiscover,
    Matchmaking,
}

/// A notification derived from one or more actions.
///
/// New kinds may be added; consumers should ignore kinds they do not handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Job {
    /// A new session started.
    NewGame { action: Action },
    /// The match finished; carries the results-phase player entry.
    EndGame { action: Action },
    /// A shop phase started.
    RoundInfo { action: Action, round: u32 },
    /// Player summary. `live` is set once the first full player burst has
    /// been seen, so later bursts are mid-match updates.
    PlayerInfo { action: Action, live: bool },
    /// A player entry seen out of its usual sequence, carrying a health change.
    HealthUpdate { action: Action },
    /// Boards gathered during one brawl phase.
    BoardInfo { round: u32, boards: BoardSnapshot },
    /// Combat finished.
    EndCombat { action: Action },
    /// A card changed outside of combat.
    CardUpdate { action: Action },
    /// Hero choices offered before the first round.
    HeroDiscover { action: Action },
    /// A matchmaking request was sent.
    Matchmaking { action: Action },
}

impl Job {
    #[must_use]
    pub fn kind(&self) -> JobKind {
        match self {
            Self::NewGame { .. } => JobKind::NewGame,
            Self::EndGame { .. } => JobKind::EndGame,
            Self::RoundInfo { .. } => JobKind::RoundInfo,
            Self::PlayerInfo { .. } => JobKind::PlayerInfo,
            Self::HealthUpdate { .. } => JobKind::HealthUpdate,
            Self::BoardInfo { .. } => JobKind::BoardInfo,
            Self::EndCombat { .. } => JobKind::EndCombat,
            Self::CardUpdate { .. } => JobKind::CardUpdate,
            Self::HeroDiscover { .. } => JobKind::HeroDiscover,
            Self::Matchmaking { .. } => JobKind::Matchmaking,
        }
    }

    /// The triggering action, for every kind except `BoardInfo`.
    #[must_use]
    pub fn action(&self) -> Option<&Action> {
        match self {
            Self::NewGame { action }
            | Self::EndGame { action }
            | Self::RoundInfo { action, .. }
            | Self::PlayerInfo { action, .. }
            | Self::HealthUpdate { action }
            | Self::EndCombat { action }
            | Self::CardUpdate { action }
            | Self::HeroDiscover { action }
            | Self::Matchmaking { action } => Some(action),
            Self::BoardInfo { .. } => None,
        }
    }

    /// The board snapshot of a `BoardInfo` job.
    #[must_use]
    pub fn boards(&self) -> Option<&BoardSnapshot> {
        match self {
            Self::BoardInfo { boards, .. } => Some(boards),
            _ => None,
        }
    }
}
