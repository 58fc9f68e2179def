//! Typed actions shared by the text log and binary match file sources.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of an [`Action`], with the event tag used in the text log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    ConnectionInfo,
    AddPlayer,
    EnterResultsPhase,
    EnterBrawlPhase,
    EnterShopPhase,
    EndRoundGather,
    CreateCard,
    UpdateCard,
    RemoveCard,
    MoveCard,
    ModifyGold,
    ModifyXp,
    ModifyLevel,
    ModifyNextLevelXp,
    UpdateTurnTimer,
    PresentHeroDiscover,
    PresentDiscover,
    CastSpell,
    Attack,
    DealDamage,
    Death,
    ReplaceUnit,
    SelectTargets,
    BrawlComplete,
    Matchmaking,
}

impl ActionType {
    /// Every action type, in discriminator order.
    pub const ALL: [ActionType; 25] = [
        Self::ConnectionInfo,
        Self::AddPlayer,
        Self::EnterResultsPhase,
        Self::EnterBrawlPhase,
        Self::EnterShopPhase,
        Self::EndRoundGather,
        Self::CreateCard,
        Self::UpdateCard,
        Self::RemoveCard,
        Self::MoveCard,
        Self::ModifyGold,
        Self::ModifyXp,
        Self::ModifyLevel,
        Self::ModifyNextLevelXp,
        Self::UpdateTurnTimer,
        Self::PresentHeroDiscover,
        Self::PresentDiscover,
        Self::CastSpell,
        Self::Attack,
        Self::DealDamage,
        Self::Death,
        Self::ReplaceUnit,
        Self::SelectTargets,
        Self::BrawlComplete,
        Self::Matchmaking,
    ];

    /// The bracketed event tag written by the game client.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::ConnectionInfo => "ActionConnectionInfo",
            Self::AddPlayer => "ActionAddPlayer",
            Self::EnterResultsPhase => "ActionEnterResultsPhase",
            Self::EnterBrawlPhase => "ActionEnterBrawlPhase",
            Self::EnterShopPhase => "ActionEnterShopPhase",
            Self::EndRoundGather => "ActionEndRoundGather",
            Self::CreateCard => "ActionCreateCard",
            Self::UpdateCard => "ActionUpdateCard",
            Self::RemoveCard => "ActionRemoveCard",
            Self::MoveCard => "ActionMoveCard",
            Self::ModifyGold => "ActionModifyGold",
            Self::ModifyXp => "ActionModifyXP",
            Self::ModifyLevel => "ActionModifyLevel",
            Self::ModifyNextLevelXp => "ActionModifyNextLevelXP",
            Self::UpdateTurnTimer => "ActionUpdateTurnTimer",
            Self::PresentHeroDiscover => "ActionPresentHeroDiscover",
            Self::PresentDiscover => "ActionPresentDiscover",
            Self::CastSpell => "ActionCastSpell",
            Self::Attack => "ActionAttack",
            Self::DealDamage => "ActionDealDamage",
            Self::Death => "ActionDeath",
            Self::ReplaceUnit => "ActionReplaceUnit",
            Self::SelectTargets => "ActionSelectTargets",
            Self::BrawlComplete => "ActionBrawlComplete",
            Self::Matchmaking => "Matchmaking",
        }
    }

    /// Look up an action type by its event tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Whether this action type carries board content.
    #[must_use]
    pub fn is_board_content(self) -> bool {
        matches!(self, Self::CreateCard | Self::UpdateCard)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Board zone a card lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Character,
    Treasure,
    Spell,
    Hero,
    Shop,
    Hand,
    /// A zone this build does not know about, kept verbatim.
    Other(String),
}

impl Zone {
    /// Parse a zone name from the text log. Unknown names are preserved.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "character" => Self::Character,
            "treasure" => Self::Treasure,
            "spell" => Self::Spell,
            "hero" => Self::Hero,
            "shop" => Self::Shop,
            "hand" => Self::Hand,
            _ => Self::Other(name.to_string()),
        }
    }

    /// Map a zone code from the binary format. Unknown codes are preserved.
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Character,
            1 => Self::Treasure,
            2 => Self::Spell,
            3 => Self::Hero,
            4 => Self::Shop,
            5 => Self::Hand,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Per-unit state bits from the binary format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitFlags(u8);

impl UnitFlags {
    pub const LOCKED: u8 = 0x01;
    pub const TARGETED: u8 = 0x02;
    pub const GOLDEN: u8 = 0x04;
    pub const MOVABLE: u8 = 0x08;
    pub const PAIRED: u8 = 0x10;
    pub const TRIPLED: u8 = 0x20;

    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit == bit
    }

    #[must_use]
    pub fn with(self, bit: u8, on: bool) -> Self {
        if on {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }

    #[must_use]
    pub fn is_locked(self) -> bool {
        self.contains(Self::LOCKED)
    }

    #[must_use]
    pub fn is_targeted(self) -> bool {
        self.contains(Self::TARGETED)
    }

    #[must_use]
    pub fn is_golden(self) -> bool {
        self.contains(Self::GOLDEN)
    }

    #[must_use]
    pub fn is_movable(self) -> bool {
        self.contains(Self::MOVABLE)
    }

    #[must_use]
    pub fn is_paired(self) -> bool {
        self.contains(Self::PAIRED)
    }

    #[must_use]
    pub fn is_tripled(self) -> bool {
        self.contains(Self::TRIPLED)
    }
}

/// Game mode announced by a matchmaking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyMode {
    Normal,
    /// The 100-player lobby variant.
    LargeLobby,
}

/// Session identity reported on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub session_id: String,
    pub build_id: String,
}

/// Player summary, used by both `AddPlayer` and `EnterResultsPhase`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: String,
    pub display_name: String,
    pub hero_id: String,
    pub health: i32,
    pub gold: i32,
    pub experience: i32,
    pub place: i32,
    pub level: i32,
    /// Only present on the end-of-game results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmr: Option<i32>,
}

/// One side of a brawl pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrawlParticipant {
    pub player_id: String,
    pub display_name: String,
    pub is_current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrawlPairing {
    pub first: BrawlParticipant,
    pub second: BrawlParticipant,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopPhase {
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundGather {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}

/// Snapshot of a single card on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardState {
    pub player_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub content_id: String,
    pub zone: Zone,
    pub slot: u32,
    pub attack: i32,
    pub health: i32,
    pub golden: bool,
    pub counter: i32,
    pub subtypes: Vec<String>,
    pub cost: i32,
    #[serde(default)]
    pub flags: UnitFlags,
    #[serde(default)]
    pub is_current: bool,
}

/// Reference to a card position, for removals and moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRef {
    pub player_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub zone: Zone,
    pub slot: u32,
}

/// A single player statistic changing to a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStat {
    pub player_id: String,
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnTimer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A set of choices offered to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discover {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    pub choices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellCast {
    pub player_id: String,
    pub content_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackInfo {
    pub attacker: String,
    pub defender: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageInfo {
    pub source: String,
    pub target: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    pub unit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReplacement {
    pub unit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<CardState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelection {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrawlResult {
    pub round: u32,
    /// Positive for a win, negative for a loss, zero for a tie.
    pub outcome: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakingRequest {
    pub mode: LobbyMode,
}

/// One normalized event, from a log line or a binary record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action_type")]
pub enum Action {
    ConnectionInfo(ConnectionInfo),
    AddPlayer(PlayerInfo),
    EnterResultsPhase(PlayerInfo),
    EnterBrawlPhase(BrawlPairing),
    EnterShopPhase(ShopPhase),
    EndRoundGather(RoundGather),
    CreateCard(CardState),
    UpdateCard(CardState),
    RemoveCard(CardRef),
    MoveCard(CardRef),
    ModifyGold(PlayerStat),
    ModifyXp(PlayerStat),
    ModifyLevel(PlayerStat),
    ModifyNextLevelXp(PlayerStat),
    UpdateTurnTimer(TurnTimer),
    PresentHeroDiscover(Discover),
    PresentDiscover(Discover),
    CastSpell(SpellCast),
    Attack(AttackInfo),
    DealDamage(DamageInfo),
    Death(UnitRef),
    ReplaceUnit(UnitReplacement),
    SelectTargets(TargetSelection),
    BrawlComplete(BrawlResult),
    Matchmaking(MatchmakingRequest),
}

impl Action {
    /// The type this action was built from.
    #[must_use]
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::ConnectionInfo(_) => ActionType::ConnectionInfo,
            Self::AddPlayer(_) => ActionType::AddPlayer,
            Self::EnterResultsPhase(_) => ActionType::EnterResultsPhase,
            Self::EnterBrawlPhase(_) => ActionType::EnterBrawlPhase,
            Self::EnterShopPhase(_) => ActionType::EnterShopPhase,
            Self::EndRoundGather(_) => ActionType::EndRoundGather,
            Self::CreateCard(_) => ActionType::CreateCard,
            Self::UpdateCard(_) => ActionType::UpdateCard,
            Self::RemoveCard(_) => ActionType::RemoveCard,
            Self::MoveCard(_) => ActionType::MoveCard,
            Self::ModifyGold(_) => ActionType::ModifyGold,
            Self::ModifyXp(_) => ActionType::ModifyXp,
            Self::ModifyLevel(_) => ActionType::ModifyLevel,
            Self::ModifyNextLevelXp(_) => ActionType::ModifyNextLevelXp,
            Self::UpdateTurnTimer(_) => ActionType::UpdateTurnTimer,
            Self::PresentHeroDiscover(_) => ActionType::PresentHeroDiscover,
            Self::PresentDiscover(_) => ActionType::PresentDiscover,
            Self::CastSpell(_) => ActionType::CastSpell,
            Self::Attack(_) => ActionType::Attack,
            Self::DealDamage(_) => ActionType::DealDamage,
            Self::Death(_) => ActionType::Death,
            Self::ReplaceUnit(_) => ActionType::ReplaceUnit,
            Self::SelectTargets(_) => ActionType::SelectTargets,
            Self::BrawlComplete(_) => ActionType::BrawlComplete,
            Self::Matchmaking(_) => ActionType::Matchmaking,
        }
    }

    /// Card state carried by a board-content action.
    #[must_use]
    pub fn card(&self) -> Option<&CardState> {
        match self {
            Self::CreateCard(card) | Self::UpdateCard(card) => Some(card),
            _ => None,
        }
    }

    /// Player id this action is about, when it names exactly one player.
    #[must_use]
    pub fn player_id(&self) -> Option<&str> {
        match self {
            Self::AddPlayer(p) | Self::EnterResultsPhase(p) => Some(&p.player_id),
            Self::CreateCard(c) | Self::UpdateCard(c) => Some(&c.player_id),
            Self::RemoveCard(c) | Self::MoveCard(c) => Some(&c.player_id),
            Self::ModifyGold(s)
            | Self::ModifyXp(s)
            | Self::ModifyLevel(s)
            | Self::ModifyNextLevelXp(s) => Some(&s.player_id),
            Self::PresentHeroDiscover(d) | Self::PresentDiscover(d) => d.player_id.as_deref(),
            Self::CastSpell(s) => Some(&s.player_id),
            _ => None,
        }
    }
}
