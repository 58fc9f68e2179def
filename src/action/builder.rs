//! Maps parsed records to typed actions.

use std::str::FromStr;

use crate::parser::RawRecord;

use super::error::BuildError;
use super::types::{
    Action, ActionType, AttackInfo, BrawlPairing, BrawlParticipant, BrawlResult, CardRef,
    CardState, ConnectionInfo, DamageInfo, Discover, LobbyMode, MatchmakingRequest, PlayerInfo,
    PlayerStat, RoundGather, ShopPhase, SpellCast, TargetSelection, TurnTimer, UnitFlags, UnitRef,
    UnitReplacement, Zone,
};

/// Counter value reported for cards that do not track one.
pub const NO_COUNTER: i32 = -1;

/// Build the action selected by the record's event tag.
///
/// # Errors
///
/// Returns `BuildError::UnknownTag` for a tag with no constructor,
/// `BuildError::MissingField` when a required field is absent and
/// `BuildError::InvalidValue` when a field cannot be coerced.
pub fn build_action(record: &RawRecord) -> Result<Action, BuildError> {
    let action_type = ActionType::from_tag(record.event_tag())
        .ok_or_else(|| BuildError::UnknownTag(record.event_tag().to_string()))?;
    let f = Fields { record };

    let action = match action_type {
        ActionType::ConnectionInfo => Action::ConnectionInfo(ConnectionInfo {
            session_id: f.text("sessionid")?,
            build_id: f.text("buildid")?,
        }),
        ActionType::AddPlayer => Action::AddPlayer(player(&f, false)?),
        ActionType::EnterResultsPhase => Action::EnterResultsPhase(player(&f, true)?),
        ActionType::EnterBrawlPhase => Action::EnterBrawlPhase(BrawlPairing {
            first: participant(&f, "1")?,
            second: participant(&f, "2")?,
            timestamp: None,
        }),
        ActionType::EnterShopPhase => Action::EnterShopPhase(ShopPhase {
            round: f.int("round")?,
            timestamp: None,
        }),
        ActionType::EndRoundGather => Action::EndRoundGather(RoundGather {
            round: f.opt_int("round")?,
        }),
        ActionType::CreateCard => Action::CreateCard(card(&f)?),
        ActionType::UpdateCard => Action::UpdateCard(card(&f)?),
        ActionType::RemoveCard => Action::RemoveCard(card_ref(&f)?),
        ActionType::MoveCard => Action::MoveCard(card_ref(&f)?),
        ActionType::ModifyGold => Action::ModifyGold(stat(&f, "gold")?),
        ActionType::ModifyXp => Action::ModifyXp(stat(&f, "xp")?),
        ActionType::ModifyLevel => Action::ModifyLevel(stat(&f, "level")?),
        ActionType::ModifyNextLevelXp => Action::ModifyNextLevelXp(stat(&f, "nextlevelxp")?),
        ActionType::UpdateTurnTimer => Action::UpdateTurnTimer(TurnTimer {
            seconds: f.opt_int("seconds")?,
            timestamp: None,
        }),
        ActionType::PresentHeroDiscover => Action::PresentHeroDiscover(Discover {
            player_id: f.opt_text("playerid"),
            choices: f.list("choices")?,
        }),
        ActionType::PresentDiscover => Action::PresentDiscover(Discover {
            player_id: Some(f.text("playerid")?),
            choices: f.list("choices")?,
        }),
        ActionType::CastSpell => Action::CastSpell(SpellCast {
            player_id: f.text("playerid")?,
            content_id: f.text("cardid")?,
            targets: f.opt_ids("targets"),
        }),
        ActionType::Attack => Action::Attack(AttackInfo {
            attacker: f.text("attacker")?,
            defender: f.text("defender")?,
        }),
        ActionType::DealDamage => Action::DealDamage(DamageInfo {
            source: f.text("source")?,
            target: f.text("target")?,
            amount: f.int("amount")?,
        }),
        ActionType::Death => Action::Death(UnitRef {
            unit_id: f.text("unitid")?,
        }),
        ActionType::ReplaceUnit => Action::ReplaceUnit(UnitReplacement {
            unit_id: f.text("unitid")?,
            replacement: None,
        }),
        ActionType::SelectTargets => Action::SelectTargets(TargetSelection {
            source: f.text("source")?,
            targets: f.opt_ids("targets"),
        }),
        ActionType::BrawlComplete => Action::BrawlComplete(BrawlResult {
            round: f.int("round")?,
            outcome: f.int("outcome")?,
            timestamp: None,
        }),
        ActionType::Matchmaking => Action::Matchmaking(MatchmakingRequest {
            mode: lobby_mode(&f)?,
        }),
    };
    Ok(action)
}

/// Shared constructor for `AddPlayer` and `EnterResultsPhase`.
fn player(f: &Fields<'_>, with_mmr: bool) -> Result<PlayerInfo, BuildError> {
    Ok(PlayerInfo {
        player_id: f.text("playerid")?,
        display_name: f.text("displayname")?,
        hero_id: f.text("heroid")?,
        health: f.int("health")?,
        gold: f.int("gold")?,
        experience: f.int("xp")?,
        place: f.int("place")?,
        level: f.int("level")?,
        mmr: if with_mmr { Some(f.int("mmr")?) } else { None },
    })
}

fn participant(f: &Fields<'_>, suffix: &str) -> Result<BrawlParticipant, BuildError> {
    Ok(BrawlParticipant {
        player_id: f.text(&format!("playerid{suffix}"))?,
        display_name: f.text(&format!("displayname{suffix}"))?,
        is_current: f.opt_flag(&format!("iscurrent{suffix}"))?.unwrap_or(false),
        health: f.opt_int(&format!("health{suffix}"))?,
    })
}

fn card(f: &Fields<'_>) -> Result<CardState, BuildError> {
    let golden = f.flag("golden")?;
    Ok(CardState {
        player_id: f.text("playerid")?,
        unit_id: f.opt_text("unitid"),
        content_id: f.text("cardid")?,
        zone: Zone::from_name(&f.text("zone")?),
        slot: f.int("slot")?,
        attack: f.int("attack")?,
        health: f.int("health")?,
        golden,
        counter: f.opt_int("counter")?.unwrap_or(NO_COUNTER),
        subtypes: f.opt_list("subtypes").unwrap_or_default(),
        cost: f.opt_int("cost")?.unwrap_or(0),
        flags: UnitFlags::default().with(UnitFlags::GOLDEN, golden),
        is_current: f.opt_flag("iscurrent")?.unwrap_or(false),
    })
}

fn card_ref(f: &Fields<'_>) -> Result<CardRef, BuildError> {
    Ok(CardRef {
        player_id: f.text("playerid")?,
        unit_id: f.opt_text("unitid"),
        zone: Zone::from_name(&f.text("zone")?),
        slot: f.int("slot")?,
    })
}

fn stat(f: &Fields<'_>, key: &str) -> Result<PlayerStat, BuildError> {
    Ok(PlayerStat {
        player_id: f.text("playerid")?,
        value: f.int(key)?,
    })
}

fn lobby_mode(f: &Fields<'_>) -> Result<LobbyMode, BuildError> {
    let mode = f.text("mode")?;
    match mode.as_str() {
        "normal" => Ok(LobbyMode::Normal),
        "large" => Ok(LobbyMode::LargeLobby),
        _ => Err(f.invalid("mode", &mode)),
    }
}

/// Typed access to a record's fields, reporting errors against its tag.
struct Fields<'a> {
    record: &'a RawRecord,
}

impl Fields<'_> {
    fn missing(&self, key: &str) -> BuildError {
        BuildError::MissingField {
            tag: self.record.event_tag().to_string(),
            field: key.to_string(),
        }
    }

    fn invalid(&self, key: &str, value: &str) -> BuildError {
        BuildError::InvalidValue {
            tag: self.record.event_tag().to_string(),
            field: key.to_string(),
            value: value.to_string(),
        }
    }

    fn raw(&self, key: &str) -> Result<&str, BuildError> {
        self.record.get(key).ok_or_else(|| self.missing(key))
    }

    fn text(&self, key: &str) -> Result<String, BuildError> {
        self.raw(key).map(str::to_string)
    }

    fn opt_text(&self, key: &str) -> Option<String> {
        self.record.get(key).map(str::to_string)
    }

    fn int<T: FromStr>(&self, key: &str) -> Result<T, BuildError> {
        let value = self.raw(key)?;
        value.parse().map_err(|_| self.invalid(key, value))
    }

    fn opt_int<T: FromStr>(&self, key: &str) -> Result<Option<T>, BuildError> {
        match self.record.get(key) {
            Some(value) => value.parse().map(Some).map_err(|_| self.invalid(key, value)),
            None => Ok(None),
        }
    }

    fn flag(&self, key: &str) -> Result<bool, BuildError> {
        let value = self.raw(key)?;
        parse_flag(value).ok_or_else(|| self.invalid(key, value))
    }

    fn opt_flag(&self, key: &str) -> Result<Option<bool>, BuildError> {
        match self.record.get(key) {
            Some(value) => parse_flag(value)
                .map(Some)
                .ok_or_else(|| self.invalid(key, value)),
            None => Ok(None),
        }
    }

    fn list(&self, key: &str) -> Result<Vec<String>, BuildError> {
        self.opt_list(key).ok_or_else(|| self.missing(key))
    }

    /// Comma-separated list, lower-cased.
    fn opt_list(&self, key: &str) -> Option<Vec<String>> {
        self.record.get(key).map(|value| {
            split_list(value)
                .map(|item| item.to_lowercase())
                .collect()
        })
    }

    /// Comma-separated identifiers, kept verbatim.
    fn opt_ids(&self, key: &str) -> Option<Vec<String>> {
        self.record
            .get(key)
            .map(|value| split_list(value).map(str::to_string).collect())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" => Some(true),
        "f" | "false" | "0" | "n" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn build(line: &str) -> Result<Action, BuildError> {
        let records = parse_line(line).unwrap();
        build_action(&records[0])
    }

    #[test]
    fn test_add_player_integer_fields() {
        let action = build(
            "[ActionAddPlayer] P1 'Alice'== HeroId:SBB_HERO_GWEN Health:37 Gold:6 XP:4 Place:2 Level:3",
        )
        .unwrap();
        let Action::AddPlayer(player) = action else {
            panic!("Expected AddPlayer, got {action:?}");
        };
        assert_eq!(player.player_id, "P1");
        assert_eq!(player.display_name, "Alice");
        assert_eq!(player.health, 37);
        assert_eq!(player.gold, 6);
        assert_eq!(player.experience, 4);
        assert_eq!(player.place, 2);
        assert_eq!(player.level, 3);
        assert_eq!(player.mmr, None);
    }

    #[test]
    fn test_results_phase_requires_mmr() {
        let err = build(
            "[ActionEnterResultsPhase] P1 'Alice'== HeroId:H Health:0 Gold:0 XP:0 Place:8 Level:3",
        )
        .unwrap_err();
        assert_eq!(
            err,
            BuildError::MissingField {
                tag: "ActionEnterResultsPhase".to_string(),
                field: "mmr".to_string(),
            }
        );

        let action = build(
            "[ActionEnterResultsPhase] P1 'Alice'== HeroId:H Health:0 Gold:0 XP:0 Place:8 Level:3 MMR:-12",
        )
        .unwrap();
        assert_eq!(action.action_type(), ActionType::EnterResultsPhase);
        let Action::EnterResultsPhase(player) = action else {
            panic!("Expected EnterResultsPhase");
        };
        assert_eq!(player.mmr, Some(-12));
    }

    #[test]
    fn test_missing_field_is_a_failure() {
        let err = build("[ActionAddPlayer] P1 'Alice'== HeroId:H Health:40 Gold:0 Place:1 Level:1")
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingField { ref field, .. } if field == "xp"));
    }

    #[test]
    fn test_invalid_number() {
        let err = build("[ActionModifyGold] PlayerId:P1 Gold:many").unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { ref value, .. } if value == "many"));
    }

    #[test]
    fn test_card_coercion() {
        let action = build(
            "[ActionCreateCard] Alice     <U> PlayerId:P1 CardId:SBB_CHARACTER_BABYROOT Zone:Character Slot:3 0/3 Golden:T Cost:2 Counter:4 Subtypes:Treant,Good",
        )
        .unwrap();
        let card = action.card().unwrap();
        assert_eq!(card.player_id, "P1");
        assert_eq!(card.zone, Zone::Character);
        assert_eq!(card.slot, 3);
        assert_eq!((card.attack, card.health), (0, 3));
        assert!(card.golden);
        assert!(card.flags.is_golden());
        assert!(card.is_current);
        assert_eq!(card.counter, 4);
        assert_eq!(card.cost, 2);
        assert_eq!(card.subtypes, vec!["treant", "good"]);
    }

    #[test]
    fn test_card_optional_defaults() {
        let action = build(
            "[ActionUpdateCard] Bob           PlayerId:P2 CardId:X Zone:Treasure Slot:0 1/1 Golden:F",
        )
        .unwrap();
        let card = action.card().unwrap();
        assert_eq!(card.counter, NO_COUNTER);
        assert_eq!(card.cost, 0);
        assert!(card.subtypes.is_empty());
        assert!(!card.is_current);
        assert_eq!(card.zone, Zone::Treasure);
    }

    #[test]
    fn test_invalid_flag() {
        let err = build(
            "[ActionCreateCard] Bob           PlayerId:P2 CardId:X Zone:Hand Slot:0 1/1 Golden:maybe",
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidValue { ref field, .. } if field == "golden"));
    }

    #[test]
    fn test_brawl_pairing() {
        let action =
            build("[ActionEnterBrawlPhase] P1<U> 'Alice'==Health:20 --> P2 'Bob'==Health:18")
                .unwrap();
        let Action::EnterBrawlPhase(pairing) = action else {
            panic!("Expected EnterBrawlPhase");
        };
        assert!(pairing.first.is_current);
        assert_eq!(pairing.first.health, Some(20));
        assert_eq!(pairing.second.player_id, "P2");
        assert!(!pairing.second.is_current);
    }

    #[test]
    fn test_hero_discover_lowercases_choices() {
        let action =
            build("[ActionPresentHeroDiscover] Choices:SBB_HERO_GWEN,SBB_HERO_MERLIN").unwrap();
        let Action::PresentHeroDiscover(discover) = action else {
            panic!("Expected PresentHeroDiscover");
        };
        assert_eq!(discover.choices, vec!["sbb_hero_gwen", "sbb_hero_merlin"]);
        assert_eq!(discover.player_id, None);
    }

    #[test]
    fn test_actions_without_fields_keep_type() {
        let action = build("[ActionUpdateTurnTimer]").unwrap();
        assert_eq!(action.action_type(), ActionType::UpdateTurnTimer);
        let action = build("[ActionEndRoundGather]").unwrap();
        assert_eq!(action.action_type(), ActionType::EndRoundGather);
    }

    #[test]
    fn test_matchmaking_modes() {
        let record = RawRecord::new("Matchmaking").with("mode", "large");
        assert_eq!(
            build_action(&record).unwrap(),
            Action::Matchmaking(MatchmakingRequest {
                mode: LobbyMode::LargeLobby
            })
        );
        let record = RawRecord::new("Matchmaking").with("mode", "weird");
        assert!(build_action(&record).is_err());
    }

    #[test]
    fn test_unknown_tag() {
        let record = RawRecord::new("ActionNope");
        assert_eq!(
            build_action(&record),
            Err(BuildError::UnknownTag("ActionNope".to_string()))
        );
    }

    #[test]
    fn test_modify_stats() {
        let action = build("[ActionModifyNextLevelXP] PlayerId:P4 NextLevelXP:6").unwrap();
        assert_eq!(
            action,
            Action::ModifyNextLevelXp(PlayerStat {
                player_id: "P4".to_string(),
                value: 6,
            })
        );
    }
}
