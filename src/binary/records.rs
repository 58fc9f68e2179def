//! Record dispatch and the streaming decoder.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;

use super::error::DecodeError;
use super::preamble::Versions;
use super::reader::WireReader;
use crate::action::{
    Action, ActionType, AttackInfo, BrawlPairing, BrawlParticipant, BrawlResult, CardRef,
    CardState, ConnectionInfo, DamageInfo, Discover, LobbyMode, MatchmakingRequest, PlayerInfo,
    PlayerStat, RoundGather, ShopPhase, SpellCast, TargetSelection, TurnTimer, UnitRef,
    UnitReplacement, Zone,
};

/// Subtype names indexed by wire code.
const SUBTYPE_NAMES: &[&str] = &[
    "animal", "dwarf", "treant", "fairy", "princess", "prince", "monster", "dragon", "evil",
    "good", "royal", "egg", "mage", "knight", "djinn", "unicorn", "frog", "ogre", "pirate",
    "witch",
];

/// Name for a subtype code. Unknown codes are kept as `#<code>`.
#[must_use]
pub fn subtype_name(code: u16) -> String {
    SUBTYPE_NAMES
        .get(usize::from(code))
        .map_or_else(|| format!("#{code}"), |name| (*name).to_string())
}

/// Action type for a discriminator, if it is known.
#[must_use]
pub fn action_type_for(discriminator: u16) -> Option<ActionType> {
    let index = usize::from(discriminator).checked_sub(1)?;
    ActionType::ALL.get(index).copied()
}

/// One decoded record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedRecord {
    /// Byte offset of the discriminator in the file.
    pub offset: u64,
    pub discriminator: u16,
    pub action: Action,
}

/// Streaming decoder over a match file.
///
/// Yields records until a clean end of stream. The first error is yielded
/// once and ends iteration.
#[derive(Debug)]
pub struct RecordDecoder<R> {
    reader: WireReader<R>,
    versions: Versions,
    done: bool,
}

impl<R: BufRead> RecordDecoder<R> {
    /// Read the preamble and prepare to decode records.
    pub fn new(mut inner: R) -> Result<Self, DecodeError> {
        let (versions, consumed) = Versions::read_from(&mut inner)?;
        Ok(Self {
            reader: WireReader::with_offset(inner, consumed),
            versions,
            done: false,
        })
    }

    #[must_use]
    pub fn versions(&self) -> &Versions {
        &self.versions
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    fn next_record(&mut self) -> Result<Option<DecodedRecord>, DecodeError> {
        if self.reader.at_eof()? {
            return Ok(None);
        }
        let offset = self.reader.offset();
        let discriminator = self.reader.u16()?;
        let action_type = action_type_for(discriminator).ok_or(
            DecodeError::UnknownDiscriminator {
                discriminator,
                offset,
            },
        )?;
        let action = decode_action(action_type, &mut self.reader)?;
        tracing::trace!(offset, discriminator, action = %action_type, "Decoded record");
        Ok(Some(DecodedRecord {
            offset,
            discriminator,
            action,
        }))
    }
}

impl<R: BufRead> Iterator for RecordDecoder<R> {
    type Item = Result<DecodedRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                tracing::warn!(error = %err, "Stopping match file decode");
                Some(Err(err))
            }
        }
    }
}

/// Open a match file for decoding.
pub fn decode_file(path: &Path) -> Result<RecordDecoder<BufReader<File>>, DecodeError> {
    let file = File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    RecordDecoder::new(BufReader::new(file))
}

fn decode_action<R: BufRead>(
    action_type: ActionType,
    r: &mut WireReader<R>,
) -> Result<Action, DecodeError> {
    let action = match action_type {
        ActionType::ConnectionInfo => Action::ConnectionInfo(ConnectionInfo {
            session_id: r.string()?,
            build_id: r.string()?,
        }),
        ActionType::AddPlayer => Action::AddPlayer(player(r, false)?),
        ActionType::EnterResultsPhase => Action::EnterResultsPhase(player(r, true)?),
        ActionType::EnterBrawlPhase => Action::EnterBrawlPhase(pairing(r)?),
        ActionType::EnterShopPhase => Action::EnterShopPhase(ShopPhase {
            timestamp: r.timestamp()?,
            round: r.u32()?,
        }),
        ActionType::EndRoundGather => Action::EndRoundGather(RoundGather {
            round: Some(r.u32()?),
        }),
        ActionType::CreateCard => Action::CreateCard(unit(r)?),
        ActionType::UpdateCard => Action::UpdateCard(unit(r)?),
        ActionType::RemoveCard => Action::RemoveCard(card_ref(r)?),
        ActionType::MoveCard => Action::MoveCard(card_ref(r)?),
        ActionType::ModifyGold => Action::ModifyGold(stat(r)?),
        ActionType::ModifyXp => Action::ModifyXp(stat(r)?),
        ActionType::ModifyLevel => Action::ModifyLevel(stat(r)?),
        ActionType::ModifyNextLevelXp => Action::ModifyNextLevelXp(stat(r)?),
        ActionType::UpdateTurnTimer => Action::UpdateTurnTimer(TurnTimer {
            timestamp: r.timestamp()?,
            seconds: Some(u32::from(r.u16()?)),
        }),
        ActionType::PresentHeroDiscover => Action::PresentHeroDiscover(discover(r)?),
        ActionType::PresentDiscover => Action::PresentDiscover(discover(r)?),
        ActionType::CastSpell => Action::CastSpell(SpellCast {
            player_id: r.guid_string()?,
            content_id: r.string()?,
            targets: r.optional(|r| r.array(WireReader::guid_string))?,
        }),
        ActionType::Attack => Action::Attack(AttackInfo {
            attacker: r.guid_string()?,
            defender: r.guid_string()?,
        }),
        ActionType::DealDamage => Action::DealDamage(DamageInfo {
            source: r.guid_string()?,
            target: r.guid_string()?,
            amount: r.i32()?,
        }),
        ActionType::Death => Action::Death(UnitRef {
            unit_id: r.guid_string()?,
        }),
        ActionType::ReplaceUnit => Action::ReplaceUnit(UnitReplacement {
            unit_id: r.guid_string()?,
            replacement: r.optional(unit)?,
        }),
        ActionType::SelectTargets => Action::SelectTargets(TargetSelection {
            source: r.guid_string()?,
            targets: r.optional(|r| r.array(WireReader::guid_string))?,
        }),
        ActionType::BrawlComplete => Action::BrawlComplete(BrawlResult {
            timestamp: r.timestamp()?,
            round: r.u32()?,
            outcome: r.i8()?,
        }),
        ActionType::Matchmaking => {
            let offset = r.offset();
            let mode = match r.u8()? {
                0 => LobbyMode::Normal,
                1 => LobbyMode::LargeLobby,
                code => {
                    return Err(DecodeError::InvalidCode {
                        field: "lobby mode",
                        code,
                        offset,
                    })
                }
            };
            Action::Matchmaking(MatchmakingRequest { mode })
        }
    };
    Ok(action)
}

fn player<R: BufRead>(r: &mut WireReader<R>, with_mmr: bool) -> Result<PlayerInfo, DecodeError> {
    Ok(PlayerInfo {
        player_id: r.guid_string()?,
        display_name: r.string()?,
        hero_id: r.string()?,
        health: r.i32()?,
        gold: r.i32()?,
        experience: r.i32()?,
        place: r.i32()?,
        level: r.i32()?,
        mmr: if with_mmr { Some(r.i32()?) } else { None },
    })
}

fn pairing<R: BufRead>(r: &mut WireReader<R>) -> Result<BrawlPairing, DecodeError> {
    let timestamp = r.timestamp()?;
    let first = (r.guid_string()?, r.string()?);
    let second = (r.guid_string()?, r.string()?);
    let offset = r.offset();
    let current = r.u8()?;
    if current > 2 {
        return Err(DecodeError::InvalidCode {
            field: "current player",
            code: current,
            offset,
        });
    }
    let participant = |(player_id, display_name): (String, String), is_current| BrawlParticipant {
        player_id,
        display_name,
        is_current,
        health: None,
    };
    Ok(BrawlPairing {
        first: participant(first, current == 1),
        second: participant(second, current == 2),
        timestamp,
    })
}

fn unit<R: BufRead>(r: &mut WireReader<R>) -> Result<CardState, DecodeError> {
    let unit_id = r.guid_string()?;
    let owner = r.guid_string()?;
    let content_id = r.string()?;
    let zone = Zone::from_code(r.u8()?);
    let slot = u32::from(r.u8()?);
    let attack = r.i32()?;
    let health = r.i32()?;
    let flags = r.flags()?;
    let counter = r.i32()?;
    let cost = i32::from(r.u8()?);
    let subtypes = r.array(|r| r.u16().map(subtype_name))?;
    Ok(CardState {
        player_id: owner,
        unit_id: Some(unit_id),
        content_id,
        zone,
        slot,
        attack,
        health,
        golden: flags.is_golden(),
        counter,
        subtypes,
        cost,
        flags,
        is_current: false,
    })
}

fn card_ref<R: BufRead>(r: &mut WireReader<R>) -> Result<CardRef, DecodeError> {
    let unit_id = r.guid_string()?;
    Ok(CardRef {
        player_id: r.guid_string()?,
        unit_id: Some(unit_id),
        zone: Zone::from_code(r.u8()?),
        slot: u32::from(r.u8()?),
    })
}

fn stat<R: BufRead>(r: &mut WireReader<R>) -> Result<PlayerStat, DecodeError> {
    Ok(PlayerStat {
        player_id: r.guid_string()?,
        value: r.i32()?,
    })
}

fn discover<R: BufRead>(r: &mut WireReader<R>) -> Result<Discover, DecodeError> {
    Ok(Discover {
        player_id: Some(r.guid_string()?),
        choices: r.array(WireReader::string)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::UnitFlags;

    const PLAYER: [u8; 16] = [
        0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02,
        0x01,
    ];
    const PLAYER_ID: &str = "12345678-9abc-def0-0102-030405060708";

    #[derive(Default)]
    struct Writer(Vec<u8>);

    impl Writer {
        fn preamble() -> Self {
            Self(b"Client:1.0 Transport:3 CardDb:77\n".to_vec())
        }
        fn u8(mut self, v: u8) -> Self {
            self.0.push(v);
            self
        }
        fn u16(mut self, v: u16) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn u32(mut self, v: u32) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn i32(mut self, v: i32) -> Self {
            self.0.extend_from_slice(&v.to_le_bytes());
            self
        }
        fn ts(mut self, millis: u64) -> Self {
            self.0.extend_from_slice(&millis.to_be_bytes());
            self
        }
        fn guid(mut self, g: [u8; 16]) -> Self {
            self.0.extend_from_slice(&g);
            self
        }
        fn str(mut self, s: &str) -> Self {
            let units: Vec<u16> = s.encode_utf16().collect();
            self = self.u32(units.len() as u32);
            for unit in units {
                self = self.u16(unit);
            }
            self
        }
        fn decode(self) -> Vec<Result<DecodedRecord, DecodeError>> {
            RecordDecoder::new(&self.0[..]).unwrap().collect()
        }
    }

    #[test]
    fn test_discriminator_table_covers_all_types() {
        assert_eq!(action_type_for(0x0001), Some(ActionType::ConnectionInfo));
        assert_eq!(action_type_for(0x0019), Some(ActionType::Matchmaking));
        assert_eq!(action_type_for(0x0000), None);
        assert_eq!(action_type_for(0x001a), None);
    }

    #[test]
    fn test_subtype_names() {
        assert_eq!(subtype_name(0), "animal");
        assert_eq!(subtype_name(900), "#900");
    }

    #[test]
    fn test_decode_connection_and_player() {
        let records = Writer::preamble()
            .u16(0x0001)
            .str("abc")
            .str("42")
            .u16(0x0002)
            .guid(PLAYER)
            .str("Alice")
            .str("SBB_HERO_X")
            .i32(40)
            .i32(3)
            .i32(2)
            .i32(1)
            .i32(2)
            .decode();
        assert_eq!(records.len(), 2);

        let first = records[0].as_ref().unwrap();
        assert_eq!(first.offset, 33);
        assert_eq!(
            first.action,
            Action::ConnectionInfo(ConnectionInfo {
                session_id: "abc".to_string(),
                build_id: "42".to_string(),
            })
        );

        let Action::AddPlayer(player) = &records[1].as_ref().unwrap().action else {
            panic!("expected player");
        };
        assert_eq!(player.player_id, PLAYER_ID);
        assert_eq!(player.health, 40);
        assert_eq!(player.mmr, None);
    }

    #[test]
    fn test_decode_unit_record() {
        let records = Writer::preamble()
            .u16(0x0007)
            .guid(PLAYER)
            .guid(PLAYER)
            .str("SBB_CHARACTER_CAT")
            .u8(0)
            .u8(3)
            .i32(5)
            .i32(6)
            .u8(UnitFlags::GOLDEN | UnitFlags::LOCKED)
            .i32(-1)
            .u8(2)
            .u32(2)
            .u16(0)
            .u16(999)
            .decode();
        let card = records[0].as_ref().unwrap().action.card().cloned().unwrap();
        assert_eq!(card.zone, Zone::Character);
        assert_eq!(card.slot, 3);
        assert!(card.golden);
        assert!(card.flags.is_locked());
        assert_eq!(card.subtypes, vec!["animal".to_string(), "#999".to_string()]);
        assert_eq!(card.unit_id.as_deref(), Some(PLAYER_ID));
    }

    #[test]
    fn test_decode_brawl_pairing() {
        let records = Writer::preamble()
            .u16(0x0004)
            .ts(1_700_000_000_000)
            .guid(PLAYER)
            .str("Alice")
            .guid([0; 16])
            .str("Bob")
            .u8(2)
            .decode();
        let Action::EnterBrawlPhase(pairing) = &records[0].as_ref().unwrap().action else {
            panic!("expected pairing");
        };
        assert!(!pairing.first.is_current);
        assert!(pairing.second.is_current);
        assert_eq!(pairing.second.player_id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(pairing.timestamp.unwrap().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_optional_targets() {
        let records = Writer::preamble()
            .u16(0x0017)
            .guid(PLAYER)
            .u8(0x01)
            .u16(0x0017)
            .guid(PLAYER)
            .u8(0x00)
            .u32(1)
            .guid(PLAYER)
            .decode();
        let targets: Vec<_> = records
            .iter()
            .map(|r| match &r.as_ref().unwrap().action {
                Action::SelectTargets(sel) => sel.targets.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(targets, vec![None, Some(vec![PLAYER_ID.to_string()])]);
    }

    #[test]
    fn test_unknown_discriminator_stops_decoding() {
        let records = Writer::preamble()
            .u16(0x0015)
            .guid(PLAYER)
            .u16(0x00ff)
            .u16(0x0015)
            .guid(PLAYER)
            .decode();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(matches!(
            records[1],
            Err(DecodeError::UnknownDiscriminator {
                discriminator: 0x00ff,
                offset: 51
            })
        ));
    }

    #[test]
    fn test_partial_record_is_truncated() {
        let records = Writer::preamble().u16(0x0015).u8(0x12).decode();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_invalid_marker() {
        let records = Writer::preamble()
            .u16(0x0016)
            .guid(PLAYER)
            .u8(0x07)
            .decode();
        assert!(matches!(
            records[0],
            Err(DecodeError::InvalidMarker { marker: 0x07, .. })
        ));
    }

    #[test]
    fn test_empty_body_ends_cleanly() {
        assert!(Writer::preamble().decode().is_empty());
    }
}
