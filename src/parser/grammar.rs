//! Grammar for the game client's bracket-tagged log lines.

use crate::action::ActionType;

use super::cursor::Cursor;
use super::error::ParseError;
use super::record::RawRecord;

/// Closing delimiter of a quoted display name.
pub const NAME_DELIMITER: &str = "'==";

/// Marker following the owner name of the local player.
pub const CURRENT_PLAYER_MARKER: &str = "<U>";

/// Substring identifying a matchmaking request on any raw line.
pub const MATCHMAKING_MARKER: &str = "REQUEST MATCHMAKER FOR";

/// Secondary substring selecting the large-lobby mode.
pub const LARGE_LOBBY_MARKER: &str = "100P";

const NAME_END_MARKERS: &[&str] = &["Health:", "Gold:", "NextLevelXP"];
const BRAWL_SEPARATOR: &str = "-->";
const OWNER_NAME_WIDTH: usize = 10;
const OWNER_MARKER_WIDTH: usize = 3;

/// Parse one raw log line into zero, one or two records.
///
/// The bracket-tagged grammar yields at most one record; the independent
/// matchmaking scan may add a second. Lines with no tag or an unknown tag
/// yield nothing.
///
/// # Errors
///
/// Returns `ParseError` when a recognized tag's body does not follow its
/// grammar.
pub fn parse_line(line: &str) -> Result<Vec<RawRecord>, ParseError> {
    let mut records = Vec::new();
    if let Some(record) = parse_tagged(line)? {
        records.push(record);
    }
    if let Some(record) = scan_matchmaking(line) {
        records.push(record);
    }
    Ok(records)
}

/// Detect a matchmaking request anywhere in a raw line.
#[must_use]
pub fn scan_matchmaking(line: &str) -> Option<RawRecord> {
    if !line.contains(MATCHMAKING_MARKER) {
        return None;
    }
    let mode = if line.contains(LARGE_LOBBY_MARKER) {
        "large"
    } else {
        "normal"
    };
    Some(RawRecord::new(ActionType::Matchmaking.tag()).with("mode", mode))
}

fn parse_tagged(line: &str) -> Result<Option<RawRecord>, ParseError> {
    let Some((tag, mut body)) = split_envelope(line) else {
        return Ok(None);
    };
    let Some(action_type) = ActionType::from_tag(tag) else {
        tracing::trace!(%tag, "Ignoring unknown event tag");
        return Ok(None);
    };

    let mut record = RawRecord::new(tag);
    match action_type {
        ActionType::Matchmaking => return Ok(None),
        ActionType::AddPlayer | ActionType::EnterResultsPhase => {
            parse_player(tag, &mut body, &mut record)?;
        }
        ActionType::EnterBrawlPhase => parse_brawl(tag, &mut body, &mut record)?,
        ActionType::CreateCard | ActionType::UpdateCard => {
            parse_card(tag, &mut body, &mut record)?;
        }
        _ => read_fields(&mut body, &mut record, "", None),
    }
    Ok(Some(record))
}

/// Strip routing prefixes such as `[RECV]` and return the event tag and a
/// cursor positioned after it.
fn split_envelope(line: &str) -> Option<(&str, Cursor<'_>)> {
    let mut cursor = Cursor::new(line);
    loop {
        cursor.skip_whitespace();
        if !cursor.eat("[") {
            return None;
        }
        let inner = cursor.take_until("]")?;
        if is_routing_prefix(inner) {
            continue;
        }
        return Some((inner, cursor));
    }
}

fn is_routing_prefix(inner: &str) -> bool {
    !inner.is_empty() && inner.chars().all(|c| c.is_ascii_uppercase())
}

/// `<player-id> '<name>'== key:value...`
fn parse_player(tag: &str, body: &mut Cursor<'_>, record: &mut RawRecord) -> Result<(), ParseError> {
    let player_id = body.next_token().ok_or_else(|| expected(tag, "player id", body))?;
    record.insert("playerid", player_id);
    let name = display_name(tag, body, NAME_END_MARKERS)?;
    record.insert("displayname", name);
    read_fields(body, record, "", None);
    Ok(())
}

/// `<id>[<U>] '<name>'==stats --> <id>[<U>] '<name>'==stats`
fn parse_brawl(tag: &str, body: &mut Cursor<'_>, record: &mut RawRecord) -> Result<(), ParseError> {
    parse_participant(tag, body, record, "1", Some(BRAWL_SEPARATOR))?;
    if body.next_token() != Some(BRAWL_SEPARATOR) {
        return Err(expected(tag, BRAWL_SEPARATOR, body));
    }
    parse_participant(tag, body, record, "2", None)
}

fn parse_participant(
    tag: &str,
    body: &mut Cursor<'_>,
    record: &mut RawRecord,
    suffix: &str,
    stop: Option<&str>,
) -> Result<(), ParseError> {
    let token = body.next_token().ok_or_else(|| expected(tag, "player id", body))?;
    let (player_id, is_current) = match token.strip_suffix(CURRENT_PLAYER_MARKER) {
        Some(id) => (id, true),
        None => (token, false),
    };
    record.insert(&format!("playerid{suffix}"), player_id);
    record.insert(&format!("iscurrent{suffix}"), flag_char(is_current));
    // The first participant's name may also end right before the separator.
    let markers: Vec<&str> = NAME_END_MARKERS.iter().copied().chain(stop).collect();
    let name = display_name(tag, body, &markers)?;
    record.insert(&format!("displayname{suffix}"), name);
    read_fields(body, record, suffix, stop);
    Ok(())
}

fn display_name<'a>(
    tag: &str,
    body: &mut Cursor<'a>,
    markers: &[&str],
) -> Result<&'a str, ParseError> {
    body.skip_whitespace();
    if !body.eat("'") {
        return Err(expected(tag, "'", body));
    }
    let column = body.position();
    body.take_delimited_name(NAME_DELIMITER, markers)
        .ok_or_else(|| ParseError::UnterminatedName {
            tag: tag.to_string(),
            column,
        })
}

/// `<owner:13> key:value... A/H ...`
fn parse_card(tag: &str, body: &mut Cursor<'_>, record: &mut RawRecord) -> Result<(), ParseError> {
    if !body.eat(" ") {
        return Err(expected(tag, "owner field", body));
    }
    let width = OWNER_NAME_WIDTH + OWNER_MARKER_WIDTH;
    let owner = body
        .take_chars(width)
        .ok_or_else(|| ParseError::ShortOwnerField {
            tag: tag.to_string(),
            needed: width,
            found: body.rest().chars().count(),
        })?;
    let split = owner
        .char_indices()
        .nth(OWNER_NAME_WIDTH)
        .map_or(owner.len(), |(idx, _)| idx);
    let (name, marker) = owner.split_at(split);
    record.insert("ownername", name.trim_end());
    record.insert("iscurrent", flag_char(marker == CURRENT_PLAYER_MARKER));

    let mut bare = 0;
    while let Some(token) = body.next_token() {
        if let Some((key, value)) = split_field(token) {
            record.insert(key, value);
        } else if let Some((attack, health)) = token.split_once('/') {
            let pair = stat_pair(tag, token, attack, health)?;
            record.insert("attack", pair.0);
            record.insert("health", pair.1);
        } else if is_integer(token) && body.peek_token() == Some("/") {
            body.next_token();
            let health = body.next_token().unwrap_or_default();
            let joined = format!("{token} / {health}");
            let pair = stat_pair(tag, &joined, token, health)?;
            record.insert("attack", pair.0);
            record.insert("health", pair.1);
        } else {
            record.insert(&format!("arg{bare}"), token);
            bare += 1;
        }
    }
    Ok(())
}

fn stat_pair<'a>(
    tag: &str,
    token: &str,
    attack: &'a str,
    health: &'a str,
) -> Result<(&'a str, &'a str), ParseError> {
    if is_integer(attack) && is_integer(health) {
        Ok((attack, health))
    } else {
        Err(ParseError::MalformedStatPair {
            tag: tag.to_string(),
            token: token.to_string(),
        })
    }
}

/// Read `key:value` and bare tokens until the end of input or `stop`.
fn read_fields(body: &mut Cursor<'_>, record: &mut RawRecord, suffix: &str, stop: Option<&str>) {
    let mut bare = 0;
    while let Some(token) = body.peek_token() {
        if stop == Some(token) {
            break;
        }
        body.next_token();
        if let Some((key, value)) = split_field(token) {
            record.insert(&format!("{key}{suffix}"), value);
        } else {
            record.insert(&format!("arg{bare}{suffix}"), token);
            bare += 1;
        }
    }
}

fn split_field(token: &str) -> Option<(&str, &str)> {
    token.split_once(':').filter(|(key, _)| !key.is_empty())
}

fn is_integer(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn flag_char(value: bool) -> &'static str {
    if value {
        "T"
    } else {
        "F"
    }
}

fn expected(tag: &str, what: &'static str, body: &Cursor<'_>) -> ParseError {
    ParseError::Expected {
        tag: tag.to_string(),
        expected: what,
        column: body.position(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(line: &str) -> RawRecord {
        let mut records = parse_line(line).unwrap();
        assert_eq!(records.len(), 1, "expected one record for {line}");
        records.remove(0)
    }

    #[test]
    fn test_connection_info() {
        let record = single("[ActionConnectionInfo] SessionId:abc BuildId:1");
        assert_eq!(record.event_tag(), "ActionConnectionInfo");
        assert_eq!(record.get("sessionid"), Some("abc"));
        assert_eq!(record.get("buildid"), Some("1"));
    }

    #[test]
    fn test_routing_prefix_is_stripped() {
        let record = single("[RECV] [ActionEnterShopPhase] Round:3");
        assert_eq!(record.event_tag(), "ActionEnterShopPhase");
        assert_eq!(record.get("round"), Some("3"));

        let record = single("  [SEND][ActionEndRoundGather]");
        assert_eq!(record.event_tag(), "ActionEndRoundGather");
        assert!(record.is_empty());
    }

    #[test]
    fn test_unknown_and_untagged_lines_are_dropped() {
        assert!(parse_line("[ActionFutureThing] A:1").unwrap().is_empty());
        assert!(parse_line("Loading scene 'Shop'").unwrap().is_empty());
        assert!(parse_line("").unwrap().is_empty());
        assert!(parse_line("[Unclosed tag").unwrap().is_empty());
    }

    #[test]
    fn test_add_player() {
        let record = single(
            "[ActionAddPlayer] P3 'Alice'== HeroId:SBB_HERO_GWEN Health:40 Gold:3 XP:2 Place:1 Level:2",
        );
        assert_eq!(record.get("playerid"), Some("P3"));
        assert_eq!(record.get("displayname"), Some("Alice"));
        assert_eq!(record.get("heroid"), Some("SBB_HERO_GWEN"));
        assert_eq!(record.get("health"), Some("40"));
        assert_eq!(record.get("xp"), Some("2"));
        assert_eq!(record.get("level"), Some("2"));
    }

    #[test]
    fn test_add_player_name_with_spaces() {
        let record = single(
            "[ActionAddPlayer] P1 'Sir Lance Alot'== HeroId:H Health:40 Gold:0 XP:0 Place:1 Level:1",
        );
        assert_eq!(record.get("displayname"), Some("Sir Lance Alot"));
    }

    // Known edge case: the closing delimiter can appear inside a name. The
    // look-ahead keeps it when no stats token precedes the next delimiter.
    #[test]
    fn test_add_player_name_containing_delimiter() {
        let record = single(
            "[ActionAddPlayer] P1 'Ann'==Marie'== HeroId:H Health:40 Gold:0 XP:0 Place:1 Level:1",
        );
        assert_eq!(record.get("displayname"), Some("Ann'==Marie"));
        assert_eq!(record.get("health"), Some("40"));
    }

    // Known limitation: a stats token inside the name itself ends it early.
    #[test]
    fn test_name_delimiter_heuristic_limitation() {
        let record = single(
            "[ActionAddPlayer] P1 'a'==Gold:b'== HeroId:H Health:40 Gold:0 XP:0 Place:1 Level:1",
        );
        assert_eq!(record.get("displayname"), Some("a"));
    }

    #[test]
    fn test_results_phase_carries_mmr() {
        let record = single(
            "[ActionEnterResultsPhase] P1 'Bob'== HeroId:H Health:0 Gold:0 XP:0 Place:5 Level:4 MMR:1234",
        );
        assert_eq!(record.event_tag(), "ActionEnterResultsPhase");
        assert_eq!(record.get("mmr"), Some("1234"));
        assert_eq!(record.get("place"), Some("5"));
    }

    #[test]
    fn test_unterminated_name_is_an_error() {
        let err = parse_line("[ActionAddPlayer] P1 'Alice Health:40").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedName { .. }));
    }

    #[test]
    fn test_brawl_phase() {
        let record = single(
            "[ActionEnterBrawlPhase] P1<U> 'Alice'==Health:20 Gold:3 NextLevelXP:5 --> P2 'Bob'==Health:18",
        );
        assert_eq!(record.get("playerid1"), Some("P1"));
        assert_eq!(record.get("iscurrent1"), Some("T"));
        assert_eq!(record.get("displayname1"), Some("Alice"));
        assert_eq!(record.get("health1"), Some("20"));
        assert_eq!(record.get("nextlevelxp1"), Some("5"));
        assert_eq!(record.get("playerid2"), Some("P2"));
        assert_eq!(record.get("iscurrent2"), Some("F"));
        assert_eq!(record.get("displayname2"), Some("Bob"));
        assert_eq!(record.get("health2"), Some("18"));
    }

    #[test]
    fn test_brawl_phase_without_stats() {
        let record = single("[ActionEnterBrawlPhase] P1<U> 'Alice'== --> P2 'Bob'==");
        assert_eq!(record.get("displayname1"), Some("Alice"));
        assert_eq!(record.get("playerid2"), Some("P2"));
        assert_eq!(record.get("displayname2"), Some("Bob"));
        assert_eq!(record.get("health1"), None);

        let record = single("[ActionEnterBrawlPhase] P1<U> 'Alice'== --> P2 'Bob'==Health:18");
        assert_eq!(record.get("displayname1"), Some("Alice"));
        assert_eq!(record.get("health2"), Some("18"));
    }

    #[test]
    fn test_brawl_phase_missing_separator() {
        let err = parse_line("[ActionEnterBrawlPhase] P1<U> 'Alice'==Health:20 P2 'Bob'==Health:18")
            .unwrap_err();
        assert!(matches!(err, ParseError::Expected { expected: "-->", .. }));
    }

    #[test]
    fn test_card_with_fixed_owner_and_pair() {
        let record = single(
            "[ActionCreateCard] Alice     <U> PlayerId:P1 CardId:SBB_CHARACTER_BABYROOT Zone:Character Slot:0 0/3 Golden:F Cost:2 Subtypes:Treant,Good",
        );
        assert_eq!(record.get("ownername"), Some("Alice"));
        assert_eq!(record.get("iscurrent"), Some("T"));
        assert_eq!(record.get("playerid"), Some("P1"));
        assert_eq!(record.get("attack"), Some("0"));
        assert_eq!(record.get("health"), Some("3"));
        assert_eq!(record.get("subtypes"), Some("Treant,Good"));
    }

    #[test]
    fn test_card_with_truncated_owner_and_spaced_pair() {
        let record = single(
            "[ActionUpdateCard] Bartholome    PlayerId:P2 CardId:X Zone:Hand Slot:1 12 / 14 Golden:T",
        );
        assert_eq!(record.get("ownername"), Some("Bartholome"));
        assert_eq!(record.get("iscurrent"), Some("F"));
        assert_eq!(record.get("attack"), Some("12"));
        assert_eq!(record.get("health"), Some("14"));
        assert_eq!(record.get("golden"), Some("T"));
    }

    #[test]
    fn test_card_malformed_pair() {
        let err = parse_line(
            "[ActionCreateCard] Alice     <U> PlayerId:P1 CardId:X Zone:Character Slot:0 3/x Golden:F",
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::MalformedStatPair { .. }));
    }

    #[test]
    fn test_card_short_owner_field() {
        let err = parse_line("[ActionCreateCard] Al").unwrap_err();
        assert!(matches!(err, ParseError::ShortOwnerField { needed: 13, .. }));
    }

    #[test]
    fn test_matchmaking_scan() {
        let records = parse_line("Sending: REQUEST MATCHMAKER FOR RANKED 100P").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_tag(), "Matchmaking");
        assert_eq!(records[0].get("mode"), Some("large"));

        let records = parse_line("Sending: REQUEST MATCHMAKER FOR RANKED").unwrap();
        assert_eq!(records[0].get("mode"), Some("normal"));
    }

    #[test]
    fn test_matchmaking_scan_alongside_tag() {
        let records = parse_line("[ActionUpdateTurnTimer] Note:REQUEST MATCHMAKER FOR later").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_tag(), "ActionUpdateTurnTimer");
        assert_eq!(records[1].event_tag(), "Matchmaking");
    }

    #[test]
    fn test_generic_bare_tokens() {
        let record = single("[ActionDeath] UnitId:u-1 extra");
        assert_eq!(record.get("unitid"), Some("u-1"));
        assert_eq!(record.get("arg0"), Some("extra"));
    }
}
