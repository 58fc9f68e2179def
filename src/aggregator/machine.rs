//! State machine turning the ordered action stream into jobs.

use std::collections::HashMap;

use crate::action::{Action, ActionType, ConnectionInfo, PlayerInfo};

use super::job::Job;
use super::session::{BrawlBuffers, PlayerState, SessionKey};

/// Default number of players in a lobby.
pub const DEFAULT_EXPECTED_PLAYERS: usize = 8;

/// Whether boards are currently being gathered.
#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    InBrawl(BrawlBuffers),
}

/// Aggregates actions into jobs for one session at a time.
///
/// Correctness depends on seeing actions in file order; callers must feed
/// them sequentially.
#[derive(Debug)]
pub struct Aggregator {
    expected_players: usize,
    session: Option<SessionKey>,
    phase: Phase,
    round: u32,
    in_shop: bool,
    last_action: Option<ActionType>,
    player_burst: usize,
    after_first_combat: bool,
    players: HashMap<String, PlayerState>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_expected_players(DEFAULT_EXPECTED_PLAYERS)
    }

    /// Create an aggregator for lobbies of `expected_players`.
    #[must_use]
    pub fn with_expected_players(expected_players: usize) -> Self {
        Self {
            expected_players: expected_players.max(1),
            session: None,
            phase: Phase::Idle,
            round: 0,
            in_shop: false,
            last_action: None,
            player_burst: 0,
            after_first_combat: false,
            players: HashMap::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionKey> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn is_in_brawl(&self) -> bool {
        matches!(self.phase, Phase::InBrawl(_))
    }

    #[must_use]
    pub fn is_after_first_combat(&self) -> bool {
        self.after_first_combat
    }

    /// Number of cards waiting in the current brawl buffers.
    #[must_use]
    pub fn pending_cards(&self) -> usize {
        match &self.phase {
            Phase::InBrawl(buffers) => buffers.card_count(),
            Phase::Idle => 0,
        }
    }

    #[must_use]
    pub fn player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.get(player_id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    /// Process actions in order, collecting all resulting jobs.
    pub fn process_all(&mut self, actions: impl IntoIterator<Item = Action>) -> Vec<Job> {
        actions
            .into_iter()
            .flat_map(|action| self.process(action))
            .collect()
    }

    /// Flush a pending brawl at end of input.
    pub fn flush(&mut self) -> Option<Job> {
        self.end_brawl()
    }

    /// Process one action and return the jobs it produced, in order.
    pub fn process(&mut self, action: Action) -> Vec<Job> {
        let mut jobs = Vec::new();
        let action_type = action.action_type();

        if let Action::ConnectionInfo(info) = &action {
            if self
                .session
                .as_ref()
                .is_some_and(|s| s.session_id == info.session_id)
            {
                tracing::debug!(session_id = %info.session_id, "Duplicate session notification");
                return jobs;
            }
            self.start_session(info);
            self.last_action = Some(action_type);
            jobs.push(Job::NewGame { action });
            return jobs;
        }

        if !action_type.is_board_content() {
            jobs.extend(self.end_brawl());
        }
        if action_type != ActionType::AddPlayer {
            self.player_burst = 0;
        }

        match action {
            Action::EnterBrawlPhase(ref pairing) => {
                tracing::debug!(
                    first = %pairing.first.player_id,
                    second = %pairing.second.player_id,
                    round = self.round,
                    "Brawl phase started"
                );
                self.in_shop = false;
                self.phase = Phase::InBrawl(BrawlBuffers::new([
                    pairing.first.player_id.as_str(),
                    pairing.second.player_id.as_str(),
                ]));
            }
            Action::CreateCard(card) | Action::UpdateCard(card) => match &mut self.phase {
                Phase::InBrawl(buffers) => {
                    let (player, slot) = (card.player_id.clone(), card.slot);
                    if !buffers.record(card) {
                        tracing::trace!(%player, slot, "Skipping repeated board slot");
                    }
                }
                Phase::Idle if self.in_shop => {
                    let action = if action_type == ActionType::CreateCard {
                        Action::CreateCard(card)
                    } else {
                        Action::UpdateCard(card)
                    };
                    jobs.push(Job::CardUpdate { action });
                }
                Phase::Idle => {
                    tracing::debug!(
                        player = %card.player_id,
                        slot = card.slot,
                        "Dropping board content outside brawl and shop"
                    );
                }
            },
            Action::RemoveCard(_) | Action::MoveCard(_) => {
                if self.in_shop {
                    jobs.push(Job::CardUpdate { action });
                } else {
                    tracing::debug!(action = %action_type, "Dropping card change outside shop");
                }
            }
            Action::AddPlayer(ref info) => {
                self.remember_player(info);
                jobs.push(self.classify_player_entry(action));
            }
            Action::EnterResultsPhase(ref info) => {
                self.remember_player(info);
                tracing::info!(
                    player = %info.player_id,
                    place = info.place,
                    mmr = ?info.mmr,
                    "Match results"
                );
                jobs.push(Job::EndGame { action });
            }
            Action::EnterShopPhase(ref shop) => {
                self.round = shop.round;
                self.in_shop = true;
                tracing::debug!(round = self.round, "Shop phase started");
                jobs.push(Job::RoundInfo {
                    round: self.round,
                    action,
                });
            }
            Action::EndRoundGather(_) => {
                self.in_shop = false;
            }
            Action::UpdateTurnTimer(_) => jobs.push(Job::EndCombat { action }),
            Action::PresentHeroDiscover(_) => {
                if self.round < 1 {
                    jobs.push(Job::HeroDiscover { action });
                } else {
                    tracing::debug!(round = self.round, "Ignoring hero discover after round start");
                }
            }
            Action::ModifyGold(ref stat)
            | Action::ModifyXp(ref stat)
            | Action::ModifyLevel(ref stat)
            | Action::ModifyNextLevelXp(ref stat) => {
                if let Some(player) = self.players.get_mut(&stat.player_id) {
                    match action_type {
                        ActionType::ModifyGold => player.info.gold = stat.value,
                        ActionType::ModifyXp => player.info.experience = stat.value,
                        ActionType::ModifyLevel => player.info.level = stat.value,
                        _ => player.next_level_xp = Some(stat.value),
                    }
                } else {
                    tracing::debug!(player = %stat.player_id, action = %action_type, "Stat change for unknown player");
                }
            }
            Action::Matchmaking(_) => jobs.push(Job::Matchmaking { action }),
            Action::ConnectionInfo(_)
            | Action::PresentDiscover(_)
            | Action::CastSpell(_)
            | Action::Attack(_)
            | Action::DealDamage(_)
            | Action::Death(_)
            | Action::ReplaceUnit(_)
            | Action::SelectTargets(_)
            | Action::BrawlComplete(_) => {
                tracing::trace!(action = %action_type, "No job for action");
            }
        }

        self.last_action = Some(action_type);
        jobs
    }

    /// Decide whether a player entry is a regular update or an out-of-band
    /// health change, based on what came before it.
    fn classify_player_entry(&mut self, action: Action) -> Job {
        let expected_context = matches!(
            self.last_action,
            None | Some(
                ActionType::EnterResultsPhase | ActionType::AddPlayer | ActionType::UpdateTurnTimer
            )
        );
        let job = if self.after_first_combat && !expected_context {
            Job::HealthUpdate { action }
        } else {
            Job::PlayerInfo {
                action,
                live: self.after_first_combat,
            }
        };

        self.player_burst += 1;
        if !self.after_first_combat && self.player_burst >= self.expected_players {
            tracing::debug!(players = self.player_burst, "Full player burst seen");
            self.after_first_combat = true;
        }
        job
    }

    fn remember_player(&mut self, info: &PlayerInfo) {
        self.players
            .entry(info.player_id.clone())
            .and_modify(|state| state.info = info.clone())
            .or_insert_with(|| PlayerState::new(info.clone()));
    }

    fn start_session(&mut self, info: &ConnectionInfo) {
        if let Phase::InBrawl(buffers) = &self.phase {
            tracing::warn!(
                cards = buffers.card_count(),
                "Discarding brawl buffers on session change"
            );
        }
        tracing::info!(
            session_id = %info.session_id,
            build_id = %info.build_id,
            "New session"
        );
        self.session = Some(SessionKey {
            session_id: info.session_id.clone(),
            build_id: info.build_id.clone(),
        });
        self.phase = Phase::Idle;
        self.round = 0;
        self.in_shop = false;
        self.last_action = None;
        self.player_burst = 0;
        self.after_first_combat = false;
        self.players.clear();
    }

    fn end_brawl(&mut self) -> Option<Job> {
        match std::mem::take(&mut self.phase) {
            Phase::InBrawl(buffers) => {
                tracing::debug!(
                    cards = buffers.card_count(),
                    round = self.round,
                    "Brawl phase ended"
                );
                Some(Job::BoardInfo {
                    round: self.round,
                    boards: buffers.into_snapshot(),
                })
            }
            Phase::Idle => None,
        }
    }
}
