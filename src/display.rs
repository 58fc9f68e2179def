//! Colored terminal output for jobs and decoded actions.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::action::{Action, CardState};
use crate::aggregator::{Job, JobKind};
use crate::binary::{DecodedRecord, Versions};
use crate::ingest::IngestStats;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 80;

/// Truncate a string to a maximum number of characters, adding ellipsis if
/// truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

fn format_card(card: &CardState) -> String {
    let golden = if card.golden { "*" } else { "" };
    format!(
        "{}{golden}@{:?}#{} {}/{}",
        card.content_id, card.zone, card.slot, card.attack, card.health
    )
}

/// One-line summary of an action.
#[must_use]
pub fn format_action(action: &Action) -> String {
    let detail = match action {
        Action::ConnectionInfo(info) => {
            format!("session={} build={}", info.session_id, info.build_id)
        }
        Action::AddPlayer(p) | Action::EnterResultsPhase(p) => format!(
            "{} ({}) hero={} hp={} place={}{}",
            p.display_name,
            p.player_id,
            p.hero_id,
            p.health,
            p.place,
            p.mmr.map_or(String::new(), |mmr| format!(" mmr={mmr}"))
        ),
        Action::EnterBrawlPhase(pairing) => format!(
            "{} vs {}",
            pairing.first.display_name, pairing.second.display_name
        ),
        Action::EnterShopPhase(shop) => format!("round={}", shop.round),
        Action::CreateCard(card) | Action::UpdateCard(card) => {
            format!("{} {}", card.player_id, format_card(card))
        }
        Action::RemoveCard(card) | Action::MoveCard(card) => {
            format!("{} @{:?}#{}", card.player_id, card.zone, card.slot)
        }
        Action::ModifyGold(stat)
        | Action::ModifyXp(stat)
        | Action::ModifyLevel(stat)
        | Action::ModifyNextLevelXp(stat) => format!("{} -> {}", stat.player_id, stat.value),
        Action::PresentHeroDiscover(discover) | Action::PresentDiscover(discover) => {
            discover.choices.join(", ")
        }
        Action::Matchmaking(request) => format!("mode={:?}", request.mode),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    format!("{:?} {}", action.action_type(), truncate(&detail, DEFAULT_MAX_LEN))
}

/// One-line summary of a job.
#[must_use]
pub fn format_job(job: &Job) -> String {
    match job {
        Job::BoardInfo { round, boards } => {
            let players: Vec<String> = boards
                .iter()
                .map(|(player, cards)| format!("{player}:{}", cards.len()))
                .collect();
            format!("round={round} boards [{}]", players.join(" "))
        }
        Job::RoundInfo { round, .. } => format!("round={round}"),
        Job::PlayerInfo { action, live } => {
            format!("{}{}", format_action(action), if *live { " (live)" } else { "" })
        }
        other => other.action().map(format_action).unwrap_or_default(),
    }
}

fn job_label(kind: JobKind) -> String {
    let label = format!("[{kind:?}]");
    match kind {
        JobKind::NewGame | JobKind::EndGame => label.blue().bold().to_string(),
        JobKind::BoardInfo | JobKind::EndCombat => label.magenta().bold().to_string(),
        JobKind::HealthUpdate => label.red().bold().to_string(),
        JobKind::CardUpdate => label.cyan().bold().to_string(),
        JobKind::Matchmaking | JobKind::HeroDiscover => label.yellow().bold().to_string(),
        JobKind::RoundInfo | JobKind::PlayerInfo => label.green().bold().to_string(),
    }
}

/// Print a job.
pub fn print_job(job: &Job) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        job_label(job.kind()),
        format_job(job)
    );
    let _ = io::stdout().flush();
}

/// Print a decoded binary record.
pub fn print_record(record: &DecodedRecord) {
    println!(
        "{} {} {}",
        format!("{:>8}", record.offset).dimmed(),
        format!("[0x{:04x}]", record.discriminator).yellow().bold(),
        format_action(&record.action)
    );
    let _ = io::stdout().flush();
}

/// Print match file versions.
pub fn print_versions(versions: &Versions) {
    println!(
        "{} client={} transport={} card_db={}",
        "[MATCH]".blue().bold(),
        versions.client.cyan(),
        versions.transport,
        versions.card_db
    );
    let _ = io::stdout().flush();
}

/// Print ingestion counters.
pub fn print_stats(stats: &IngestStats) {
    println!(
        "{} {} {} lines, {} jobs, {} failures",
        timestamp().dimmed(),
        "[DONE]".green().bold(),
        stats.lines,
        stats.jobs,
        stats.failures
    );
    let _ = io::stdout().flush();
}

/// Print any serializable value as one JSON line.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize output"),
    }
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
