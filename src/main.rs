//! Derby Demo
//!
//! Scripted full session: an auto-bettor plays every round of a
//! three-round game and the results land in a JSON stat file.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use derby_core::{
    VERSION, TICK_RATE,
    core::fixed::to_float,
    core::rng::derive_draw_seed,
    game::{BetKind, GameEvent, GameSession, Phase, Roster, SessionConfig, TrackCatalog},
    ledger::{ScoreLedger, store::FileStore},
};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to set tracing subscriber")?;

    info!("Derby Core v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let stats_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "derby_stats.json".to_string());
    info!("Stat store: {}", stats_path);

    let seed = 20240817u64;
    info!("Session seed: {} (0x{})", seed, hex::encode(seed.to_be_bytes()));

    let config = SessionConfig {
        seed,
        ..SessionConfig::default()
    };
    let ledger = ScoreLedger::new(Box::new(FileStore::new(&stats_path)));
    let mut session = GameSession::new(
        config,
        Box::new(Roster::new(derive_draw_seed(seed))),
        Box::new(TrackCatalog::new(seed)),
        ledger,
    );

    // Narrate the interesting events
    session.subscribe(|event| match event {
        GameEvent::PhaseChanged { from, to } => info!("Phase: {:?} -> {:?}", from, to),
        GameEvent::CountdownTick { seconds_left } => info!("Countdown: {}", seconds_left),
        GameEvent::TrackChanged { name, laps, .. } => {
            info!("Track: {} ({} laps)", name, laps);
        }
        GameEvent::CompetitorFinished { id, rank } => info!("{} finishes #{}", id, rank),
        GameEvent::ScoreChanged { delta, total } => {
            info!("Round settled: +{} (session total {})", delta, total);
        }
        GameEvent::SessionFinished { final_score } => {
            info!("Session over with {} points", final_score);
        }
        _ => {}
    });

    session.new_game();

    info!("=== Field ===");
    for competitor in session.competitors() {
        info!(
            "{} {} (pace {:.1}, stamina {:.2}, luck {:.2})",
            competitor.id,
            competitor.name,
            to_float(competitor.base_speed),
            to_float(competitor.stamina),
            to_float(competitor.luck),
        );
    }

    let plan = [BetKind::Win, BetKind::Quinella, BetKind::Exacta];
    while session.phase() != Phase::Finish {
        let round = session.round();
        let kind = plan[(round as usize - 1) % plan.len()];
        place_bet(&mut session, kind);

        info!(
            "Round {}: betting {:?} on {:?}",
            round,
            kind,
            session.bet().picks()
        );

        session.start_race();
        run_race(&mut session);

        let outcome = session
            .final_outcome()
            .context("race finished without an outcome")?;
        info!("=== Round {} result ===", round);
        for (rank, id) in outcome.placings() {
            info!("  #{} {}", rank, id);
        }

        session.next_round();
    }

    info!("=== Leaderboard ===");
    for (i, row) in session.leaderboard().iter().enumerate() {
        info!(
            "  {}. {} pts over {} rounds ({})",
            i + 1,
            row.score,
            row.rounds_played,
            row.completed_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }

    let cumulative = session.cumulative();
    info!(
        "All-time: {} pts, {} rounds, {} wins",
        cumulative.total_score, cumulative.rounds_played, cumulative.wins,
    );

    Ok(())
}

/// Back the fastest competitors on paper, as many as the kind needs.
fn place_bet(session: &mut GameSession, kind: BetKind) {
    session.change_bet_kind(kind);

    let mut field: Vec<_> = session.competitors().to_vec();
    field.sort_by(|a, b| b.base_speed.cmp(&a.base_speed));

    let ids: Vec<_> = field
        .iter()
        .take(kind.required_picks())
        .map(|c| c.id)
        .collect();
    for id in ids {
        session.pick(id);
    }
}

/// Drive the countdown and race to settlement, reporting standings
/// every few seconds of simulated time.
fn run_race(session: &mut GameSession) {
    let mut ticks: u32 = 0;
    while session.phase() != Phase::Result {
        session.advance();
        ticks += 1;

        if session.phase() == Phase::Racing && ticks % (TICK_RATE * 5) == 0 {
            let standings = session.live_ranking();
            info!("t+{}s standings: {:?}", ticks / TICK_RATE, standings);
        }

        if ticks > 1_000_000 {
            // The fatigue floor makes this unreachable; bail loudly if
            // a regression breaks termination.
            panic!("race did not terminate");
        }
    }
}
