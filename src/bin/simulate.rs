use clap::Parser;
use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use novus::config::MatchConfig;
use novus::enums::Seat;
use novus::manager::MatchSession;
use novus::players::{policy_from_name, Policy};
use novus::recorder::{Conclusion, MatchRecord};

/// Plays policy-vs-policy matches and prints a tournament summary
#[derive(Parser, Debug)]
#[command(name = "simulate")]
struct Args {
    /// Number of matches to play
    #[arg(short, long, default_value_t = 100)]
    num_games: usize,

    /// Policies for seat 0 and seat 1, comma separated (random, greedy)
    #[arg(short, long, default_value = "random,random")]
    players: String,

    /// Base seed; match i uses seed + i
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Turn number at which a match is drawn
    #[arg(short, long)]
    turn_limit: Option<u32>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Print every match result
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct Summary {
    players: [String; 2],
    games: usize,
    wins: [usize; 2],
    draws: usize,
    conclusions: Vec<(String, usize)>,
    average_turns: f64,
    elapsed_ms: u128,
}

fn build_policies(names: &[&str], seed: u64) -> Option<[Arc<dyn Policy>; 2]> {
    let first: Arc<dyn Policy> = policy_from_name(names[0], seed)?.into();
    let second: Arc<dyn Policy> = policy_from_name(names[1], seed.wrapping_add(1))?.into();
    Some([first, second])
}

fn play(config: MatchConfig, names: &[&str], seed: u64, index: usize) -> Option<MatchRecord> {
    let [first, second] = build_policies(names, seed)?;
    let mut session = MatchSession::new(format!("sim-{}", index), config);
    session
        .join(format!("seat0:{}", first.name()), None, Some(first))
        .ok()?;
    // Joining the second policy starts the match and plays it to the end.
    let (_, effects) = session
        .join(format!("seat1:{}", second.name()), None, Some(second))
        .ok()?;
    effects.record
}

fn conclusion_label(conclusion: &Conclusion) -> String {
    match conclusion {
        Conclusion::Victory { kind } => format!("victory ({:?})", kind),
        Conclusion::Draw { reason } => format!("draw ({})", reason),
        Conclusion::Surrender => "surrender".to_string(),
        Conclusion::Abandoned => "abandoned".to_string(),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let names: Vec<&str> = args.players.split(',').map(str::trim).collect();
    if names.len() != 2 || build_policies(&names, args.seed).is_none() {
        eprintln!("❌ --players must name two policies out of: random, greedy");
        process::exit(2);
    }

    let mut config = MatchConfig::from_env().unwrap_or_else(|e| {
        eprintln!("❌ {}", e);
        process::exit(2);
    });
    if let Some(limit) = args.turn_limit {
        config = config.with_turn_limit(limit);
    }

    if !args.json {
        println!("🎮 Novus Match Simulation");
        println!("=========================");
        println!("  - Seat 0: {}", names[0]);
        println!("  - Seat 1: {}", names[1]);
        println!("  - Matches: {}", args.num_games);
        println!("  - Turn limit: {}", config.turn_limit);
    }

    let start = Instant::now();
    let records: Vec<MatchRecord> = (0..args.num_games)
        .into_par_iter()
        .filter_map(|i| play(config, &names, args.seed.wrapping_add(2 * i as u64), i))
        .collect();
    let elapsed = start.elapsed();

    if args.verbose && !args.json {
        for record in &records {
            println!(
                "  {}: {} after {} turns",
                record.match_id,
                conclusion_label(&record.conclusion),
                record.turn_count
            );
        }
    }

    let mut wins = [0usize; 2];
    for seat in records.iter().filter_map(|r| r.winner_seat) {
        wins[seat.index()] += 1;
    }
    let draws = records
        .iter()
        .filter(|r| matches!(r.conclusion, Conclusion::Draw { .. }))
        .count();
    let conclusions: Vec<(String, usize)> = records
        .iter()
        .map(|r| conclusion_label(&r.conclusion))
        .counts()
        .into_iter()
        .sorted()
        .collect();
    let average_turns = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.turn_count as f64).sum::<f64>() / records.len() as f64
    };

    let summary = Summary {
        players: [names[0].to_string(), names[1].to_string()],
        games: records.len(),
        wins,
        draws,
        conclusions,
        average_turns,
        elapsed_ms: elapsed.as_millis(),
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("❌ Failed to serialize summary: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    println!("\n📊 Tournament Results:");
    println!("====================");
    for seat in [Seat::First, Seat::Second] {
        let rate = if summary.games > 0 {
            wins[seat.index()] as f64 / summary.games as f64 * 100.0
        } else {
            0.0
        };
        println!(
            "Seat {} ({}): {} wins ({:.1}%)",
            seat,
            names[seat.index()],
            wins[seat.index()],
            rate
        );
    }
    println!("Draws: {}", summary.draws);
    for (label, count) in &summary.conclusions {
        println!("  {}: {}", label, count);
    }
    println!("Average turns per match: {:.1}", summary.average_turns);
    println!("⏱️  {} matches in {:?}", summary.games, elapsed);
}
