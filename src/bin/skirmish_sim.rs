//! Headless Skirmish Runner
//!
//! Runs AI vs AI encounters and prints a JSON summary for balancing
//! sweeps.

use clap::Parser;
use serde::Serialize;
use skirmish::combat::{
    Ability, CombatAction, CombatSession, DamageType, EncounterResult, Participant,
};
use skirmish::core::config::EncounterConfig;
use skirmish::core::types::Team;
use skirmish::grid::{HexCoord, TerrainPreset};

/// Headless Skirmish Runner - AI vs AI encounters
#[derive(Parser, Debug)]
#[command(name = "skirmish_sim")]
#[command(about = "Run AI vs AI encounters and output outcome summaries")]
struct Args {
    /// Units per side
    #[arg(long, default_value_t = 4)]
    party_size: usize,

    /// Terrain preset: plains, woodland, ruins, cavern
    #[arg(long, default_value = "plains")]
    terrain: String,

    /// Battlefield width in hexes
    #[arg(long, default_value_t = 16)]
    map_width: u32,

    /// Battlefield height in hexes
    #[arg(long, default_value_t = 12)]
    map_height: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Encounter config TOML file (defaults apply if omitted)
    #[arg(long)]
    config: Option<String>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print every combat event to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunSummary {
    result: String,
    rounds: u32,
    turns_elapsed: u32,
    damage_dealt: u32,
    damage_taken: u32,
    healing_done: u32,
    enemies_killed: u32,
    allies_lost: u32,
    critical_hits: u32,
    abilities_used: u32,
    seed: u64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                eprintln!("Failed to read config '{path}': {e}");
                std::process::exit(1);
            });
            EncounterConfig::from_toml_str(&text).unwrap_or_else(|e| {
                eprintln!("Invalid config '{path}': {e}");
                std::process::exit(1);
            })
        }
        None => EncounterConfig::default(),
    };

    let preset = match args.terrain.as_str() {
        "plains" => TerrainPreset::Plains,
        "woodland" => TerrainPreset::Woodland,
        "ruins" => TerrainPreset::Ruins,
        "cavern" => TerrainPreset::Cavern,
        other => {
            eprintln!("Unknown terrain preset '{other}'");
            std::process::exit(1);
        }
    };

    let mut roster = Vec::new();
    roster.extend(build_party(Team::Ally, args.party_size, 0, args.map_height));
    roster.extend(build_party(
        Team::Enemy,
        args.party_size,
        args.map_width as i32 - 1,
        args.map_height,
    ));

    let mut session = CombatSession::new(
        &roster,
        preset,
        args.map_width,
        args.map_height,
        seed,
        config,
    )
    .unwrap_or_else(|e| {
        eprintln!("Encounter setup failed: {e}");
        std::process::exit(1);
    });

    while session.result().is_none() {
        let log = if session.awaiting_unit().is_some() {
            session.submit_action(CombatAction::Pass)
        } else {
            session.step()
        };
        if args.verbose {
            for event in &log.events {
                eprintln!("  [round {}] {:?}", session.round(), event);
            }
        }
    }

    let stats = session.stats();
    let summary = RunSummary {
        result: format!("{:?}", session.result().unwrap_or(EncounterResult::Stalemate)),
        rounds: stats.rounds,
        turns_elapsed: stats.turns_elapsed,
        damage_dealt: stats.damage_dealt,
        damage_taken: stats.damage_taken,
        healing_done: stats.healing_done,
        enemies_killed: stats.enemies_killed,
        allies_lost: stats.allies_lost,
        critical_hits: stats.critical_hits,
        abilities_used: stats.abilities_used,
        seed,
    };

    match args.format.as_str() {
        "json" => match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize summary: {e}");
                std::process::exit(1);
            }
        },
        _ => {
            println!("Encounter Result");
            println!("================");
            println!("Result: {}", summary.result);
            println!("Rounds: {}", summary.rounds);
            println!("Turns: {}", summary.turns_elapsed);
            println!(
                "Damage dealt/taken: {}/{}",
                summary.damage_dealt, summary.damage_taken
            );
            println!("Healing done: {}", summary.healing_done);
            println!(
                "Enemies killed / allies lost: {}/{}",
                summary.enemies_killed, summary.allies_lost
            );
            println!("Seed: {}", summary.seed);
        }
    }
}

/// A mixed party deployed along one map edge: fighter, archer, mage,
/// healer, rogue, cycling for larger sizes.
fn build_party(team: Team, size: usize, column: i32, map_height: u32) -> Vec<Participant> {
    let mut party = Vec::with_capacity(size);
    for i in 0..size {
        let row = ((i as u32 * map_height) / size.max(1) as u32) as i32;
        let position = HexCoord::new(column, row);
        let mut p = match i % 5 {
            0 => {
                let mut p = Participant::new(format!("{team:?} fighter {i}"), team, position);
                p.attributes.strength = 14;
                p.max_hp = 26;
                p.hp = 26;
                p
            }
            1 => {
                let mut p = Participant::new(format!("{team:?} archer {i}"), team, position);
                p.attributes.dexterity = 14;
                p.abilities = vec![Ability::sword(), Ability::bow()];
                p
            }
            2 => {
                let mut p = Participant::new(format!("{team:?} mage {i}"), team, position);
                p.attributes.intelligence = 16;
                p.abilities = vec![Ability::sword(), Ability::firebolt(), Ability::fireburst()];
                p.max_mana = 14;
                p.mana = 14;
                p.weaknesses = vec![DamageType::Physical];
                p.max_hp = 16;
                p.hp = 16;
                p
            }
            3 => {
                let mut p = Participant::new(format!("{team:?} healer {i}"), team, position);
                p.attributes.intelligence = 12;
                p.attributes.charisma = 14;
                p.abilities = vec![Ability::sword(), Ability::mend()];
                p
            }
            _ => {
                let mut p = Participant::new(format!("{team:?} rogue {i}"), team, position);
                p.attributes.dexterity = 16;
                p.abilities = vec![Ability::venom_dagger(), Ability::sword()];
                p
            }
        };
        if i == 0 {
            p.elite = true;
        }
        party.push(p);
    }
    party
}
