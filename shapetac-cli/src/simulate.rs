//! Simulate command - play agents against each other and report statistics
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), play_games(), report_results()
//! - Level 3: play_single_game(), compute_statistics()
//! - Level 4: formatting utilities

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;

use shapetac_core::{AgentKind, EndCondition, GameConfig, GameResult, GameSession, Player};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

/// Board radius when neither the command line nor a config file sets one
const DEFAULT_SIMULATION_RADIUS: u32 = 6;

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of games to play
    #[arg(long, default_value = "10")]
    pub games: usize,

    /// Board radius [default: 6, or the config file's]
    #[arg(long)]
    pub radius: Option<u32>,

    /// Red strategy (random, greedy, easy, minimax[:DEPTH[:BEAM]], thoughtful, smart, genius)
    #[arg(long, default_value = "random")]
    pub red: AgentKind,

    /// Blue strategy
    #[arg(long, default_value = "greedy")]
    pub blue: AgentKind,

    /// Rounds per player before the game ends [default: 25, or the config file's]
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Play to a target score instead of a round limit
    #[arg(long, conflicts_with = "max_rounds")]
    pub target: Option<u32>,

    /// Base game config JSON; command-line values override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Play games on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Print one line per game
    #[arg(long)]
    pub verbose: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Result of a single game
#[derive(Clone, Debug)]
struct GameRecord {
    game_number: usize,
    result: GameResult,
    red_score: u32,
    blue_score: u32,
    moves: u32,
    cells: usize,
    /// Completed shapes by kind name
    shapes: BTreeMap<String, usize>,
}

/// Aggregated simulation results
#[derive(Clone, Debug)]
struct SimulationResults {
    games: Vec<GameRecord>,
    red_wins: usize,
    blue_wins: usize,
    draws: usize,
    avg_moves: f32,
    avg_red_score: f32,
    avg_blue_score: f32,
    shape_totals: BTreeMap<String, usize>,
    elapsed: Duration,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulate command
///
/// This function reads like a table of contents:
/// 1. Build the game config
/// 2. Play every game
/// 3. Report results
pub fn run(args: SimulateArgs, seed: Option<u64>) -> Result<()> {
    if args.games == 0 {
        anyhow::bail!("--games must be at least 1");
    }
    let config = build_config(&args, seed)?;

    tracing::info!(
        "Starting simulation: {} (Red) vs {} (Blue), {} games, radius {}",
        args.red,
        args.blue,
        args.games,
        config.radius
    );

    let results = play_games(&config, &args);

    report_results(&results, &args)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Merge the optional config file with command-line values
fn build_config(args: &SimulateArgs, seed: Option<u64>) -> Result<GameConfig> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)
            .with_context(|| format!("Failed to load simulation config: {}", path.display()))?,
        None => GameConfig::default().with_radius(DEFAULT_SIMULATION_RADIUS),
    };

    if let Some(radius) = args.radius {
        config = config.with_radius(radius);
    }
    if let Some(target) = args.target {
        config = config.with_end_condition(EndCondition::ScoreThreshold {
            target: Some(target),
        });
    } else if let Some(max_rounds) = args.max_rounds {
        config = config.with_end_condition(EndCondition::RoundLimit { max_rounds });
    }

    config = config
        .with_agent(Player::Red, Some(args.red))
        .with_agent(Player::Blue, Some(args.blue));
    config.seed = seed.or(config.seed);

    Ok(config)
}

/// Play all games, on all cores when asked
fn play_games(config: &GameConfig, args: &SimulateArgs) -> SimulationResults {
    let progress = create_progress(args.games as u64, args.json || args.verbose);
    let start = Instant::now();

    let play = |index: usize| {
        let record = play_single_game(config, index);
        if args.verbose {
            progress.suspend(|| print_game_line(&record, args.games));
        }
        progress.inc(1);
        record
    };

    let mut games: Vec<GameRecord> = if args.parallel {
        (0..args.games).into_par_iter().map(play).collect()
    } else {
        (0..args.games).map(play).collect()
    };
    games.sort_by_key(|g| g.game_number);

    progress.finish_and_clear();
    compute_statistics(games, start.elapsed())
}

/// Report simulation results
fn report_results(results: &SimulationResults, args: &SimulateArgs) -> Result<()> {
    if args.json {
        print_json_results(results, args)
    } else {
        print_text_results(results, args);
        Ok(())
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Play one game to the end
fn play_single_game(config: &GameConfig, index: usize) -> GameRecord {
    let mut game_config = config.clone();
    game_config.seed = config.seed.map(|s| s.wrapping_add(index as u64));

    let mut session = GameSession::new(game_config);
    let mut shapes: BTreeMap<String, usize> = BTreeMap::new();

    while let Some(result) = session.play_agent_turn() {
        match result {
            Ok(report) => {
                for shape in &report.new_shapes {
                    *shapes.entry(shape.kind.to_string()).or_default() += 1;
                }
            }
            Err(err) => {
                // Agents only pick from valid_moves(), so this means a bug
                tracing::error!(game = index + 1, "agent move rejected: {}", err);
                break;
            }
        }
    }

    let state = session.state();
    GameRecord {
        game_number: index + 1,
        result: state.result(),
        red_score: state.score(Player::Red),
        blue_score: state.score(Player::Blue),
        moves: state.moves_played(),
        cells: state.board().cell_count(),
        shapes,
    }
}

/// Compute aggregate statistics from game records
fn compute_statistics(games: Vec<GameRecord>, elapsed: Duration) -> SimulationResults {
    let count = |result: GameResult| games.iter().filter(|g| g.result == result).count();
    let red_wins = count(GameResult::RedWins);
    let blue_wins = count(GameResult::BlueWins);
    let draws = count(GameResult::Draw);

    let avg_moves = average(&games, |g| g.moves);
    let avg_red_score = average(&games, |g| g.red_score);
    let avg_blue_score = average(&games, |g| g.blue_score);

    let mut shape_totals: BTreeMap<String, usize> = BTreeMap::new();
    for game in &games {
        for (kind, n) in &game.shapes {
            *shape_totals.entry(kind.clone()).or_default() += n;
        }
    }

    SimulationResults {
        games,
        red_wins,
        blue_wins,
        draws,
        avg_moves,
        avg_red_score,
        avg_blue_score,
        shape_totals,
        elapsed,
    }
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn create_progress(total: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let template = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} games";
    if let Ok(style) = ProgressStyle::default_bar().template(template) {
        pb.set_style(style);
    }
    pb
}

fn average(games: &[GameRecord], value: impl Fn(&GameRecord) -> u32) -> f32 {
    if games.is_empty() {
        0.0
    } else {
        games.iter().map(|g| value(g) as f32).sum::<f32>() / games.len() as f32
    }
}

fn percent(part: usize, total: usize) -> f32 {
    if total == 0 {
        0.0
    } else {
        part as f32 / total as f32 * 100.0
    }
}

/// Shape kinds, most frequent first
fn sorted_shapes(totals: &BTreeMap<String, usize>) -> Vec<(&String, usize)> {
    let mut shapes: Vec<(&String, usize)> = totals.iter().map(|(k, &n)| (k, n)).collect();
    shapes.sort_by(|a, b| b.1.cmp(&a.1));
    shapes
}

fn print_game_line(record: &GameRecord, total: usize) {
    println!(
        "Game {}/{}: Winner={}, Score={}-{}, Moves={}",
        record.game_number,
        total,
        record.result.label().unwrap_or("None"),
        record.red_score,
        record.blue_score,
        record.moves
    );
}

/// Print results as JSON
fn print_json_results(results: &SimulationResults, args: &SimulateArgs) -> Result<()> {
    #[derive(Serialize)]
    struct JsonGame<'a> {
        game_number: usize,
        winner: Option<&'static str>,
        red_score: u32,
        blue_score: u32,
        moves: u32,
        shapes: &'a BTreeMap<String, usize>,
    }

    #[derive(Serialize)]
    struct JsonOutput<'a> {
        generated_at: String,
        red: String,
        blue: String,
        total_games: usize,
        red_wins: usize,
        blue_wins: usize,
        draws: usize,
        avg_moves: f32,
        avg_red_score: f32,
        avg_blue_score: f32,
        seconds: f64,
        shape_totals: &'a BTreeMap<String, usize>,
        games: Vec<JsonGame<'a>>,
    }

    let output = JsonOutput {
        generated_at: chrono::Local::now().to_rfc3339(),
        red: args.red.to_string(),
        blue: args.blue.to_string(),
        total_games: results.games.len(),
        red_wins: results.red_wins,
        blue_wins: results.blue_wins,
        draws: results.draws,
        avg_moves: results.avg_moves,
        avg_red_score: results.avg_red_score,
        avg_blue_score: results.avg_blue_score,
        seconds: results.elapsed.as_secs_f64(),
        shape_totals: &results.shape_totals,
        games: results
            .games
            .iter()
            .map(|g| JsonGame {
                game_number: g.game_number,
                winner: g.result.label(),
                red_score: g.red_score,
                blue_score: g.blue_score,
                moves: g.moves,
                shapes: &g.shapes,
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print results as text
fn print_text_results(results: &SimulationResults, args: &SimulateArgs) {
    let total = results.games.len();
    let seconds = results.elapsed.as_secs_f64();
    let cells = results.games.first().map_or(0, |g| g.cells);

    println!("\n{}", "=".repeat(40));
    println!("SIMULATION REPORT: {} (Red) vs {} (Blue)", args.red, args.blue);
    println!("Games: {}", total);
    println!(
        "Time Taken: {:.2}s ({:.3}s/game)",
        seconds,
        seconds / total.max(1) as f64
    );
    println!("{}", "=".repeat(40));
    println!("Red Wins:  {} ({:.1}%)", results.red_wins, percent(results.red_wins, total));
    println!("Blue Wins: {} ({:.1}%)", results.blue_wins, percent(results.blue_wins, total));
    println!("Draws:     {} ({:.1}%)", results.draws, percent(results.draws, total));
    println!("{}", "-".repeat(40));
    println!("Avg Moves: {:.1}", results.avg_moves);
    println!("Avg Score Red:  {:.1}", results.avg_red_score);
    println!("Avg Score Blue: {:.1}", results.avg_blue_score);
    if cells > 0 {
        println!(
            "Avg Board Usage: {:.1}/{} ({:.1}%)",
            results.avg_moves,
            cells,
            results.avg_moves / cells as f32 * 100.0
        );
    }
    println!("{}", "-".repeat(40));
    println!("Shape Frequencies (Total across all games):");
    for (kind, n) in sorted_shapes(&results.shape_totals) {
        println!("  {}: {} ({:.1} per game)", kind, n, n as f32 / total.max(1) as f32);
    }
    println!("{}", "=".repeat(40));
}

// ============================================================================
// TESTS
// ============================================================================
