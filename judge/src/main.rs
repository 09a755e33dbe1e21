use std::path::{Path, PathBuf};

use blokus::{visualize_board, CreativeConfig, GameConfig, Heuristic, Weights};
use clap::Parser;
use judge::{play_game, Participant, Player, PlayerConfig, Recorder, Stats};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    /// Path to the config JSON files of bot players
    #[clap(num_args(0..=4), value_delimiter = ' ')]
    player_configs: Vec<PathBuf>,

    /// How many seats the built-in heuristic fills
    #[arg(short, long, default_value_t = 0)]
    builtin_players: usize,

    /// JSON file with weights for the built-in heuristic
    #[arg(long)]
    weights: Option<PathBuf>,

    /// How many games to play
    #[arg(short, long, default_value_t = 100)]
    num_games: usize,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Play with special tiles and item cards
    #[arg(short, long, default_value_t = false)]
    creative: bool,

    /// JSON file with the game configuration, overriding --creative
    #[arg(long)]
    game_config: Option<PathBuf>,

    /// Shuffle the seating before every game
    #[arg(long, default_value_t = false)]
    shuffle_seats: bool,

    /// Record the games as JSON files into this directory
    #[arg(short, long)]
    record_games_to_directory: Option<PathBuf>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    use anyhow::Context;
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    initialize_logging(args.log_level);

    let num_players = args.player_configs.len() + args.builtin_players;
    if !(2..=4).contains(&num_players) {
        anyhow::bail!("A game needs 2 to 4 players, got {}", num_players);
    }

    // Get a random seed
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut recorder = if let Some(dir_path) = args.record_games_to_directory {
        Some(Recorder::new(dir_path)?)
    } else {
        None
    };

    let config = match &args.game_config {
        Some(path) => load_json(path)?,
        None => GameConfig {
            creative: args.creative.then(CreativeConfig::default),
            ..GameConfig::default()
        },
    };
    let weights: Weights = match &args.weights {
        Some(path) => load_json(path)?,
        None => Weights::default(),
    };

    let player_configs = args
        .player_configs
        .iter()
        .map(|path| PlayerConfig::load(path))
        .collect::<Result<Vec<PlayerConfig>, anyhow::Error>>()?;
    let mut bots = player_configs
        .iter()
        .map(Player::from_config)
        .collect::<Result<Vec<Player>, anyhow::Error>>()?;

    let mut stats = Stats::default();
    let mut illegal_moves = 0;
    for game_idx in 0..args.num_games {
        let mut participants: Vec<Participant> = bots.iter_mut().map(Participant::Bot).collect();
        for n in 0..args.builtin_players {
            participants.push(Participant::Builtin {
                name: format!("heuristic-{}", n + 1),
                heuristic: Heuristic::new(weights),
            });
        }
        if args.shuffle_seats {
            participants.shuffle(&mut rng);
        }

        let outcome = play_game(game_idx as u64 + 1, &mut rng, &mut participants, config.clone(), &mut recorder)?;
        for &seat in &outcome.illegal_moves {
            info!(player = participants[seat].name(), game_idx, "Illegal move by player");
        }
        illegal_moves += outcome.illegal_moves.len();
        stats.record(&outcome.results);
        debug!("Final board of game {}:\n{}", game_idx + 1, visualize_board(&outcome.final_board, &[]));
    }

    eprintln!(
        "End result after {} games ({} illegal moves):\n{}",
        args.num_games, illegal_moves, stats
    );

    Ok(())
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().event_format(format))
        .with(filter)
        .init();
}
