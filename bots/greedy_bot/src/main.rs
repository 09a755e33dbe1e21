use std::path::PathBuf;

use anyhow::Context;
use blokus::{Board, Color, Heuristic, ItemChoice, ItemContext, PieceSet, PlayTurnResponse, Weights};
use blokus_bot_utils::Bot;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
struct Args {
    /// JSON file with heuristic weights
    #[arg(long)]
    weights: Option<PathBuf>,

    /// A log level among "off", "error", "warn", "info", "debug", "trace"
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    initialize_logging(args.log_level);

    let weights = match args.weights {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read weights from {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse weights from {}", path.display()))?
        }
        None => Weights::default(),
    };

    GreedyBot {
        heuristic: Heuristic::new(weights),
        color: None,
    }
    .run()
}

fn initialize_logging(level: LevelFilter) {
    let format = tracing_subscriber::fmt::format()
        .with_target(false)
        .compact();

    let filter = Targets::new().with_default(level);

    // Stdout carries the protocol.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

struct GreedyBot {
    heuristic: Heuristic,
    color: Option<Color>,
}

impl Bot for GreedyBot {
    fn new_game(&mut self, color: Color) {
        debug!(?color, "New game");
        self.color = Some(color);
    }

    fn item_phase(&mut self, context: ItemContext) -> ItemChoice {
        self.heuristic.choose_item_card(&context)
    }

    fn play_turn(
        &mut self,
        board: Board,
        pieces: PieceSet,
        blocked: Vec<(i8, i8)>,
        big_piece_ban: bool,
    ) -> PlayTurnResponse {
        let Some(color) = self.color else {
            return PlayTurnResponse(None);
        };
        let placement = self
            .heuristic
            .make_move(&board, color, pieces, &blocked, big_piece_ban);
        debug!(?placement, "Turn played");
        PlayTurnResponse(placement)
    }
}
