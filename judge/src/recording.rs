use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use blokus::{Board, Move, PlayerResult, Request};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Writes one JSON file per finished game into a directory.
pub struct Recorder {
    num: usize,
    directory: PathBuf,
    requests: Vec<RequestToPlayer>,
}

impl Recorder {
    pub fn new(directory: PathBuf) -> anyhow::Result<Self> {
        if !directory.is_dir() {
            anyhow::bail!("Directory '{}' does not exist", directory.display());
        }
        Ok(Self {
            num: 1,
            directory,
            requests: Vec::new(),
        })
    }

    pub fn store_request(&mut self, player: &str, request: &Request, response: &str) -> anyhow::Result<()> {
        self.requests.push(RequestToPlayer {
            player: String::from(player),
            request: serde_json::to_value(request)?,
            response: serde_json::from_str(response)?,
        });
        Ok(())
    }

    /// Writes the game and the bot traffic collected since the last one.
    pub fn write_game_recording(
        &mut self,
        results: Vec<PlayerResult>,
        moves: Vec<Move>,
        final_board: Board,
    ) -> anyhow::Result<PathBuf> {
        let record = MatchRecord {
            date: Utc::now(),
            results,
            moves,
            final_board,
            requests: std::mem::take(&mut self.requests),
        };
        let filepath = self.directory.join(format!("game_{:0>6}.json", self.num));
        let writer = BufWriter::new(File::create(&filepath)?);
        serde_json::to_writer_pretty(writer, &record)?;
        self.num += 1;
        Ok(filepath)
    }
}

/// Everything kept about one finished game.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: DateTime<Utc>,
    pub results: Vec<PlayerResult>,
    pub moves: Vec<Move>,
    pub final_board: Board,
    #[serde(default)]
    pub requests: Vec<RequestToPlayer>,
}

impl MatchRecord {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read match record from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse match record from {}", path.display()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestToPlayer {
    pub player: String,
    pub request: serde_json::Value,
    pub response: serde_json::Value,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub games: u32,
    /// Games finished with rank 1, ties included.
    pub wins: u32,
    pub best_score: i32,
    pub total_score: i64,
}

impl PlayerStats {
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.wins as f64 / self.games as f64
    }

    pub fn average_score(&self) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        self.total_score as f64 / self.games as f64
    }
}

/// Results aggregated per player name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    pub players: BTreeMap<String, PlayerStats>,
}

impl Stats {
    pub fn record(&mut self, results: &[PlayerResult]) {
        for result in results {
            let total = result.score.total();
            let stats = self.players.entry(result.name.clone()).or_default();
            stats.best_score = if stats.games == 0 {
                total
            } else {
                stats.best_score.max(total)
            };
            stats.games += 1;
            stats.total_score += i64::from(total);
            if result.rank == 1 {
                stats.wins += 1;
            }
        }
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a MatchRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.record(&record.results);
        }
        stats
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            " {:19} | {:>6} | {:>6} | {:>6} | {:>6} | {:>7}",
            "player", "games", "wins", "win %", "best", "average"
        )?;
        for (name, stats) in &self.players {
            writeln!(
                f,
                " {:19} | {:>6} | {:>6} | {:>5.1}% | {:>6} | {:>7.1}",
                name,
                stats.games,
                stats.wins,
                stats.win_rate() * 100.0,
                stats.best_score,
                stats.average_score()
            )?;
        }
        Ok(())
    }
}
