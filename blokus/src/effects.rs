use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BoundingBox, ItemCardKind, StatusKind, ALL_COLORS, BOARD_SIZE};

/// How many times a tile position is rolled before the tile is dropped.
const MAX_PLACEMENT_ATTEMPTS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Gold,
    Purple,
    Red,
    /// Cannot be covered at all.
    Barrier,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialTile {
    pub i: i8,
    pub j: i8,
    pub kind: TileKind,
    pub used: bool,
}

/// Tile generation parameters for creative games.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreativeConfig {
    pub gold: usize,
    pub purple: usize,
    pub red: usize,
    pub barrier: usize,
    /// Tiles keep at least this Chebyshev distance plus one from every starting corner.
    pub corner_safety_radius: i8,
    /// Minimum Manhattan distance between any two tiles.
    pub min_tile_spacing: i8,
}

impl Default for CreativeConfig {
    fn default() -> Self {
        Self {
            gold: 6,
            purple: 6,
            red: 6,
            barrier: 4,
            corner_safety_radius: 3,
            min_tile_spacing: 3,
        }
    }
}

/// Scatters the configured tiles over the board.
///
/// A tile that cannot be placed within a bounded number of attempts is left out,
/// so crowded configurations yield fewer tiles instead of looping forever.
pub fn generate_special_tiles<R: Rng + ?Sized>(config: &CreativeConfig, rng: &mut R) -> Vec<SpecialTile> {
    let kinds = std::iter::repeat(TileKind::Gold)
        .take(config.gold)
        .chain(std::iter::repeat(TileKind::Purple).take(config.purple))
        .chain(std::iter::repeat(TileKind::Red).take(config.red))
        .chain(std::iter::repeat(TileKind::Barrier).take(config.barrier));

    let mut tiles: Vec<SpecialTile> = Vec::new();
    for kind in kinds {
        let spot = (0..MAX_PLACEMENT_ATTEMPTS)
            .map(|_| (rng.gen_range(0..BOARD_SIZE), rng.gen_range(0..BOARD_SIZE)))
            .find(|&(i, j)| is_valid_tile_spot(config, &tiles, i, j));
        match spot {
            Some((i, j)) => tiles.push(SpecialTile {
                i,
                j,
                kind,
                used: false,
            }),
            None => debug!(?kind, "No room left for special tile"),
        }
    }
    tiles
}

fn is_valid_tile_spot(config: &CreativeConfig, tiles: &[SpecialTile], i: i8, j: i8) -> bool {
    let near_corner = ALL_COLORS.iter().any(|color| {
        let (ci, cj) = color.starting_corner();
        BoundingBox::singleton(ci, cj).distance_to(i, j) <= config.corner_safety_radius
    });
    if near_corner {
        return false;
    }
    tiles.iter().all(|tile| {
        let distance = (tile.i - i).abs() + (tile.j - j).abs();
        distance > 0 && distance >= config.min_tile_spacing
    })
}

/// Marks every unused, non-barrier tile under `cells` as used.
///
/// Returns the indices of the newly triggered tiles in the order the cells
/// were given, so a piece covering several tiles resolves them in sequence.
pub fn triggered_tiles(tiles: &mut [SpecialTile], cells: &[(i8, i8)]) -> Vec<usize> {
    let mut triggered = Vec::new();
    for &(i, j) in cells {
        let hit = tiles
            .iter()
            .position(|t| t.i == i && t.j == j && !t.used && t.kind != TileKind::Barrier);
        if let Some(idx) = hit {
            tiles[idx].used = true;
            triggered.push(idx);
        }
    }
    triggered
}

/// A status to grant, with its duration in owner turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusGrant {
    pub kind: StatusKind,
    pub turns: i32,
}

impl StatusGrant {
    pub fn new(kind: StatusKind, turns: i32) -> Self {
        Self { kind, turns }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemGrant {
    Random,
    Specific(ItemCardKind),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceRemoval {
    Largest,
    Random,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redistribution {
    /// The recipient trades totals with the highest scoring other player.
    SwapWithLeader,
    /// Every player's total is set to the (rounded down) average.
    AverageAll,
}

/// The consequences of a tile effect or an item card.
///
/// Everything is relative to a recipient, except `user_score_delta` and the
/// blame transfer, which refer to the player causing the effect.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectResult {
    pub score_delta: i32,
    /// Capped at what the recipient lost, when `score_delta` is negative.
    pub user_score_delta: i32,
    /// Every player gains this many points per piece they have already placed.
    pub global_used_piece_bonus: i32,
    pub statuses: Vec<StatusGrant>,
    pub transfer_negative_status: bool,
    pub item_card: Option<ItemGrant>,
    pub remove_piece: Option<PieceRemoval>,
    pub undo_last_move: bool,
    pub redistribution: Option<Redistribution>,
    pub extra_turn: bool,
}

impl EffectResult {
    pub fn with_status(kind: StatusKind, turns: i32) -> Self {
        Self {
            statuses: vec![StatusGrant::new(kind, turns)],
            ..Self::default()
        }
    }

    fn score(delta: i32) -> Self {
        Self {
            score_delta: delta,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectId {
    GoldCoins,
    Treasure,
    ExtraTurn,
    Momentum,
    CardDraw,
    PurpleBlessing,
    Fortune,
    GrandFortune,
    Misfortune,
    Jubilee,
    CrownSwap,
    EqualShare,
    MysteryCard,
    Aegis,
    Toll,
    Sinkhole,
    Pickpocket,
    Rewind,
    Stun,
    Drain,
    Hourglass,
    Shackles,
}

impl EffectId {
    pub fn result(self) -> EffectResult {
        use EffectId::*;
        match self {
            GoldCoins => EffectResult::score(3),
            Treasure => EffectResult {
                score_delta: 5,
                item_card: Some(ItemGrant::Random),
                ..EffectResult::default()
            },
            ExtraTurn => EffectResult {
                extra_turn: true,
                ..EffectResult::default()
            },
            Momentum => EffectResult::with_status(StatusKind::DoubleNext, 1),
            CardDraw | MysteryCard => EffectResult {
                item_card: Some(ItemGrant::Random),
                ..EffectResult::default()
            },
            PurpleBlessing => EffectResult::with_status(StatusKind::PurpleUpgrade, 3),
            Fortune => EffectResult::score(4),
            GrandFortune => EffectResult::score(8),
            Misfortune => EffectResult::score(-3),
            Jubilee => EffectResult {
                global_used_piece_bonus: 1,
                ..EffectResult::default()
            },
            CrownSwap => EffectResult {
                redistribution: Some(Redistribution::SwapWithLeader),
                ..EffectResult::default()
            },
            EqualShare => EffectResult {
                redistribution: Some(Redistribution::AverageAll),
                ..EffectResult::default()
            },
            Aegis => EffectResult::with_status(StatusKind::SteelShield, 2),
            Toll => EffectResult::score(-3),
            Sinkhole => EffectResult {
                remove_piece: Some(PieceRemoval::Largest),
                ..EffectResult::default()
            },
            Pickpocket => EffectResult {
                remove_piece: Some(PieceRemoval::Random),
                ..EffectResult::default()
            },
            Rewind => EffectResult {
                undo_last_move: true,
                ..EffectResult::default()
            },
            Stun => EffectResult::with_status(StatusKind::SkipTurn, 1),
            Drain => EffectResult::with_status(StatusKind::HalfScore, 1),
            Hourglass => EffectResult::with_status(StatusKind::TimePressure, 2),
            Shackles => EffectResult::with_status(StatusKind::BigPieceBan, 2),
        }
    }
}

/// An entry in one of the weighted effect tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TileEffect {
    pub id: EffectId,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: TileKind,
    pub weight: u32,
}

const fn entry(
    id: EffectId,
    name: &'static str,
    description: &'static str,
    kind: TileKind,
    weight: u32,
) -> TileEffect {
    TileEffect {
        id,
        name,
        description,
        kind,
        weight,
    }
}

static GOLD_EFFECTS: [TileEffect; 6] = [
    entry(EffectId::GoldCoins, "Gold Coins", "+3 points", TileKind::Gold, 30),
    entry(EffectId::Treasure, "Treasure", "+5 points and a random item card", TileKind::Gold, 20),
    entry(EffectId::ExtraTurn, "Second Wind", "Take another turn", TileKind::Gold, 15),
    entry(EffectId::Momentum, "Momentum", "Your next placement scores double", TileKind::Gold, 15),
    entry(EffectId::CardDraw, "Card Draw", "Gain a random item card", TileKind::Gold, 15),
    entry(EffectId::PurpleBlessing, "Purple Blessing", "Purple tiles roll on the upgraded table for 3 turns", TileKind::Gold, 5),
];

static PURPLE_EFFECTS: [TileEffect; 7] = [
    entry(EffectId::Fortune, "Fortune", "+4 points", TileKind::Purple, 20),
    entry(EffectId::Misfortune, "Misfortune", "-3 points", TileKind::Purple, 20),
    entry(EffectId::Jubilee, "Jubilee", "Everyone gains 1 point per placed piece", TileKind::Purple, 10),
    entry(EffectId::CrownSwap, "Crown Swap", "Swap scores with the leader", TileKind::Purple, 10),
    entry(EffectId::EqualShare, "Equal Share", "All scores become the average", TileKind::Purple, 10),
    entry(EffectId::MysteryCard, "Mystery Card", "Gain a random item card", TileKind::Purple, 20),
    entry(EffectId::Aegis, "Aegis", "Steel shield for 2 turns", TileKind::Purple, 10),
];

static UPGRADED_PURPLE_EFFECTS: [TileEffect; 6] = [
    entry(EffectId::Fortune, "Fortune", "+4 points", TileKind::Purple, 25),
    entry(EffectId::GrandFortune, "Grand Fortune", "+8 points", TileKind::Purple, 15),
    entry(EffectId::Jubilee, "Jubilee", "Everyone gains 1 point per placed piece", TileKind::Purple, 15),
    entry(EffectId::CrownSwap, "Crown Swap", "Swap scores with the leader", TileKind::Purple, 15),
    entry(EffectId::MysteryCard, "Mystery Card", "Gain a random item card", TileKind::Purple, 20),
    entry(EffectId::Aegis, "Aegis", "Steel shield for 2 turns", TileKind::Purple, 10),
];

static RED_EFFECTS: [TileEffect; 8] = [
    entry(EffectId::Toll, "Toll", "-3 points", TileKind::Red, 25),
    entry(EffectId::Sinkhole, "Sinkhole", "Lose your largest unplaced piece", TileKind::Red, 10),
    entry(EffectId::Pickpocket, "Pickpocket", "Lose a random unplaced piece", TileKind::Red, 15),
    entry(EffectId::Rewind, "Rewind", "Your last placement is undone", TileKind::Red, 10),
    entry(EffectId::Stun, "Stun", "Skip your next turn", TileKind::Red, 15),
    entry(EffectId::Drain, "Drain", "Your next placement scores half", TileKind::Red, 10),
    entry(EffectId::Hourglass, "Hourglass", "Half the time for 2 turns", TileKind::Red, 10),
    entry(EffectId::Shackles, "Shackles", "No five-cell pieces for 2 turns", TileKind::Red, 5),
];

/// The weighted table a tile kind rolls on. Barriers have none.
pub fn effect_table(kind: TileKind, upgraded: bool) -> &'static [TileEffect] {
    match kind {
        TileKind::Gold => &GOLD_EFFECTS,
        TileKind::Purple if upgraded => &UPGRADED_PURPLE_EFFECTS,
        TileKind::Purple => &PURPLE_EFFECTS,
        TileKind::Red => &RED_EFFECTS,
        TileKind::Barrier => &[],
    }
}

pub fn roll_effect<R: Rng + ?Sized>(kind: TileKind, upgraded: bool, rng: &mut R) -> Option<&'static TileEffect> {
    effect_table(kind, upgraded)
        .choose_weighted(rng, |effect| effect.weight)
        .ok()
}

/// A tile effect as it was rolled during a placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredEffect {
    pub i: i8,
    pub j: i8,
    pub kind: TileKind,
    pub effect: EffectId,
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn generated_tiles_respect_spacing() {
        let config = CreativeConfig::default();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tiles = generate_special_tiles(&config, &mut rng);
            assert!(tiles.len() <= 22);
            for (idx, a) in tiles.iter().enumerate() {
                for color in ALL_COLORS {
                    let (ci, cj) = color.starting_corner();
                    assert!((ci - a.i).abs().max((cj - a.j).abs()) > config.corner_safety_radius);
                }
                for b in &tiles[idx + 1..] {
                    assert!((a.i - b.i).abs() + (a.j - b.j).abs() >= config.min_tile_spacing);
                }
            }
        }
    }

    #[test]
    fn impossible_layouts_terminate() {
        let config = CreativeConfig {
            gold: 500,
            min_tile_spacing: 10,
            ..CreativeConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let tiles = generate_special_tiles(&config, &mut rng);
        assert!(tiles.len() < 500);
    }

    #[test]
    fn tiles_fire_once_in_coverage_order() {
        let mut tiles = vec![
            SpecialTile { i: 5, j: 6, kind: TileKind::Red, used: false },
            SpecialTile { i: 5, j: 5, kind: TileKind::Gold, used: false },
            SpecialTile { i: 5, j: 7, kind: TileKind::Barrier, used: false },
        ];
        let cells = [(5, 5), (5, 6), (5, 7)];
        assert_eq!(triggered_tiles(&mut tiles, &cells), vec![1, 0]);
        assert!(tiles[0].used && tiles[1].used && !tiles[2].used);
        assert!(triggered_tiles(&mut tiles, &cells).is_empty());
    }

    #[test]
    fn tables_are_consistent() {
        for (kind, upgraded) in [
            (TileKind::Gold, false),
            (TileKind::Purple, false),
            (TileKind::Purple, true),
            (TileKind::Red, false),
        ] {
            let table = effect_table(kind, upgraded);
            assert_eq!(table.iter().map(|e| e.weight).sum::<u32>(), 100);
            assert!(table.iter().all(|e| e.kind == kind));
        }
        let mut rng = StdRng::seed_from_u64(1);
        assert!(roll_effect(TileKind::Barrier, false, &mut rng).is_none());
        assert!(roll_effect(TileKind::Gold, false, &mut rng).is_some());
    }

    #[test]
    fn treasure_gives_points_and_a_card() {
        let result = EffectId::Treasure.result();
        assert_eq!(result.score_delta, 5);
        assert_eq!(result.item_card, Some(ItemGrant::Random));
        assert!(result.statuses.is_empty() && !result.extra_turn);
    }
}
