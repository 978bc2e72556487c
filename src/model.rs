use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::timecontrol::Category;

/// PGN game-termination marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Ongoing => "*",
        }
    }
}

impl FromStr for GameResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1-0" => Ok(GameResult::WhiteWins),
            "0-1" => Ok(GameResult::BlackWins),
            "1/2-1/2" => Ok(GameResult::Draw),
            "*" => Ok(GameResult::Ongoing),
            other => Err(format!("unknown result {:?}", other)),
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GameResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One game as read from PGN, with every optional header already defaulted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub time_control: String, // raw, e.g. "180+2"
    pub result: GameResult,
    pub white: String,
    pub black: String,
    pub opening: String,
    pub date: NaiveDate,
    pub white_elo: String,
    pub black_elo: String,
    pub white_rating_diff: String,
    pub black_rating_diff: String,
    pub moves: Vec<String>, // SAN, mainline only
}

/// The user's outcome in a decided game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Tally {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
}

impl Tally {
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
    }

    pub fn decided(&self) -> u64 {
        self.wins + self.losses + self.draws
    }
}

/// wins / games as a percentage, 0 when there are no games.
pub fn win_rate(wins: u64, games: u64) -> f64 {
    if games == 0 {
        0.0
    } else {
        wins as f64 / games as f64 * 100.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Streaks {
    pub win_streak: u32,
    pub loss_streak: u32,
    pub draw_streak: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameLength {
    pub length: usize,
    pub result: GameResult,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningStats {
    pub name: String,
    pub count: u64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub win_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPerformance {
    pub month: String, // "YYYY-MM"
    pub games: u64,
    pub wins: u64,
    pub win_rate: f64,
    pub rating_change: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPoint {
    pub date: NaiveDate,
    pub rating: i32,
    pub game_type: Category,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadToHead {
    pub opponent: String,
    pub games: u64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub win_rate: f64,
    pub last_played: NaiveDate,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LengthSummary {
    pub average: f64,
    pub shortest: usize,
    pub longest: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultDistribution {
    pub wins: LengthSummary,
    pub losses: LengthSummary,
    pub draws: LengthSummary,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ColorStats {
    #[serde(rename = "White")]
    pub white: Tally,
    #[serde(rename = "Black")]
    pub black: Tally,
}

/// Everything `analyze` reports for one user over one game set.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub game_types: BTreeMap<Category, u64>,
    pub results: Tally,
    pub streaks: Streaks,
    pub game_lengths: Vec<GameLength>,
    pub openings: Vec<OpeningStats>,
    pub monthly_performance: Vec<MonthlyPerformance>,
    pub rating_progression: Vec<RatingPoint>,
    pub head_to_head: Vec<HeadToHead>,
    pub result_distribution: ResultDistribution,
    pub color_stats: ColorStats,
    pub peak_ratings: BTreeMap<Category, i32>,
}
