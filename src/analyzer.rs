use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use chrono::NaiveDate;

use crate::model::{
    win_rate, AnalysisStats, ColorStats, GameLength, GameRecord, GameResult, HeadToHead,
    LengthSummary, MonthlyPerformance, OpeningStats, Outcome, RatingPoint, ResultDistribution,
    Streaks, Tally,
};
use crate::pgn::UNKNOWN_OPENING;
use crate::timecontrol::{classify, Category};

pub const ANONYMOUS: &str = "Anonymous";

/// Running {sum, count, min, max} over game lengths.
#[derive(Clone, Debug, Default)]
struct LengthAcc {
    sum: u64,
    count: u64,
    min: usize,
    max: usize,
}

impl LengthAcc {
    fn add(&mut self, len: usize) {
        if self.count == 0 || len < self.min {
            self.min = len;
        }
        self.max = self.max.max(len);
        self.sum += len as u64;
        self.count += 1;
    }

    fn summary(&self) -> LengthSummary {
        if self.count == 0 {
            return LengthSummary::default();
        }
        LengthSummary {
            average: self.sum as f64 / self.count as f64,
            shortest: self.min,
            longest: self.max,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct MonthAcc {
    games: u64,
    wins: u64,
    rating_change: i64,
}

#[derive(Clone, Debug, Default)]
struct OpeningAcc {
    count: u64,
    tally: Tally,
}

#[derive(Clone, Debug)]
struct OpponentAcc {
    tally: Tally,
    last_played: NaiveDate,
}

/// Keyed accumulators that remember first-seen order, so ties in the final
/// sorts come out the same on every call.
#[derive(Debug)]
struct Ordered<V> {
    index: HashMap<String, usize>,
    entries: Vec<(String, V)>,
}

impl<V> Default for Ordered<V> {
    fn default() -> Self {
        Self { index: HashMap::new(), entries: Vec::new() }
    }
}

impl<V> Ordered<V> {
    fn entry_or_insert_with(&mut self, key: &str, make: impl FnOnce() -> V) -> &mut V {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.entries.push((key.to_string(), make()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }
}

/// Per-call state for one pass over the games.
#[derive(Default)]
struct Accumulator {
    game_types: BTreeMap<Category, u64>,
    results: Tally,
    colors: ColorStats,
    streaks: Streaks,
    current_win: u32,
    current_loss: u32,
    current_draw: u32,
    game_lengths: Vec<GameLength>,
    win_lengths: LengthAcc,
    loss_lengths: LengthAcc,
    draw_lengths: LengthAcc,
    months: Ordered<MonthAcc>,
    ratings: Vec<RatingPoint>,
    openings: Ordered<OpeningAcc>,
    opponents: Ordered<OpponentAcc>,
}

/// The user's outcome, seen from White when `is_white` and from Black otherwise.
fn outcome_for(result: GameResult, is_white: bool) -> Option<Outcome> {
    match (result, is_white) {
        (GameResult::WhiteWins, true) | (GameResult::BlackWins, false) => Some(Outcome::Win),
        (GameResult::WhiteWins, false) | (GameResult::BlackWins, true) => Some(Outcome::Loss),
        (GameResult::Draw, _) => Some(Outcome::Draw),
        (GameResult::Ongoing, _) => None,
    }
}

fn parse_int(s: &str) -> i32 {
    s.trim().parse::<i32>().unwrap_or(0)
}

impl Accumulator {
    fn add_game(&mut self, game: &GameRecord, username: &str) {
        let category = classify(&game.time_control);
        *self.game_types.entry(category).or_insert(0) += 1;

        // Conflicts with a plain `white == username` test, which would count a
        // game the user is absent from as Black. Such games count as White.
        let is_white = game.white == username || game.black != username;
        let outcome = outcome_for(game.result, is_white);

        if let Some(o) = outcome {
            self.results.add(o);
            let side = if is_white { &mut self.colors.white } else { &mut self.colors.black };
            side.add(o);
            self.bump_streaks(o);
        }

        let length = game.moves.len();
        self.game_lengths.push(GameLength { length, result: game.result });
        if length > 0 {
            match outcome {
                Some(Outcome::Win) => self.win_lengths.add(length),
                Some(Outcome::Loss) => self.loss_lengths.add(length),
                Some(Outcome::Draw) => self.draw_lengths.add(length),
                None => {}
            }
        }

        let won = outcome == Some(Outcome::Win);
        let (elo, diff) = if is_white {
            (&game.white_elo, &game.white_rating_diff)
        } else {
            (&game.black_elo, &game.black_rating_diff)
        };

        let month = game.date.format("%Y-%m").to_string();
        let m = self.months.entry_or_insert_with(&month, MonthAcc::default);
        m.games += 1;
        if won {
            m.wins += 1;
            m.rating_change += i64::from(parse_int(diff));
        }

        self.ratings.push(RatingPoint {
            date: game.date,
            rating: parse_int(elo),
            game_type: category,
        });

        let name = match game.opening.trim() {
            "" => UNKNOWN_OPENING,
            name => name,
        };
        let op = self.openings.entry_or_insert_with(name, OpeningAcc::default);
        op.count += 1;
        if let Some(o) = outcome {
            op.tally.add(o);
        }

        let opponent = if is_white { &game.black } else { &game.white };
        if opponent != ANONYMOUS {
            let h2h = self.opponents.entry_or_insert_with(opponent, || OpponentAcc {
                tally: Tally::default(),
                last_played: game.date,
            });
            if let Some(o) = outcome {
                h2h.tally.add(o);
            }
            h2h.last_played = h2h.last_played.max(game.date);
        }
    }

    fn bump_streaks(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => {
                self.current_win += 1;
                self.current_loss = 0;
                self.current_draw = 0;
            }
            Outcome::Loss => {
                self.current_loss += 1;
                self.current_win = 0;
                self.current_draw = 0;
            }
            Outcome::Draw => {
                self.current_draw += 1;
                self.current_win = 0;
                self.current_loss = 0;
            }
        }
        self.streaks.win_streak = self.streaks.win_streak.max(self.current_win);
        self.streaks.loss_streak = self.streaks.loss_streak.max(self.current_loss);
        self.streaks.draw_streak = self.streaks.draw_streak.max(self.current_draw);
    }

    fn finish(self) -> AnalysisStats {
        let mut monthly_performance: Vec<MonthlyPerformance> = self
            .months
            .entries
            .into_iter()
            .map(|(month, m)| MonthlyPerformance {
                month,
                games: m.games,
                wins: m.wins,
                win_rate: win_rate(m.wins, m.games),
                rating_change: m.rating_change,
            })
            .collect();
        monthly_performance.sort_by(|a, b| a.month.cmp(&b.month));

        let mut openings: Vec<OpeningStats> = self
            .openings
            .entries
            .into_iter()
            .map(|(name, o)| OpeningStats {
                name,
                count: o.count,
                wins: o.tally.wins,
                losses: o.tally.losses,
                draws: o.tally.draws,
                win_rate: win_rate(o.tally.wins, o.count),
            })
            .collect();
        openings.sort_by_key(|o| std::cmp::Reverse(o.count));

        let mut head_to_head: Vec<HeadToHead> = self
            .opponents
            .entries
            .into_iter()
            .map(|(opponent, h)| {
                let games = h.tally.decided();
                HeadToHead {
                    opponent,
                    games,
                    wins: h.tally.wins,
                    losses: h.tally.losses,
                    draws: h.tally.draws,
                    win_rate: win_rate(h.tally.wins, games),
                    last_played: h.last_played,
                }
            })
            .collect();
        head_to_head.sort_by_key(|h| std::cmp::Reverse(h.games));

        let mut rating_progression = self.ratings;
        rating_progression.sort_by_key(|r| r.date);

        let mut peak_ratings: BTreeMap<Category, i32> = BTreeMap::new();
        for point in &rating_progression {
            peak_ratings
                .entry(point.game_type)
                .and_modify(|peak| *peak = (*peak).max(point.rating))
                .or_insert(point.rating);
        }

        AnalysisStats {
            game_types: self.game_types,
            results: self.results,
            streaks: self.streaks,
            game_lengths: self.game_lengths,
            openings,
            monthly_performance,
            rating_progression,
            head_to_head,
            result_distribution: ResultDistribution {
                wins: self.win_lengths.summary(),
                losses: self.loss_lengths.summary(),
                draws: self.draw_lengths.summary(),
            },
            color_stats: self.colors,
            peak_ratings,
        }
    }
}

/// Fold the games, in the order given, into the full report for `username`.
pub fn analyze(games: &[GameRecord], username: &str) -> AnalysisStats {
    let mut acc = Accumulator::default();
    for game in games {
        acc.add_game(game, username);
    }
    acc.finish()
}

/// Optional CSV writer for the opening table.
pub fn write_openings_csv(openings: &[OpeningStats], out_path: &Path) -> io::Result<()> {
    let mut f = File::create(out_path)?;
    writeln!(f, "name,count,wins,losses,draws,win_rate")?;
    for o in openings {
        writeln!(
            f,
            "{},{},{},{},{},{:.3}",
            escape_csv(&o.name),
            o.count,
            o.wins,
            o.losses,
            o.draws,
            o.win_rate
        )?;
    }
    Ok(())
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
