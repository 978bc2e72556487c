use std::collections::HashMap;
use std::fmt;
use std::io;
use std::ops::ControlFlow;

use chrono::{NaiveDate, Utc};
use log::{debug, warn};
use pgn_reader::{Reader, SanPlus, Skip, Visitor};
use rayon::prelude::*;
use shakmaty::san::San;

use crate::date::{has_date_content, parse_date};
use crate::model::{GameRecord, GameResult};

pub const UNKNOWN_OPENING: &str = "Unknown Opening";
pub const UNLIMITED: &str = "unlimited";

/// Why a game chunk was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    MissingHeader(&'static str),
    BadResult(String),
    MalformedHeader(String),
    HeaderAfterMoves,
    Movetext(String),
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::MissingHeader(tag) => write!(f, "missing {} header", tag),
            ChunkError::BadResult(v) => write!(f, "unrecognised result {:?}", v),
            ChunkError::MalformedHeader(line) => write!(f, "malformed header line {:?}", line),
            ChunkError::HeaderAfterMoves => f.write_str("header line inside move text"),
            ChunkError::Movetext(e) => write!(f, "unreadable move text: {}", e),
        }
    }
}

/// Split concatenated PGN text into per-game line groups. A new game starts
/// at a `[` line that follows a blank line.
pub fn split_games(text: &str) -> Vec<Vec<&str>> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut prev_blank = true;

    for line in text.lines() {
        let blank = line.trim().is_empty();
        if is_game_start(line, prev_blank) && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        // leading blank lines belong to nobody
        if !(blank && current.is_empty()) {
            current.push(line);
        }
        prev_blank = blank;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Consider a line that starts a new game.
pub fn is_game_start(line: &str, prev_blank: bool) -> bool {
    prev_blank && line.trim_start().starts_with('[')
}

/// Parse one `[Tag "Value"]` line. Returns None if the line is not shaped like one.
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if !(line.starts_with('[') && line.ends_with(']')) {
        return None;
    }
    let inner = &line[1..line.len() - 1];
    let space_idx = inner.find(char::is_whitespace)?;
    let tag = &inner[..space_idx];
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let rest = inner[space_idx..].trim();
    if rest.len() < 2 || !rest.starts_with('"') || !rest.ends_with('"') {
        return None;
    }
    let val = rest[1..rest.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\");
    Some((tag.to_string(), val))
}

/// Parse PGN headers from a game's leading lines into a map (Tag -> Value).
/// The first occurrence of a tag wins. Returns the index of the first
/// move-text line alongside the map.
pub fn parse_headers(game_lines: &[&str]) -> Result<(HashMap<String, String>, usize), ChunkError> {
    let mut map = HashMap::new();
    for (idx, line) in game_lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('[') {
            // beyond headers
            return Ok((map, idx));
        }
        let (tag, val) =
            parse_header_line(line).ok_or_else(|| ChunkError::MalformedHeader(line.to_string()))?;
        map.entry(tag).or_insert(val);
    }
    Ok((map, game_lines.len()))
}

/// Collects mainline SAN. Comments and NAGs never reach `san`; variations
/// are skipped wholesale.
#[derive(Default)]
struct MainlineVisitor {
    moves: Vec<String>,
}

impl Visitor for MainlineVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.moves.clear();
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(
        &mut self,
        _movetext: &mut Self::Movetext,
        san_plus: SanPlus,
    ) -> ControlFlow<Self::Output> {
        // null moves ("--", "Z0") are not plies
        if !matches!(san_plus.san, San::Null) {
            self.moves.push(san_plus.to_string());
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, _movetext: Self::Movetext) -> Self::Output {}
}

/// Extract the mainline SAN moves of one game's move text.
pub fn parse_movetext(text: &str) -> Result<Vec<String>, ChunkError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader::new(io::Cursor::new(text.as_bytes()));
    let mut visitor = MainlineVisitor::default();

    match reader.read_game(&mut visitor) {
        Ok(Some(())) => Ok(visitor.moves),
        Ok(None) => Err(ChunkError::Movetext("no game in move text".to_string())),
        Err(e) => Err(ChunkError::Movetext(e.to_string())),
    }
}

fn header_or(h: &HashMap<String, String>, tag: &str, default: &str) -> String {
    match h.get(tag).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

fn required(h: &HashMap<String, String>, tag: &'static str) -> Result<String, ChunkError> {
    match h.get(tag).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ChunkError::MissingHeader(tag)),
    }
}

/// Game date from Date (or UTCDate); `today` when neither carries anything usable.
pub fn date_from_headers(h: &HashMap<String, String>, today: NaiveDate) -> NaiveDate {
    ["Date", "UTCDate"]
        .iter()
        .filter_map(|tag| h.get(*tag))
        .find(|raw| has_date_content(raw))
        .map(|raw| parse_date(raw))
        .unwrap_or(today)
}

/// Turn one chunk into a record, or explain why it cannot be one.
pub fn parse_chunk(game_lines: &[&str], today: NaiveDate) -> Result<GameRecord, ChunkError> {
    let (h, body_start) = parse_headers(game_lines)?;

    let white = required(&h, "White")?;
    let black = required(&h, "Black")?;
    let result_raw = required(&h, "Result")?;
    let result = result_raw
        .parse::<GameResult>()
        .map_err(|_| ChunkError::BadResult(result_raw.clone()))?;

    let body = &game_lines[body_start..];
    // a tag line down here means two games were glued together
    if body.iter().any(|line| parse_header_line(line).is_some()) {
        return Err(ChunkError::HeaderAfterMoves);
    }
    let moves = parse_movetext(&body.join("\n"))?;

    Ok(GameRecord {
        time_control: header_or(&h, "TimeControl", UNLIMITED),
        result,
        white,
        black,
        opening: header_or(&h, "Opening", UNKNOWN_OPENING),
        date: date_from_headers(&h, today),
        white_elo: header_or(&h, "WhiteElo", "0"),
        black_elo: header_or(&h, "BlackElo", "0"),
        white_rating_diff: header_or(&h, "WhiteRatingDiff", "0"),
        black_rating_diff: header_or(&h, "BlackRatingDiff", "0"),
        moves,
    })
}

/// Parse concatenated PGN into game records sorted by date (stable, so
/// same-day games keep file order). Malformed chunks are logged and skipped.
pub fn parse(pgn_text: &str) -> Vec<GameRecord> {
    let text = pgn_text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chunks = split_games(text);
    let today = Utc::now().date_naive();
    let parsed: Vec<Result<GameRecord, ChunkError>> = chunks
        .par_iter()
        .map(|lines| parse_chunk(lines, today))
        .collect();

    let mut games = Vec::with_capacity(parsed.len());
    let mut dropped = 0usize;
    for (idx, res) in parsed.into_iter().enumerate() {
        match res {
            Ok(game) => games.push(game),
            Err(e) => {
                dropped += 1;
                warn!("pgn: dropping game #{}: {}", idx + 1, e);
            }
        }
    }
    games.sort_by_key(|g| g.date);
    debug!("pgn: parsed {} games, dropped {} chunks", games.len(), dropped);
    games
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    const GAME: &str = r#"[Event "Rated Blitz game"]
[Site "https://lichess.org/abcd1234"]
[Date "2023.03.05"]
[White "alice"]
[Black "bob"]
[Result "1-0"]
[WhiteElo "1500"]
[BlackElo "1480"]
[WhiteRatingDiff "+6"]
[BlackRatingDiff "-6"]
[TimeControl "180+2"]
[Opening "Italian Game"]

1. e4 { [%clk 0:03:00] } 1... e5 2. Nf3 Nc6 3. Bc4 Bc5 (3... Nf6 4. Ng5) 4. O-O $1 Nf6?! 5. d3 1-0
"#;

    #[test]
    fn test_parse_single_game() {
        let games = parse(GAME);
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!(g.white, "alice");
        assert_eq!(g.black, "bob");
        assert_eq!(g.result, GameResult::WhiteWins);
        assert_eq!(g.time_control, "180+2");
        assert_eq!(g.opening, "Italian Game");
        assert_eq!(g.date, NaiveDate::from_ymd_opt(2023, 3, 5).unwrap());
        assert_eq!(g.white_rating_diff, "+6");
        assert_eq!(g.moves, vec!["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "O-O", "Nf6", "d3"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\n\t\n").is_empty());
    }

    #[test]
    fn test_split_on_blank_line_before_header() {
        let text = "[White \"a\"]\n[Black \"b\"]\n[Result \"*\"]\n\n1. e4 *\n\n\n\
            [White \"c\"]\n[Black \"d\"]\n[Result \"*\"]\n\n1. d4 *\n";
        let chunks = split_games(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1][0], "[White \"c\"]");
    }

    #[test]
    fn test_split_handles_crlf_and_leading_blanks() {
        let text = "\r\n\r\n[White \"a\"]\r\n[Black \"b\"]\r\n[Result \"1-0\"]\r\n\r\n\
            1. e4 1-0\r\n\r\n\
            [White \"c\"]\r\n[Black \"d\"]\r\n[Result \"0-1\"]\r\n\r\n1. d4 0-1\r\n";
        let chunks = split_games(text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(parse(text).len(), 2);
    }

    #[test]
    fn test_missing_required_header_is_dropped() {
        let lines = ["[White \"a\"]", "[Black \"b\"]", "", "1. e4 e5 *"];
        assert_eq!(parse_chunk(&lines, today()), Err(ChunkError::MissingHeader("Result")));
        let lines = ["[White \"a\"]", "[Result \"1-0\"]", "", "1. e4 1-0"];
        assert_eq!(parse_chunk(&lines, today()), Err(ChunkError::MissingHeader("Black")));
    }

    #[test]
    fn test_unknown_result_is_dropped() {
        let lines = ["[White \"a\"]", "[Black \"b\"]", "[Result \"?\"]"];
        assert_eq!(parse_chunk(&lines, today()), Err(ChunkError::BadResult("?".to_string())));
    }

    #[test]
    fn test_defaults_applied() {
        let lines = ["[White \"a\"]", "[Black \"b\"]", "[Result \"1/2-1/2\"]", "[Opening \"  \"]"];
        let g = parse_chunk(&lines, today()).unwrap();
        assert_eq!(g.time_control, UNLIMITED);
        assert_eq!(g.opening, UNKNOWN_OPENING);
        assert_eq!(g.date, today());
        assert_eq!(g.white_elo, "0");
        assert_eq!(g.black_rating_diff, "0");
        assert!(g.moves.is_empty());
    }

    #[test]
    fn test_unknown_date_falls_back_to_today() {
        let lines = ["[White \"a\"]", "[Black \"b\"]", "[Result \"*\"]", "[Date \"????.??.??\"]"];
        assert_eq!(parse_chunk(&lines, today()).unwrap().date, today());
        let lines = [
            "[White \"a\"]",
            "[Black \"b\"]",
            "[Result \"*\"]",
            "[UTCDate \"2022.11.02\"]",
        ];
        assert_eq!(
            parse_chunk(&lines, today()).unwrap().date,
            NaiveDate::from_ymd_opt(2022, 11, 2).unwrap()
        );
    }

    #[test]
    fn test_header_line_shapes() {
        assert_eq!(
            parse_header_line(r#"[Event "Casual \"fun\" game"]"#),
            Some(("Event".to_string(), "Casual \"fun\" game".to_string()))
        );
        assert_eq!(parse_header_line("[Event]"), None);
        assert_eq!(parse_header_line("[Event \"open"), None);
        assert_eq!(parse_header_line("[ \"x\"]"), None);
    }

    #[test]
    fn test_malformed_header_drops_chunk() {
        let lines = ["[White \"a\"]", "[Black b]", "[Result \"1-0\"]"];
        assert!(matches!(parse_chunk(&lines, today()), Err(ChunkError::MalformedHeader(_))));
    }

    #[test]
    fn test_glued_games_are_dropped() {
        let lines = [
            "[White \"a\"]",
            "[Black \"b\"]",
            "[Result \"1-0\"]",
            "",
            "1. e4 e5",
            "[Event \"next\"]",
            "1-0",
        ];
        assert_eq!(parse_chunk(&lines, today()), Err(ChunkError::HeaderAfterMoves));
    }

    #[test]
    fn test_movetext_tokens() {
        let moves = parse_movetext(
            "1. e4 c5 2. Nf3 d6 3. d4 cxd4 4. Nxd4 Nf6 5. Nc3 a6 6. Be3 e5 7. Nb3 Be6 \
             8. f3 Be7 9. Qd2 O-O 10. O-O-O Nbd7 11. g4 b5 12. g5 b4 13. Ne2 Ne8 \
             14. f4 a5 15. f5 a4 16. Nbd4 exd4 17. Nxd4 b3 18. Kb1 bxc2+ 19. Nxc2 Bb3 \
             20. axb3 axb3 21. Na3 Rxa3 22. bxa3 Qa5 23. h4 Qxa3 24. h5 Qa2+ 25. Kc1 Qa1+ \
             26. Kd2 Qxd1+ 27. Rxd1 b2 28. e5 b1=Q 29. e6 Qb2+ 30. Ke1 Qb1+ 31. Kf2 Qxd1# 0-1",
        )
        .unwrap();
        assert_eq!(moves.len(), 62);
        assert_eq!(moves[0], "e4");
        assert_eq!(moves[2], "Nf3");
        assert_eq!(moves[4], "d4");
        assert!(moves.contains(&"O-O-O".to_string()));
        assert!(moves.contains(&"b1=Q".to_string()));
        assert_eq!(moves.last().map(String::as_str), Some("Qxd1#"));
    }

    #[test]
    fn test_en_passant_suffix_is_tolerated() {
        let moves = parse_movetext("1. e4 d5 2. e5 f5 3. exf6 e.p. 1-0").unwrap();
        assert_eq!(moves, vec!["e4", "d5", "e5", "f5", "exf6"]);
    }

    #[test]
    fn test_null_moves_are_not_counted() {
        let moves = parse_movetext("1. e4 Z0 2. d4 *").unwrap();
        assert_eq!(moves, vec!["e4", "d4"]);
        let moves = parse_movetext("1. e4 -- 2. d4 *").unwrap();
        assert_eq!(moves, vec!["e4", "d4"]);
    }

    #[test]
    fn test_comment_before_first_move() {
        let moves = parse_movetext("{ Blitz arena } 1. e4 { [%clk 0:03:00] } 1... e5 *").unwrap();
        assert_eq!(moves, vec!["e4", "e5"]);
    }

    #[test]
    fn test_lenient_movetext_keeps_the_game() {
        let text = "[White \"alice\"]\n[Black \"bob\"]\n[Result \"1-0\"]\n\n\
            1. e4 e5 2. Bc4 Nc6 3. Qh5 Nf6 4. Qxf7# +- 1-0\n\n\
            [White \"alice\"]\n[Black \"carol\"]\n[Result \"1-0\"]\n\n\
            1. e4 d5 2. e5 f5 3. exf6 e.p. 1-0\n\n\
            [White \"dave\"]\n[Black \"alice\"]\n[Result \"*\"]\n\n\
            1. e4 Z0 2. d4 *\n";
        let games = parse(text);
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].moves.last().map(String::as_str), Some("Qxf7#"));
        assert_eq!(games[1].moves.len(), 5);
        assert_eq!(games[2].moves, vec!["e4", "d4"]);
    }

    #[test]
    fn test_variations_and_nags_skipped() {
        let moves = parse_movetext("1. e4 $1 e5 (1... c5 2. Nf3) 2. Nf3!? Nc6 *").unwrap();
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn test_output_sorted_by_date_stable() {
        let text = "[White \"a\"]\n[Black \"b\"]\n[Result \"1-0\"]\n[Date \"2023.05.01\"]\n\n\
            1. e4 1-0\n\n\
            [White \"c\"]\n[Black \"d\"]\n[Result \"0-1\"]\n[Date \"2023.01.01\"]\n\n1. d4 0-1\n\n\
            [White \"e\"]\n[Black \"f\"]\n[Result \"*\"]\n[Date \"2023.05.01\"]\n\n1. c4 *\n";
        let games = parse(text);
        let whites: Vec<&str> = games.iter().map(|g| g.white.as_str()).collect();
        assert_eq!(whites, vec!["c", "a", "e"]);
    }

    #[test]
    fn test_bad_chunk_does_not_abort_the_rest() {
        let text = "[White \"a\"]\n[Black \"b\"]\n[Result \"1-0\"]\n\n1. e4\n[Event \"x\"]\n1-0\n\n\
[White \"c\"]\n[Black \"d\"]\n[Result \"0-1\"]\n\n1. d4 0-1\n";
        let games = parse(text);
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].white, "c");
    }
}
