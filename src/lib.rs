//! PGN game-history analysis: parse concatenated PGN text into game records,
//! then fold them into per-user performance statistics.

pub mod analyzer;
pub mod date;
pub mod model;
pub mod pgn;
pub mod timecontrol;

pub use analyzer::analyze;
pub use model::{AnalysisStats, GameRecord, GameResult};
pub use pgn::parse;
pub use timecontrol::{classify, Category};
