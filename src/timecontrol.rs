use std::fmt;

use serde::Serialize;

/// Coarse speed bucket derived from a `TimeControl` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Bullet,
    Blitz,
    Rapid,
    Classical,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bullet => "Bullet",
            Category::Blitz => "Blitz",
            Category::Rapid => "Rapid",
            Category::Classical => "Classical",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket a raw descriptor like "180+2" by its base time in seconds.
/// The increment is ignored; anything unparseable is Classical.
pub fn classify(time_control: &str) -> Category {
    let tc = time_control.trim();
    if tc.is_empty() || tc == "unlimited" {
        return Category::Classical;
    }
    let base = tc.split('+').next().unwrap_or("");
    match base.trim().parse::<i64>() {
        Ok(secs) if secs < 180 => Category::Bullet,
        Ok(secs) if secs <= 480 => Category::Blitz,
        Ok(secs) if secs <= 1500 => Category::Rapid,
        _ => Category::Classical,
    }
}
