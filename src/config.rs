use std::path::Path;

use log::warn;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub username: Option<String>,    // default self identity
    pub lichess_url: String,         // games-export API base
    pub rayon_threads: Option<usize>,
    pub top_openings: Option<usize>, // truncate printed opening list
    pub pretty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            lichess_url: "https://lichess.org".to_string(),
            rayon_threads: None,
            top_openings: None,
            pretty: false,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml(&s).unwrap_or_else(|e| {
                warn!("config: ignoring {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
