use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// The boolean UI preferences that survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Prefs {
    #[serde(default)]
    pub dark_mode: bool,
    /// Ask the speaker to read the question aloud.
    #[serde(default)]
    pub play_query: bool,
    /// Ask the speaker to read the answer aloud.
    #[serde(default)]
    pub play_answer: bool,
}

impl Prefs {
    /// Missing or unreadable files fall back to defaults.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("prefs: ignoring corrupt {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
