use serde::{Deserialize, Deserializer, Serialize};

/// Push-channel payload announcing that the server's play queue ran out.
pub const QUEUE_END_SENTINEL: &str = "-end-";

/// Virtual directories understood by `/music/list`; they never become the
/// current directory.
pub const HISTORY_DIR: &str = "history";
pub const FAVORITE_DIR: &str = "favorite";
/// Root of the music library as the backend names it.
pub const MUSIC_ROOT: &str = "music";

/// One entry of a `/music/list` response (file or sub-directory).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileItem {
    pub name: String,
    /// Directory of the file relative to the library root.
    #[serde(default)]
    pub path: String,
    #[serde(rename = "isDir", default)]
    pub is_dir: bool,
    #[serde(rename = "isFav", default)]
    pub is_fav: bool,
}

/// Server-side auto-advance behaviour once a track ends.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayMode {
    #[default]
    Single,
    Loop,
    /// Any mode this client doesn't know about, kept verbatim.
    Other(String),
}

impl PlayMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Single => "single",
            Self::Loop => "loop",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for PlayMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            // A fresh backend reports "" before anyone picked a mode.
            "" | "single" => Self::Single,
            "loop" => Self::Loop,
            _ => Self::Other(s),
        }
    }
}

impl From<PlayMode> for String {
    fn from(mode: PlayMode) -> Self {
        mode.as_str().to_string()
    }
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The player state as exchanged with `/player/last` and `/player/src`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filtered_music_files: Vec<FileItem>,
    /// `-1` when nothing is selected.
    #[serde(default = "no_index")]
    pub current_playing_index: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_music_dir: String,
    #[serde(default)]
    pub play_mode: PlayMode,
    #[serde(default)]
    pub is_sequence_playing: bool,
    #[serde(default)]
    pub is_random_playing: bool,
}

impl Default for PlaySnapshot {
    fn default() -> Self {
        Self {
            filtered_music_files: Vec::new(),
            current_playing_index: no_index(),
            current_music_dir: String::new(),
            play_mode: PlayMode::default(),
            is_sequence_playing: false,
            is_random_playing: false,
        }
    }
}

impl PlaySnapshot {
    pub fn current_index(&self) -> Option<usize> {
        usize::try_from(self.current_playing_index).ok()
    }
}

fn no_index() -> i64 {
    -1
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reply of `/player/set_volume` and `/player/get_volume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStatus {
    /// Speaker volume in percent; `-1` when the speaker could not be read.
    pub volume: i64,
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Speak the question on the speaker.
    pub play_query: bool,
    /// Speak the answer on the speaker.
    pub play_answer: bool,
    pub stream: bool,
}

impl ChatRequest {
    /// Streaming is only requested when nothing has to be spoken: the backend
    /// synthesizes audio from the complete answer.
    pub fn new(message: impl Into<String>, play_query: bool, play_answer: bool) -> Self {
        Self {
            message: message.into(),
            play_query,
            play_answer,
            stream: !play_query && !play_answer,
        }
    }
}

/// A message received on the push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    /// The server's play queue is exhausted.
    QueueEnded,
    /// Name of the track that just started.
    NowPlaying(String),
}

impl PushMessage {
    pub fn parse(payload: &str) -> Self {
        if payload == QUEUE_END_SENTINEL {
            Self::QueueEnded
        } else {
            Self::NowPlaying(payload.to_string())
        }
    }
}
