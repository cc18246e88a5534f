//! Client-side mirror of the backend player.
//!
//! `PlayerState::apply` is a pure transition: it consumes the state and a
//! message and returns the new state plus the backend calls to make. Results
//! of those calls come back in as further messages.

use rand::Rng;
use tracing::debug;

use xiao_proto::protocol::{
    FileItem, PlayMode, PlaySnapshot, PushMessage, FAVORITE_DIR, HISTORY_DIR, MUSIC_ROOT,
};

use crate::intent::IntentState;

/// Volume shown before the speaker reports one.
pub const DEFAULT_VOLUME: u8 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub current_dir: String,
    /// Last listing from the backend.
    pub files: Vec<FileItem>,
    /// What is shown and what indices refer to.
    pub filtered: Vec<FileItem>,
    pub current_index: Option<usize>,
    pub play_mode: PlayMode,
    pub sequence: bool,
    pub shuffle: bool,
    pub is_playing: bool,
    pub now_playing: Option<String>,
    pub volume: IntentState<u8>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_dir: MUSIC_ROOT.to_string(),
            files: Vec::new(),
            filtered: Vec::new(),
            current_index: None,
            play_mode: PlayMode::default(),
            sequence: false,
            shuffle: false,
            is_playing: false,
            now_playing: None,
            volume: IntentState::new(DEFAULT_VOLUME),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerMsg {
    /// Result of `GET /player/last`; `None` when it failed.
    Restore(Option<PlaySnapshot>),
    OpenDirectory { dir: String, filter: Option<String> },
    Listed(Vec<FileItem>),
    FilterLocal(String),
    SubmitSearch(String),
    /// Open a folder row or select a file row.
    Activate(usize),
    Select(usize),
    Play,
    PlayResult(bool),
    Stop,
    StopResult(bool),
    Previous,
    Next,
    ToggleSequence,
    ToggleShuffle,
    SetPlayMode(PlayMode),
    PlayModeResult { mode: PlayMode, ok: bool },
    SetVolume(u8),
    VolumeResult { requested: u8, accepted: bool },
    /// Result of `GET /player/get_volume`; `-1` means unknown.
    VolumeLoaded(i64),
    ToggleFavorite(usize),
    Push(PushMessage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchList { dir: String, filter: Option<String> },
    SendPlayState(PlaySnapshot),
    Play,
    Stop,
    Skip(i32),
    SetPlayMode(PlayMode),
    SetVolume(u8),
    SaveFavorite(FileItem),
}

/// How much of the list goes into a snapshot sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotScope {
    /// The whole visible list.
    All,
    /// Only the selected item, at index 0.
    Current,
}

impl PlayerState {
    /// Sequence or shuffle playback owns the list; browsing is frozen.
    pub fn list_locked(&self) -> bool {
        self.sequence || self.shuffle
    }

    pub fn current_item(&self) -> Option<&FileItem> {
        self.current_index.and_then(|i| self.filtered.get(i))
    }

    pub fn snapshot(&self, scope: SnapshotScope) -> PlaySnapshot {
        let index = self.current_index.map_or(-1, |i| i as i64);
        let (files, index) = match scope {
            SnapshotScope::All => (self.filtered.clone(), index),
            SnapshotScope::Current => (self.current_item().cloned().into_iter().collect(), 0),
        };
        PlaySnapshot {
            filtered_music_files: files,
            current_playing_index: index,
            current_music_dir: self.current_dir.clone(),
            play_mode: self.play_mode.clone(),
            is_sequence_playing: self.sequence,
            is_random_playing: self.shuffle,
        }
    }

    pub fn apply<R: Rng>(mut self, msg: PlayerMsg, rng: &mut R) -> (Self, Vec<Effect>) {
        let mut fx = Vec::new();

        if self.list_locked() && is_list_bound(&msg) {
            debug!("player: list locked, ignoring {:?}", msg);
            return (self, fx);
        }

        match msg {
            PlayerMsg::Restore(snapshot) => {
                if let Some(snap) = snapshot {
                    self.current_index = snap.current_index();
                    self.files = snap.filtered_music_files;
                    self.filtered = self.files.clone();
                    self.play_mode = snap.play_mode;
                    self.sequence = snap.is_sequence_playing;
                    self.shuffle = snap.is_random_playing;
                    if !snap.current_music_dir.is_empty() {
                        self.current_dir = snap.current_music_dir;
                    }
                    self.now_playing = self.current_item().map(|f| f.name.clone());
                }
                match self.files.len() {
                    0 => self.open_directory(MUSIC_ROOT.to_string(), None, &mut fx),
                    1 => self.open_directory(self.current_dir.clone(), None, &mut fx),
                    _ => {}
                }
            }
            PlayerMsg::OpenDirectory { dir, filter } => self.open_directory(dir, filter, &mut fx),
            PlayerMsg::Listed(files) => {
                self.filtered = files.clone();
                self.files = files;
            }
            PlayerMsg::FilterLocal(term) => {
                let term = term.trim().to_lowercase();
                self.filtered = if term.is_empty() {
                    self.files.clone()
                } else {
                    self.files
                        .iter()
                        .filter(|f| f.name.to_lowercase().contains(&term))
                        .cloned()
                        .collect()
                };
            }
            PlayerMsg::SubmitSearch(term) => {
                let term = term.trim().to_lowercase();
                let filter = (!term.is_empty()).then_some(term);
                self.open_directory(self.current_dir.clone(), filter, &mut fx);
            }
            PlayerMsg::Activate(i) => match self.filtered.get(i) {
                Some(item) if item.is_dir => {
                    let dir = format!(
                        "{}/{}",
                        self.current_dir,
                        item.name.strip_suffix('/').unwrap_or(&item.name)
                    );
                    self.open_directory(dir, None, &mut fx);
                }
                Some(_) => self.select(i, &mut fx),
                None => {}
            },
            PlayerMsg::Select(i) => self.select(i, &mut fx),
            PlayerMsg::Play => self.play(&mut fx),
            PlayerMsg::PlayResult(ok) => {
                if ok {
                    self.is_playing = true;
                }
            }
            PlayerMsg::Stop => fx.push(Effect::Stop),
            PlayerMsg::StopResult(ok) => {
                if ok {
                    self.is_playing = false;
                    if self.sequence {
                        self.toggle_sequence(&mut fx);
                    }
                    if self.shuffle {
                        self.toggle_shuffle(rng, &mut fx);
                    }
                }
            }
            PlayerMsg::Previous => self.step(-1, &mut fx),
            PlayerMsg::Next => self.step(1, &mut fx),
            PlayerMsg::ToggleSequence => {
                if !self.shuffle {
                    self.toggle_sequence(&mut fx);
                }
            }
            PlayerMsg::ToggleShuffle => {
                if !self.sequence {
                    self.toggle_shuffle(rng, &mut fx);
                }
            }
            PlayerMsg::SetPlayMode(mode) => fx.push(Effect::SetPlayMode(mode)),
            PlayerMsg::PlayModeResult { mode, ok } => {
                if ok {
                    self.play_mode = mode;
                }
            }
            PlayerMsg::SetVolume(v) => {
                self.volume.set_intent(v);
                fx.push(Effect::SetVolume(v));
            }
            PlayerMsg::VolumeResult {
                requested,
                accepted,
            } => {
                if accepted {
                    self.volume.on_confirmed(requested);
                } else {
                    self.volume.reject();
                }
            }
            PlayerMsg::VolumeLoaded(v) => {
                if v > -1 {
                    let v = u8::try_from(v.min(100)).unwrap_or(DEFAULT_VOLUME);
                    self.volume = IntentState::new(v);
                }
            }
            PlayerMsg::ToggleFavorite(i) => {
                if let Some(item) = self.filtered.get_mut(i).filter(|f| !f.is_dir) {
                    item.is_fav = !item.is_fav;
                    let item = item.clone();
                    for f in self
                        .files
                        .iter_mut()
                        .filter(|f| f.name == item.name && f.path == item.path)
                    {
                        f.is_fav = item.is_fav;
                    }
                    fx.push(Effect::SaveFavorite(item));
                }
            }
            PlayerMsg::Push(PushMessage::QueueEnded) => {
                if self.sequence {
                    self.toggle_sequence(&mut fx);
                }
                if self.shuffle {
                    self.toggle_shuffle(rng, &mut fx);
                }
            }
            PlayerMsg::Push(PushMessage::NowPlaying(name)) => {
                self.now_playing = (!name.is_empty()).then_some(name);
            }
        }

        (self, fx)
    }

    fn open_directory(&mut self, dir: String, filter: Option<String>, fx: &mut Vec<Effect>) {
        if dir != HISTORY_DIR && dir != FAVORITE_DIR {
            self.current_dir = dir.strip_suffix('/').unwrap_or(&dir).to_string();
        }
        fx.push(Effect::FetchList { dir, filter });
    }

    fn select(&mut self, i: usize, fx: &mut Vec<Effect>) {
        match self.filtered.get(i) {
            Some(item) if !item.is_dir => {}
            _ => return,
        }
        self.current_index = Some(i);
        fx.push(Effect::SendPlayState(self.snapshot(SnapshotScope::Current)));
        self.play(fx);
    }

    fn play(&self, fx: &mut Vec<Effect>) {
        if self.current_item().is_some() {
            fx.push(Effect::Play);
        }
    }

    fn step(&mut self, delta: i32, fx: &mut Vec<Effect>) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        if self.list_locked() {
            fx.push(Effect::Skip(delta));
            return;
        }
        let next = match (self.current_index, delta < 0) {
            (Some(i), true) => (i % len + len - 1) % len,
            (Some(i), false) => (i + 1) % len,
            (None, true) => len - 1,
            (None, false) => 0,
        };
        self.select(next, fx);
    }

    fn toggle_sequence(&mut self, fx: &mut Vec<Effect>) {
        self.sequence = !self.sequence;
        if self.sequence {
            self.current_index = Some(0);
            fx.push(Effect::SendPlayState(self.snapshot(SnapshotScope::All)));
            self.play(fx);
        } else {
            // The backend keeps this snapshot for the next start; it must
            // still describe the list being browsed.
            fx.push(Effect::SendPlayState(self.snapshot(SnapshotScope::All)));
        }
    }

    fn toggle_shuffle<R: Rng>(&mut self, rng: &mut R, fx: &mut Vec<Effect>) {
        self.shuffle = !self.shuffle;
        if self.shuffle {
            let len = self.filtered.len();
            self.current_index = Some(if len == 0 { 0 } else { rng.gen_range(0..len) });
            fx.push(Effect::SendPlayState(self.snapshot(SnapshotScope::All)));
            self.play(fx);
        } else {
            // The backend keeps this snapshot for the next start; it must
            // still describe the list being browsed.
            fx.push(Effect::SendPlayState(self.snapshot(SnapshotScope::All)));
        }
    }
}

fn is_list_bound(msg: &PlayerMsg) -> bool {
    matches!(
        msg,
        PlayerMsg::OpenDirectory { .. }
            | PlayerMsg::FilterLocal(_)
            | PlayerMsg::SubmitSearch(_)
            | PlayerMsg::Activate(_)
            | PlayerMsg::Select(_)
            | PlayerMsg::ToggleFavorite(_)
    )
}
