//! Music browser and speaker player.

pub mod api;
pub mod push;
pub mod state;

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

pub use api::PlayerApi;
pub use state::{Effect, PlayerMsg, PlayerState, SnapshotScope};

/// Owns the player state and runs its effects against the backend. A
/// message is applied, each resulting effect is executed in order, and any
/// result message is queued behind it until nothing is left.
pub struct PlayerController<R: Rng = StdRng> {
    state: PlayerState,
    api: PlayerApi,
    rng: R,
}

impl PlayerController<StdRng> {
    pub fn new(api: PlayerApi) -> Self {
        Self::with_rng(api, StdRng::from_entropy())
    }
}

impl<R: Rng> PlayerController<R> {
    pub fn with_rng(api: PlayerApi, rng: R) -> Self {
        Self {
            state: PlayerState::default(),
            api,
            rng,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Fetch the last server-side state and the speaker volume.
    pub async fn startup(&mut self) {
        let snapshot = match self.api.last_state().await {
            Ok(snap) => {
                info!("player: restored state in {}", snap.current_music_dir);
                Some(snap)
            }
            Err(e) => {
                warn!("player: could not load last state: {:#}", e);
                None
            }
        };
        self.dispatch(PlayerMsg::Restore(snapshot)).await;

        match self.api.get_volume().await {
            Ok(v) => self.dispatch(PlayerMsg::VolumeLoaded(v)).await,
            Err(e) => warn!("player: could not load volume: {:#}", e),
        }
    }

    pub async fn dispatch(&mut self, msg: PlayerMsg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = state.apply(msg, &mut self.rng);
            self.state = state;
            for effect in effects {
                if let Some(follow_up) = self.execute(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&self, effect: Effect) -> Option<PlayerMsg> {
        match effect {
            Effect::FetchList { dir, filter } => {
                match self.api.list(&dir, filter.as_deref()).await {
                    Ok(files) => {
                        info!("player: {} entries in {}", files.len(), dir);
                        Some(PlayerMsg::Listed(files))
                    }
                    Err(e) => {
                        warn!("player: listing {} failed: {:#}", dir, e);
                        None
                    }
                }
            }
            Effect::SendPlayState(snapshot) => {
                if let Err(e) = self.api.send_play_state(&snapshot).await {
                    warn!("player: sending play state failed: {:#}", e);
                }
                None
            }
            Effect::Play => Some(PlayerMsg::PlayResult(ok_or_log(
                "play",
                self.api.play().await,
            ))),
            Effect::Stop => Some(PlayerMsg::StopResult(ok_or_log(
                "stop",
                self.api.stop().await,
            ))),
            Effect::Skip(value) => {
                ok_or_log("skip", self.api.skip(value).await);
                None
            }
            Effect::SetPlayMode(mode) => {
                let ok = ok_or_log("play mode", self.api.set_play_mode(&mode).await);
                Some(PlayerMsg::PlayModeResult { mode, ok })
            }
            Effect::SetVolume(requested) => {
                let accepted = match self.api.set_volume(requested).await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("player: volume failed: {:#}", e);
                        false
                    }
                };
                Some(PlayerMsg::VolumeResult {
                    requested,
                    accepted,
                })
            }
            Effect::SaveFavorite(item) => {
                ok_or_log("favorite", self.api.save_favorite(&item).await);
                None
            }
        }
    }
}

fn ok_or_log(what: &str, result: anyhow::Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("player: {} failed: {:#}", what, e);
            false
        }
    }
}
