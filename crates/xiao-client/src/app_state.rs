//! AppState: everything the console loop owns besides the player.
//!
//! Only the App event loop writes to it; chat tasks reach it through
//! `AppMessage`s.

use std::io;
use std::path::PathBuf;

use tracing::{info, warn};
use xiao_proto::prefs::Prefs;

use crate::breadcrumb::CrumbTable;
use crate::chat::SpeakOptions;
use crate::console::{ChatPane, LiveBlock};
use crate::player::PlayerState;
use crate::theme::{self, Palette};

pub struct AppState {
    pub chat: ChatPane<io::Stdout>,
    pub prefs: Prefs,
    pub prefs_path: PathBuf,
    pub crumbs: CrumbTable,
}

impl AppState {
    pub fn new(prefs_path: PathBuf, player: &PlayerState) -> Self {
        let prefs = Prefs::load(&prefs_path);
        info!(
            "prefs: dark_mode={} play_query={} play_answer={}",
            prefs.dark_mode, prefs.play_query, prefs.play_answer
        );
        Self {
            chat: ChatPane::new(LiveBlock::stdout(theme::palette(prefs.dark_mode))),
            prefs,
            prefs_path,
            crumbs: CrumbTable::new(&player.current_dir),
        }
    }

    pub fn palette(&self) -> Palette {
        theme::palette(self.prefs.dark_mode)
    }

    pub fn speak_options(&self) -> SpeakOptions {
        SpeakOptions {
            play_query: self.prefs.play_query,
            play_answer: self.prefs.play_answer,
        }
    }

    pub fn save_prefs(&self) {
        if let Err(e) = self.prefs.save(&self.prefs_path) {
            warn!("prefs: save to {} failed: {:#}", self.prefs_path.display(), e);
        }
    }

    /// Follow the player: rebuild the trail and park it while the list is
    /// locked.
    pub fn sync_crumbs(&mut self, player: &PlayerState) {
        if player.list_locked() {
            self.crumbs.disable();
        } else {
            self.crumbs.enable();
        }
        self.crumbs.rebuild(&player.current_dir);
    }
}
