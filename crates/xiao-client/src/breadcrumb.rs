//! Breadcrumb trail for the music browser.
//!
//! Every crumb is bound to an `Action::OpenDirectory`. While sequence or
//! shuffle playback owns the list, the bindings are parked and crumbs do
//! nothing; unlocking swaps the same bindings back in.

use xiao_proto::protocol::{FAVORITE_DIR, HISTORY_DIR};

use crate::action::Action;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub path: String,
}

/// `History`, `Favorites`, then one crumb per segment of `dir` carrying the
/// cumulative path.
pub fn crumbs(dir: &str) -> Vec<Crumb> {
    let mut out = vec![
        Crumb {
            label: "History".to_string(),
            path: HISTORY_DIR.to_string(),
        },
        Crumb {
            label: "Favorites".to_string(),
            path: FAVORITE_DIR.to_string(),
        },
    ];
    let mut path = String::new();
    for part in dir.split('/').filter(|p| !p.is_empty()) {
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(part);
        out.push(Crumb {
            label: part.to_string(),
            path: path.clone(),
        });
    }
    out
}

#[derive(Debug, Default)]
pub struct CrumbTable {
    crumbs: Vec<Crumb>,
    active: Vec<Action>,
    parked: Vec<Action>,
    disabled: bool,
}

impl CrumbTable {
    pub fn new(dir: &str) -> Self {
        let mut table = Self::default();
        table.rebuild(dir);
        table
    }

    pub fn rebuild(&mut self, dir: &str) {
        self.crumbs = crumbs(dir);
        let bindings = self
            .crumbs
            .iter()
            .map(|c| Action::OpenDirectory(c.path.clone()))
            .collect();
        if self.disabled {
            self.parked = bindings;
        } else {
            self.active = bindings;
        }
    }

    pub fn disable(&mut self) {
        if self.disabled {
            return;
        }
        self.disabled = true;
        self.parked = std::mem::take(&mut self.active);
    }

    pub fn enable(&mut self) {
        if !self.disabled {
            return;
        }
        self.disabled = false;
        self.active = std::mem::take(&mut self.parked);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// The action bound to crumb `idx`, if any and if enabled.
    pub fn dispatch(&self, idx: usize) -> Option<Action> {
        self.active.get(idx).cloned()
    }

    pub fn crumbs(&self) -> &[Crumb] {
        &self.crumbs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crumb_paths() {
        let c = crumbs("music/jazz/miles/");
        let paths: Vec<_> = c.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            ["history", "favorite", "music", "music/jazz", "music/jazz/miles"]
        );
        assert_eq!(c[3].label, "jazz");
        assert_eq!(crumbs("").len(), 2);
    }

    #[test]
    fn test_disable_and_restore_same_bindings() {
        let mut t = CrumbTable::new("music/jazz");
        assert_eq!(
            t.dispatch(3),
            Some(Action::OpenDirectory("music/jazz".into()))
        );
        t.disable();
        assert_eq!(t.dispatch(3), None);
        assert_eq!(t.dispatch(0), None);
        t.enable();
        assert_eq!(t.dispatch(0), Some(Action::OpenDirectory("history".into())));
        assert_eq!(
            t.dispatch(3),
            Some(Action::OpenDirectory("music/jazz".into()))
        );
    }

    #[test]
    fn test_rebuild_while_disabled_stays_parked() {
        let mut t = CrumbTable::new("music");
        t.disable();
        t.disable();
        t.rebuild("music/rock");
        assert_eq!(t.dispatch(3), None);
        assert_eq!(t.crumbs().len(), 4);
        t.enable();
        assert_eq!(
            t.dispatch(3),
            Some(Action::OpenDirectory("music/rock".into()))
        );
    }
}
