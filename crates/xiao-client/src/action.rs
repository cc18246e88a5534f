//! Action enum: everything the user can ask for from the console.

use anyhow::{bail, Context};

use xiao_proto::protocol::{PlayMode, FAVORITE_DIR, HISTORY_DIR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ── Browsing ─────────────────────────────────────────────────────────────
    ListCurrent,
    OpenDirectory(String),
    /// Server-side search in the current directory.
    Search(String),
    /// Local filter over the listed files.
    Filter(String),
    /// 0-based row of the visible list.
    Select(usize),
    ToggleFavorite(usize),
    Crumb(usize),

    // ── Playback ─────────────────────────────────────────────────────────────
    Play,
    Stop,
    Next,
    Prev,
    ToggleSequence,
    ToggleShuffle,
    SetPlayMode(PlayMode),
    Volume(u8),

    // ── Chat / preferences ───────────────────────────────────────────────────
    Chat(String),
    ToggleTheme,
    SpeakQuery(bool),
    SpeakAnswer(bool),

    // ── System ───────────────────────────────────────────────────────────────
    Help,
    Quit,
    Noop,
}

pub const HELP: &str = "\
/ls                  list the current directory
/cd DIR              open a directory (music/...)
/history, /fav-list  recently played / favorites
/find TERM           search the current directory on the server
/filter TERM         filter the listed files
/sel N               play row N (opens it if it is a folder)
/play /stop          start / stop the speaker
/next /prev          skip
/seq /shuffle        toggle sequential / shuffled playback of the list
/mode single|loop    set the play mode
/vol N               set the speaker volume (0-100)
/fav N               toggle favorite on row N
/crumb N             jump to breadcrumb N
/theme               toggle dark mode
/speak-query on|off  speak the question on the speaker
/speak-answer on|off speak the answer on the speaker
/help /quit
anything else        chat with the assistant";

impl Action {
    /// Parse one input line. Row and crumb numbers are 1-based on input.
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Noop);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Self::Chat(line.to_string()));
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        let action = match name {
            "ls" => Self::ListCurrent,
            "cd" => Self::OpenDirectory(required(name, arg)?.to_string()),
            "history" => Self::OpenDirectory(HISTORY_DIR.to_string()),
            "fav-list" => Self::OpenDirectory(FAVORITE_DIR.to_string()),
            "find" => Self::Search(arg.to_lowercase()),
            "filter" => Self::Filter(arg.to_string()),
            "sel" => Self::Select(row(name, arg)?),
            "fav" => Self::ToggleFavorite(row(name, arg)?),
            "crumb" => Self::Crumb(row(name, arg)?),
            "play" => Self::Play,
            "stop" => Self::Stop,
            "next" => Self::Next,
            "prev" => Self::Prev,
            "seq" => Self::ToggleSequence,
            "shuffle" => Self::ToggleShuffle,
            "mode" => Self::SetPlayMode(PlayMode::from(required(name, arg)?.to_string())),
            "vol" => {
                let v: u8 = required(name, arg)?
                    .parse()
                    .with_context(|| format!("/vol: not a number: {}", arg))?;
                if v > 100 {
                    bail!("/vol: {} is out of range 0-100", v);
                }
                Self::Volume(v)
            }
            "theme" => Self::ToggleTheme,
            "speak-query" => Self::SpeakQuery(on_off(name, arg)?),
            "speak-answer" => Self::SpeakAnswer(on_off(name, arg)?),
            "help" => Self::Help,
            "quit" | "q" => Self::Quit,
            other => bail!("unknown command /{} (try /help)", other),
        };
        Ok(action)
    }
}

fn required<'a>(name: &str, arg: &'a str) -> anyhow::Result<&'a str> {
    if arg.is_empty() {
        bail!("/{} needs an argument", name);
    }
    Ok(arg)
}

fn row(name: &str, arg: &str) -> anyhow::Result<usize> {
    let n: usize = required(name, arg)?
        .parse()
        .with_context(|| format!("/{}: not a number: {}", name, arg))?;
    if n == 0 {
        bail!("/{}: rows start at 1", name);
    }
    Ok(n - 1)
}

fn on_off(name: &str, arg: &str) -> anyhow::Result<bool> {
    match arg {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => bail!("/{} takes on or off", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            Action::parse("  what's the weather  ").unwrap(),
            Action::Chat("what's the weather".into())
        );
        assert_eq!(Action::parse("   ").unwrap(), Action::Noop);
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            Action::parse("/cd music/jazz").unwrap(),
            Action::OpenDirectory("music/jazz".into())
        );
        assert_eq!(
            Action::parse("/history").unwrap(),
            Action::OpenDirectory("history".into())
        );
        assert_eq!(Action::parse("/sel 3").unwrap(), Action::Select(2));
        assert_eq!(Action::parse("/vol 35").unwrap(), Action::Volume(35));
        assert_eq!(
            Action::parse("/mode loop").unwrap(),
            Action::SetPlayMode(PlayMode::Loop)
        );
        assert_eq!(
            Action::parse("/find Miles DAVIS").unwrap(),
            Action::Search("miles davis".into())
        );
        assert_eq!(
            Action::parse("/speak-answer on").unwrap(),
            Action::SpeakAnswer(true)
        );
    }

    #[test]
    fn test_bad_commands() {
        assert!(Action::parse("/sel 0").is_err());
        assert!(Action::parse("/sel x").is_err());
        assert!(Action::parse("/vol 101").is_err());
        assert!(Action::parse("/cd").is_err());
        assert!(Action::parse("/speak-query maybe").is_err());
        assert!(Action::parse("/nope").is_err());
    }
}
