//! App: the console event loop.
//!
//! One task owns all state. Input lines, chat render events and push events
//! arrive over channels and are handled one at a time; chat requests run on
//! their own tasks and only ever send messages back.

use anyhow::Result;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use xiao_proto::config::Config;

use crate::action::{Action, HELP};
use crate::app_state::AppState;
use crate::chat::{ChatClient, ChatError, ChatReply, LineMode, MessageId, MessageSurface};
use crate::player::push::{self, PushEvent, ReconnectPolicy};
use crate::player::{PlayerApi, PlayerController, PlayerMsg};
use crate::theme::{paint, Paint};

const PUSH_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum AppMessage {
    Input(String),
    InputClosed,
    /// New full rendering of an in-flight bot message.
    ChatRender { id: MessageId, fragment: String },
    ChatFinished {
        id: MessageId,
        result: Result<ChatReply, ChatError>,
    },
}

/// Surface handed to a chat task: every update becomes an `AppMessage`.
struct EventSurface {
    id: MessageId,
    tx: mpsc::UnboundedSender<AppMessage>,
}

impl MessageSurface for EventSurface {
    fn replace_content(&mut self, fragment: &str) {
        let _ = self.tx.send(AppMessage::ChatRender {
            id: self.id,
            fragment: fragment.to_string(),
        });
    }
}

pub struct App {
    state: AppState,
    player: PlayerController,
    chat: ChatClient,
    push_url: Url,
    push_policy: ReconnectPolicy,
    tx: mpsc::UnboundedSender<AppMessage>,
    rx: Option<mpsc::UnboundedReceiver<AppMessage>>,
    chat_cancel: Option<CancellationToken>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base = &config.server.base_url;
        let player = PlayerController::new(PlayerApi::new(client.clone(), base)?);
        let chat = ChatClient::new(
            client,
            base,
            LineMode::from_config(config.chat.buffer_partial_lines),
        )?;
        let push_url = push::push_url(base, &config.push.path)?;
        let state = AppState::new(config.paths.prefs_file.clone(), player.state());
        let (tx, rx) = mpsc::unbounded_channel();

        Ok(Self {
            state,
            player,
            chat,
            push_url,
            push_policy: ReconnectPolicy::from_config(&config.push),
            tx,
            rx: Some(rx),
            chat_cancel: None,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        let Some(mut rx) = self.rx.take() else {
            anyhow::bail!("app loop already ran");
        };

        let input_tx = self.tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if input_tx.send(AppMessage::Input(line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("input: {}", e);
                        break;
                    }
                }
            }
            let _ = input_tx.send(AppMessage::InputClosed);
        });

        let (push_tx, mut push_rx) = mpsc::channel(PUSH_CHANNEL_CAPACITY);
        let push_task = push::spawn(self.push_url.clone(), self.push_policy.clone(), push_tx);

        self.player.startup().await;
        self.state.sync_crumbs(self.player.state());
        self.print_status();
        self.print_list();
        self.say(Paint::Secondary, "type /help for commands");

        loop {
            tokio::select! {
                Some(msg) = rx.recv() => {
                    if !self.handle_message(msg).await {
                        break;
                    }
                }
                Some(event) = push_rx.recv() => {
                    self.handle_push(event).await;
                }
            }
        }

        if let Some(token) = self.chat_cancel.take() {
            token.cancel();
        }
        push_task.abort();
        info!("xiao: bye");
        Ok(())
    }

    /// Returns `false` to quit.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Input(line) => match Action::parse(&line) {
                Ok(action) => return self.handle_action(action).await,
                Err(e) => self.say(Paint::Error, &e.to_string()),
            },
            AppMessage::InputClosed => return false,
            AppMessage::ChatRender { id, fragment } => {
                if !self.state.chat.render(id, &fragment) {
                    debug!("chat: dropping update for closed message {:?}", id);
                }
            }
            AppMessage::ChatFinished { id, result } => self.finish_chat(id, result),
        }
        true
    }

    async fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::ListCurrent => self.print_list(),
            Action::OpenDirectory(dir) => {
                self.player_msg(PlayerMsg::OpenDirectory { dir, filter: None })
                    .await;
                self.print_list();
            }
            Action::Search(term) => {
                self.player_msg(PlayerMsg::SubmitSearch(term)).await;
                self.print_list();
            }
            Action::Filter(term) => {
                self.player_msg(PlayerMsg::FilterLocal(term)).await;
                self.print_list();
            }
            Action::Select(i) => {
                let was_dir = self.player.state().filtered.get(i).is_some_and(|f| f.is_dir);
                self.player_msg(PlayerMsg::Activate(i)).await;
                if was_dir {
                    self.print_list();
                } else {
                    self.print_status();
                }
            }
            Action::ToggleFavorite(i) => {
                self.player_msg(PlayerMsg::ToggleFavorite(i)).await;
                self.print_list();
            }
            Action::Crumb(i) => match self.state.crumbs.dispatch(i) {
                Some(Action::OpenDirectory(dir)) => {
                    self.player_msg(PlayerMsg::OpenDirectory { dir, filter: None })
                        .await;
                    self.print_list();
                }
                Some(other) => debug!("crumb: unexpected binding {:?}", other),
                None if self.state.crumbs.is_disabled() => {
                    self.say(Paint::Secondary, "the list is locked while /seq or /shuffle is on")
                }
                None => self.say(Paint::Error, "no such breadcrumb"),
            },
            Action::Play => self.player_status_msg(PlayerMsg::Play).await,
            Action::Stop => self.player_status_msg(PlayerMsg::Stop).await,
            Action::Next => self.player_status_msg(PlayerMsg::Next).await,
            Action::Prev => self.player_status_msg(PlayerMsg::Previous).await,
            Action::ToggleSequence => self.player_status_msg(PlayerMsg::ToggleSequence).await,
            Action::ToggleShuffle => self.player_status_msg(PlayerMsg::ToggleShuffle).await,
            Action::SetPlayMode(mode) => {
                self.player_status_msg(PlayerMsg::SetPlayMode(mode)).await
            }
            Action::Volume(v) => self.player_status_msg(PlayerMsg::SetVolume(v)).await,
            Action::Chat(text) => self.start_chat(text),
            Action::ToggleTheme => {
                self.state.prefs.dark_mode = !self.state.prefs.dark_mode;
                self.state.save_prefs();
                let palette = self.state.palette();
                self.state.chat.set_palette(palette);
                let name = if self.state.prefs.dark_mode { "dark" } else { "light" };
                self.say(Paint::Accent, &format!("theme: {}", name));
            }
            Action::SpeakQuery(on) => {
                self.state.prefs.play_query = on;
                self.state.save_prefs();
                self.say(Paint::Secondary, &format!("speak question: {}", on_off(on)));
            }
            Action::SpeakAnswer(on) => {
                self.state.prefs.play_answer = on;
                self.state.save_prefs();
                self.say(Paint::Secondary, &format!("speak answer: {}", on_off(on)));
            }
            Action::Help => println!("{}", HELP),
            Action::Quit => return false,
            Action::Noop => {}
        }
        true
    }

    async fn player_msg(&mut self, msg: PlayerMsg) {
        self.player.dispatch(msg).await;
        self.state.sync_crumbs(self.player.state());
    }

    async fn player_status_msg(&mut self, msg: PlayerMsg) {
        self.player_msg(msg).await;
        self.print_status();
    }

    async fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Connected => info!("push: live"),
            PushEvent::Disconnected => debug!("push: down"),
            PushEvent::GaveUp => self.say(
                Paint::Error,
                "lost the connection to the player; now-playing updates stopped",
            ),
            PushEvent::Message(m) => {
                self.player_msg(PlayerMsg::Push(m)).await;
                self.print_status();
            }
        }
    }

    // ── Chat ─────────────────────────────────────────────────────────────────

    fn start_chat(&mut self, text: String) {
        if let Some(previous) = self.chat_cancel.take() {
            info!("chat: cancelling previous request");
            previous.cancel();
        }

        let id = self.state.chat.begin(&text);

        let token = CancellationToken::new();
        self.chat_cancel = Some(token.clone());
        let client = self.chat.clone();
        let opts = self.state.speak_options();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let mut surface = EventSurface { id, tx: tx.clone() };
            let result = client.ask(&text, opts, &mut surface, &token).await;
            let _ = tx.send(AppMessage::ChatFinished { id, result });
        });
    }

    fn finish_chat(&mut self, id: MessageId, result: Result<ChatReply, ChatError>) {
        let closed = self.state.chat.finish(id);
        if closed {
            self.chat_cancel = None;
        }
        match result {
            Ok(reply) => debug!(
                "chat: answer {:?} done ({} chars, streamed={})",
                id,
                reply.text.chars().count(),
                reply.streamed
            ),
            Err(ChatError::Cancelled) => debug!("chat: answer {:?} cancelled", id),
            // Already shown in place of the answer.
            Err(e) => debug!("chat: answer {:?} failed: {}", id, e),
        }
    }

    // ── Output ───────────────────────────────────────────────────────────────

    fn say(&mut self, role: Paint, text: &str) {
        self.state.chat.detach();
        println!("{}", paint(&self.state.palette(), role, text));
    }

    fn print_status(&mut self) {
        self.state.chat.detach();
        let p = self.player.state();
        let palette = self.state.palette();
        let playing = match (&p.now_playing, p.is_playing) {
            (Some(name), true) => paint(&palette, Paint::Playing, &format!("▶ {}", name)),
            (Some(name), false) => paint(&palette, Paint::Primary, name),
            (None, _) => paint(&palette, Paint::Secondary, "no music selected"),
        };
        let volume = if p.volume.is_pending() {
            format!("{}%…", p.volume.intended())
        } else {
            format!("{}%", p.volume.intended())
        };
        let mut flags = vec![format!("mode {}", p.play_mode), format!("vol {}", volume)];
        if p.sequence {
            flags.push("sequence".to_string());
        }
        if p.shuffle {
            flags.push("shuffle".to_string());
        }
        println!(
            "{}  {}",
            playing,
            paint(&palette, Paint::Secondary, &format!("[{}]", flags.join(", ")))
        );
    }

    fn print_list(&mut self) {
        self.state.chat.detach();
        let p = self.player.state();
        let palette = self.state.palette();

        let trail = self
            .state
            .crumbs
            .crumbs()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}:{}", i + 1, c.label))
            .collect::<Vec<_>>()
            .join(" / ");
        let trail_paint = if self.state.crumbs.is_disabled() {
            Paint::Secondary
        } else {
            Paint::Accent
        };
        println!("{}", paint(&palette, trail_paint, &trail));

        if p.filtered.is_empty() {
            println!("{}", paint(&palette, Paint::Secondary, "  (no music here)"));
            return;
        }
        for (i, item) in p.filtered.iter().enumerate() {
            let marker = if p.current_index == Some(i) { ">" } else { " " };
            let name = if item.is_dir {
                format!("{}/", item.name.trim_end_matches('/'))
            } else {
                item.name.clone()
            };
            let star = if item.is_dir {
                ""
            } else if item.is_fav {
                " ★"
            } else {
                " ☆"
            };
            let role = if p.current_index == Some(i) {
                Paint::Playing
            } else if item.is_dir {
                Paint::Accent
            } else {
                Paint::Primary
            };
            println!(
                "{} {:>3} {}{}",
                marker,
                i + 1,
                paint(&palette, role, &name),
                paint(&palette, Paint::Secondary, star)
            );
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}
