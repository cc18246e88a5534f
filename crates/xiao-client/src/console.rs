//! Live terminal output for chat answers.
//!
//! A streamed answer is shown as one block of lines at the bottom of the
//! terminal. Every update moves the cursor back to the top of the block,
//! clears to the end of the screen and prints the new rendering, so the block
//! grows in place instead of repeating. Anything else printed below the block
//! detaches it: the next update starts a fresh block.

use std::io::{self, Write};
use std::sync::OnceLock;

use crossterm::cursor::MoveToPreviousLine;
use crossterm::queue;
use crossterm::terminal::{self, Clear, ClearType};
use regex::Regex;
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::chat::{MessageId, MessageSurface, Transcript};
use crate::theme::{paint, render_markup, Paint, Palette};

/// Shown in the answer block until the first fragment arrives.
pub const LOADING_TEXT: &str = "…";

const FALLBACK_WIDTH: u16 = 80;

fn style_re() -> &'static Regex {
    static STYLE: OnceLock<Regex> = OnceLock::new();
    STYLE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("static regex"))
}

/// Terminal rows `text` takes up at `width` columns, wrapping included.
pub fn rows_of(text: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let plain = style_re().replace_all(text, "");
    if plain.is_empty() {
        return 0;
    }
    let rows: usize = plain
        .strip_suffix('\n')
        .unwrap_or(&plain)
        .split('\n')
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

// ── Live block ────────────────────────────────────────────────────────────────

pub struct LiveBlock<W: Write> {
    out: W,
    palette: Palette,
    width: u16,
    /// Rows of the block currently on screen; 0 when detached.
    rows: u16,
}

impl LiveBlock<io::Stdout> {
    pub fn stdout(palette: Palette) -> Self {
        let width = terminal::size()
            .map(|(cols, _)| cols)
            .unwrap_or(FALLBACK_WIDTH);
        Self::new(io::stdout(), palette, width)
    }
}

impl<W: Write> LiveBlock<W> {
    pub fn new(out: W, palette: Palette, width: u16) -> Self {
        Self {
            out,
            palette,
            width,
            rows: 0,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    /// Replace the block with the styled rendering of `markup`.
    pub fn redraw(&mut self, markup: &str) -> io::Result<()> {
        self.erase()?;
        let mut text = render_markup(&self.palette, markup);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        self.out.write_all(text.as_bytes())?;
        self.rows = rows_of(&text, self.width);
        Ok(())
    }

    /// Take the block off the screen.
    pub fn erase(&mut self) -> io::Result<()> {
        if self.rows > 0 {
            queue!(self.out, MoveToPreviousLine(self.rows))?;
        }
        queue!(self.out, Clear(ClearType::FromCursorDown))?;
        self.rows = 0;
        Ok(())
    }

    /// Print a finished line; the next redraw starts below it.
    pub fn print_line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)?;
        self.rows = 0;
        Ok(())
    }

    /// Leave the block on screen as it is.
    pub fn detach(&mut self) {
        self.rows = 0;
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> MessageSurface for LiveBlock<W> {
    fn replace_content(&mut self, fragment: &str) {
        if let Err(e) = self.redraw(fragment) {
            warn!("console: redraw failed: {}", e);
        }
    }

    /// The block sits at the bottom of the output; flushing it is enough to
    /// have the terminal scroll it into view.
    fn scroll_into_view(&mut self) {
        if let Err(e) = self.flush() {
            warn!("console: flush failed: {}", e);
        }
    }
}

// ── Chat pane ─────────────────────────────────────────────────────────────────

/// Transcript plus the live block of the answer in flight.
pub struct ChatPane<W: Write> {
    transcript: Transcript,
    live: LiveBlock<W>,
    /// The loading marker is on screen and nothing has replaced it yet.
    loading: bool,
}

impl<W: Write> ChatPane<W> {
    pub fn new(live: LiveBlock<W>) -> Self {
        Self {
            transcript: Transcript::new(),
            live,
            loading: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn live(&self) -> &LiveBlock<W> {
        &self.live
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.live.set_palette(palette);
    }

    /// Record the question and open a bot record headed by its timestamp,
    /// showing the loading marker until the first fragment arrives.
    pub fn begin(&mut self, question: &str) -> MessageId {
        if self.loading {
            self.write(|live| live.erase());
        }
        self.live.detach();

        self.transcript.push_user(question);
        let id = self.transcript.begin_bot();
        let stamp = self
            .transcript
            .get(id)
            .map(|r| r.created_at.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        let header = paint(self.live.palette(), Paint::Secondary, &format!("xiao · {}", stamp));

        self.write(|live| {
            live.print_line(&header)?;
            live.redraw(LOADING_TEXT)?;
            live.flush()
        });
        self.loading = true;
        id
    }

    /// Show a new rendering of `id`. Dropped unless `id` is still in flight.
    pub fn render(&mut self, id: MessageId, fragment: &str) -> bool {
        if !self.transcript.replace(id, fragment) {
            return false;
        }
        self.loading = false;
        self.live.replace_content(fragment);
        self.live.scroll_into_view();
        true
    }

    /// The request for `id` is over. If nothing was ever shown, the loading
    /// marker is removed.
    pub fn finish(&mut self, id: MessageId) -> bool {
        let closed = self.transcript.finish(id, None);
        if closed {
            if self.loading {
                self.write(|live| {
                    live.erase()?;
                    live.flush()
                });
                self.loading = false;
            }
            self.live.detach();
        }
        closed
    }

    /// Other output is about to go below the block.
    pub fn detach(&mut self) {
        self.live.detach();
    }

    fn write(&mut self, f: impl FnOnce(&mut LiveBlock<W>) -> io::Result<()>) {
        if let Err(e) = f(&mut self.live) {
            warn!("console: write failed: {}", e);
        }
    }
}
