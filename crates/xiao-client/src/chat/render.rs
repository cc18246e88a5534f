//! Incremental rendering of a bot answer, and the transcript it lands in.

use chrono::{DateTime, Local};

use super::format::format_message;

/// Where a bot message is shown. Every update replaces the whole content.
pub trait MessageSurface {
    fn replace_content(&mut self, fragment: &str);

    /// Bring the message into view after an update.
    fn scroll_into_view(&mut self) {}
}

/// Plain buffer surface: keeps the last fragment.
impl MessageSurface for String {
    fn replace_content(&mut self, fragment: &str) {
        self.clear();
        self.push_str(fragment);
    }
}

/// Render a complete answer in one go.
pub fn render_reply<M: MessageSurface + ?Sized>(surface: &mut M, text: &str) {
    surface.replace_content(&format_message(text));
    surface.scroll_into_view();
}

/// Owns the accumulated text of one streamed answer and re-renders all of it
/// after every append.
pub struct StreamRenderer<'a, M: MessageSurface + ?Sized> {
    surface: &'a mut M,
    accumulated: String,
}

impl<'a, M: MessageSurface + ?Sized> StreamRenderer<'a, M> {
    pub fn new(surface: &'a mut M) -> Self {
        Self {
            surface,
            accumulated: String::new(),
        }
    }

    /// Appending an empty string still renders.
    pub fn append(&mut self, text: &str) {
        self.accumulated.push_str(text);
        self.render();
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    fn render(&mut self) {
        render_reply(&mut *self.surface, &self.accumulated);
    }

    /// Stream ended: one last render. Returns the raw accumulated text.
    pub fn finish(mut self) -> String {
        self.render();
        self.accumulated
    }

    /// Stream broke: the content becomes `text` verbatim.
    pub fn fail(self, text: &str) {
        self.surface.replace_content(text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: MessageId,
    pub role: Role,
    /// Verbatim text for user records, rendered markup for bot records.
    pub content: String,
    pub created_at: DateTime<Local>,
    /// A bot record still receiving stream updates.
    pub in_flight: bool,
}

/// The conversation so far. At most one bot record is in flight; updates for
/// a record that is no longer in flight are dropped.
#[derive(Debug, Default)]
pub struct Transcript {
    records: Vec<MessageRecord>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, role: Role, content: String, in_flight: bool) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.records.push(MessageRecord {
            id,
            role,
            content,
            created_at: Local::now(),
            in_flight,
        });
        id
    }

    pub fn push_user(&mut self, text: &str) -> MessageId {
        self.push(Role::User, text.to_string(), false)
    }

    /// Start an empty bot record. Any previous in-flight record is closed and
    /// keeps its current content.
    pub fn begin_bot(&mut self) -> MessageId {
        for record in self.records.iter_mut().filter(|r| r.in_flight) {
            record.in_flight = false;
        }
        self.push(Role::Bot, String::new(), true)
    }

    /// Returns `false` if the record is unknown or already finished.
    pub fn replace(&mut self, id: MessageId, fragment: &str) -> bool {
        match self.records.iter_mut().find(|r| r.id == id && r.in_flight) {
            Some(record) => {
                record.content.clear();
                record.content.push_str(fragment);
                true
            }
            None => false,
        }
    }

    /// Close a bot record, optionally with final content.
    pub fn finish(&mut self, id: MessageId, content: Option<&str>) -> bool {
        if let Some(content) = content {
            if !self.replace(id, content) {
                return false;
            }
        }
        match self.records.iter_mut().find(|r| r.id == id && r.in_flight) {
            Some(record) => {
                record.in_flight = false;
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> Option<MessageId> {
        self.records.iter().find(|r| r.in_flight).map(|r| r.id)
    }

    pub fn get(&self, id: MessageId) -> Option<&MessageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<String>,
        scrolls: usize,
    }

    impl MessageSurface for Recorder {
        fn replace_content(&mut self, fragment: &str) {
            self.frames.push(fragment.to_string());
        }

        fn scroll_into_view(&mut self) {
            self.scrolls += 1;
        }
    }

    #[test]
    fn test_every_append_rerenders_everything() {
        let mut surface = Recorder::default();
        let mut r = StreamRenderer::new(&mut surface);
        r.append("### 1. A");
        r.append("");
        r.append("x: y");
        let text = r.finish();
        assert_eq!(text, "### 1. Ax: y");
        assert_eq!(surface.frames.len(), 4);
        assert_eq!(surface.frames[0], "<p class=\"section-title\">1. A</p>");
        assert_eq!(surface.frames[1], surface.frames[0]);
        assert_eq!(
            surface.frames[3],
            "<p class=\"section-title\">1. Ax: y</p>"
        );
        assert_eq!(surface.scrolls, 4);
    }

    #[test]
    fn test_fail_replaces_with_plain_text() {
        let mut surface = String::new();
        let mut r = StreamRenderer::new(&mut surface);
        r.append("partial");
        r.fail("Streaming failed.");
        assert_eq!(surface, "Streaming failed.");
    }

    #[test]
    fn test_transcript_single_in_flight() {
        let mut t = Transcript::new();
        t.push_user("hi");
        let first = t.begin_bot();
        assert!(t.replace(first, "<p>a</p>"));
        let second = t.begin_bot();
        assert_eq!(t.in_flight(), Some(second));
        // Late update for the superseded record is dropped.
        assert!(!t.replace(first, "<p>late</p>"));
        assert_eq!(t.get(first).unwrap().content, "<p>a</p>");
        assert!(t.finish(second, Some("<p>b</p>")));
        assert_eq!(t.in_flight(), None);
        assert!(!t.finish(second, None));
        assert_eq!(t.records().len(), 3);
        assert_eq!(t.records()[0].role, Role::User);
    }
}
