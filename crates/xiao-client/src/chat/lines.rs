//! Splitting decoded stream text into event lines.
//!
//! The backend relays the model output as `data: ...` lines and finishes with
//! `data: [DONE]`; some deployments send bare text instead. Both are
//! accepted. Each line is trimmed before it is looked at.

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    /// Text after `data:`, trimmed. May be empty.
    Payload(String),
    /// `data: [DONE]`; carries no text.
    Done,
    /// A non-empty line without the `data:` prefix.
    Raw(String),
}

impl StreamLine {
    /// Text to append to the accumulated answer. `None` for the end marker.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Payload(s) | Self::Raw(s) => Some(s),
            Self::Done => None,
        }
    }
}

/// `None` for blank lines.
pub fn classify_line(line: &str) -> Option<StreamLine> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
        let payload = rest.trim();
        if payload == DONE_MARKER {
            return Some(StreamLine::Done);
        }
        return Some(StreamLine::Payload(payload.to_string()));
    }
    if line.is_empty() {
        None
    } else {
        Some(StreamLine::Raw(line.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineMode {
    /// Every chunk is split on its own. A line cut by a chunk boundary is seen
    /// as two lines.
    #[default]
    PerChunk,
    /// An unterminated tail is held until the next chunk or the end.
    Buffered,
}

impl LineMode {
    pub fn from_config(buffer_partial_lines: bool) -> Self {
        if buffer_partial_lines {
            Self::Buffered
        } else {
            Self::PerChunk
        }
    }
}

#[derive(Debug, Default)]
pub struct LineSplitter {
    mode: LineMode,
    carry: String,
}

impl LineSplitter {
    pub fn new(mode: LineMode) -> Self {
        Self {
            mode,
            carry: String::new(),
        }
    }

    pub fn feed(&mut self, chunk: &str) -> Vec<StreamLine> {
        match self.mode {
            LineMode::PerChunk => chunk.split('\n').filter_map(classify_line).collect(),
            LineMode::Buffered => {
                self.carry.push_str(chunk);
                let Some(end) = self.carry.rfind('\n') else {
                    return Vec::new();
                };
                let tail = self.carry.split_off(end + 1);
                let complete = std::mem::replace(&mut self.carry, tail);
                complete.split('\n').filter_map(classify_line).collect()
            }
        }
    }

    /// End of stream: whatever is still held back.
    pub fn flush(&mut self) -> Vec<StreamLine> {
        let rest = std::mem::take(&mut self.carry);
        classify_line(&rest).into_iter().collect()
    }
}
