//! Byte stream to text chunks.

use futures_util::{Stream, StreamExt};
use tracing::debug;

use super::error::ChatError;

/// Incremental UTF-8 decoder. A multi-byte sequence split across two network
/// chunks is held back until its tail arrives; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);

        let mut out = String::with_capacity(buf.len());
        let mut rest: &[u8] = &buf;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + bad..];
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more.
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }
        self.pending = rest.to_vec();
        out
    }

    /// Bytes of an unfinished sequence still held back.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Pulls an HTTP body stream and hands out decoded text chunks. Once the body
/// ends or fails it keeps returning `None`.
pub struct DecodedChunks<S> {
    inner: S,
    decoder: Utf8StreamDecoder,
    done: bool,
}

impl<S, B, E> DecodedChunks<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Utf8StreamDecoder::new(),
            done: false,
        }
    }

    pub async fn next_chunk(&mut self) -> Option<Result<String, ChatError>> {
        if self.done {
            return None;
        }
        match self.inner.next().await {
            Some(Ok(bytes)) => Some(Ok(self.decoder.decode(bytes.as_ref()))),
            Some(Err(e)) => {
                self.done = true;
                Some(Err(ChatError::Stream(e.to_string())))
            }
            None => {
                self.done = true;
                let dropped = self.decoder.pending_len();
                if dropped > 0 {
                    debug!("chat: dropping {} undecodable trailing bytes", dropped);
                }
                None
            }
        }
    }
}
