//! Push channel: "now playing" and "queue ended" notifications.
//!
//! The backend keeps one WebSocket per page open and writes plain text frames.
//! Delivery is best effort; after a close the client reconnects with
//! exponential backoff a bounded number of times and then gives up.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use xiao_proto::config::PushConfig;
use xiao_proto::protocol::PushMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Connected,
    Message(PushMessage),
    Disconnected,
    /// Reconnect attempts are used up; no more events follow.
    GaveUp,
}

/// Attempt `n` (1-based) waits `2^n * base`. The counter resets on every
/// successful connect.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    base: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts,
            base,
            attempts: 0,
        }
    }

    pub fn from_config(config: &PushConfig) -> Self {
        Self::new(
            config.max_reconnect_attempts,
            Duration::from_millis(config.backoff_base_ms),
        )
    }

    /// Delay before the next attempt, or `None` once exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.base * 2u32.saturating_pow(self.attempts))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// `http(s)://host[:port]/...` to `ws(s)://host[:port]<path>`.
pub fn push_url(base_url: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).with_context(|| format!("Invalid base URL {}", base_url))?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("Cannot derive a WebSocket URL from {}", base_url))?;
    url.join(path)
        .with_context(|| format!("Invalid push path {}", path))
}

/// Run the push channel until the policy gives up or `tx` is dropped.
pub fn spawn(url: Url, mut policy: ReconnectPolicy, tx: mpsc::Sender<PushEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match connect_async(url.as_str()).await {
                Ok((mut ws, _)) => {
                    info!("push: connected to {}", url);
                    policy.reset();
                    if tx.send(PushEvent::Connected).await.is_err() {
                        return;
                    }
                    while let Some(frame) = ws.next().await {
                        match frame {
                            Ok(Message::Text(text)) => {
                                debug!("push: {}", text);
                                let event = PushEvent::Message(PushMessage::parse(&text));
                                if tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(e) => {
                                warn!("push: read error: {}", e);
                                break;
                            }
                        }
                    }
                    info!("push: connection closed");
                    if tx.send(PushEvent::Disconnected).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!("push: connect to {} failed: {}", url, e),
            }

            match policy.next_delay() {
                Some(delay) => {
                    info!(
                        "push: reconnecting ({}/{}) in {:?}",
                        policy.attempts(),
                        policy.max_attempts(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    error!(
                        "push: giving up after {} reconnect attempts",
                        policy.max_attempts()
                    );
                    let _ = tx.send(PushEvent::GaveUp).await;
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_stops() {
        let mut p = ReconnectPolicy::new(2, Duration::from_millis(1000));
        assert_eq!(p.next_delay(), Some(Duration::from_millis(2000)));
        assert_eq!(p.next_delay(), Some(Duration::from_millis(4000)));
        assert_eq!(p.next_delay(), None);
        assert_eq!(p.next_delay(), None);

        p.reset();
        assert_eq!(p.next_delay(), Some(Duration::from_millis(2000)));
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let mut p = ReconnectPolicy::new(0, Duration::from_millis(1000));
        assert_eq!(p.next_delay(), None);
    }

    #[test]
    fn test_from_config_defaults() {
        let mut p = ReconnectPolicy::from_config(&PushConfig::default());
        assert_eq!(p.max_attempts(), 2);
        assert_eq!(p.next_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_push_url() {
        assert_eq!(
            push_url("http://192.168.1.5:8080", "/ws").unwrap().as_str(),
            "ws://192.168.1.5:8080/ws"
        );
        assert_eq!(
            push_url("https://bot.example/ui/", "/ws").unwrap().as_str(),
            "wss://bot.example/ws"
        );
    }
}
