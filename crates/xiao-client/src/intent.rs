//! Pending-intent tracking for settings the backend has to acknowledge.
//!
//! Setting the speaker volume is a request/response round trip: the slider
//! moves immediately, but the value only sticks once the backend echoes it
//! back. Until then the display shows the intended value and remembers the
//! last confirmed one so a refusal can snap back.
//!
//! # States
//! ```text
//!  Confirmed(T)          backend agreed; render normally
//!  Pending { ... }       request sent, no answer yet; render with a marker
//! ```

/// Two-state wrapper for a value that may be waiting for confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum IntentState<T: Clone + PartialEq> {
    /// Backend has confirmed this value.
    Confirmed(T),
    /// Request sent; waiting for the backend to echo `intended`.
    Pending { intended: T, confirmed: T },
}

impl<T: Clone + PartialEq> IntentState<T> {
    pub fn new(value: T) -> Self {
        Self::Confirmed(value)
    }

    /// The value to display.
    pub fn intended(&self) -> &T {
        match self {
            Self::Confirmed(v) => v,
            Self::Pending { intended, .. } => intended,
        }
    }

    /// The last value the backend agreed to.
    pub fn confirmed(&self) -> &T {
        match self {
            Self::Confirmed(v) => v,
            Self::Pending { confirmed, .. } => confirmed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Register a user intent. Stays `Confirmed` if nothing changes.
    pub fn set_intent(&mut self, intended: T) {
        let confirmed = self.confirmed().clone();
        if intended == confirmed {
            *self = Self::Confirmed(intended);
        } else {
            *self = Self::Pending {
                intended,
                confirmed,
            };
        }
    }

    /// The backend reported `value`; it becomes the confirmed value whether or
    /// not it matches the intent. Returns `true` if the display changed.
    pub fn on_confirmed(&mut self, value: T) -> bool {
        let changed = *self.intended() != value;
        *self = Self::Confirmed(value);
        changed
    }

    /// The backend refused; fall back to the last confirmed value.
    pub fn reject(&mut self) {
        let confirmed = self.confirmed().clone();
        *self = Self::Confirmed(confirmed);
    }
}
