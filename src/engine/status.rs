// SPDX-License-Identifier: GPL-3.0-only

//! Latest human-readable engine status

use std::time::{Duration, Instant};
use tracing::debug;

/// Callback invoked with every new status string
pub type StatusListener = Box<dyn FnMut(&str)>;

/// Holds the current status string and notifies a listener on change
///
/// Every write bumps the revision, even when the text is unchanged, so a
/// shell polling [`StatusBoard::revision`] sees each transition.
#[derive(Default)]
pub struct StatusBoard {
    message: String,
    revision: u64,
    expires_at: Option<Instant>,
    listener: Option<StatusListener>,
}

impl StatusBoard {
    pub fn new(initial: &str) -> Self {
        Self {
            message: initial.to_string(),
            ..Self::default()
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_listener(&mut self, listener: StatusListener) {
        self.listener = Some(listener);
    }

    /// Replace the status
    pub fn set(&mut self, message: impl Into<String>) {
        self.expires_at = None;
        self.publish(message.into());
    }

    /// Replace the status and clear it once `ttl` has passed
    pub fn flash(&mut self, message: impl Into<String>, ttl: Duration, now: Instant) {
        self.publish(message.into());
        // A ttl past the clock's range never expires
        self.expires_at = now.checked_add(ttl);
    }

    /// Clear an expired transient status; returns whether it was cleared
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(at) if now >= at => {
                self.expires_at = None;
                self.publish(String::new());
                true
            }
            _ => false,
        }
    }

    fn publish(&mut self, message: String) {
        debug!(status = %message, "Status changed");
        self.message = message;
        self.revision += 1;
        if let Some(listener) = self.listener.as_mut() {
            listener(&self.message);
        }
    }
}

impl std::fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBoard")
            .field("message", &self.message)
            .field("revision", &self.revision)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
