//! The coordinator's input vocabulary.
//!
//! Settings-change notifications, host signals and the simulator's stdin
//! tap all feed the same [`Event`] enum through one
//! [`mpsc`](std::sync::mpsc) channel, so every debounce and coalescing
//! decision lives in a single handler instead of being duplicated per
//! trigger source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything that can wake the lifecycle coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A settings key changed; carries the key name.
    ConfigChanged(String),

    /// The host's monitor/display configuration changed.
    MonitorsChanged,

    /// The overview is about to be shown.  Dash drift is detected while
    /// handling this event.
    OverviewShowing,

    /// The session lock state flipped.
    SessionLockChanged(bool),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::ConfigChanged(key) => write!(f, "config-changed({key})"),
            Event::MonitorsChanged => write!(f, "monitors-changed"),
            Event::OverviewShowing => write!(f, "overview-showing"),
            Event::SessionLockChanged(locked) => write!(f, "session-lock-changed({locked})"),
        }
    }
}
