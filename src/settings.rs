//! The key/value settings backend.
//!
//! The core depends on a deliberately small surface: `get`, `set`, and a
//! change subscription that delivers the changed key.  Change
//! notifications arrive as [`Event::ConfigChanged`] on the coordinator's
//! event channel; the store never calls back into the coordinator
//! directly, which keeps re-entrancy out of the picture.
//!
//! [`MemorySettings`] is the in-process implementation used by the tests
//! and the simulator.  It is seeded with the settings schema defaults and
//! only notifies when a stored value actually changes, which is what lets
//! derive-time write-backs (the icon-size clamp) terminate.

use crate::event::Event;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::mpsc;

/// Handle for a change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(pub u64);

/// The settings-storage collaborator.
///
/// Implementations use interior mutability; stores are shared between the
/// coordinator and the layout modules by `Rc`.
pub trait SettingsStore {
    /// Current value for `key`, if any.
    fn get(&self, key: &str) -> Option<Value>;

    /// Store a value.  Implementations must notify subscribers only when
    /// the stored value actually changes.
    fn set(&self, key: &str, value: Value);

    /// Subscribe to change notifications.  Every change sends
    /// [`Event::ConfigChanged`] with the key into `sink`.
    fn connect_changed(&self, sink: mpsc::Sender<Event>) -> SubscriptionId;

    /// Drop a subscription.
    fn disconnect(&self, id: SubscriptionId);

    //  Typed convenience getters

    /// Boolean value with a fallback.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    /// Integer value with a fallback.
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    /// Float value with a fallback.
    fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    /// String-list value; missing or malformed entries yield an empty list.
    fn get_strv(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(|v| v.as_array().cloned())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Store a string list.
    fn set_strv(&self, key: &str, values: &[String]) {
        self.set(key, json!(values));
    }
}

/// In-memory [`SettingsStore`] seeded with the schema defaults.
pub struct MemorySettings {
    values: RefCell<HashMap<String, Value>>,
    subscribers: RefCell<Vec<(SubscriptionId, mpsc::Sender<Event>)>>,
    next_subscription: Cell<u64>,
}

impl MemorySettings {
    /// Create a store holding the schema defaults.
    pub fn with_defaults() -> Self {
        let store = Self::empty();
        for (key, value) in schema_defaults() {
            store.values.borrow_mut().insert(key.to_string(), value);
        }
        store
    }

    /// Create a completely empty store.
    pub fn empty() -> Self {
        Self {
            values: RefCell::new(HashMap::new()),
            subscribers: RefCell::new(Vec::new()),
            next_subscription: Cell::new(0),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        {
            let mut values = self.values.borrow_mut();
            if values.get(key) == Some(&value) {
                return;
            }
            values.insert(key.to_string(), value);
        }
        // Drop subscribers whose channel is gone while notifying.
        self.subscribers
            .borrow_mut()
            .retain(|(_, sink)| sink.send(Event::ConfigChanged(key.to_string())).is_ok());
    }

    fn connect_changed(&self, sink: mpsc::Sender<Event>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.get() + 1);
        self.next_subscription.set(id.0);
        self.subscribers.borrow_mut().push((id, sink));
        id
    }

    fn disconnect(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|(sub, _)| *sub != id);
    }
}

/// The settings schema: every key the crate reads, with its default.
fn schema_defaults() -> Vec<(&'static str, Value)> {
    vec![
        // Per-module toggles.
        ("workspaces-view-module", json!(true)),
        ("ws-thumbnails-module", json!(true)),
        ("overview-controls-module", json!(true)),
        ("layout-module", json!(true)),
        ("dash-module", json!(true)),
        ("panel-module", json!(true)),
        ("ws-switcher-popup-module", json!(true)),
        ("search-module", json!(true)),
        ("icon-grid-module", json!(true)),
        ("app-grid-module", json!(true)),
        // Orientation and thumbnails.
        ("ws-orientation", json!(1)),
        ("ws-thumbnails-position", json!(0)),
        ("ws-thumbnail-scale", json!(5.0)),
        // Dash.
        ("dash-position", json!(3)),
        ("dash-visible", json!(true)),
        ("dash-max-icon-size", json!(64)),
        ("dash-bg-opacity", json!(40.0)),
        ("dash-bg-radius", json!(12)),
        // Panel.
        ("panel-position", json!(0)),
        ("panel-overview-only", json!(false)),
        // Overview behaviour.
        ("overview-mode", json!(0)),
        ("show-bg-in-overview", json!(true)),
        ("show-ws-preview-bg", json!(false)),
        ("animation-time-factor", json!(1.0)),
        // Search.
        ("show-search-entry", json!(true)),
        ("search-max-rows", json!(5)),
        ("search-width-scale", json!(1.0)),
        // Layout manager.
        ("hot-corner-action", json!(1)),
        // App grid.
        ("app-grid-columns", json!(0)),
        ("app-grid-rows", json!(0)),
        ("app-grid-icon-size", json!(-1)),
        ("app-grid-active-preview", json!(false)),
        // Host-side keys the coordinator watches or rewrites.
        ("enable-page-shortcuts", json!(true)),
        ("fix-external-dock", json!(false)),
        ("enabled-extensions", json!([])),
        (
            "switch-to-workspace-left",
            json!(["<Super>Page_Up", "<Control><Alt>Left"]),
        ),
        (
            "switch-to-workspace-right",
            json!(["<Super>Page_Down", "<Control><Alt>Right"]),
        ),
        ("switch-to-workspace-up", json!(["<Control><Alt>Up"])),
        ("switch-to-workspace-down", json!(["<Control><Alt>Down"])),
        (
            "move-to-workspace-left",
            json!(["<Super><Shift>Page_Up", "<Control><Shift><Alt>Left"]),
        ),
        (
            "move-to-workspace-right",
            json!(["<Super><Shift>Page_Down", "<Control><Shift><Alt>Right"]),
        ),
        ("move-to-workspace-up", json!(["<Control><Shift><Alt>Up"])),
        ("move-to-workspace-down", json!(["<Control><Shift><Alt>Down"])),
    ]
}

//  Tests
