//! The abstract host shell: objects with named, replaceable method slots.
//!
//! The shell being restyled is not part of this crate.  It is modelled as a
//! graph of [`HostObject`]s — property bags with a table of named method
//! slots — plus the [`ShellHost`] trait for everything that is not plain
//! state: signal subscriptions, user notifications, session-lock queries.
//!
//! Method slots are resolved through the table at call time, so a slot can
//! be swapped for a replacement and later swapped back without the object
//! ever knowing.  The [`OverrideRegistry`](crate::overrides::OverrideRegistry)
//! is the only component that should perform those swaps.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A method implementation stored in a slot.
///
/// Shared (`Rc`) so a captured original and an installed replacement can
/// both be held without copying, and so restore can put back the *same*
/// implementation that was captured.  The round-trip guarantee is about
/// identity, not equivalence.
pub type Method = Rc<dyn Fn(&mut HostObject)>;

/// Wrap a closure as a [`Method`].
pub fn method<F>(f: F) -> Method
where
    F: Fn(&mut HostObject) + 'static,
{
    Rc::new(f)
}

/// Errors from host object access.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A method slot was invoked that does not exist on the object.
    #[error("object {object:?} has no method {method:?}")]
    MissingMethod { object: String, method: String },
}

/// One object of the host shell: named method slots plus plain properties.
///
/// Properties are JSON values because the host exposes heterogeneous
/// state (numbers as readily as style strings) and the core must not
/// care which.
pub struct HostObject {
    name: String,
    slots: HashMap<String, Method>,
    props: HashMap<String, Value>,
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("name", &self.name)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("props", &self.props)
            .finish()
    }
}

impl HostObject {
    /// Create an empty object with a debug label.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: HashMap::new(),
            props: HashMap::new(),
        }
    }

    /// The object's debug label.
    pub fn name(&self) -> &str {
        &self.name
    }

    //  Slots

    /// Current implementation of `slot`, if any.
    pub fn slot(&self, slot: &str) -> Option<Method> {
        self.slots.get(slot).cloned()
    }

    /// Whether `slot` currently has an implementation.
    pub fn has_slot(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Install `method` into `slot`, replacing any previous implementation.
    pub fn set_slot(&mut self, slot: impl Into<String>, method: Method) {
        self.slots.insert(slot.into(), method);
    }

    /// Remove `slot` entirely, returning the object to its unpatched shape
    /// for slots that never existed before a patch.
    pub fn remove_slot(&mut self, slot: &str) {
        self.slots.remove(slot);
    }

    /// Invoke the method currently installed in `slot`.
    ///
    /// The implementation is resolved through the slot table at call time,
    /// so replacements installed by an override registry take effect
    /// immediately and restores take effect just as immediately.
    pub fn call(&mut self, slot: &str) -> Result<(), HostError> {
        let method = self.slots.get(slot).cloned().ok_or_else(|| HostError::MissingMethod {
            object: self.name.clone(),
            method: slot.to_string(),
        })?;
        (*method)(self);
        Ok(())
    }

    //  Properties

    /// Raw property value.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// Set a property.
    pub fn set_prop(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.props.insert(key.into(), value.into());
    }

    /// Numeric property with a fallback.
    pub fn prop_f64(&self, key: &str, default: f64) -> f64 {
        self.props.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Integer property with a fallback.
    pub fn prop_i64(&self, key: &str, default: i64) -> i64 {
        self.props.get(key).and_then(Value::as_i64).unwrap_or(default)
    }

    /// Boolean property with a fallback.
    pub fn prop_bool(&self, key: &str, default: bool) -> bool {
        self.props.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// String property, if present and a string.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }
}

/// A shared handle to a host object.
pub type ObjectRef = Rc<RefCell<HostObject>>;

/// Build an [`ObjectRef`] from an object.
pub fn object_ref(object: HostObject) -> ObjectRef {
    Rc::new(RefCell::new(object))
}

//  Shell graph

/// The overview object graph the coordinator and the layout modules patch.
///
/// All members are fixed for the lifetime of the shell except the dash,
/// which the host (or a competing extension) may replace at any time —
/// hence the extra [`RefCell`] around its handle.  Replacement is exactly
/// the drift scenario the coordinator watches for.
pub struct ShellGraph {
    dash: RefCell<ObjectRef>,
    pub panel: ObjectRef,
    pub controls: ObjectRef,
    pub thumbnails: ObjectRef,
    pub search_entry: ObjectRef,
    pub workspaces_view: ObjectRef,
    pub icon_grid: ObjectRef,
    pub app_grid: ObjectRef,
    pub switcher_popup: ObjectRef,
    pub layout_manager: ObjectRef,
    /// Holder for global UI tunables (animation slow-down factor).
    pub ui_settings: ObjectRef,
}

impl ShellGraph {
    /// Build a graph with the host's stock slots and properties.
    pub fn new() -> Self {
        Self {
            dash: RefCell::new(stock_dash()),
            panel: stock_panel(),
            controls: stock_controls(),
            thumbnails: stock_thumbnails(),
            search_entry: stock_search_entry(),
            workspaces_view: stock_workspaces_view(),
            icon_grid: stock_icon_grid(),
            app_grid: stock_app_grid(),
            switcher_popup: stock_switcher_popup(),
            layout_manager: stock_layout_manager(),
            ui_settings: stock_ui_settings(),
        }
    }

    /// The current dash object.
    pub fn dash(&self) -> ObjectRef {
        self.dash.borrow().clone()
    }

    /// Replace the dash object, as a competing dock extension would.
    ///
    /// Patches applied to the previous dash are *not* carried over; the
    /// coordinator detects the swap and rebuilds from scratch.
    pub fn replace_dash(&self, dash: ObjectRef) {
        *self.dash.borrow_mut() = dash;
    }
}

impl Default for ShellGraph {
    fn default() -> Self {
        Self::new()
    }
}

//  Stock objects
//
//  Each constructor models the host's unpatched behaviour: the stock
//  method implementations write the host-default values back into the
//  object's properties.

/// Build a stock dash at the given position (0 top, 1 right, 2 bottom, 3 left).
pub fn stock_dash_at(position: i64) -> ObjectRef {
    let mut dash = HostObject::new("dash");
    dash.set_prop("position", position);
    dash.set_prop("translation-x", 0.0);
    dash.set_prop("translation-y", 0.0);
    dash.set_prop("width", 64.0);
    dash.set_prop("height", 480.0);
    dash.set_prop("bg-style", "");
    dash.set_prop("bg-opacity", 255);
    dash.set_prop("visible", true);
    dash.set_prop("max-icon-size", 64);
    dash.set_slot(
        "update-style",
        method(|o| {
            o.set_prop("bg-style", "");
            o.set_prop("bg-opacity", 255);
        }),
    );
    dash.set_slot(
        "adjust-position",
        method(|o| {
            o.set_prop("visible", true);
            o.set_prop("max-icon-size", 64);
        }),
    );
    object_ref(dash)
}

fn stock_dash() -> ObjectRef {
    stock_dash_at(2)
}

fn stock_panel() -> ObjectRef {
    let mut panel = HostObject::new("panel");
    panel.set_prop("position", 0);
    panel.set_prop("height", 32.0);
    panel.set_prop("visible", true);
    panel.set_prop("transparent", false);
    panel.set_slot(
        "update-position",
        method(|o| {
            o.set_prop("position", 0);
            o.set_prop("visible", true);
        }),
    );
    panel.set_slot(
        "update-style",
        method(|o| {
            o.set_prop("transparent", false);
        }),
    );
    object_ref(panel)
}

fn stock_controls() -> ObjectRef {
    let mut controls = HostObject::new("overview-controls");
    controls.set_prop("workspace-adjustment", 0.0);
    controls.set_prop("start-y", 0.0);
    controls.set_prop("spacing", 0.0);
    controls.set_slot(
        "update-layout",
        method(|o| {
            o.set_prop("start-y", 0.0);
            o.set_prop("spacing", 0.0);
        }),
    );
    object_ref(controls)
}

fn stock_thumbnails() -> ObjectRef {
    let mut tmb = HostObject::new("workspace-thumbnails");
    tmb.set_prop("position", 0);
    tmb.set_prop("scale", 0.05);
    tmb.set_prop("spacing", 12.0);
    tmb.set_prop("width", 160.0);
    tmb.set_prop("translation-x", 0.0);
    tmb.set_prop("translation-y", 0.0);
    tmb.set_slot(
        "update-scale",
        method(|o| {
            o.set_prop("scale", 0.05);
            o.set_prop("position", 0);
        }),
    );
    object_ref(tmb)
}

fn stock_search_entry() -> ObjectRef {
    let mut entry = HostObject::new("search-entry");
    entry.set_prop("visible", true);
    entry.set_prop("width", 320.0);
    entry.set_prop("max-result-rows", 5);
    entry.set_prop("translation-y", 0.0);
    entry.set_slot(
        "update-width",
        method(|o| {
            o.set_prop("width", 320.0);
            o.set_prop("visible", true);
        }),
    );
    object_ref(entry)
}

fn stock_workspaces_view() -> ObjectRef {
    let mut view = HostObject::new("workspaces-view");
    view.set_prop("orientation", "horizontal");
    view.set_prop("layout-rows", 1);
    view.set_prop("spacing", 0.0);
    view.set_slot(
        "update-layout",
        method(|o| {
            o.set_prop("orientation", "horizontal");
            o.set_prop("layout-rows", 1);
        }),
    );
    object_ref(view)
}

fn stock_icon_grid() -> ObjectRef {
    let mut grid = HostObject::new("icon-grid");
    grid.set_prop("page-width", 1920.0);
    grid.set_prop("page-height", 1080.0);
    grid.set_prop("page-padding", 64.0);
    grid.set_prop("column-spacing", 8.0);
    grid.set_prop("row-spacing", 8.0);
    grid.set_prop("columns-per-page", 6);
    grid.set_prop("rows-per-page", 4);
    grid.set_prop("icon-size", 96);
    grid.set_prop("fixed-icon-size", -1);
    grid.set_slot(
        "find-best-mode",
        method(|o| {
            o.set_prop("columns-per-page", 6);
            o.set_prop("rows-per-page", 4);
        }),
    );
    grid.set_slot(
        "find-best-icon-size",
        method(|o| {
            o.set_prop("icon-size", 96);
        }),
    );
    object_ref(grid)
}

fn stock_app_grid() -> ObjectRef {
    let mut grid = HostObject::new("app-grid");
    grid.set_prop("columns", 6);
    grid.set_prop("rows", 4);
    grid.set_prop("page-size", 24);
    grid.set_slot(
        "adapt-to-size",
        method(|o| {
            o.set_prop("columns", 6);
            o.set_prop("rows", 4);
            o.set_prop("page-size", 24);
        }),
    );
    object_ref(grid)
}

fn stock_switcher_popup() -> ObjectRef {
    let mut popup = HostObject::new("workspace-switcher-popup");
    popup.set_prop("orientation", "horizontal");
    popup.set_prop("position", 0);
    popup.set_slot(
        "display",
        method(|o| {
            o.set_prop("orientation", "horizontal");
        }),
    );
    object_ref(popup)
}

fn stock_layout_manager() -> ObjectRef {
    let mut lm = HostObject::new("layout-manager");
    lm.set_prop("panel-barrier", true);
    lm.set_prop("hot-corners", true);
    lm.set_slot(
        "update-panel-barrier",
        method(|o| {
            o.set_prop("panel-barrier", true);
        }),
    );
    lm.set_slot(
        "update-hot-corners",
        method(|o| {
            o.set_prop("hot-corners", true);
        }),
    );
    object_ref(lm)
}

fn stock_ui_settings() -> ObjectRef {
    let mut ui = HostObject::new("ui-settings");
    ui.set_prop("slow-down-factor", 1.0);
    object_ref(ui)
}

//  Host services

/// Host-emitted signals the coordinator can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Monitor/display configuration changed.
    MonitorsChanged,
    /// The overview is about to be shown.
    OverviewShowing,
    /// The session lock state flipped.
    SessionLock,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::MonitorsChanged => write!(f, "monitors-changed"),
            SignalKind::OverviewShowing => write!(f, "overview-showing"),
            SignalKind::SessionLock => write!(f, "session-lock"),
        }
    }
}

/// Handle for a host signal subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalId(pub u64);

/// Everything the coordinator needs from the live host beyond the object
/// graph itself.
///
/// An implementation might bridge to a real compositor bus, or it might be
/// an in-memory double used in tests and the simulator.
pub trait ShellHost {
    /// The object graph this host exposes.
    fn graph(&self) -> &ShellGraph;

    /// Subscribe to a host signal.  Events for connected signals are
    /// delivered by the host into the coordinator's event channel.
    fn connect(&self, signal: SignalKind) -> SignalId;

    /// Drop a subscription made with [`connect`](ShellHost::connect).
    fn disconnect(&self, id: SignalId);

    /// Surface a one-line notification to the user.
    fn notify(&self, summary: &str, body: &str);

    /// Index of the currently active workspace.
    fn active_workspace_index(&self) -> u32;

    /// Whether the session is in the locked/suspended mode.
    fn is_locked(&self) -> bool;
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_resolves_through_slot_table() {
        let mut obj = HostObject::new("test");
        obj.set_slot("bump", method(|o| {
            let n = o.prop_i64("count", 0);
            o.set_prop("count", n + 1);
        }));
        obj.call("bump").unwrap();
        obj.call("bump").unwrap();
        assert_eq!(obj.prop_i64("count", 0), 2);
    }

    #[test]
    fn call_sees_replacement_immediately() {
        let mut obj = HostObject::new("test");
        obj.set_slot("tag", method(|o| o.set_prop("tag", "stock")));
        obj.call("tag").unwrap();
        assert_eq!(obj.prop_str("tag"), Some("stock"));

        obj.set_slot("tag", method(|o| o.set_prop("tag", "patched")));
        obj.call("tag").unwrap();
        assert_eq!(obj.prop_str("tag"), Some("patched"));
    }

    #[test]
    fn call_missing_slot_is_an_error() {
        let mut obj = HostObject::new("test");
        let err = obj.call("nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn removed_slot_is_gone() {
        let mut obj = HostObject::new("test");
        obj.set_slot("x", method(|_| {}));
        assert!(obj.has_slot("x"));
        obj.remove_slot("x");
        assert!(!obj.has_slot("x"));
    }

    #[test]
    fn stock_graph_has_expected_shape() {
        let graph = ShellGraph::new();
        assert!(graph.dash().borrow().has_slot("update-style"));
        assert!(graph.layout_manager.borrow().has_slot("update-panel-barrier"));
        assert_eq!(graph.icon_grid.borrow().prop_i64("columns-per-page", 0), 6);
        assert_eq!(graph.ui_settings.borrow().prop_f64("slow-down-factor", 0.0), 1.0);
    }

    #[test]
    fn replace_dash_swaps_identity() {
        let graph = ShellGraph::new();
        let before = graph.dash();
        graph.replace_dash(stock_dash_at(3));
        let after = graph.dash();
        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(after.borrow().prop_i64("position", 0), 3);
    }
}
