//! The per-module contract and the settings-key dispatch table.
//!
//! Every layout module exposes exactly one entry point,
//! [`Module::update`], called with `reset = false` to apply its patches
//! and `reset = true` to revert them.  Updates must be safe to call
//! redundantly and each module's reset path must be self-sufficient,
//! because the coordinator tears modules down in the *same* fixed order
//! it brought them up.
//!
//! [`modules_for_key`] is the routing table for partial refreshes: a
//! settings change re-runs only the modules whose domain the key touches.

use crate::host::{HostError, ShellGraph};
use crate::options::Options;
use crate::overrides::OverrideError;
use crate::settings::SettingsStore;
use std::fmt;

/// Identifies one layout module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleId {
    WorkspacesView,
    Thumbnails,
    OverviewControls,
    Layout,
    Dash,
    Panel,
    SwitcherPopup,
    Search,
    IconGrid,
    AppGrid,
}

impl ModuleId {
    /// The settings key that toggles this module on and off.
    pub fn settings_key(self) -> &'static str {
        match self {
            ModuleId::WorkspacesView => "workspaces-view-module",
            ModuleId::Thumbnails => "ws-thumbnails-module",
            ModuleId::OverviewControls => "overview-controls-module",
            ModuleId::Layout => "layout-module",
            ModuleId::Dash => "dash-module",
            ModuleId::Panel => "panel-module",
            ModuleId::SwitcherPopup => "ws-switcher-popup-module",
            ModuleId::Search => "search-module",
            ModuleId::IconGrid => "icon-grid-module",
            ModuleId::AppGrid => "app-grid-module",
        }
    }

    /// Whether this module rebuilds expensive state and therefore skips
    /// updates while the session is locked.
    pub fn lock_gated(self) -> bool {
        matches!(self, ModuleId::IconGrid | ModuleId::AppGrid)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::WorkspacesView => write!(f, "workspaces-view"),
            ModuleId::Thumbnails => write!(f, "ws-thumbnails"),
            ModuleId::OverviewControls => write!(f, "overview-controls"),
            ModuleId::Layout => write!(f, "layout"),
            ModuleId::Dash => write!(f, "dash"),
            ModuleId::Panel => write!(f, "panel"),
            ModuleId::SwitcherPopup => write!(f, "ws-switcher-popup"),
            ModuleId::Search => write!(f, "search"),
            ModuleId::IconGrid => write!(f, "icon-grid"),
            ModuleId::AppGrid => write!(f, "app-grid"),
        }
    }
}

/// The fixed module update order.
///
/// Significant on activation: view and thumbnail modules come before
/// modules that read their geometry, and the icon grid must be patched
/// before the app grid lays out pages on top of it.  Teardown reuses the
/// same order, which is why every reset path must stand on its own.
pub const UPDATE_ORDER: [ModuleId; 10] = [
    ModuleId::WorkspacesView,
    ModuleId::Thumbnails,
    ModuleId::OverviewControls,
    ModuleId::Layout,
    ModuleId::Dash,
    ModuleId::Panel,
    ModuleId::SwitcherPopup,
    ModuleId::Search,
    ModuleId::IconGrid,
    ModuleId::AppGrid,
];

/// Everything a module may look at while updating.
pub struct UpdateContext<'a> {
    pub opt: &'a Options,
    pub graph: &'a ShellGraph,
    pub settings: &'a dyn SettingsStore,
}

impl UpdateContext<'_> {
    /// Whether the given module is enabled in the settings.
    pub fn module_enabled(&self, id: ModuleId) -> bool {
        self.settings.get_bool(id.settings_key(), true)
    }
}

/// Errors escaping a module update.
///
/// These are not recovered by the coordinator; they propagate to whoever
/// drove the activation, i.e. the host's extension-loading error
/// reporting.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Override(#[from] OverrideError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// One self-contained layout module.
pub trait Module {
    /// Which module this is.
    fn id(&self) -> ModuleId;

    /// Apply (`reset = false`) or revert (`reset = true`) this module's
    /// patches.  Must be idempotent in both directions.
    fn update(&mut self, ctx: &UpdateContext<'_>, reset: bool) -> Result<(), UpdateError>;
}

//  Settings-key dispatch

/// Which modules a settings key re-runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Re-run the full module list (a module was toggled, or the key
    /// reshapes the whole overview).
    All,
    /// Re-run only the listed modules, in the given order.
    Subset(Vec<ModuleId>),
}

enum Matcher {
    Suffix(&'static str),
    Contains(&'static str),
    Exact(&'static str),
}

impl Matcher {
    fn matches(&self, key: &str) -> bool {
        match self {
            Matcher::Suffix(s) => key.ends_with(s),
            Matcher::Contains(s) => key.contains(s),
            Matcher::Exact(s) => key == *s,
        }
    }
}

enum Targets {
    All,
    Only(&'static [ModuleId]),
}

struct Rule {
    matcher: Matcher,
    targets: Targets,
    /// Whether a match ends the table walk.
    stop: bool,
}

/// The routing table.  Rules are checked top to bottom; non-stopping
/// rules accumulate (a `dash-position` change touches both the dash and
/// the layout manager's hot-corner geometry).
const DISPATCH: &[Rule] = &[
    Rule {
        matcher: Matcher::Suffix("-module"),
        targets: Targets::All,
        stop: true,
    },
    Rule {
        matcher: Matcher::Exact("ws-thumbnails-position"),
        targets: Targets::All,
        stop: true,
    },
    Rule {
        matcher: Matcher::Contains("app-grid"),
        targets: Targets::Only(&[ModuleId::AppGrid]),
        stop: true,
    },
    Rule {
        matcher: Matcher::Contains("panel"),
        targets: Targets::Only(&[ModuleId::Panel]),
        stop: false,
    },
    Rule {
        matcher: Matcher::Contains("dash"),
        targets: Targets::Only(&[ModuleId::Dash, ModuleId::Layout]),
        stop: false,
    },
    Rule {
        matcher: Matcher::Contains("search"),
        targets: Targets::Only(&[ModuleId::Dash]),
        stop: false,
    },
    Rule {
        matcher: Matcher::Contains("icon"),
        targets: Targets::Only(&[ModuleId::Dash]),
        stop: false,
    },
    Rule {
        matcher: Matcher::Contains("hot-corner"),
        targets: Targets::Only(&[ModuleId::Layout]),
        stop: false,
    },
    Rule {
        matcher: Matcher::Exact("search-width-scale"),
        targets: Targets::Only(&[ModuleId::Search]),
        stop: false,
    },
    Rule {
        matcher: Matcher::Exact("show-ws-preview-bg"),
        targets: Targets::Only(&[ModuleId::Panel]),
        stop: false,
    },
];

/// Resolve which modules a changed key re-runs.
///
/// Keys matching no rule return an empty subset: the derived options were
/// refreshed, but no module needs to re-register its patches.
pub fn modules_for_key(key: &str) -> Dispatch {
    let mut subset: Vec<ModuleId> = Vec::new();
    for rule in DISPATCH {
        if !rule.matcher.matches(key) {
            continue;
        }
        match rule.targets {
            Targets::All => return Dispatch::All,
            Targets::Only(ids) => {
                for id in ids {
                    if !subset.contains(id) {
                        subset.push(*id);
                    }
                }
            }
        }
        if rule.stop {
            break;
        }
    }
    Dispatch::Subset(subset)
}

//  Tests
