//! The layout modules: one self-contained feature per file.
//!
//! Every module follows the same lifecycle.  On apply it tears down any
//! previous registry, builds a fresh [`OverrideRegistry`](crate::overrides::OverrideRegistry),
//! registers its patch table and invokes the patched entry points once so
//! the host graph reflects the new policy.  On reset it tears the
//! registry down and stops.  A module that is disabled in the settings
//! treats every update as a reset, and a module that has never applied
//! anything does not touch the host at all.

pub mod app_grid;
pub mod dash;
pub mod icon_grid;
pub mod layout;
pub mod overview_controls;
pub mod panel;
pub mod search;
pub mod switcher_popup;
pub mod thumbnails;
pub mod workspaces_view;

use crate::subsystem::Module;

/// Build the full module list in [`UPDATE_ORDER`](crate::subsystem::UPDATE_ORDER).
pub fn make_modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(workspaces_view::WorkspacesViewModule::new()),
        Box::new(thumbnails::ThumbnailsModule::new()),
        Box::new(overview_controls::OverviewControlsModule::new()),
        Box::new(layout::LayoutModule::new()),
        Box::new(dash::DashModule::new()),
        Box::new(panel::PanelModule::new()),
        Box::new(switcher_popup::SwitcherPopupModule::new()),
        Box::new(search::SearchModule::new()),
        Box::new(icon_grid::IconGridModule::new()),
        Box::new(app_grid::AppGridModule::new()),
    ]
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::host::ShellGraph;
    use crate::settings::MemorySettings;

    /// A defaults-seeded store and a stock host graph.
    pub fn fixture() -> (MemorySettings, ShellGraph) {
        (MemorySettings::with_defaults(), ShellGraph::new())
    }
}
