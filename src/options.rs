//! Derived options: the computed view of the raw settings.
//!
//! [`Options`] is rebuilt on every settings sync.  It holds the values
//! the coordinator and the layout modules actually consume (positions
//! resolved to enums, percentages converted to host units), so no module
//! ever re-implements a derivation.
//!
//! One derivation writes back: a dash icon size below 16 px is treated
//! as corrupted and reset to 64 in the store itself.

use crate::host::ShellGraph;
use crate::settings::SettingsStore;
use serde_json::json;

/// Where the dash sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashPosition {
    Top,
    Right,
    Bottom,
    Left,
}

impl DashPosition {
    /// Decode the settings value (0 top, 1 right, 2 bottom, 3 left).
    pub fn from_setting(value: i64) -> Self {
        match value {
            0 => DashPosition::Top,
            1 => DashPosition::Right,
            3 => DashPosition::Left,
            _ => DashPosition::Bottom,
        }
    }

    /// Numeric form, as stored in the host object's `position` property.
    pub fn as_i64(self) -> i64 {
        match self {
            DashPosition::Top => 0,
            DashPosition::Right => 1,
            DashPosition::Bottom => 2,
            DashPosition::Left => 3,
        }
    }

    /// Whether the dash runs along a vertical screen edge.
    pub fn is_vertical(self) -> bool {
        matches!(self, DashPosition::Left | DashPosition::Right)
    }
}

/// Snapshot of every derived setting.
#[derive(Debug, Clone)]
pub struct Options {
    pub dash_position: DashPosition,
    pub dash_visible: bool,
    pub dash_max_icon_size: i64,
    /// Background opacity converted from percent to the host's 0–255 range.
    pub dash_bg_opacity: i64,
    pub dash_bg_radius: i64,
    /// Precomputed background style; empty when the radius is zero.
    pub dash_bg_style: String,

    pub vertical_orientation: bool,
    pub ws_thumbnails_position: i64,
    pub ws_thumbnail_scale: f64,
    /// Minimum spacing between workspaces, read from the host theme.
    pub workspace_min_spacing: f64,

    pub overview_mode: i64,
    pub overview_mode2: bool,
    pub show_bg_in_overview: bool,
    pub show_ws_preview_bg: bool,
    pub animation_time_factor: f64,

    pub show_search_entry: bool,
    pub search_max_rows: i64,
    pub search_width_scale: f64,

    pub panel_position_top: bool,
    pub panel_overview_only: bool,
    /// Vertical offset reserved for the panel above overview content.
    pub start_y_offset: f64,

    pub hot_corner_action: i64,

    pub app_grid_columns: i64,
    pub app_grid_rows: i64,
    pub app_grid_icon_size: i64,
    pub app_grid_active_preview: bool,

    pub enable_page_shortcuts: bool,
    pub fix_external_dock: bool,
}

impl Options {
    /// Build a snapshot from the store and the live host state.
    pub fn derive(store: &dyn SettingsStore, graph: &ShellGraph) -> Self {
        let dash_position = DashPosition::from_setting(store.get_i64("dash-position", 2));

        let mut dash_max_icon_size = store.get_i64("dash-max-icon-size", 64);
        if dash_max_icon_size < 16 {
            dash_max_icon_size = 64;
            store.set("dash-max-icon-size", json!(64));
        }

        // Percent to 0–255.
        let dash_bg_opacity = (store.get_f64("dash-bg-opacity", 40.0) * 2.5)
            .round()
            .clamp(0.0, 255.0) as i64;

        let dash_bg_radius = store.get_i64("dash-bg-radius", 0);
        let dash_bg_style = bg_radius_style(dash_position, dash_bg_radius);

        let overview_mode = store.get_i64("overview-mode", 0);

        let panel_position_top = store.get_i64("panel-position", 0) == 0;
        let panel_overview_only = store.get_bool("panel-overview-only", false);
        let panel_module = store.get_bool("panel-module", true);
        let start_y_offset = if panel_module && panel_overview_only && panel_position_top {
            graph.panel.borrow().prop_f64("height", 0.0)
        } else {
            0.0
        };

        Self {
            dash_position,
            dash_visible: store.get_bool("dash-visible", true),
            dash_max_icon_size,
            dash_bg_opacity,
            dash_bg_radius,
            dash_bg_style,

            vertical_orientation: store.get_i64("ws-orientation", 0) == 1,
            ws_thumbnails_position: store.get_i64("ws-thumbnails-position", 0),
            ws_thumbnail_scale: store.get_f64("ws-thumbnail-scale", 5.0) / 100.0,
            workspace_min_spacing: graph.thumbnails.borrow().prop_f64("spacing", 0.0),

            overview_mode,
            overview_mode2: overview_mode == 2,
            show_bg_in_overview: store.get_bool("show-bg-in-overview", true),
            show_ws_preview_bg: store.get_bool("show-ws-preview-bg", false),
            animation_time_factor: store.get_f64("animation-time-factor", 1.0),

            show_search_entry: store.get_bool("show-search-entry", true),
            search_max_rows: store.get_i64("search-max-rows", 5),
            search_width_scale: store.get_f64("search-width-scale", 1.0),

            panel_position_top,
            panel_overview_only,
            start_y_offset,

            hot_corner_action: store.get_i64("hot-corner-action", 1),

            app_grid_columns: store.get_i64("app-grid-columns", 0),
            app_grid_rows: store.get_i64("app-grid-rows", 0),
            app_grid_icon_size: store.get_i64("app-grid-icon-size", -1),
            app_grid_active_preview: store.get_bool("app-grid-active-preview", false),

            enable_page_shortcuts: store.get_bool("enable-page-shortcuts", true),
            fix_external_dock: store.get_bool("fix-external-dock", false),
        }
    }

    /// Whether overview elements slide in from off-screen.  With a static
    /// workspace-preview background there is nothing to animate over.
    pub fn should_animate_overview(&self) -> bool {
        !self.show_ws_preview_bg || self.overview_mode2
    }
}

/// Corner-radius style for the dash background.  A dash on a vertical
/// edge keeps the screen-side corners square.
fn bg_radius_style(position: DashPosition, radius: i64) -> String {
    if radius <= 0 {
        return String::new();
    }
    match position {
        DashPosition::Right => format!("border-radius: {radius}px 0 0 {radius}px;"),
        DashPosition::Left => format!("border-radius: 0 {radius}px {radius}px 0;"),
        _ => format!("border-radius: {radius}px;"),
    }
}

//  Tests
