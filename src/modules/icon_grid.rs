//! Icon grid sizing.
//!
//! Replaces the host's fixed grid-mode table with a calculation over the
//! actual page space.  Columns and rows of `0` in the settings mean
//! adaptive: fit as many cells as the page allows at the configured icon
//! size.  The app grid module reads the page shape this module computes,
//! which is why the update order runs this module first.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

/// Extra room around one icon cell.
const CELL_PADDING: f64 = 64.0;

/// Icon sizes the host can render well, largest first.
const ICON_SIZES: [i64; 12] = [256, 224, 208, 192, 176, 160, 144, 96, 80, 64, 48, 32];

/// Default icon size; larger when pages show live window previews.
fn default_icon_size(active_preview: bool) -> i64 {
    if active_preview {
        176
    } else {
        96
    }
}

pub struct IconGridModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl IconGridModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let grid = ctx.graph.icon_grid.clone();
        let columns_setting = ctx.opt.app_grid_columns;
        let rows_setting = ctx.opt.app_grid_rows;
        let icon_setting = ctx.opt.app_grid_icon_size;
        let active_preview = ctx.opt.app_grid_active_preview;

        ov.add_override(
            "IconGrid",
            &grid,
            &[
                (
                    "find-best-mode",
                    method(move |o| {
                        let padding = o.prop_f64("page-padding", 0.0);
                        let width = o.prop_f64("page-width", 0.0) - 2.0 * padding;
                        let height = o.prop_f64("page-height", 0.0) - 2.0 * padding;

                        let icon_size = if icon_setting < 0 {
                            default_icon_size(active_preview)
                        } else {
                            icon_setting
                        } as f64;

                        let mut columns = columns_setting;
                        let mut rows = rows_setting;
                        // 0 means adaptive size.
                        if columns == 0 {
                            columns = (width / (icon_size + CELL_PADDING)).floor() as i64;
                        }
                        if rows == 0 {
                            rows = (height / (icon_size + CELL_PADDING)).floor() as i64;
                        }
                        o.set_prop("columns-per-page", columns.max(1));
                        o.set_prop("rows-per-page", rows.max(1));
                    }),
                ),
                (
                    "find-best-icon-size",
                    method(|o| {
                        let fixed = o.prop_i64("fixed-icon-size", -1);
                        if fixed != -1 {
                            o.set_prop("icon-size", fixed);
                            return;
                        }
                        let columns = o.prop_i64("columns-per-page", 1).max(1) as f64;
                        let rows = o.prop_i64("rows-per-page", 1).max(1) as f64;
                        let padding = o.prop_f64("page-padding", 0.0);
                        let usable_width = o.prop_f64("page-width", 0.0)
                            - 2.0 * padding
                            - o.prop_f64("column-spacing", 0.0) * (columns - 1.0);
                        let usable_height = o.prop_f64("page-height", 0.0)
                            - 2.0 * padding
                            - o.prop_f64("row-spacing", 0.0) * (rows - 1.0);
                        let cell = (usable_width / columns).min(usable_height / rows);

                        let best = ICON_SIZES
                            .iter()
                            .copied()
                            .find(|size| (*size as f64) <= cell)
                            .unwrap_or(32);
                        o.set_prop("icon-size", best);
                    }),
                ),
            ],
        )?;

        {
            let mut grid = grid.borrow_mut();
            grid.call("find-best-mode")?;
            grid.call("find-best-icon-size")?;
        }
        Ok(())
    }
}

impl Default for IconGridModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for IconGridModule {
    fn id(&self) -> ModuleId {
        ModuleId::IconGrid
    }

    fn update(&mut self, ctx: &UpdateContext<'_>, reset: bool) -> Result<(), UpdateError> {
        let reset = reset || !ctx.module_enabled(self.id());
        if self.first_run && reset {
            return Ok(());
        }
        self.first_run = false;

        if let Some(mut ov) = self.overrides.take() {
            ov.remove_all();
        }
        if reset {
            return Ok(());
        }

        let mut ov = OverrideRegistry::new();
        let result = Self::register(&mut ov, ctx);
        self.overrides = Some(ov);
        result
    }
}
