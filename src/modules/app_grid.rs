//! App grid page layout.
//!
//! Lays pages out on top of whatever grid shape the icon grid module has
//! computed.  Depends on the icon grid being patched first (see
//! [`UPDATE_ORDER`](crate::subsystem::UPDATE_ORDER)); its own reset path
//! is still self-sufficient and never touches the icon grid.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

pub struct AppGridModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl AppGridModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let app_grid = ctx.graph.app_grid.clone();
        let icon_grid = ctx.graph.icon_grid.clone();

        ov.add_override(
            "AppDisplay",
            &app_grid,
            &[(
                "adapt-to-size",
                method(move |o| {
                    let (columns, rows) = {
                        let grid = icon_grid.borrow();
                        (
                            grid.prop_i64("columns-per-page", 6),
                            grid.prop_i64("rows-per-page", 4),
                        )
                    };
                    o.set_prop("columns", columns);
                    o.set_prop("rows", rows);
                    o.set_prop("page-size", columns * rows);
                }),
            )],
        )?;

        app_grid.borrow_mut().call("adapt-to-size")?;
        Ok(())
    }
}

impl Default for AppGridModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for AppGridModule {
    fn id(&self) -> ModuleId {
        ModuleId::AppGrid
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::icon_grid::IconGridModule;
    use crate::modules::testutil::fixture;
    use crate::options::Options;
    use crate::settings::SettingsStore;
    use serde_json::json;

    #[test]
    fn page_shape_follows_the_patched_icon_grid() {
        let (store, graph) = fixture();
        store.set("app-grid-columns", json!(5));
        store.set("app-grid-rows", json!(3));
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        // Icon grid first, as the update order guarantees.
        let mut icon_grid = IconGridModule::new();
        icon_grid.update(&ctx, false).unwrap();
        let mut app_grid = AppGridModule::new();
        app_grid.update(&ctx, false).unwrap();

        let grid = graph.app_grid.borrow();
        assert_eq!(grid.prop_i64("columns", 0), 5);
        assert_eq!(grid.prop_i64("rows", 0), 3);
        assert_eq!(grid.prop_i64("page-size", 0), 15);
    }

    #[test]
    fn works_against_an_unpatched_icon_grid() {
        // Partial refresh can re-run this module alone; it must cope with
        // whatever grid shape is currently live.
        let (store, graph) = fixture();
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = AppGridModule::new();
        module.update(&ctx, false).unwrap();
        assert_eq!(graph.app_grid.borrow().prop_i64("page-size", 0), 24);
    }
}
