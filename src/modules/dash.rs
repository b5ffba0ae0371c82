//! Dash placement and styling.
//!
//! Note the target: the *current* dash from the graph, which a competing
//! dock extension may replace at runtime.  The registry only keeps a weak
//! back-reference, so a swapped-out dash simply ages out of the teardown.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

pub struct DashModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl DashModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let dash = ctx.graph.dash();
        let style = ctx.opt.dash_bg_style.clone();
        let opacity = ctx.opt.dash_bg_opacity;
        let position = ctx.opt.dash_position.as_i64();
        let visible = ctx.opt.dash_visible;
        let max_icon_size = ctx.opt.dash_max_icon_size;

        ov.add_override(
            "Dash",
            &dash,
            &[
                (
                    "update-style",
                    method(move |o| {
                        o.set_prop("bg-style", style.clone());
                        o.set_prop("bg-opacity", opacity);
                    }),
                ),
                (
                    "adjust-position",
                    method(move |o| {
                        o.set_prop("position", position);
                        o.set_prop("visible", visible);
                        o.set_prop("max-icon-size", max_icon_size);
                    }),
                ),
            ],
        )?;

        {
            let mut dash = dash.borrow_mut();
            dash.call("update-style")?;
            dash.call("adjust-position")?;
        }
        Ok(())
    }
}

impl Default for DashModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for DashModule {
    fn id(&self) -> ModuleId {
        ModuleId::Dash
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
    use crate::host::stock_dash_at;
    use crate::modules::testutil::fixture;
    use crate::options::Options;
    use crate::settings::SettingsStore;
    use serde_json::json;
    use std::rc::Rc;

    #[test]
    fn apply_styles_and_positions_the_dash() {
        let (store, graph) = fixture();
        store.set("dash-bg-opacity", json!(100.0));
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = DashModule::new();
        module.update(&ctx, false).unwrap();

        let dash = graph.dash();
        let dash = dash.borrow();
        assert_eq!(dash.prop_i64("position", -1), 3, "defaults to the left edge");
        assert_eq!(dash.prop_i64("bg-opacity", 0), 250);
        assert_eq!(dash.prop_str("bg-style"), Some("border-radius: 0 12px 12px 0;"));
    }

    #[test]
    fn reapply_after_settings_change_updates_the_style() {
        let (store, graph) = fixture();
        let mut module = DashModule::new();
        {
            let opt = Options::derive(&store, &graph);
            let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };
            module.update(&ctx, false).unwrap();
        }

        store.set("dash-position", json!(1));
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };
        module.update(&ctx, false).unwrap();

        let dash = graph.dash();
        let dash = dash.borrow();
        assert_eq!(dash.prop_i64("position", -1), 1);
        assert_eq!(dash.prop_str("bg-style"), Some("border-radius: 12px 0 0 12px;"));
    }

    #[test]
    fn reset_survives_a_replaced_dash() {
        let (store, graph) = fixture();
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = DashModule::new();
        module.update(&ctx, false).unwrap();

        // A competing extension swaps the dash before we tear down.
        let old_dash = graph.dash();
        graph.replace_dash(stock_dash_at(2));
        drop(old_dash);

        // The old target is gone; reset must not fail.
        module.update(&ctx, true).unwrap();
    }

    #[test]
    fn reset_restores_the_original_slots() {
        let (store, graph) = fixture();
        let dash = graph.dash();
        let style = dash.borrow().slot("update-style").unwrap();
        let position = dash.borrow().slot("adjust-position").unwrap();
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = DashModule::new();
        module.update(&ctx, false).unwrap();
        module.update(&ctx, true).unwrap();

        assert!(Rc::ptr_eq(&style, &dash.borrow().slot("update-style").unwrap()));
        assert!(Rc::ptr_eq(&position, &dash.borrow().slot("adjust-position").unwrap()));
    }
}
