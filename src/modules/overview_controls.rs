//! Overview controls geometry.
//!
//! Reserves vertical space for an overview-only panel and propagates the
//! workspace spacing the thumbnails module relies on.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

pub struct OverviewControlsModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl OverviewControlsModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let controls = ctx.graph.controls.clone();
        let start_y = ctx.opt.start_y_offset;
        let spacing = ctx.opt.workspace_min_spacing;

        ov.add_override(
            "ControlsManager",
            &controls,
            &[(
                "update-layout",
                method(move |o| {
                    o.set_prop("start-y", start_y);
                    o.set_prop("spacing", spacing);
                }),
            )],
        )?;

        controls.borrow_mut().call("update-layout")?;
        Ok(())
    }
}

impl Default for OverviewControlsModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for OverviewControlsModule {
    fn id(&self) -> ModuleId {
        ModuleId::OverviewControls
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
    use crate::modules::testutil::fixture;
    use crate::options::Options;
    use crate::settings::SettingsStore;
    use serde_json::json;

    #[test]
    fn reserves_panel_height_for_overview_only_panel() {
        let (store, graph) = fixture();
        store.set("panel-overview-only", json!(true));
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = OverviewControlsModule::new();
        module.update(&ctx, false).unwrap();
        assert_eq!(graph.controls.borrow().prop_f64("start-y", 0.0), 32.0);
    }

    #[test]
    fn redundant_updates_are_safe() {
        let (store, graph) = fixture();
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = OverviewControlsModule::new();
        module.update(&ctx, false).unwrap();
        module.update(&ctx, false).unwrap();
        module.update(&ctx, true).unwrap();
        module.update(&ctx, true).unwrap();
        assert!(graph.controls.borrow().has_slot("update-layout"));
    }
}
