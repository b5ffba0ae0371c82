//! Search entry width and result-list sizing.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

/// Host-default entry width the scale factor applies to.
const BASE_ENTRY_WIDTH: f64 = 320.0;

pub struct SearchModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl SearchModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let entry = ctx.graph.search_entry.clone();
        let width_scale = ctx.opt.search_width_scale;
        let visible = ctx.opt.show_search_entry;
        let max_rows = ctx.opt.search_max_rows;

        ov.add_override(
            "SearchEntry",
            &entry,
            &[(
                "update-width",
                method(move |o| {
                    o.set_prop("width", BASE_ENTRY_WIDTH * width_scale);
                    o.set_prop("visible", visible);
                    o.set_prop("max-result-rows", max_rows);
                }),
            )],
        )?;

        entry.borrow_mut().call("update-width")?;
        Ok(())
    }
}

impl Default for SearchModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for SearchModule {
    fn id(&self) -> ModuleId {
        ModuleId::Search
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
