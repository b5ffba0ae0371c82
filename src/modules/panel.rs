//! Panel position and visibility.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

pub struct PanelModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl PanelModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let panel = ctx.graph.panel.clone();
        let top = ctx.opt.panel_position_top;
        let overview_only = ctx.opt.panel_overview_only;
        let transparent = ctx.opt.show_ws_preview_bg;

        ov.add_override(
            "Panel",
            &panel,
            &[
                (
                    "update-position",
                    method(move |o| {
                        o.set_prop("position", if top { 0 } else { 2 });
                        // An overview-only panel stays hidden in the session.
                        o.set_prop("visible", !overview_only);
                    }),
                ),
                (
                    "update-style",
                    method(move |o| {
                        o.set_prop("transparent", transparent);
                    }),
                ),
            ],
        )?;

        {
            let mut panel = panel.borrow_mut();
            panel.call("update-position")?;
            panel.call("update-style")?;
        }
        Ok(())
    }
}

impl Default for PanelModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for PanelModule {
    fn id(&self) -> ModuleId {
        ModuleId::Panel
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
