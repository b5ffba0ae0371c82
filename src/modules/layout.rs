//! Layout manager: panel barrier and hot corners.
//!
//! The pointer barrier along the panel edge assumes a top panel; with the
//! panel repositioned it would cut across the screen, so the replacement
//! drops it outright.  Hot corners follow their own setting.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

pub struct LayoutModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl LayoutModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let lm = ctx.graph.layout_manager.clone();
        let hot_corners = ctx.opt.hot_corner_action != 0;

        ov.add_override(
            "LayoutManager",
            &lm,
            &[
                (
                    "update-panel-barrier",
                    method(|o| {
                        o.set_prop("panel-barrier", false);
                    }),
                ),
                (
                    "update-hot-corners",
                    method(move |o| {
                        o.set_prop("hot-corners", hot_corners);
                    }),
                ),
            ],
        )?;

        {
            let mut lm = lm.borrow_mut();
            lm.call("update-panel-barrier")?;
            lm.call("update-hot-corners")?;
        }
        Ok(())
    }
}

impl Default for LayoutModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for LayoutModule {
    fn id(&self) -> ModuleId {
        ModuleId::Layout
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
