//! Workspaces view orientation.
//!
//! The defining patch of the whole crate: flips the workspaces view from
//! the host's horizontal strip to a vertical column.  Other modules read
//! the orientation this module establishes, which is why it sits first in
//! the update order.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

pub struct WorkspacesViewModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl WorkspacesViewModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let view = ctx.graph.workspaces_view.clone();
        let vertical = ctx.opt.vertical_orientation;
        let spacing = ctx.opt.workspace_min_spacing;

        ov.add_override(
            "WorkspacesView",
            &view,
            &[(
                "update-layout",
                method(move |o| {
                    if vertical {
                        o.set_prop("orientation", "vertical");
                        o.set_prop("layout-rows", -1);
                    } else {
                        o.set_prop("orientation", "horizontal");
                        o.set_prop("layout-rows", 1);
                    }
                    o.set_prop("spacing", spacing);
                }),
            )],
        )?;

        view.borrow_mut().call("update-layout")?;
        Ok(())
    }
}

impl Default for WorkspacesViewModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for WorkspacesViewModule {
    fn id(&self) -> ModuleId {
        ModuleId::WorkspacesView
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
