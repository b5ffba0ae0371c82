//! Workspace switcher popup orientation.
//!
//! The popup mirrors the workspaces view: a vertical workspace column
//! gets a vertical popup next to the thumbnails.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

pub struct SwitcherPopupModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl SwitcherPopupModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let popup = ctx.graph.switcher_popup.clone();
        let vertical = ctx.opt.vertical_orientation;
        let position = ctx.opt.ws_thumbnails_position;

        ov.add_override(
            "WorkspaceSwitcherPopup",
            &popup,
            &[(
                "display",
                method(move |o| {
                    o.set_prop("orientation", if vertical { "vertical" } else { "horizontal" });
                    o.set_prop("position", position);
                }),
            )],
        )?;

        popup.borrow_mut().call("display")?;
        Ok(())
    }
}

impl Default for SwitcherPopupModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for SwitcherPopupModule {
    fn id(&self) -> ModuleId {
        ModuleId::SwitcherPopup
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
    fn popup_follows_the_workspace_orientation() {
        let (store, graph) = fixture();
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = SwitcherPopupModule::new();
        module.update(&ctx, false).unwrap();
        assert_eq!(graph.switcher_popup.borrow().prop_str("orientation"), Some("vertical"));

        store.set("ws-orientation", json!(0));
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };
        module.update(&ctx, false).unwrap();
        assert_eq!(graph.switcher_popup.borrow().prop_str("orientation"), Some("horizontal"));
    }
}
