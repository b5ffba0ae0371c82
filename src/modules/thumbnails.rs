//! Workspace thumbnail scale and placement.

use crate::host::method;
use crate::overrides::OverrideRegistry;
use crate::subsystem::{Module, ModuleId, UpdateContext, UpdateError};

/// Largest fraction of the screen the thumbnail column may take.
const MAX_THUMBNAIL_SCALE: f64 = 0.3;

pub struct ThumbnailsModule {
    overrides: Option<OverrideRegistry>,
    first_run: bool,
}

impl ThumbnailsModule {
    pub fn new() -> Self {
        Self {
            overrides: None,
            first_run: true,
        }
    }

    fn register(ov: &mut OverrideRegistry, ctx: &UpdateContext<'_>) -> Result<(), UpdateError> {
        let tmb = ctx.graph.thumbnails.clone();
        let scale = ctx.opt.ws_thumbnail_scale.clamp(0.0, MAX_THUMBNAIL_SCALE);
        let position = ctx.opt.ws_thumbnails_position;

        ov.add_override(
            "ThumbnailsBox",
            &tmb,
            &[
                (
                    "update-scale",
                    method(move |o| {
                        o.set_prop("scale", scale);
                        o.set_prop("position", position);
                    }),
                ),
                // Not a slot the host defines; reverting must delete it.
                (
                    "preferred-width",
                    method(move |o| {
                        let screen = o.prop_f64("screen-width", 1920.0);
                        o.set_prop("width", screen * scale);
                    }),
                ),
            ],
        )?;

        {
            let mut tmb = tmb.borrow_mut();
            tmb.call("update-scale")?;
            tmb.call("preferred-width")?;
        }
        Ok(())
    }
}

impl Default for ThumbnailsModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for ThumbnailsModule {
    fn id(&self) -> ModuleId {
        ModuleId::Thumbnails
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
    fn apply_scales_thumbnails_from_settings() {
        let (store, graph) = fixture();
        store.set("ws-thumbnail-scale", json!(8.0));
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = ThumbnailsModule::new();
        module.update(&ctx, false).unwrap();

        let tmb = graph.thumbnails.borrow();
        assert_eq!(tmb.prop_f64("scale", 0.0), 0.08);
        assert_eq!(tmb.prop_f64("width", 0.0), 1920.0 * 0.08);
    }

    #[test]
    fn scale_is_clamped_to_the_maximum() {
        let (store, graph) = fixture();
        store.set("ws-thumbnail-scale", json!(90.0));
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = ThumbnailsModule::new();
        module.update(&ctx, false).unwrap();
        assert_eq!(graph.thumbnails.borrow().prop_f64("scale", 0.0), MAX_THUMBNAIL_SCALE);
    }

    #[test]
    fn reset_deletes_the_added_helper_slot() {
        let (store, graph) = fixture();
        let opt = Options::derive(&store, &graph);
        let ctx = UpdateContext { opt: &opt, graph: &graph, settings: &store };

        let mut module = ThumbnailsModule::new();
        module.update(&ctx, false).unwrap();
        assert!(graph.thumbnails.borrow().has_slot("preferred-width"));

        module.update(&ctx, true).unwrap();
        assert!(
            !graph.thumbnails.borrow().has_slot("preferred-width"),
            "slot that did not exist before the patch must not survive a reset"
        );
        assert!(graph.thumbnails.borrow().has_slot("update-scale"));
    }
}
