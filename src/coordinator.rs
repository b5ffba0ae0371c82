//! The lifecycle coordinator.
//!
//! One instance owns the whole enable/disable cycle: it builds the
//! derived options, subscribes to settings changes and host signals,
//! fans `update()` out to the layout modules in the fixed order, and
//! watches for the host pulling the dash out from under us.
//!
//! The state machine is `Disabled → Enabling → Enabled → Disabling →
//! Disabled`.  Activation is debounced (the host flaps enable/disable
//! during startup), and so is every recovery path: monitor changes, a
//! competing dock appearing, and profile loads all funnel into a single
//! pending reset-and-reactivate action.  Scheduling a new reset while one
//! is pending cancels the old one first, so concurrent triggers collapse
//! into one rebuild.
//!
//! All timing is explicit: the owner of the event loop calls
//! [`Coordinator::pump`] with the current instant.  The coordinator never
//! reads the wall clock itself.

use crate::defer::{DeferredQueue, TimerHandle};
use crate::event::Event;
use crate::host::{ObjectRef, ShellHost, SignalId, SignalKind};
use crate::modules;
use crate::options::{DashPosition, Options};
use crate::settings::{SettingsStore, SubscriptionId};
use crate::subsystem::{modules_for_key, Dispatch, Module, ModuleId, UpdateContext, UpdateError};
use log::{debug, info};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Debounce between the host's activate call and the real work, to ride
/// out enable/disable flapping during host startup.
pub const STARTUP_DELAY: Duration = Duration::from_millis(400);

/// Default delay for a reset-and-reactivate cycle.
pub const RESET_DELAY: Duration = Duration::from_millis(200);

/// Reset delay after a monitor reconfiguration, which the host follows
/// with a burst of allocation work.
pub const MONITORS_RESET_DELAY: Duration = Duration::from_millis(3000);

/// Settle time for a profile load: the store replays many keys
/// back-to-back and only the last one should count.
pub const PROFILE_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Display name used in user notifications.
const EXTENSION_NAME: &str = "OverShell";

/// Process-wide activity flag, readable by independent extensions.
static ACTIVE: AtomicBool = AtomicBool::new(false);

/// Whether a coordinator is currently active in this process.
pub fn extension_active() -> bool {
    ACTIVE.load(Ordering::Relaxed)
}

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Disabled,
    Enabling,
    Enabled,
    Disabling,
}

/// Errors escaping the coordinator.
///
/// Module failures are not retried or rolled back; they carry the module
/// name and surface to whoever drove the lifecycle, i.e. the host's
/// extension-loading error reporting.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("module {module}: {source}")]
    Module {
        module: ModuleId,
        #[source]
        source: UpdateError,
    },
}

/// Snapshot of the dash taken at activation, for drift detection.
struct DashSnapshot {
    object: ObjectRef,
    position: i64,
}

/// The process-wide lifecycle coordinator.
pub struct Coordinator<H: ShellHost> {
    host: H,
    settings: Rc<dyn SettingsStore>,
    state: Lifecycle,
    opt: Option<Options>,
    modules: Vec<Box<dyn Module>>,
    session_locked: bool,

    timers: DeferredQueue,
    startup_timer: Option<TimerHandle>,
    /// Pending reset; the flag asks the callback to re-verify the dash
    /// swap before rebuilding.
    reset_timer: Option<(TimerHandle, bool)>,
    profile_timer: Option<TimerHandle>,

    settings_sub: Option<SubscriptionId>,
    signals: Vec<SignalId>,
    prev_dash: Option<DashSnapshot>,

    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
}

impl<H: ShellHost> Coordinator<H> {
    /// Create a coordinator in the `Disabled` state.
    pub fn new(host: H, settings: Rc<dyn SettingsStore>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            host,
            settings,
            state: Lifecycle::Disabled,
            opt: None,
            modules: Vec::new(),
            session_locked: false,
            timers: DeferredQueue::new(),
            startup_timer: None,
            reset_timer: None,
            profile_timer: None,
            settings_sub: None,
            signals: Vec::new(),
            prev_dash: None,
            tx,
            rx,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.state
    }

    /// Whether the coordinator has completed activation.
    pub fn is_enabled(&self) -> bool {
        self.state == Lifecycle::Enabled
    }

    /// A sender for feeding [`Event`]s into this coordinator.  The host
    /// bridge and the settings store each hold a clone.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    /// The host this coordinator drives.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Earliest pending deferred action, for event-loop poll timeouts.
    pub fn next_due(&self) -> Option<Instant> {
        self.timers.next_due()
    }

    //  Lifecycle entry points

    /// Request activation.  The real work runs [`STARTUP_DELAY`] later,
    /// from [`pump`](Coordinator::pump).
    pub fn activate(&mut self, now: Instant) {
        if self.state != Lifecycle::Disabled {
            debug!("activate ignored in state {:?}", self.state);
            return;
        }
        ACTIVE.store(true, Ordering::Relaxed);
        if let Some(handle) = self.startup_timer.take() {
            self.timers.cancel(handle);
        }
        self.startup_timer = Some(self.timers.schedule(now, STARTUP_DELAY));
        self.state = Lifecycle::Enabling;
        info!("activation scheduled");
    }

    /// Deactivate immediately.
    ///
    /// An activation still sitting in its startup delay is simply
    /// cancelled.  Every pending deferred action dies here; a callback
    /// firing after teardown would touch a discarded configuration.
    pub fn deactivate(&mut self) -> Result<(), CoordinatorError> {
        self.session_locked = self.host.is_locked();
        let result = match self.state {
            Lifecycle::Enabling => {
                self.state = Lifecycle::Disabled;
                Ok(())
            }
            Lifecycle::Enabled => {
                self.state = Lifecycle::Disabling;
                let result = self.reset_all();
                self.state = Lifecycle::Disabled;
                result
            }
            Lifecycle::Disabled | Lifecycle::Disabling => Ok(()),
        };

        self.timers.clear();
        self.startup_timer = None;
        self.reset_timer = None;
        self.profile_timer = None;
        ACTIVE.store(false, Ordering::Relaxed);
        info!("{}", if self.session_locked { "suspended" } else { "disabled" });
        result
    }

    /// Drain queued events, then fire due deferred actions.
    pub fn pump(&mut self, now: Instant) -> Result<(), CoordinatorError> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.handle_event(event, now)?,
                Err(_) => break,
            }
        }
        self.fire_due_timers(now)
    }

    /// Handle one event.
    pub fn handle_event(&mut self, event: Event, now: Instant) -> Result<(), CoordinatorError> {
        debug!("event: {event}");
        match event {
            Event::SessionLockChanged(locked) => {
                self.session_locked = locked;
                Ok(())
            }
            _ if self.state != Lifecycle::Enabled => {
                debug!("event ignored in state {:?}", self.state);
                Ok(())
            }
            Event::ConfigChanged(key) => self.on_settings_changed(&key, now),
            Event::MonitorsChanged => {
                self.schedule_reset(now, MONITORS_RESET_DELAY, false);
                Ok(())
            }
            Event::OverviewShowing => {
                self.on_showing_overview(now);
                Ok(())
            }
        }
    }

    //  Deferred actions

    fn fire_due_timers(&mut self, now: Instant) -> Result<(), CoordinatorError> {
        for handle in self.timers.due(now) {
            if self.startup_timer == Some(handle) {
                self.startup_timer = None;
                if self.state == Lifecycle::Enabling {
                    self.activate_now()?;
                }
            } else if self.reset_timer.map(|(h, _)| h) == Some(handle) {
                let verify_dash = self.reset_timer.map(|(_, v)| v).unwrap_or(false);
                self.reset_timer = None;
                if self.state != Lifecycle::Enabled {
                    continue;
                }
                if verify_dash && !self.dash_drifted() {
                    continue;
                }
                info!("resetting");
                self.state = Lifecycle::Disabling;
                self.reset_all()?;
                self.activate_now()?;
            } else if self.profile_timer == Some(handle) {
                self.profile_timer = None;
                if self.state == Lifecycle::Enabled {
                    self.schedule_reset(now, RESET_DELAY, false);
                }
            }
        }
        Ok(())
    }

    /// Replace any pending reset with a new one due `delay` from `now`.
    fn schedule_reset(&mut self, now: Instant, delay: Duration, verify_dash: bool) {
        if let Some((handle, _)) = self.reset_timer.take() {
            self.timers.cancel(handle);
        }
        self.reset_timer = Some((self.timers.schedule(now, delay), verify_dash));
    }

    //  Activation

    fn activate_now(&mut self) -> Result<(), CoordinatorError> {
        self.state = Lifecycle::Enabled;
        self.session_locked = self.host.is_locked();

        self.sync_options();
        self.settings_sub = Some(self.settings.connect_changed(self.tx.clone()));

        self.modules = modules::make_modules();
        self.update_all(false)?;

        let dash = self.host.graph().dash();
        let position = dash.borrow().prop_i64("position", 0);
        self.prev_dash = Some(DashSnapshot { object: dash, position });

        for signal in [
            SignalKind::MonitorsChanged,
            SignalKind::OverviewShowing,
            SignalKind::SessionLock,
        ] {
            let id = self.host.connect(signal);
            self.signals.push(id);
        }

        self.switch_page_shortcuts();
        self.apply_overview_translations();
        self.apply_global_tunables();

        // The host restores the overview on workspace 1 after a restart;
        // land it on the workspace that is actually active.
        let index = self.host.active_workspace_index();
        self.host
            .graph()
            .controls
            .borrow_mut()
            .set_prop("workspace-adjustment", f64::from(index));

        info!("enabled");
        Ok(())
    }

    fn reset_all(&mut self) -> Result<(), CoordinatorError> {
        if let Some((handle, _)) = self.reset_timer.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = self.profile_timer.take() {
            self.timers.cancel(handle);
        }

        let result = self.update_all(true);
        self.modules.clear();

        for id in std::mem::take(&mut self.signals) {
            self.host.disconnect(id);
        }
        if let Some(sub) = self.settings_sub.take() {
            self.settings.disconnect(sub);
        }
        self.prev_dash = None;

        self.apply_page_shortcuts(false);
        self.restore_direct_props();
        self.opt = None;
        result
    }

    /// Fan an update out to every module, in the fixed order.
    ///
    /// The expensive grid modules are skipped while the session is
    /// locked; their patches stay exactly as they are until unlock.
    fn update_all(&mut self, reset: bool) -> Result<(), CoordinatorError> {
        let Some(opt) = self.opt.as_ref() else {
            return Ok(());
        };
        let ctx = UpdateContext {
            opt,
            graph: self.host.graph(),
            settings: &*self.settings,
        };
        for module in &mut self.modules {
            if self.session_locked && module.id().lock_gated() {
                debug!("module {} skipped while locked", module.id());
                continue;
            }
            module.update(&ctx, reset).map_err(|source| CoordinatorError::Module {
                module: module.id(),
                source,
            })?;
        }
        Ok(())
    }

    /// Re-run a subset of modules in apply mode.
    fn update_subset(&mut self, ids: &[ModuleId]) -> Result<(), CoordinatorError> {
        let Some(opt) = self.opt.as_ref() else {
            return Ok(());
        };
        let ctx = UpdateContext {
            opt,
            graph: self.host.graph(),
            settings: &*self.settings,
        };
        for id in ids {
            if let Some(module) = self.modules.iter_mut().find(|m| m.id() == *id) {
                module.update(&ctx, false).map_err(|source| CoordinatorError::Module {
                    module: *id,
                    source,
                })?;
            }
        }
        Ok(())
    }

    //  Settings handling

    fn sync_options(&mut self) {
        self.opt = Some(Options::derive(&*self.settings, self.host.graph()));
    }

    fn on_settings_changed(&mut self, key: &str, now: Instant) -> Result<(), CoordinatorError> {
        if let Some(index) = key.strip_prefix("profile-data-") {
            self.host
                .notify(EXTENSION_NAME, &format!("Profile {index} has been saved"));
        }

        // A profile load rewrites many keys back-to-back; let them settle
        // and rebuild once.
        if key == "aaa-loading-profile" {
            self.host.notify(EXTENSION_NAME, "Profile has been loaded");
            if let Some(handle) = self.profile_timer.take() {
                self.timers.cancel(handle);
            }
            self.profile_timer = Some(self.timers.schedule(now, PROFILE_SETTLE_DELAY));
        }
        if self.profile_timer.is_some() {
            return Ok(());
        }

        self.sync_options();
        self.apply_global_tunables();
        self.apply_settings_key(key, now)
    }

    fn apply_settings_key(&mut self, key: &str, now: Instant) -> Result<(), CoordinatorError> {
        if key.ends_with("-module") {
            return self.update_all(false);
        }

        let fix_dock = self.opt.as_ref().is_some_and(|o| o.fix_external_dock);
        if fix_dock && key == "enabled-extensions" {
            // Some other extension was toggled; if it owns a dock we are
            // about to lose the dash.  Rebuild from scratch.
            self.schedule_reset(now, RESET_DELAY, false);
            return Ok(());
        }

        self.apply_overview_translations();
        self.switch_page_shortcuts();

        match modules_for_key(key) {
            Dispatch::All => self.update_all(false),
            Dispatch::Subset(ids) => self.update_subset(&ids),
        }
    }

    //  Drift detection

    fn on_showing_overview(&mut self, now: Instant) {
        let fix_dock = self.opt.as_ref().is_some_and(|o| o.fix_external_dock);
        if !fix_dock {
            return;
        }
        if self.dash_drifted() {
            debug!("dash replaced by the host, scheduling reset");
            self.schedule_reset(now, Duration::ZERO, true);
        }
    }

    /// Whether the live dash no longer matches the activation snapshot.
    fn dash_drifted(&self) -> bool {
        let Some(snapshot) = &self.prev_dash else {
            return false;
        };
        let current = self.host.graph().dash();
        !Rc::ptr_eq(&snapshot.object, &current)
            || current.borrow().prop_i64("position", 0) != snapshot.position
    }

    //  Direct host-state policies

    /// Propagate tunables the coordinator owns directly rather than
    /// through a module: the global animation slow-down factor.
    fn apply_global_tunables(&self) {
        let Some(opt) = &self.opt else {
            return;
        };
        self.host
            .graph()
            .ui_settings
            .borrow_mut()
            .set_prop("slow-down-factor", opt.animation_time_factor);
    }

    /// Position overview elements just off their own edge so the opening
    /// animation can slide them in; with a static workspace-preview
    /// background there is nothing to slide over and everything sits at
    /// zero.
    fn apply_overview_translations(&self) {
        let Some(opt) = &self.opt else {
            return;
        };
        let graph = self.host.graph();
        let dash = graph.dash();

        if !opt.should_animate_overview() {
            zero_translations(&dash, &graph.thumbnails, &graph.search_entry);
            return;
        }

        {
            let mut dash = dash.borrow_mut();
            let width = dash.prop_f64("width", 0.0);
            let height = dash.prop_f64("height", 0.0);
            let (tx, ty) = match opt.dash_position {
                DashPosition::Top => (0.0, -height),
                DashPosition::Bottom => (0.0, height),
                DashPosition::Left => (-width, 0.0),
                DashPosition::Right => (width, 0.0),
            };
            dash.set_prop("translation-x", tx);
            dash.set_prop("translation-y", ty);
        }
        {
            let mut tmb = graph.thumbnails.borrow_mut();
            let width = tmb.prop_f64("width", 0.0);
            let tx = if opt.ws_thumbnails_position == 0 { -width } else { width };
            tmb.set_prop("translation-x", tx);
            tmb.set_prop("translation-y", 0.0);
        }
        graph
            .search_entry
            .borrow_mut()
            .set_prop("translation-y", -opt.start_y_offset);
    }

    /// Reset every directly-mutated visual property to the host default.
    fn restore_direct_props(&self) {
        let graph = self.host.graph();
        let dash = graph.dash();
        zero_translations(&dash, &graph.thumbnails, &graph.search_entry);
        dash.borrow_mut().set_prop("bg-style", "");
        graph
            .ui_settings
            .borrow_mut()
            .set_prop("slow-down-factor", 1.0);
    }

    //  Page shortcuts

    /// Remap the PageUp/PageDown workspace shortcuts for the current
    /// orientation.
    fn switch_page_shortcuts(&self) {
        let vertical = self.opt.as_ref().map(|o| o.vertical_orientation).unwrap_or(false);
        self.apply_page_shortcuts(vertical);
    }

    fn apply_page_shortcuts(&self, vertical: bool) {
        if !self.settings.get_bool("enable-page-shortcuts", true) {
            return;
        }

        const SWITCH_PREV: &str = "<Super>Page_Up";
        const SWITCH_NEXT: &str = "<Super>Page_Down";
        const MOVE_PREV: &str = "<Super><Shift>Page_Up";
        const MOVE_NEXT: &str = "<Super><Shift>Page_Down";

        let mut switch_left = self.settings.get_strv("switch-to-workspace-left");
        let mut switch_right = self.settings.get_strv("switch-to-workspace-right");
        let mut switch_up = self.settings.get_strv("switch-to-workspace-up");
        let mut switch_down = self.settings.get_strv("switch-to-workspace-down");
        let mut move_left = self.settings.get_strv("move-to-workspace-left");
        let mut move_right = self.settings.get_strv("move-to-workspace-right");
        let mut move_up = self.settings.get_strv("move-to-workspace-up");
        let mut move_down = self.settings.get_strv("move-to-workspace-down");

        if vertical {
            remove_shortcut(&mut switch_left, SWITCH_PREV);
            remove_shortcut(&mut switch_right, SWITCH_NEXT);
            remove_shortcut(&mut move_left, MOVE_PREV);
            remove_shortcut(&mut move_right, MOVE_NEXT);
            add_shortcut(&mut switch_up, SWITCH_PREV);
            add_shortcut(&mut switch_down, SWITCH_NEXT);
            add_shortcut(&mut move_up, MOVE_PREV);
            add_shortcut(&mut move_down, MOVE_NEXT);
        } else {
            add_shortcut(&mut switch_left, SWITCH_PREV);
            add_shortcut(&mut switch_right, SWITCH_NEXT);
            add_shortcut(&mut move_left, MOVE_PREV);
            add_shortcut(&mut move_right, MOVE_NEXT);
            remove_shortcut(&mut switch_up, SWITCH_PREV);
            remove_shortcut(&mut switch_down, SWITCH_NEXT);
            remove_shortcut(&mut move_up, MOVE_PREV);
            remove_shortcut(&mut move_down, MOVE_NEXT);
        }

        self.settings.set_strv("switch-to-workspace-left", &switch_left);
        self.settings.set_strv("switch-to-workspace-right", &switch_right);
        self.settings.set_strv("switch-to-workspace-up", &switch_up);
        self.settings.set_strv("switch-to-workspace-down", &switch_down);
        self.settings.set_strv("move-to-workspace-left", &move_left);
        self.settings.set_strv("move-to-workspace-right", &move_right);
        self.settings.set_strv("move-to-workspace-up", &move_up);
        self.settings.set_strv("move-to-workspace-down", &move_down);
    }
}

fn add_shortcut(list: &mut Vec<String>, shortcut: &str) {
    if !list.iter().any(|s| s == shortcut) {
        list.push(shortcut.to_string());
    }
}

fn remove_shortcut(list: &mut Vec<String>, shortcut: &str) {
    list.retain(|s| s != shortcut);
}

fn zero_translations(dash: &ObjectRef, thumbnails: &ObjectRef, search_entry: &ObjectRef) {
    {
        let mut dash = dash.borrow_mut();
        dash.set_prop("translation-x", 0.0);
        dash.set_prop("translation-y", 0.0);
    }
    {
        let mut tmb = thumbnails.borrow_mut();
        tmb.set_prop("translation-x", 0.0);
        tmb.set_prop("translation-y", 0.0);
    }
    search_entry.borrow_mut().set_prop("translation-y", 0.0);
}

//  Tests
