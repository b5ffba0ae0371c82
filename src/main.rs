//! Entry point for the **overshell** simulator.
//!
//! There is no real shell in here: the binary wires the
//! [`Coordinator`](overshell::coordinator::Coordinator) to an in-memory
//! settings store and an in-memory host double, then walks through a
//! scripted session — activate, restyle, survive a dash replacement,
//! deactivate.  Run with `RUST_LOG=debug` to watch the lifecycle.
//!
//! With `--stdin`, the script is skipped and JSON-encoded
//! [`Event`](overshell::event::Event)s are read from standard input
//! instead, one per line:
//!
//! ```json
//! {"ConfigChanged":"dash-position"}
//! "OverviewShowing"
//! {"SessionLockChanged":true}
//! ```

use log::{error, info};
use overshell::coordinator::Coordinator;
use overshell::event::Event;
use overshell::host::{stock_dash_at, ShellHost};
use overshell::settings::{MemorySettings, SettingsStore};
use serde_json::json;
use std::io::BufRead;
use std::rc::Rc;
use std::time::{Duration, Instant};

//  In-memory host double

mod sim_shell {
    use log::info;
    use overshell::host::{ShellGraph, ShellHost, SignalId, SignalKind};
    use std::cell::Cell;

    /// Host double for the simulator: owns a stock graph, logs
    /// notifications, and hands out subscription ids.
    pub struct SimShell {
        graph: ShellGraph,
        next_signal: Cell<u64>,
        locked: Cell<bool>,
    }

    impl SimShell {
        pub fn new() -> Self {
            Self {
                graph: ShellGraph::new(),
                next_signal: Cell::new(0),
                locked: Cell::new(false),
            }
        }
    }

    impl ShellHost for SimShell {
        fn graph(&self) -> &ShellGraph {
            &self.graph
        }

        fn connect(&self, signal: SignalKind) -> SignalId {
            self.next_signal.set(self.next_signal.get() + 1);
            info!("host: connected {signal}");
            SignalId(self.next_signal.get())
        }

        fn disconnect(&self, id: SignalId) {
            info!("host: disconnected {:?}", id);
        }

        fn notify(&self, summary: &str, body: &str) {
            info!("notification: {summary}: {body}");
        }

        fn active_workspace_index(&self) -> u32 {
            2
        }

        fn is_locked(&self) -> bool {
            self.locked.get()
        }
    }
}

use sim_shell::SimShell;

fn main() {
    env_logger::init();

    let stdin_mode = std::env::args().any(|a| a == "--stdin");

    let settings = Rc::new(MemorySettings::with_defaults());
    let mut coordinator = Coordinator::new(SimShell::new(), settings.clone());

    if stdin_mode {
        run_stdin(&mut coordinator);
    } else {
        run_script(&mut coordinator, &settings);
    }
}

/// Pump after letting pending deferred work come due.
fn settle(coordinator: &mut Coordinator<SimShell>, wait: Duration) {
    std::thread::sleep(wait);
    if let Err(e) = coordinator.pump(Instant::now()) {
        error!("pump error: {e}");
        std::process::exit(1);
    }
}

fn report(coordinator: &Coordinator<SimShell>) {
    let graph = coordinator.host().graph();
    let dash = graph.dash();
    info!(
        "overview: orientation={} dash-position={} panel-barrier={} grid={}x{}",
        graph
            .workspaces_view
            .borrow()
            .prop_str("orientation")
            .unwrap_or("?"),
        dash.borrow().prop_i64("position", -1),
        graph.layout_manager.borrow().prop_bool("panel-barrier", true),
        graph.icon_grid.borrow().prop_i64("columns-per-page", 0),
        graph.icon_grid.borrow().prop_i64("rows-per-page", 0),
    );
}

//  Scripted session

fn run_script(coordinator: &mut Coordinator<SimShell>, settings: &Rc<MemorySettings>) {
    info!("simulator: activating");
    coordinator.activate(Instant::now());
    settle(coordinator, Duration::from_millis(450));
    report(coordinator);

    info!("simulator: moving the dash to the right edge");
    settings.set("dash-position", json!(1));
    settle(coordinator, Duration::from_millis(10));
    report(coordinator);

    info!("simulator: a competing dock replaces the dash");
    settings.set("fix-external-dock", json!(true));
    settle(coordinator, Duration::from_millis(10));
    coordinator.host().graph().replace_dash(stock_dash_at(2));
    let sender = coordinator.sender();
    let _ = sender.send(Event::OverviewShowing);
    settle(coordinator, Duration::from_millis(10));
    report(coordinator);

    info!("simulator: deactivating");
    if let Err(e) = coordinator.deactivate() {
        error!("deactivate error: {e}");
        std::process::exit(1);
    }
    report(coordinator);
    info!("simulator: done");
}

//  Stdin event tap

fn run_stdin(coordinator: &mut Coordinator<SimShell>) {
    info!("simulator: reading events from stdin");
    coordinator.activate(Instant::now());
    settle(coordinator, Duration::from_millis(450));

    let sender = coordinator.sender();
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("read error: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(&line) {
            Ok(event) => {
                let _ = sender.send(event);
            }
            Err(e) => {
                error!("bad event: {line}: {e}");
                continue;
            }
        }
        settle(coordinator, Duration::from_millis(10));
        report(coordinator);
    }

    if let Err(e) = coordinator.deactivate() {
        error!("deactivate error: {e}");
        std::process::exit(1);
    }
    info!("simulator: done");
}
