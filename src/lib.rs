//! **overshell** — a reversible override engine for desktop shell
//! overview layouts.
//!
//! The host shell's overview is restyled by replacing method slots on its
//! object graph: workspaces become a vertical column and the dash moves
//! to a screen edge.  Every replacement is captured so the shell can be
//! returned to its stock behaviour at any time.
//!
//! # Architecture
//!
//! The crate is organised around two core pieces:
//!
//! * [`overrides::OverrideRegistry`] — captures, replaces and restores
//!   method slots on host objects; one registry per module per enable
//!   cycle, torn down in reverse order and tolerant of targets the host
//!   has already dropped.
//! * [`coordinator::Coordinator`] — the process-wide enable/disable state
//!   machine.  It derives [`options::Options`] from the settings store,
//!   fans `update(reset)` out to the [`modules`] in a fixed order,
//!   debounces every recovery path through one pending reset action, and
//!   watches for the host replacing the dash out from under us.
//!
//! The host itself is abstract: [`host::ShellGraph`] models its object
//! graph and [`host::ShellHost`] its signals and services, so the engine
//! is not coupled to any specific shell.  Concrete collaborators live in
//! the test suites and in the simulator binary.

pub mod coordinator;
pub mod defer;
pub mod event;
pub mod host;
pub mod modules;
pub mod options;
pub mod overrides;
pub mod settings;
pub mod subsystem;
