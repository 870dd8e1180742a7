//! FieldSync: sync lifecycle coordination for a field data collection client
//!
//! - `sync` holds task handles, the task registry and the step-based worker
//! - `services` holds the connectivity monitor, notifications and the
//!   coordinator tying them to the options menu
//! - `app` is the screen shell that delegates menu events to the coordinator
//! - `session` and `settings` carry the process-lifetime state and config

#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod services;
pub mod session;
pub mod settings;
pub mod sync;
pub mod ui;

pub use app::FieldApp;
pub use services::SyncLifecycleCoordinator;
pub use session::{Session, User};
