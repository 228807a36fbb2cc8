#![forbid(unsafe_code)]

//! Core domain model and session logic for setlog.
//!
//! This crate provides:
//! - Domain types (exercises, sets, templates, completed workouts)
//! - The active session controller and its clock, ticker and events
//! - The lifecycle adapter for host suspend/resume signals
//! - Persistence (WAL, performance book, CSV rollup, history)

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod clock;
pub mod events;
pub mod heart_rate;
pub mod controller;
pub mod ticker;
pub mod lifecycle;
pub mod wal;
pub mod state;
pub mod store;
pub mod csv_rollup;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{get_default_catalog, Catalog};
pub use config::{Config, SessionConfig};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{SessionEvent, SessionOutcome};
pub use controller::{SessionController, SessionPhase, SharedController};
pub use ticker::Ticker;
pub use lifecycle::{GraceScheduler, GraceToken, LifecycleAdapter, LoggingGraceScheduler};
pub use store::{FileStore, MemoryStore, PerformanceStore};
pub use history::{load_recent_workouts, WorkoutSummary};
