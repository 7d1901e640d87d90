//! Background tasks of the running service.

pub mod reaper;

pub use reaper::{SessionReaper, spawn_reaper};
