//! Worker tasks that back the runtime orchestration.
//!
//! The autosave worker owns every repository write so engine operations never
//! wait on disk.

mod autosave;

pub use autosave::{AutosaveWorker, Command};
