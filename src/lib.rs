//! filesort - sort files into category subfolders
//!
//! This library scans a set of source folders, classifies files by extension
//! against a user-editable category table, moves them into per-category
//! subfolders of a destination root under a configurable duplicate policy,
//! and can undo the most recent run.

pub mod category;
pub mod cli;
pub mod config;
pub mod mover;
pub mod output;
pub mod preview;
pub mod undo;
pub mod worker;

pub use category::{CategoryError, CategoryTable};
pub use config::{Settings, SettingsError};
pub use mover::{DuplicatePolicy, MoveError, MoveOutcome, RunEvent, RunReport, execute_plan, move_file};
pub use preview::{PreviewEntry, build_preview};
pub use undo::{MoveRecord, UndoLog, UndoReport};
pub use worker::{Job, JobResult, SortWorker, WorkerBusy};

pub use cli::{Cli, run};
