//! Command-line interface.
//!
//! The command surface replaces the GUI the tool grew up with: it collects
//! the four configuration values (sources, destination, selected categories,
//! duplicate policy), previews the plan, and triggers runs and undos on the
//! background worker. Every mutating command persists the settings before
//! returning.

use crate::config::Settings;
use crate::mover::{DuplicatePolicy, RunEvent, RunReport};
use crate::output::OutputFormatter;
use crate::preview::{PreviewEntry, build_preview};
use crate::undo::{UndoLog, UndoReport};
use crate::worker::{Job, JobResult, SortWorker};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

/// Sort files from multiple source folders into category subfolders.
#[derive(Debug, Parser)]
#[command(name = "filesort", version, about)]
pub struct Cli {
    /// Settings file to use instead of ~/.config/filesort/settings.json.
    #[arg(long, global = true, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the move plan without touching any file.
    Preview,
    /// Execute the move plan.
    Sort {
        /// One-shot duplicate policy override; the configured policy is not
        /// changed.
        #[arg(long, value_enum)]
        policy: Option<DuplicatePolicy>,
    },
    /// Restore every file moved by the most recent run.
    Undo,
    /// Manage source folders.
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },
    /// Set the destination root folder.
    Dest { path: PathBuf },
    /// Set the duplicate policy applied on name collisions.
    Policy {
        #[arg(value_enum)]
        policy: DuplicatePolicy,
    },
    /// Manage categories and their extension lists.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Print the current configuration.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum SourceAction {
    /// Add one or more source folders.
    Add { paths: Vec<PathBuf> },
    /// Remove a source folder.
    Remove { path: PathBuf },
    /// Remove all source folders.
    Clear,
    /// List the configured source folders.
    List,
}

#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    /// List categories, their extensions and selection state.
    List,
    /// Add a category or replace an existing one's extension list.
    Set {
        name: String,
        /// Comma-separated extensions, with or without leading dots.
        extensions: String,
    },
    /// Delete a category and drop it from the selection.
    Remove { name: String },
    /// Include a category in the next preview and run.
    Select { name: String },
    /// Exclude a category from the next preview and run.
    Deselect { name: String },
}

/// Entry point for a parsed command line.
pub fn run(cli: Cli) -> Result<(), String> {
    let settings_path = cli.settings.unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&settings_path);

    match cli.command {
        Command::Preview => preview(&settings),
        Command::Sort { policy } => sort(&settings, &settings_path, policy),
        Command::Undo => undo(&settings_path),
        Command::Source { action } => {
            source(&mut settings, action)?;
            save(&settings, &settings_path)
        }
        Command::Dest { path } => {
            settings.set_destination(path);
            save(&settings, &settings_path)
        }
        Command::Policy { policy } => {
            settings.set_policy(policy);
            OutputFormatter::plain(&format!("Duplicate policy set to {}", policy));
            save(&settings, &settings_path)
        }
        Command::Category { action } => {
            let mutated = category(&mut settings, action)?;
            if mutated {
                save(&settings, &settings_path)
            } else {
                Ok(())
            }
        }
        Command::Show => {
            show(&settings);
            Ok(())
        }
    }
}

fn save(settings: &Settings, path: &std::path::Path) -> Result<(), String> {
    settings.save(path).map_err(|e| e.to_string())
}

fn current_plan(settings: &Settings) -> Vec<PreviewEntry> {
    build_preview(
        &settings.source_paths,
        &settings.destination_path,
        &settings.folder_lists,
        &settings.selected_categories,
    )
}

fn check_configured(settings: &Settings) -> Result<(), String> {
    if settings.source_paths.is_empty() {
        return Err("No source folders configured. Add one with 'filesort source add'.".into());
    }
    if settings.destination_path.as_os_str().is_empty() {
        return Err("No destination folder configured. Set one with 'filesort dest'.".into());
    }
    Ok(())
}

fn preview(settings: &Settings) -> Result<(), String> {
    check_configured(settings)?;
    let plan = current_plan(settings);
    if plan.is_empty() {
        OutputFormatter::plain("No files to sort.");
        return Ok(());
    }

    OutputFormatter::header("PLAN");
    let mut counts: HashMap<String, usize> = HashMap::new();
    for entry in &plan {
        let name = entry
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        OutputFormatter::plain(&format!(
            " - {} [{}] {} → {}",
            name,
            entry.category,
            entry.source.display(),
            entry.destination.display()
        ));
        *counts.entry(entry.category.clone()).or_insert(0) += 1;
    }
    OutputFormatter::summary_table(&counts, plan.len());
    Ok(())
}

fn sort(
    settings: &Settings,
    settings_path: &std::path::Path,
    policy_override: Option<DuplicatePolicy>,
) -> Result<(), String> {
    check_configured(settings)?;
    let plan = current_plan(settings);
    if plan.is_empty() {
        OutputFormatter::plain("No files to sort.");
        return Ok(());
    }

    let policy = policy_override.unwrap_or(settings.duplicate_mode);
    OutputFormatter::info(&format!(
        "Sorting {} file(s) into {} ({} on duplicates)",
        plan.len(),
        settings.destination_path.display(),
        policy
    ));

    let mut worker = SortWorker::spawn();
    worker
        .try_submit(Job::Run { plan, policy })
        .map_err(|e| e.to_string())?;
    let spinner = OutputFormatter::spinner("Sorting files...");
    let result = worker.wait();
    spinner.finish_and_clear();

    let (report, log) = match result {
        Ok(JobResult::Run(Ok(outcome))) => outcome,
        Ok(JobResult::Run(Err(e))) => return Err(e.to_string()),
        Ok(JobResult::Undo(_)) => return Err("Worker returned an unexpected result".into()),
        Err(_) => return Err("Worker exited before finishing the run".into()),
    };

    print_run_report(&report);

    // Replace the previous run's log: only the most recent run is undoable.
    let log_path = Settings::undo_log_path(settings_path);
    if log.is_empty() {
        if let Err(e) = UndoLog::delete(&log_path) {
            OutputFormatter::warning(&format!("Could not clear undo log: {}", e));
        }
    } else {
        match log.save(&log_path) {
            Ok(()) => OutputFormatter::plain("Use 'filesort undo' to revert this run."),
            Err(e) => OutputFormatter::warning(&format!("Could not save undo log: {}", e)),
        }
    }
    Ok(())
}

fn print_run_report(report: &RunReport) {
    for event in &report.events {
        match event {
            RunEvent::Moved { from, to } => {
                OutputFormatter::success(&format!("Moved: {} → {}", from.display(), to.display()));
            }
            RunEvent::Skipped { path } => {
                OutputFormatter::plain(&format!("Skipped (duplicate): {}", path.display()));
            }
            RunEvent::Missing { path } => {
                OutputFormatter::warning(&format!("Missing: {}", path.display()));
            }
            RunEvent::Failed { path, reason } => {
                OutputFormatter::error(&format!("Error moving {}: {}", path.display(), reason));
            }
        }
    }
    OutputFormatter::plain(&format!("Done. {}", report.summary()));
    if report.failed > 0 {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be moved. See errors above.",
            report.failed
        ));
    }
}

fn undo(settings_path: &std::path::Path) -> Result<(), String> {
    let log_path = Settings::undo_log_path(settings_path);
    let log = match UndoLog::load(&log_path) {
        Ok(Some(log)) if !log.is_empty() => log,
        Ok(_) => {
            OutputFormatter::plain("Nothing to undo.");
            return Ok(());
        }
        Err(e) => {
            // A log that cannot be read can never be replayed. Drop it so it
            // does not block every later undo.
            OutputFormatter::warning(&format!("Discarding unreadable undo log: {}", e));
            if let Err(e) = UndoLog::delete(&log_path) {
                OutputFormatter::warning(&format!("Could not delete undo log: {}", e));
            }
            OutputFormatter::plain("Nothing to undo.");
            return Ok(());
        }
    };

    let mut worker = SortWorker::spawn();
    worker
        .try_submit(Job::Undo { log })
        .map_err(|e| e.to_string())?;
    let spinner = OutputFormatter::spinner("Restoring files...");
    let result = worker.wait();
    spinner.finish_and_clear();

    let report = match result {
        Ok(JobResult::Undo(report)) => report,
        Ok(JobResult::Run(_)) => return Err("Worker returned an unexpected result".into()),
        Err(_) => return Err("Worker exited before finishing the undo".into()),
    };

    print_undo_report(&report);

    // The log is consumed by a single undo regardless of partial failure.
    if let Err(e) = UndoLog::delete(&log_path) {
        OutputFormatter::warning(&format!("Could not delete undo log: {}", e));
    }
    Ok(())
}

fn print_undo_report(report: &UndoReport) {
    OutputFormatter::plain(&format!(
        "Undo complete. Restored {} file(s).",
        report.restored
    ));
    for (path, reason) in &report.skipped {
        OutputFormatter::warning(&format!("Skipped {}: {}", path.display(), reason));
    }
    for (path, reason) in &report.failures {
        OutputFormatter::error(&format!("Failed to restore {}: {}", path.display(), reason));
    }
}

fn source(settings: &mut Settings, action: SourceAction) -> Result<(), String> {
    match action {
        SourceAction::Add { paths } => {
            if paths.is_empty() {
                return Err("No folder given.".into());
            }
            for path in paths {
                if settings.add_source(path.clone()) {
                    OutputFormatter::success(&format!("Added source {}", path.display()));
                } else {
                    OutputFormatter::plain(&format!("Already a source: {}", path.display()));
                }
            }
            Ok(())
        }
        SourceAction::Remove { path } => {
            if settings.remove_source(&path) {
                OutputFormatter::success(&format!("Removed source {}", path.display()));
                Ok(())
            } else {
                Err(format!("Not a configured source: {}", path.display()))
            }
        }
        SourceAction::Clear => {
            settings.clear_sources();
            OutputFormatter::plain("All source folders removed.");
            Ok(())
        }
        SourceAction::List => {
            if settings.source_paths.is_empty() {
                OutputFormatter::plain("No source folders configured.");
            }
            for path in &settings.source_paths {
                OutputFormatter::plain(&format!(" - {}", path.display()));
            }
            Ok(())
        }
    }
}

/// Returns whether the settings were mutated and need saving.
fn category(settings: &mut Settings, action: CategoryAction) -> Result<bool, String> {
    match action {
        CategoryAction::List => {
            for entry in settings.folder_lists.iter() {
                let marker = if settings.selected_categories.iter().any(|c| *c == entry.name) {
                    "[x]"
                } else {
                    "[ ]"
                };
                OutputFormatter::plain(&format!(
                    "{} {}: {}",
                    marker,
                    entry.name,
                    entry.extensions.join(", ")
                ));
            }
            Ok(false)
        }
        CategoryAction::Set { name, extensions } => {
            settings
                .set_category(&name, extensions.split(','))
                .map_err(|e| e.to_string())?;
            OutputFormatter::success(&format!("Category '{}' saved.", name.trim()));
            Ok(true)
        }
        CategoryAction::Remove { name } => {
            if settings.remove_category(&name) {
                OutputFormatter::success(&format!("Category '{}' removed.", name));
                Ok(true)
            } else {
                Err(format!("No category named '{}'", name))
            }
        }
        CategoryAction::Select { name } => {
            settings.select_category(&name).map_err(|e| e.to_string())?;
            Ok(true)
        }
        CategoryAction::Deselect { name } => {
            if settings.deselect_category(&name) {
                Ok(true)
            } else {
                Err(format!("Category '{}' was not selected", name))
            }
        }
    }
}

fn show(settings: &Settings) {
    OutputFormatter::header("SOURCES");
    if settings.source_paths.is_empty() {
        OutputFormatter::plain("(none)");
    }
    for path in &settings.source_paths {
        OutputFormatter::plain(&format!(" - {}", path.display()));
    }

    OutputFormatter::header("DESTINATION");
    if settings.destination_path.as_os_str().is_empty() {
        OutputFormatter::plain("(not set)");
    } else {
        OutputFormatter::plain(&format!("{}", settings.destination_path.display()));
    }

    OutputFormatter::header("DUPLICATE POLICY");
    OutputFormatter::plain(&settings.duplicate_mode.to_string());

    OutputFormatter::header("CATEGORIES");
    for entry in settings.folder_lists.iter() {
        let marker = if settings.selected_categories.iter().any(|c| *c == entry.name) {
            "[x]"
        } else {
            "[ ]"
        };
        OutputFormatter::plain(&format!(
            "{} {}: {}",
            marker,
            entry.name,
            entry.extensions.join(", ")
        ));
    }
}
