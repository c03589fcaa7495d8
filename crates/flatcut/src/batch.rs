//! Batch runner: one job per input file on a rayon pool.
//!
//! Jobs share nothing but the [`Reporter`]. A failed file is recorded and the
//! batch moves on; only configuration problems stop a run before it starts.
//!
//! Output names are planned before any job runs. When two inputs map to the
//! same output (`part.step` and `part.stp`, `a b.step` and `a_b.step`), or an
//! output would replace another input, the later input fails with
//! [`ConvertError::OutputConflict`] and nothing of it is written.

use crate::config::{Config, ConfigError};
use crate::convert::{convert_step, output_paths, PartSummary};
use crate::error::{ConvertError, ErrorKind};
use crate::rotate::{already_rotated, rotate_dxf, rotated_path};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Shared flag for stopping a batch between files.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask running batches to stop before their next file.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How one file ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// All outputs were written.
    Succeeded {
        /// Files written.
        outputs: Vec<PathBuf>,
        /// Part facts, for STEP inputs.
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<PartSummary>,
    },
    /// The file failed; the batch went on.
    Failed {
        /// Error kind.
        kind: ErrorKind,
        /// Full message.
        message: String,
    },
    /// The file was not processed.
    Skipped {
        /// Why.
        reason: String,
    },
}

/// One input and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    /// Input file.
    pub input: PathBuf,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// All files of a run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Per-file results.
    pub files: Vec<FileReport>,
}

impl BatchReport {
    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }

    /// Files that succeeded.
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Succeeded { .. }))
    }

    /// Files that failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    /// Files that were skipped.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Skipped { .. }))
    }

    /// Whether any file failed.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Pretty JSON of the whole report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Thread-safe progress sink shared by the jobs of one batch.
#[derive(Debug)]
pub struct Reporter {
    total: usize,
    done: AtomicUsize,
    files: Mutex<Vec<(usize, FileReport)>>,
}

impl Reporter {
    /// Reporter for `total` files.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: AtomicUsize::new(0),
            files: Mutex::new(Vec::with_capacity(total)),
        }
    }

    /// Record the report for the input at `index`. Returns the number of
    /// files finished so far.
    pub fn record(&self, index: usize, report: FileReport) -> usize {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((index, report));
        self.done.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Files finished so far.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Files in the batch.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Collect the reports in input order.
    pub fn finish(self) -> BatchReport {
        let mut files = self
            .files
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        files.sort_by_key(|(index, _)| *index);
        BatchReport {
            files: files.into_iter().map(|(_, report)| report).collect(),
        }
    }
}

/// Run the pipeline over `inputs`.
pub fn run_batch(
    inputs: &[PathBuf],
    config: &Config,
    cancel: &CancellationToken,
) -> Result<BatchReport, ConfigError> {
    run_batch_with(inputs, config, cancel, |_, _, _| {})
}

/// Run the pipeline over `inputs`, calling `on_progress(report, done, total)`
/// from the worker that finished each file.
pub fn run_batch_with<F>(
    inputs: &[PathBuf],
    config: &Config,
    cancel: &CancellationToken,
    on_progress: F,
) -> Result<BatchReport, ConfigError>
where
    F: Fn(&FileReport, usize, usize) + Sync,
{
    config.validate()?;
    if let Some(dir) = &config.output_dir {
        fs::create_dir_all(dir).map_err(|e| ConfigError::OutputDir {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| ConfigError::Invalid {
            field: "threads",
            reason: e.to_string(),
        })?;
    info!(files = inputs.len(), threads = pool.current_num_threads(), "starting batch");

    let conflicts = output_conflicts(inputs, config);
    let reporter = Reporter::new(inputs.len());
    pool.install(|| {
        inputs.par_iter().enumerate().for_each(|(index, input)| {
            let report = FileReport {
                input: input.clone(),
                outcome: process_file(input, config, conflicts[index].as_ref(), cancel),
            };
            let done = reporter.record(index, report.clone());
            on_progress(&report, done, reporter.total());
        });
    });

    let report = reporter.finish();
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        skipped = report.skipped(),
        "batch finished"
    );
    Ok(report)
}

/// Which pipeline handles a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// `.step` or `.stp`.
    Step,
    /// `.dxf`.
    Dxf,
}

impl InputKind {
    /// Classify by extension, case-insensitively.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "step" | "stp" => Some(InputKind::Step),
            "dxf" => Some(InputKind::Dxf),
            _ => None,
        }
    }
}

/// Files `input` will write.
fn planned_outputs(input: &Path, config: &Config) -> Vec<PathBuf> {
    match InputKind::of(input) {
        Some(InputKind::Step) => output_paths(input, config),
        Some(InputKind::Dxf) if !already_rotated(input, &config.rotator.suffix) => {
            vec![rotated_path(input, config)]
        }
        _ => Vec::new(),
    }
}

/// Per input, the first planned output that is already taken, and the input
/// holding it. Inputs own their own paths; outputs are claimed in input
/// order.
fn output_conflicts(inputs: &[PathBuf], config: &Config) -> Vec<Option<(PathBuf, PathBuf)>> {
    let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
    for (index, input) in inputs.iter().enumerate() {
        claimed.entry(input.clone()).or_insert(index);
    }

    let mut conflicts = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let outputs = planned_outputs(input, config);
        let taken = outputs.iter().find_map(|out| match claimed.get(out) {
            Some(&owner) if owner != index => Some((out.clone(), inputs[owner].clone())),
            _ => None,
        });
        if taken.is_none() {
            for out in outputs {
                claimed.insert(out, index);
            }
        }
        conflicts.push(taken);
    }
    conflicts
}

fn process_file(
    input: &Path,
    config: &Config,
    conflict: Option<&(PathBuf, PathBuf)>,
    cancel: &CancellationToken,
) -> FileOutcome {
    if cancel.is_cancelled() {
        debug!(file = %input.display(), "cancelled before start");
        return FileOutcome::Skipped {
            reason: "batch cancelled".into(),
        };
    }

    let result = match (conflict, InputKind::of(input)) {
        (Some((path, other)), _) => Err(ConvertError::OutputConflict {
            path: path.clone(),
            other: other.clone(),
        }),
        (None, Some(InputKind::Step)) => {
            convert_step(input, config).map(|c| FileOutcome::Succeeded {
                outputs: c.outputs,
                summary: Some(c.summary),
            })
        }
        (None, Some(InputKind::Dxf)) if already_rotated(input, &config.rotator.suffix) => {
            return FileOutcome::Skipped {
                reason: format!("already ends in {}", config.rotator.suffix),
            };
        }
        (None, Some(InputKind::Dxf)) => rotate_dxf(input, config).map(|r| FileOutcome::Succeeded {
            outputs: vec![r.output],
            summary: None,
        }),
        (None, None) => Err(ConvertError::UnknownInput {
            path: input.to_path_buf(),
        }),
    };

    result.unwrap_or_else(|e| {
        warn!(file = %input.display(), kind = %e.kind(), error = %e, "file failed");
        FileOutcome::Failed {
            kind: e.kind(),
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind() {
        assert_eq!(InputKind::of(Path::new("a.STEP")), Some(InputKind::Step));
        assert_eq!(InputKind::of(Path::new("a.stp")), Some(InputKind::Step));
        assert_eq!(InputKind::of(Path::new("dir/a.Dxf")), Some(InputKind::Dxf));
        assert_eq!(InputKind::of(Path::new("a.igs")), None);
        assert_eq!(InputKind::of(Path::new("README")), None);
    }

    #[test]
    fn test_reporter_keeps_input_order() {
        let reporter = Reporter::new(3);
        let skipped = |name: &str| FileReport {
            input: name.into(),
            outcome: FileOutcome::Skipped {
                reason: "test".into(),
            },
        };
        assert_eq!(reporter.record(2, skipped("c")), 1);
        assert_eq!(reporter.record(0, skipped("a")), 2);
        assert_eq!(reporter.record(1, skipped("b")), 3);
        assert_eq!(reporter.done(), 3);

        let report = reporter.finish();
        let names: Vec<_> = report.files.iter().map(|f| f.input.clone()).collect();
        assert_eq!(names, vec![PathBuf::from("a"), "b".into(), "c".into()]);
        assert_eq!(report.skipped(), 3);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_report_json_shape() {
        let report = BatchReport {
            files: vec![FileReport {
                input: "bad.step".into(),
                outcome: FileOutcome::Failed {
                    kind: ErrorKind::AmbiguousAxis,
                    message: "cube".into(),
                },
            }],
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let file = &json["files"][0];
        assert_eq!(file["input"], "bad.step");
        assert_eq!(file["status"], "failed");
        assert_eq!(file["kind"], "AmbiguousAxis");
    }

    #[test]
    fn test_record_survives_poisoned_lock() {
        let reporter = Reporter::new(2);
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = reporter.files.lock().unwrap();
            panic!("job panicked while recording");
        }));
        assert!(poisoned.is_err());
        assert!(reporter.files.is_poisoned());

        let failed = FileReport {
            input: "a.step".into(),
            outcome: FileOutcome::Failed {
                kind: ErrorKind::Load,
                message: "bad".into(),
            },
        };
        assert_eq!(reporter.record(0, failed.clone()), 1);
        let report = reporter.finish();
        assert_eq!(report.files, vec![failed]);
        assert!(report.has_failures());
    }

    #[test]
    fn test_output_conflicts() {
        let config = Config::default();
        let inputs: Vec<PathBuf> = [
            "/w/part.step",
            "/w/part.stp",
            "/w/a b.step",
            "/w/a_b.step",
            "/w/bracket.step",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();
        let conflicts = output_conflicts(&inputs, &config);
        assert_eq!(
            conflicts,
            vec![
                None,
                Some(("/w/part.dxf".into(), "/w/part.step".into())),
                None,
                Some(("/w/a_b.dxf".into(), "/w/a b.step".into())),
                None,
            ]
        );

        // an output may not replace another input
        let inputs = vec![PathBuf::from("/w/panel.step"), "/w/panel.dxf".into()];
        let conflicts = output_conflicts(&inputs, &config);
        assert_eq!(
            conflicts,
            vec![Some(("/w/panel.dxf".into(), "/w/panel.dxf".into())), None]
        );

        let outcome = process_file(
            &inputs[0],
            &config,
            conflicts[0].as_ref(),
            &CancellationToken::new(),
        );
        assert!(matches!(
            outcome,
            FileOutcome::Failed { kind: ErrorKind::ExportWrite, ref message } if message.contains("panel.dxf")
        ));
    }

    #[test]
    fn test_cancelled_token() {
        let token = CancellationToken::new();
        let shared = token.clone();
        assert!(!shared.is_cancelled());
        token.cancel();
        assert!(shared.is_cancelled());
        assert!(matches!(
            process_file(Path::new("x.step"), &Config::default(), None, &shared),
            FileOutcome::Skipped { .. }
        ));
    }
}
