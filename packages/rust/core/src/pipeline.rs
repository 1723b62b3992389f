//! End-to-end horoscope run: sources → records → prompt → generation → checkpoint.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, instrument, warn};

use horoscope_generation::GenerationClient;
use horoscope_shared::{HoroscopeError, Record, Result, RunConfig, SourceFile};
use horoscope_sources::{RecordIter, enumerate_sources, read_records};

use crate::checkpoint::{EnrichedRecord, ResultAccumulator, checkpoint_path, write_checkpoint};
use crate::context::format_context;
use crate::prompt::PromptTemplate;

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Checkpoint file, or `None` when no horoscope was generated.
    pub output_path: Option<PathBuf>,
    /// Records pulled from the sources (bounded by the limit).
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Source files that could not be opened or parsed.
    pub files_skipped: usize,
    /// Number of checkpoint writes, including the final one.
    pub checkpoints_written: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn produced_output(&self) -> bool {
        self.output_path.is_some()
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a record is sent for generation, with its summary.
    fn record_started(&self, index: usize, source_file: &str, context: &str);
    /// Called when generation for a record failed.
    fn record_failed(&self, index: usize, error: &str);
    /// Called after each checkpoint write.
    fn checkpoint_written(&self, path: &std::path::Path, records: usize);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_started(&self, _index: usize, _source_file: &str, _context: &str) {}
    fn record_failed(&self, _index: usize, _error: &str) {}
    fn checkpoint_written(&self, _path: &std::path::Path, _records: usize) {}
    fn done(&self, _report: &RunReport) {}
}

/// Single-use cursor over `(file, record)` pairs across all sources.
///
/// Files are opened lazily in order. Once `limit` records have been yielded
/// the cursor stops without touching the remaining rows or files. A zero
/// limit means unlimited.
struct RecordCursor {
    files: std::vec::IntoIter<SourceFile>,
    current: Option<(String, RecordIter)>,
    yielded: usize,
    limit: Option<usize>,
    files_skipped: usize,
}

impl RecordCursor {
    fn new(files: Vec<SourceFile>, limit: Option<usize>) -> Self {
        Self {
            files: files.into_iter(),
            current: None,
            yielded: 0,
            limit: limit.filter(|l| *l > 0),
            files_skipped: 0,
        }
    }
}

impl Iterator for RecordCursor {
    type Item = (String, Record);

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit.is_some_and(|limit| self.yielded >= limit) {
            return None;
        }

        loop {
            if let Some((name, rows)) = &mut self.current {
                if let Some(record) = rows.next() {
                    self.yielded += 1;
                    return Some((name.clone(), record));
                }
                self.current = None;
            }

            let source = self.files.next()?;
            match read_records(&source) {
                Ok(rows) => {
                    debug!(file = %source, "reading source file");
                    self.current = Some((source.file_name(), rows));
                }
                Err(e) => {
                    warn!(file = %source, error = %e, "failed to read source file, skipping");
                    self.files_skipped += 1;
                }
            }
        }
    }
}

/// Run the full horoscope batch.
///
/// 1. Resolve source files
/// 2. Create the output directory and fix the checkpoint path
/// 3. For each record: build the prompt, generate, accumulate
/// 4. Checkpoint every `checkpoint_every` successes and once at the end
///
/// Generation failures and unreadable files are skipped with a warning.
/// Everything else that goes wrong aborts the run.
#[instrument(skip_all, fields(data_dir = %config.data_dir.display(), model = %client.model_name()))]
pub async fn run_pipeline(
    config: &RunConfig,
    template: &PromptTemplate,
    client: &dyn GenerationClient,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let start = Instant::now();

    // --- Phase 1: Sources ---
    progress.phase("Resolving source files");
    let files = enumerate_sources(
        &config.data_dir,
        config.target_file.as_deref(),
        &config.extensions,
    )?;
    info!(files = files.len(), limit = ?config.record_limit, "starting horoscope run");

    // --- Phase 2: Output ---
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| HoroscopeError::io(&config.output_dir, e))?;
    let output_path = checkpoint_path(&config.output_dir, Local::now());

    // --- Phase 3: Generation ---
    progress.phase("Generating horoscopes");
    let mut cursor = RecordCursor::new(files, config.record_limit);
    let mut results = ResultAccumulator::new();
    let mut attempted = 0;
    let mut failed = 0;
    let mut checkpoints_written = 0;

    for (source_file, record) in cursor.by_ref() {
        attempted += 1;
        let context = format_context(&record);
        info!(index = attempted, file = %source_file, "processing record");
        debug!(index = attempted, %context, "record context");
        progress.record_started(attempted, &source_file, &context);

        let prompt = template.render(&record);
        let horoscope = match client.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(index = attempted, file = %source_file, error = %e, "generation failed, skipping record");
                progress.record_failed(attempted, &e.to_string());
                failed += 1;
                continue;
            }
        };

        results.push(EnrichedRecord::new(&record, source_file, horoscope));

        if config.checkpoint_every > 0 && results.len() % config.checkpoint_every == 0 {
            write_checkpoint(&results, &output_path)?;
            checkpoints_written += 1;
            info!(records = results.len(), path = %output_path.display(), "checkpoint saved");
            progress.checkpoint_written(&output_path, results.len());
        }
    }

    // --- Phase 4: Final checkpoint ---
    let output_path = if results.is_empty() {
        warn!("no horoscopes were generated, nothing written");
        None
    } else {
        progress.phase("Saving results");
        write_checkpoint(&results, &output_path)?;
        checkpoints_written += 1;
        progress.checkpoint_written(&output_path, results.len());
        Some(output_path)
    };

    let report = RunReport {
        output_path,
        attempted,
        succeeded: results.len(),
        failed,
        files_skipped: cursor.files_skipped,
        checkpoints_written,
        elapsed: start.elapsed(),
    };

    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        files_skipped = report.files_skipped,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "horoscope run complete"
    );

    progress.done(&report);
    Ok(report)
}
