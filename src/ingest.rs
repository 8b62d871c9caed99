//! Ingestion run orchestration.
//!
//! Coordinates the full pipeline: discovery → per-file parse tasks on a
//! bounded worker pool → aggregation into one corpus. Parse tasks are
//! explicit jobs returning their own record sequence; progress flows back
//! as messages on a channel. Per-file failures degrade to empty
//! contributions; only directory-level failures are terminal.
//!
//! The run owns a scratch directory for archive expansion and removes it
//! on teardown, error paths included.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::archive;
use crate::config::IngestConfig;
use crate::discovery::{self, CandidateFile, FileClass};
use crate::error::IngestError;
use crate::eventlog::EventLogSource;
use crate::format::{self, LogFormat};
use crate::progress::ProgressEvent;

/// Lifecycle of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    Idle,
    Discovering,
    Processing,
    Aggregating,
    Done,
    Failed,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Newline-joined normalized records.
    pub corpus: String,
    pub total_lines: usize,
    pub files_discovered: usize,
    pub files_parsed: usize,
    /// Tasks dropped because the line budget was already spent.
    pub files_skipped: usize,
}

enum TaskOutcome {
    Parsed(Vec<String>),
    Skipped,
}

/// Runs ingestion over a root directory.
pub struct Ingestor {
    config: IngestConfig,
    events: Arc<dyn EventLogSource>,
    phase: IngestPhase,
}

impl Ingestor {
    pub fn new(config: IngestConfig, events: Arc<dyn EventLogSource>) -> Self {
        Self {
            config,
            events,
            phase: IngestPhase::Idle,
        }
    }

    pub fn phase(&self) -> IngestPhase {
        self.phase
    }

    /// Run the pipeline over `root`. Progress events are fire-and-forget;
    /// a dropped receiver never stalls the run.
    pub async fn run(
        &mut self,
        root: &Path,
        progress: &UnboundedSender<ProgressEvent>,
    ) -> Result<IngestReport, IngestError> {
        self.phase = IngestPhase::Discovering;
        let _ = progress.send(ProgressEvent::DiscoveryStarted {
            root: root.to_path_buf(),
        });

        let candidates = match discovery::discover(root, &self.config) {
            Ok(c) => c,
            Err(e) => return Err(self.fail(progress, e.into())),
        };

        if candidates.is_empty() {
            return Err(self.fail(
                progress,
                IngestError::NoSupportedFiles(root.to_path_buf()),
            ));
        }

        let files_discovered = candidates.len();
        let _ = progress.send(ProgressEvent::FilesDiscovered {
            count: files_discovered,
        });

        // Scratch space for archive expansion, removed when the run ends.
        let scratch = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => return Err(self.fail(progress, IngestError::Io(e))),
        };

        self.phase = IngestPhase::Processing;

        let semaphore = Arc::new(Semaphore::new(self.config.worker_count()));
        let budget = Arc::new(AtomicUsize::new(self.config.max_lines));
        let config = Arc::new(self.config.clone());

        let mut tasks = JoinSet::new();
        for (index, candidate) in candidates.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let budget = Arc::clone(&budget);
            let config = Arc::clone(&config);
            let events = Arc::clone(&self.events);
            let progress = progress.clone();
            let archive_scratch = scratch.path().join(format!("archive-{}", index));

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return TaskOutcome::Skipped,
                };

                // Budget spent before this task got a worker: skip it.
                if budget.load(Ordering::SeqCst) == 0 {
                    let _ = progress.send(ProgressEvent::FileSkipped {
                        path: candidate.path.clone(),
                    });
                    return TaskOutcome::Skipped;
                }

                let _ = progress.send(ProgressEvent::FileStarted {
                    path: candidate.path.clone(),
                });

                let path = candidate.path.clone();
                let parse = tokio::task::spawn_blocking(move || {
                    process_candidate(&candidate, &config, events.as_ref(), &archive_scratch)
                });
                let mut lines = match parse.await {
                    Ok(lines) => lines,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "parse task failed");
                        Vec::new()
                    }
                };

                // Keep only what the remaining budget allows. The parse
                // itself is never interrupted; excess output is dropped.
                let kept = reserve(&budget, lines.len());
                lines.truncate(kept);

                let _ = progress.send(ProgressEvent::FileFinished {
                    path,
                    lines: kept,
                });
                TaskOutcome::Parsed(lines)
            });
        }

        let mut per_task: Vec<Vec<String>> = Vec::new();
        let mut files_parsed = 0usize;
        let mut files_skipped = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Parsed(lines)) => {
                    files_parsed += 1;
                    per_task.push(lines);
                }
                Ok(TaskOutcome::Skipped) => files_skipped += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "ingestion task aborted");
                }
            }
        }

        self.phase = IngestPhase::Aggregating;

        let all_lines: Vec<String> = per_task.into_iter().flatten().collect();
        let total_lines = all_lines.len();
        let corpus = all_lines.join("\n");

        self.phase = IngestPhase::Done;
        let _ = progress.send(ProgressEvent::Completed { total_lines });

        drop(scratch);

        Ok(IngestReport {
            corpus,
            total_lines,
            files_discovered,
            files_parsed,
            files_skipped,
        })
    }

    fn fail(&mut self, progress: &UnboundedSender<ProgressEvent>, error: IngestError) -> IngestError {
        self.phase = IngestPhase::Failed;
        let _ = progress.send(ProgressEvent::Failed {
            message: error.to_string(),
        });
        error
    }
}

/// Atomically take up to `want` from the remaining budget; returns the
/// amount actually reserved.
fn reserve(budget: &AtomicUsize, want: usize) -> usize {
    let mut current = budget.load(Ordering::SeqCst);
    loop {
        if current == 0 || want == 0 {
            return 0;
        }
        let take = want.min(current);
        match budget.compare_exchange(current, current - take, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return take,
            Err(observed) => current = observed,
        }
    }
}

/// Parse one candidate: direct files dispatch straight to their format
/// parser; archives expand into their own scratch subdirectory and the
/// extracted files are parsed with the same dispatch rules.
fn process_candidate(
    candidate: &CandidateFile,
    config: &IngestConfig,
    events: &dyn EventLogSource,
    archive_scratch: &Path,
) -> Vec<String> {
    match candidate.class(config) {
        FileClass::Direct => format::parse_file(
            &candidate.path,
            LogFormat::from_extension(&candidate.extension),
            events,
        ),
        FileClass::Archive => {
            if let Err(e) = std::fs::create_dir_all(archive_scratch) {
                tracing::warn!(path = %candidate.path.display(), error = %e, "cannot create scratch dir");
                return Vec::new();
            }
            if !archive::expand(&candidate.path, archive_scratch) {
                return Vec::new();
            }

            let extracted =
                discovery::discover_extracted(archive_scratch, &candidate.path, config);
            let mut lines = Vec::new();
            for file in extracted {
                lines.extend(format::parse_file(
                    &file.path,
                    LogFormat::from_extension(&file.extension),
                    events,
                ));
            }
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eventlog::UnavailableEventLog;
    use std::collections::HashSet;
    use std::fs;
    use std::io::Write;
    use tokio::sync::mpsc;

    fn ingestor(config: IngestConfig) -> Ingestor {
        Ingestor::new(config, Arc::new(UnavailableEventLog))
    }

    fn channel() -> (
        UnboundedSender<ProgressEvent>,
        mpsc::UnboundedReceiver<ProgressEvent>,
    ) {
        mpsc::unbounded_channel()
    }

    fn drain(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn missing_root_fails_terminally() {
        let (tx, rx) = channel();
        let mut ing = ingestor(IngestConfig::default());
        let err = ing.run(Path::new("/nonexistent/loglens"), &tx).await.unwrap_err();
        assert!(matches!(err, IngestError::DirectoryNotFound(_)));
        assert_eq!(ing.phase(), IngestPhase::Failed);
        assert!(drain(rx)
            .iter()
            .any(|e| matches!(e, ProgressEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn empty_walk_reports_no_supported_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("image.png"), b"png").unwrap();

        let (tx, _rx) = channel();
        let mut ing = ingestor(IngestConfig::default());
        let err = ing.run(tmp.path(), &tx).await.unwrap_err();
        assert!(matches!(err, IngestError::NoSupportedFiles(_)));
        assert_eq!(ing.phase(), IngestPhase::Failed);
    }

    #[tokio::test]
    async fn aggregates_mixed_formats_as_multiset() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("app.log"), "plain one\nplain two\n").unwrap();
        fs::write(tmp.path().join("rows.csv"), "a,b\n1,2\n").unwrap();
        fs::write(tmp.path().join("conf.ini"), "[s]\nk=v\n").unwrap();

        let (tx, rx) = channel();
        let mut ing = ingestor(IngestConfig::default());
        let report = ing.run(tmp.path(), &tx).await.unwrap();

        assert_eq!(ing.phase(), IngestPhase::Done);
        assert_eq!(report.files_discovered, 3);
        assert_eq!(report.files_parsed, 3);
        assert_eq!(report.total_lines, 5);

        let lines: HashSet<&str> = report.corpus.lines().collect();
        for expected in ["plain one", "plain two", "a: 1 | b: 2", "[s]", "k = v"] {
            assert!(lines.contains(expected), "missing line: {}", expected);
        }

        let events = drain(rx);
        assert!(matches!(events[0], ProgressEvent::DiscoveryStarted { .. }));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::FilesDiscovered { count: 3 })));
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Completed { total_lines: 5 })));
    }

    #[tokio::test]
    async fn zip_archive_contributes_union_of_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("bundle.zip");
        {
            let file = fs::File::create(&archive).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("inner.json", opts).unwrap();
            zip.write_all(b"{\"x\":1}\n").unwrap();
            zip.start_file("inner.txt", opts).unwrap();
            zip.write_all(b"hello from txt\n").unwrap();
            zip.finish().unwrap();
        }

        let (tx, _rx) = channel();
        let mut ing = ingestor(IngestConfig::default());
        let report = ing.run(tmp.path(), &tx).await.unwrap();

        assert!(report.corpus.contains("\"x\": 1"));
        assert!(report.corpus.contains("hello from txt"));
    }

    #[tokio::test]
    async fn nested_archives_stay_opaque() {
        let tmp = tempfile::tempdir().unwrap();
        let outer = tmp.path().join("outer.zip");
        {
            let file = fs::File::create(&outer).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("inner.zip", opts).unwrap();
            zip.write_all(b"PK\x03\x04fake").unwrap();
            zip.start_file("real.txt", opts).unwrap();
            zip.write_all(b"kept\n").unwrap();
            zip.finish().unwrap();
        }

        let (tx, _rx) = channel();
        let mut ing = ingestor(IngestConfig::default());
        let report = ing.run(tmp.path(), &tx).await.unwrap();

        assert_eq!(report.corpus, "kept");
    }

    #[tokio::test]
    async fn line_cap_bounds_aggregate_output() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..4 {
            let body: String = (0..10).map(|j| format!("file{} line{}\n", i, j)).collect();
            fs::write(tmp.path().join(format!("f{}.log", i)), body).unwrap();
        }

        let config = IngestConfig {
            max_lines: 7,
            ..IngestConfig::default()
        };
        let (tx, _rx) = channel();
        let mut ing = ingestor(config);
        let report = ing.run(tmp.path(), &tx).await.unwrap();

        assert_eq!(report.total_lines, 7);
        assert_eq!(report.corpus.lines().count(), 7);
        assert_eq!(ing.phase(), IngestPhase::Done);
    }

    #[tokio::test]
    async fn corrupt_archive_degrades_to_empty_contribution() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("broken.zip"), b"not really a zip").unwrap();
        fs::write(tmp.path().join("app.log"), "still here\n").unwrap();

        let (tx, _rx) = channel();
        let mut ing = ingestor(IngestConfig::default());
        let report = ing.run(tmp.path(), &tx).await.unwrap();

        assert_eq!(report.corpus, "still here");
        assert_eq!(ing.phase(), IngestPhase::Done);
    }

    #[test]
    fn reserve_is_exact_under_contention() {
        let budget = AtomicUsize::new(10);
        assert_eq!(reserve(&budget, 4), 4);
        assert_eq!(reserve(&budget, 4), 4);
        assert_eq!(reserve(&budget, 4), 2);
        assert_eq!(reserve(&budget, 4), 0);
    }
}
