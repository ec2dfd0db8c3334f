//! Export service with a thread pool for background renders
//!
//! The service owns a rayon thread pool and runs export jobs off the
//! control thread. Progress flows back through an mpsc channel; a shared
//! cancellation flag lets the control thread abandon a run mid-way.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rayon::prelude::*;

use super::{mixdown, stem_pcm, write_wav, ExportProgress};
use crate::track::Track;
use crate::types::StemId;

/// What one export job renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Raw PCM of one stem, no mix state applied
    Stem(StemId),
    /// Full mix under the current gain/mute/solo/master state
    Mixdown,
}

/// One file to write
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub kind: ExportKind,
    pub path: PathBuf,
}

impl ExportJob {
    fn filename(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Thread pool service for export operations
///
/// The pool is reusable - create once at startup, not per export.
pub struct ExportService {
    thread_pool: rayon::ThreadPool,
    /// Cancellation flag shared with workers
    cancel_flag: Arc<AtomicBool>,
}

impl ExportService {
    /// Create a new export service with 4 worker threads
    pub fn new() -> Self {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .thread_name(|i| format!("stem-export-{}", i))
            .build()
            .expect("Failed to create export thread pool");

        Self {
            thread_pool,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation of the current run
    ///
    /// Jobs already writing finish their file; queued jobs are skipped.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Run export jobs in the background
    ///
    /// The track is the control side's copy, so the mix state rendered is
    /// exactly what the caller sees. Returns a receiver for progress
    /// messages; poll it until a terminal message arrives.
    pub fn start_export(
        &self,
        track: Track,
        master_volume: f32,
        jobs: Vec<ExportJob>,
    ) -> Receiver<ExportProgress> {
        self.cancel_flag.store(false, Ordering::SeqCst);

        let (progress_tx, progress_rx) = channel();
        let cancel_flag = self.cancel_flag.clone();
        let total_jobs = jobs.len();

        self.thread_pool.spawn(move || {
            let start_time = Instant::now();

            let _ = progress_tx.send(ExportProgress::Started { total_jobs });

            let jobs_complete = AtomicUsize::new(0);
            let failed_files: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

            jobs.par_iter().enumerate().for_each(|(index, job)| {
                if cancel_flag.load(Ordering::Relaxed) {
                    return;
                }

                let filename = job.filename();
                let _ = progress_tx.send(ExportProgress::JobStarted {
                    filename: filename.clone(),
                    job_index: index,
                });

                let result = match job.kind {
                    ExportKind::Stem(stem) => {
                        write_wav(&job.path, stem_pcm(&track, stem), track.sample_rate())
                    }
                    ExportKind::Mixdown => {
                        let mix = mixdown(&track, master_volume);
                        write_wav(&job.path, &mix, track.sample_rate())
                    }
                };

                match result {
                    Ok(()) => {
                        jobs_complete.fetch_add(1, Ordering::Relaxed);
                        let _ = progress_tx.send(ExportProgress::JobComplete {
                            filename,
                            job_index: index,
                            total_jobs,
                        });
                    }
                    Err(e) => {
                        log::error!("Failed to export {}: {}", filename, e);
                        failed_files
                            .lock()
                            .unwrap()
                            .push((filename.clone(), e.to_string()));
                        let _ = progress_tx.send(ExportProgress::JobFailed {
                            filename,
                            job_index: index,
                            error: e.to_string(),
                        });
                    }
                }
            });

            if cancel_flag.load(Ordering::Relaxed) {
                let _ = progress_tx.send(ExportProgress::Cancelled);
                return;
            }

            let _ = progress_tx.send(ExportProgress::Complete {
                duration: start_time.elapsed(),
                jobs_exported: jobs_complete.load(Ordering::Relaxed),
                failed_files: failed_files.into_inner().unwrap_or_default(),
            });
        });

        progress_rx
    }
}

impl Default for ExportService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::StemMap;
    use crate::types::{StereoBuffer, DEFAULT_SAMPLE_RATE};

    fn test_track(frames: usize) -> Track {
        let map = StemMap {
            vocals: StereoBuffer::from_mono(&vec![0.1; frames]),
            drums: StereoBuffer::from_mono(&vec![0.2; frames]),
            bass: StereoBuffer::from_mono(&vec![0.3; frames]),
            other: StereoBuffer::from_mono(&vec![0.4; frames]),
        };
        Track::new(map, DEFAULT_SAMPLE_RATE).unwrap()
    }

    fn drain(rx: Receiver<ExportProgress>) -> Vec<ExportProgress> {
        let mut messages = Vec::new();
        while let Ok(msg) = rx.recv() {
            let terminal = msg.is_terminal();
            messages.push(msg);
            if terminal {
                break;
            }
        }
        messages
    }

    #[test]
    fn test_export_run_completes() {
        let dir = std::env::temp_dir();
        let service = ExportService::new();
        let jobs = vec![
            ExportJob {
                kind: ExportKind::Stem(StemId::Vocals),
                path: dir.join("stemset_svc_vocals.wav"),
            },
            ExportJob {
                kind: ExportKind::Mixdown,
                path: dir.join("stemset_svc_mix.wav"),
            },
        ];
        let paths: Vec<_> = jobs.iter().map(|j| j.path.clone()).collect();

        let rx = service.start_export(test_track(256), 1.0, jobs);
        let messages = drain(rx);

        let last = messages.last().unwrap();
        assert!(matches!(
            last,
            ExportProgress::Complete {
                jobs_exported: 2,
                ..
            }
        ));
        for path in &paths {
            assert!(path.exists());
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn test_failed_job_is_reported() {
        let service = ExportService::new();
        let jobs = vec![ExportJob {
            kind: ExportKind::Mixdown,
            path: PathBuf::from("/nonexistent-dir/stemset_mix.wav"),
        }];

        let rx = service.start_export(test_track(64), 1.0, jobs);
        let messages = drain(rx);

        assert!(messages
            .iter()
            .any(|m| matches!(m, ExportProgress::JobFailed { .. })));
        let last = messages.last().unwrap();
        assert!(matches!(
            last,
            ExportProgress::Complete {
                jobs_exported: 0,
                ..
            }
        ));
    }
}
