//! Export progress messages
//!
//! Sent from worker threads to the control thread via mpsc channel.
//! Each message represents a step in the export lifecycle:
//!
//! Started → JobStarted → JobComplete/JobFailed → ... → Complete/Cancelled

use std::time::Duration;

/// Progress messages for a background export run
#[derive(Debug, Clone)]
pub enum ExportProgress {
    /// Export started
    Started {
        /// Total number of files to write
        total_jobs: usize,
    },

    /// A file write started
    JobStarted {
        /// Filename being written
        filename: String,
        /// Index in the export queue (0-based)
        job_index: usize,
    },

    /// A file was fully written
    JobComplete {
        /// Filename that was written
        filename: String,
        /// Index in the export queue (0-based)
        job_index: usize,
        /// Total jobs in the export
        total_jobs: usize,
    },

    /// A file failed to write
    JobFailed {
        /// Filename that failed
        filename: String,
        /// Index in the export queue (0-based)
        job_index: usize,
        /// Error description
        error: String,
    },

    /// All files written (or failed)
    Complete {
        /// Total export duration
        duration: Duration,
        /// Number of files successfully written
        jobs_exported: usize,
        /// Files that failed with their error messages
        failed_files: Vec<(String, String)>,
    },

    /// Export was cancelled
    Cancelled,
}

impl ExportProgress {
    /// Human-readable description of this progress message
    pub fn description(&self) -> String {
        match self {
            Self::Started { total_jobs } => {
                format!("Starting export of {} files", total_jobs)
            }
            Self::JobStarted { filename, .. } => {
                format!("Exporting: {}", filename)
            }
            Self::JobComplete {
                job_index,
                total_jobs,
                ..
            } => {
                format!("Exported {}/{}", job_index + 1, total_jobs)
            }
            Self::JobFailed {
                filename, error, ..
            } => {
                format!("Failed: {} - {}", filename, error)
            }
            Self::Complete {
                duration,
                jobs_exported,
                failed_files,
            } => {
                if failed_files.is_empty() {
                    format!(
                        "Export complete: {} files in {:.1}s",
                        jobs_exported,
                        duration.as_secs_f64()
                    )
                } else {
                    format!(
                        "Export complete: {} files, {} failed in {:.1}s",
                        jobs_exported,
                        failed_files.len(),
                        duration.as_secs_f64()
                    )
                }
            }
            Self::Cancelled => "Export cancelled".to_string(),
        }
    }

    /// Whether this is a terminal message (Complete or Cancelled)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Cancelled)
    }

    /// Progress fraction in [0.0, 1.0], when one applies
    pub fn progress_fraction(&self) -> Option<f32> {
        match self {
            Self::JobComplete {
                job_index,
                total_jobs,
                ..
            } => Some((*job_index + 1) as f32 / *total_jobs as f32),
            Self::Complete { .. } => Some(1.0),
            Self::Started { .. } => Some(0.0),
            _ => None,
        }
    }
}
