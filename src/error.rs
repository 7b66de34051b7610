//! Error handling for gerber-to-order
//!
//! Collaborator calls and plumbing use anyhow for propagation and context;
//! failures the caller may want to inspect are typed in [`ExportError`].

use anyhow::Context;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::layers::LayerId;

pub type Result<T> = anyhow::Result<T>;

/// Extension trait for Results to add context with file paths
pub trait ResultExt<T> {
    /// Add context with file path information
    fn with_path_context<P: AsRef<Path>>(self, operation: &str, path: P) -> Result<T>;

    /// Add context with the fabrication service being exported
    fn with_service_context(self, service: &str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error> + Send + Sync + 'static,
{
    fn with_path_context<P: AsRef<Path>>(self, operation: &str, path: P) -> Result<T> {
        self.map_err(|e| e.into())
            .with_context(|| format!("Failed to {}: {}", operation, path.as_ref().display()))
    }

    fn with_service_context(self, service: &str) -> Result<T> {
        self.map_err(|e| e.into())
            .with_context(|| format!("Failed for service {}", service))
    }
}

/// Pipeline stage an export failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    /// Output directory setup and stale export cleanup
    Prepare,
    /// Gerber plotting and layer renaming
    Plot,
    /// Drill file generation and renaming
    Drill,
    /// Zip archive creation
    Archive,
    /// Removal of intermediate files
    Cleanup,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportStage::Prepare => "prepare",
            ExportStage::Plot => "plot",
            ExportStage::Drill => "drill",
            ExportStage::Archive => "archive",
            ExportStage::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

/// Specific error types for export operations
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Cannot rename {} to {} after {attempts} attempts", .src.display(), .dst.display())]
    RenameFailed {
        src: PathBuf,
        dst: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Plot engine reported no output file for layer {layer}")]
    MissingPlotOutput { layer: LayerId },

    #[error("Unknown fabrication service: {name}")]
    UnknownService { name: String },

    #[error("Board path has no usable file name: {}", .path.display())]
    InvalidBoardPath { path: PathBuf },

    #[error("{stage} stage failed for {service}")]
    Stage {
        service: String,
        stage: ExportStage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl ExportError {
    /// Wrap a lower-level failure with the service and stage it aborted
    pub fn stage(service: &str, stage: ExportStage, source: anyhow::Error) -> Self {
        ExportError::Stage {
            service: service.to_string(),
            stage,
            source: source.into(),
        }
    }

    /// Stage tag for stage failures
    pub fn failed_stage(&self) -> Option<ExportStage> {
        match self {
            ExportError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
