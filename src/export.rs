//! Export orchestration
//!
//! For each fabrication service: prepare a fresh working directory next to
//! the board, plot layers and drill files into it, zip it and remove the
//! intermediate files. Batches keep going when one service fails.

use crate::{
    archive::ArchiveCreator,
    board::Board,
    drill::{DrillFileKind, DrillPlotter, ENGINE_DRILL_EXTENSION},
    error::{ExportError, ExportStage, Result},
    fsretry::RetryFs,
    layers::{plot_sequence, LayerId},
    plot::LayerPlotter,
    profiles::ServiceProfile,
    progress::ProgressTracker,
};
use std::error::Error as _;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Directory created next to the board file for all exports
pub const OUTPUT_DIR_NAME: &str = "gerber_to_order";

/// Per-call export settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Board size label such as `50.0x30.0mm`, part of the archive name
    pub size_label: Option<String>,

    /// Keep the working directory after archiving
    pub keep_intermediate: bool,
}

/// Every path derived for one (board, service) export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportNaming {
    pub project_name: String,
    pub board_dir: PathBuf,
    pub output_dir: PathBuf,
    pub work_dir_name: String,
    pub work_dir: PathBuf,
    /// Matches working directories of earlier exports with any size label
    pub work_dir_pattern: PathBuf,
    pub archive: PathBuf,
    pub archive_pattern: PathBuf,
}

impl ExportNaming {
    pub fn new(
        board_path: &Path,
        output_dir_name: &str,
        service: &str,
        size_label: Option<&str>,
    ) -> Result<Self> {
        let project_name = board_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| ExportError::InvalidBoardPath {
                path: board_path.to_path_buf(),
            })?
            .to_string();
        let board_dir = board_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let output_dir = board_dir.join(output_dir_name);

        let mut work_dir_name = project_name.clone();
        if let Some(label) = size_label {
            work_dir_name.push('_');
            work_dir_name.push_str(label);
        }
        work_dir_name.push_str("_for_");
        work_dir_name.push_str(service);
        let pattern_name = format!("{}*_for_{}", project_name, service);

        Ok(Self {
            work_dir: output_dir.join(&work_dir_name),
            work_dir_pattern: output_dir.join(&pattern_name),
            archive: output_dir.join(format!("{}.zip", work_dir_name)),
            archive_pattern: output_dir.join(format!("{}.zip", pattern_name)),
            project_name,
            board_dir,
            output_dir,
            work_dir_name,
        })
    }
}

/// What an export would produce, without running any engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    pub naming: ExportNaming,
    /// Plotted layers with their target name; `None` keeps the engine name
    pub layers: Vec<(LayerId, Option<String>)>,
    /// Drill file names if the board has holes of every kind
    pub drill_files: Vec<String>,
}

impl ExportPlan {
    pub fn new(
        board_path: &Path,
        copper_layer_count: u32,
        profile: &ServiceProfile,
        options: &ExportOptions,
        output_dir_name: &str,
    ) -> Result<Self> {
        let naming = ExportNaming::new(
            board_path,
            output_dir_name,
            &profile.name,
            options.size_label.as_deref(),
        )?;

        let layers = plot_sequence(copper_layer_count)
            .into_iter()
            .map(|layer| (layer, profile.layer_file_name(layer, &naming.project_name)))
            .collect();

        let extension = profile
            .drill_extension
            .as_deref()
            .unwrap_or(ENGINE_DRILL_EXTENSION);
        let drill_files = DrillFileKind::for_merge(profile.merge_plated_and_non_plated_holes)
            .iter()
            .map(|kind| kind.file_name(&naming.project_name, extension))
            .collect();

        Ok(Self {
            naming,
            layers,
            drill_files,
        })
    }
}

/// Archive written for one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArchive {
    pub service: String,
    pub path: PathBuf,
}

/// Failed export of one service
#[derive(Debug)]
pub struct ServiceFailure {
    pub service: String,
    pub error: ExportError,
}

/// Results of a batch with at least one service selected
#[derive(Debug, Default)]
pub struct BatchReport {
    pub archives: Vec<ExportedArchive>,
    pub failures: Vec<ServiceFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human readable report of exported archives and failures
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        if !self.archives.is_empty() {
            lines.push("Exported".to_string());
            for archive in &self.archives {
                let name = archive
                    .path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                lines.push(name);
            }
            if let Some(dir) = self.archives[0].path.parent() {
                lines.push("at".to_string());
                lines.push(dir.display().to_string());
            }
        }

        if !self.failures.is_empty() {
            lines.push("Failed".to_string());
            for failure in &self.failures {
                lines.push(format!("{}: {}", failure.service, error_chain(&failure.error)));
            }
        }

        lines.join("\n")
    }
}

/// Outcome of a batch export
#[derive(Debug)]
pub enum BatchOutcome {
    /// No service was selected
    NothingToExport,
    Completed(BatchReport),
}

impl BatchOutcome {
    pub fn summary(&self) -> String {
        match self {
            BatchOutcome::NothingToExport => "Select some service to export.".to_string(),
            BatchOutcome::Completed(report) => report.summary(),
        }
    }
}

/// Runs the export pipeline for one board
pub struct Exporter {
    fs: RetryFs,
    output_dir_name: String,
    progress_tracker: ProgressTracker,
}

impl Exporter {
    pub fn new(fs: RetryFs) -> Self {
        Self {
            fs,
            output_dir_name: OUTPUT_DIR_NAME.to_string(),
            progress_tracker: ProgressTracker::new(false),
        }
    }

    /// Use a different top-level output directory name
    pub fn with_output_dir_name(mut self, name: impl Into<String>) -> Self {
        self.output_dir_name = name.into();
        self
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress_tracker = ProgressTracker::new(enabled);
        self
    }

    pub fn output_dir_name(&self) -> &str {
        &self.output_dir_name
    }

    /// Export one service and return the archive path
    pub fn export(
        &self,
        board: &dyn Board,
        profile: &ServiceProfile,
        options: &ExportOptions,
    ) -> std::result::Result<PathBuf, ExportError> {
        self.run(board, profile, options, self.progress_tracker.is_enabled())
    }

    /// Export every profile in order, collecting archives and failures
    pub fn export_batch(
        &self,
        board: &dyn Board,
        profiles: &[&ServiceProfile],
        options: &ExportOptions,
    ) -> BatchOutcome {
        if profiles.is_empty() {
            info!("No service selected, nothing to export");
            return BatchOutcome::NothingToExport;
        }

        let progress = self.progress_tracker.create_service_progress(profiles.len());
        let mut report = BatchReport::default();

        for profile in profiles {
            ProgressTracker::set_message(&progress, &profile.name);
            match self.run(board, profile, options, false) {
                Ok(path) => report.archives.push(ExportedArchive {
                    service: profile.name.clone(),
                    path,
                }),
                Err(e) => {
                    error!("Export for {} failed: {}", profile.name, error_chain(&e));
                    report.failures.push(ServiceFailure {
                        service: profile.name.clone(),
                        error: e,
                    });
                }
            }
            ProgressTracker::update_progress(&progress, 1, None);
        }

        if report.is_success() {
            ProgressTracker::finish_progress(progress, "Export completed");
        } else {
            ProgressTracker::finish_with_error(
                progress,
                &format!("{} of {} services failed", report.failures.len(), profiles.len()),
            );
        }

        BatchOutcome::Completed(report)
    }

    fn run(
        &self,
        board: &dyn Board,
        profile: &ServiceProfile,
        options: &ExportOptions,
        show_progress: bool,
    ) -> std::result::Result<PathBuf, ExportError> {
        let service = profile.name.as_str();
        let start = std::time::Instant::now();
        let in_stage = |stage: ExportStage| move |e| ExportError::stage(service, stage, e);

        let naming = ExportNaming::new(
            board.file_path(),
            &self.output_dir_name,
            service,
            options.size_label.as_deref(),
        )
        .map_err(in_stage(ExportStage::Prepare))?;
        info!("Exporting {} for {}", naming.project_name, service);

        self.prepare(&naming).map_err(in_stage(ExportStage::Prepare))?;

        LayerPlotter::new(&self.fs)
            .run(board, &naming.work_dir, profile, &naming.project_name)
            .map_err(in_stage(ExportStage::Plot))?;

        DrillPlotter::new(&self.fs)
            .run(board, &naming.work_dir, profile, &naming.project_name)
            .map_err(in_stage(ExportStage::Drill))?;

        self.archive(&naming, show_progress)
            .map_err(in_stage(ExportStage::Archive))?;

        if !options.keep_intermediate {
            debug!("Removing intermediate files in {}", naming.work_dir.display());
            self.fs
                .remove_dir_if_exists(&naming.work_dir)
                .map_err(in_stage(ExportStage::Cleanup))?;
        }

        info!(
            "Exported {} in {} ms",
            naming.archive.display(),
            start.elapsed().as_millis()
        );
        Ok(naming.archive)
    }

    /// Fresh working directory, with stale exports of this service removed
    fn prepare(&self, naming: &ExportNaming) -> Result<()> {
        if !naming.output_dir.exists() {
            self.fs.make_dir(&naming.output_dir)?;
        }
        self.fs.remove_dir_if_exists(&naming.work_dir_pattern)?;
        self.fs.make_dir(&naming.work_dir)
    }

    fn archive(&self, naming: &ExportNaming, show_progress: bool) -> Result<()> {
        self.fs.remove_if_exists(&naming.archive_pattern)?;
        ArchiveCreator::zip_directory(&naming.work_dir, &naming.archive, show_progress)
    }
}

/// `error: cause: cause` rendering of an error and its sources
fn error_chain(err: &ExportError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
