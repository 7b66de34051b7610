//! Excellon drill stage
//!
//! Writes plated and non-plated drill files with the service's number
//! format, header and origin settings, then gives them the service's
//! extension.

use crate::board::{Board, DrillFormat, DrillOptions, Point};
use crate::error::Result;
use crate::fsretry::RetryFs;
use crate::profiles::ServiceProfile;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extension the drill writer gives its files
pub const ENGINE_DRILL_EXTENSION: &str = "drl";

/// Drill file names the writer produces for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillFileKind {
    /// Plated and non-plated holes in one file
    Merged,
    Plated,
    NonPlated,
}

impl DrillFileKind {
    /// Kinds produced for the given merge setting
    pub fn for_merge(merge: bool) -> &'static [DrillFileKind] {
        if merge {
            &[DrillFileKind::Merged]
        } else {
            &[DrillFileKind::Plated, DrillFileKind::NonPlated]
        }
    }

    /// File name for `project` with `extension`
    pub fn file_name(&self, project_name: &str, extension: &str) -> String {
        match self {
            DrillFileKind::Merged => format!("{}.{}", project_name, extension),
            DrillFileKind::Plated => format!("{}-PTH.{}", project_name, extension),
            DrillFileKind::NonPlated => format!("{}-NPTH.{}", project_name, extension),
        }
    }
}

/// Drives the board's Excellon writer for one service
pub struct DrillPlotter<'a> {
    fs: &'a RetryFs,
}

impl<'a> DrillPlotter<'a> {
    pub fn new(fs: &'a RetryFs) -> Self {
        Self { fs }
    }

    /// Write drill files into `output_dir` and rename them
    ///
    /// Returns the drill files present afterwards. A hole kind the board
    /// lacks simply has no file.
    pub fn run(
        &self,
        board: &dyn Board,
        output_dir: &Path,
        profile: &ServiceProfile,
        project_name: &str,
    ) -> Result<Vec<PathBuf>> {
        let merge = profile.merge_plated_and_non_plated_holes;
        let format = DrillFormat::metric(profile.drill_number_format);
        let options = DrillOptions {
            mirror: false,
            minimal_header: profile.minimal_drill_header,
            offset: if profile.use_aux_origin {
                board.aux_origin()
            } else {
                Point::ORIGIN
            },
            merge_npth: merge,
        };
        info!(
            "Writing drill files for {} (merge: {}, offset: {:?})",
            profile.name, merge, options.offset
        );

        let mut writer = board
            .drill_writer()
            .context("Failed to open drill writer")?;
        writer
            .set_format(&format)
            .context("Failed to set drill format")?;
        writer
            .set_options(&options)
            .context("Failed to set drill options")?;
        writer
            .create_drill_and_map_files(output_dir, true, false)
            .with_context(|| format!("Failed to write drill files to {}", output_dir.display()))?;

        let extension = match &profile.drill_extension {
            Some(extension) => {
                for kind in DrillFileKind::for_merge(merge) {
                    let src = output_dir.join(kind.file_name(project_name, ENGINE_DRILL_EXTENSION));
                    let dst = output_dir.join(kind.file_name(project_name, extension));
                    if !self.fs.rename_if_exists(&src, &dst)? {
                        debug!("No {:?} drill file for {}", kind, project_name);
                    }
                }
                extension.as_str()
            }
            None => ENGINE_DRILL_EXTENSION,
        };

        let files: Vec<PathBuf> = DrillFileKind::for_merge(merge)
            .iter()
            .map(|kind| output_dir.join(kind.file_name(project_name, extension)))
            .filter(|path| path.is_file())
            .collect();
        info!("Wrote {} drill files", files.len());
        Ok(files)
    }
}
