//! Zip archive creation
//!
//! Fabrication houses expect every gerber and drill file at the root of the
//! uploaded zip, so entries are stored under their bare file names.

use crate::error::{Result, ResultExt};
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Archive creator for building output ZIP files
pub struct ArchiveCreator;

impl ArchiveCreator {
    /// Create a ZIP file from a collection of files
    pub fn create_zip<P: AsRef<Path>, I: IntoIterator<Item = P>>(
        files: I,
        output_path: &Path,
        show_progress: bool,
    ) -> Result<()> {
        let files: Vec<PathBuf> = files
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();

        info!("Creating ZIP archive {}", output_path.display());

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).with_path_context("create output directory", parent)?;
        }

        let file =
            fs::File::create(output_path).with_path_context("create ZIP file", output_path)?;

        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        let progress = if show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                    .progress_chars("#>-")
            );
            pb.set_message("Creating ZIP file...");
            Some(pb)
        } else {
            None
        };

        for file_path in files {
            let file_name = file_path
                .file_name()
                .and_then(|name| name.to_str())
                .context("Invalid filename")?;

            zip.start_file(file_name, options)
                .context("Failed to start ZIP file entry")?;

            let content =
                fs::read(&file_path).with_path_context("read file for ZIP", &file_path)?;

            zip.write_all(&content)
                .context("Failed to write file content to ZIP")?;
            debug!("Added {} to archive", file_name);

            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        zip.finish().context("Failed to finalize ZIP file")?;

        if let Some(pb) = progress {
            pb.finish_with_message("ZIP file created successfully");
        }

        info!("ZIP file created successfully: {}", output_path.display());
        Ok(())
    }

    /// Zip every regular file directly inside `dir`, sorted by name
    pub fn zip_directory(dir: &Path, output_path: &Path, show_progress: bool) -> Result<()> {
        let mut files = fs::read_dir(dir)
            .with_path_context("read directory", dir)?
            .filter_map(|entry| {
                entry.ok().and_then(|e| {
                    let path = e.path();
                    if path.is_file() {
                        Some(path)
                    } else {
                        None
                    }
                })
            })
            .collect::<Vec<_>>();
        files.sort();

        debug!("Archiving {} files from {}", files.len(), dir.display());
        Self::create_zip(&files, output_path, show_progress)
    }
}
