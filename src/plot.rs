//! Gerber plotting stage
//!
//! Plots every layer of the board's plot sequence, then renames the
//! produced files to the service's naming convention.

use crate::board::{Board, PlotEngine, PlotFormat, PlotOptions};
use crate::error::{ExportError, Result};
use crate::fsretry::RetryFs;
use crate::layers::{plot_sequence, LayerId};
use crate::profiles::ServiceProfile;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files produced by one plotting pass, in plot order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotJob {
    pub output_directory: PathBuf,
    pub files: Vec<(LayerId, PathBuf)>,
}

impl PlotJob {
    /// Path recorded for `layer`
    pub fn path_of(&self, layer: LayerId) -> Option<&Path> {
        self.files
            .iter()
            .find(|(id, _)| *id == layer)
            .map(|(_, path)| path.as_path())
    }
}

/// Drives the board's plot engine for one service
pub struct LayerPlotter<'a> {
    fs: &'a RetryFs,
}

impl<'a> LayerPlotter<'a> {
    pub fn new(fs: &'a RetryFs) -> Self {
        Self { fs }
    }

    /// Plot all layers into `output_dir` and apply the profile's rename rules
    ///
    /// The returned job holds the final path of every layer.
    pub fn run(
        &self,
        board: &dyn Board,
        output_dir: &Path,
        profile: &ServiceProfile,
        project_name: &str,
    ) -> Result<PlotJob> {
        let options = PlotOptions::for_fabrication(
            output_dir,
            profile.use_aux_origin,
            profile.use_alternate_extensions,
        );
        let layers = plot_sequence(board.copper_layer_count());
        info!(
            "Plotting {} layers for {} into {}",
            layers.len(),
            profile.name,
            output_dir.display()
        );

        let mut engine = board.plot_engine().context("Failed to open plot engine")?;
        let plotted = plot_all(engine.as_mut(), &options, &layers)?;

        let job = self.apply_rename_rules(plotted, profile, project_name)?;
        info!("Plotted {} layer files", job.files.len());
        Ok(job)
    }

    fn apply_rename_rules(
        &self,
        plotted: PlotJob,
        profile: &ServiceProfile,
        project_name: &str,
    ) -> Result<PlotJob> {
        if profile.layer_rename_rules.is_empty() {
            debug!("No rename rules for {}, keeping engine names", profile.name);
            return Ok(plotted);
        }

        let mut files = Vec::with_capacity(plotted.files.len());
        for (layer, path) in plotted.files {
            match profile.layer_target_path(layer, project_name, &plotted.output_directory) {
                Some(target) => {
                    debug!("Renaming {} output to {}", layer, target.display());
                    self.fs
                        .rename(&path, &target)
                        .with_context(|| format!("Failed to rename plot of {}", layer))?;
                    files.push((layer, target));
                }
                None => files.push((layer, path)),
            }
        }

        Ok(PlotJob {
            output_directory: plotted.output_directory,
            files,
        })
    }
}

/// Configure once, then open and plot every layer before touching any file
fn plot_all(
    engine: &mut dyn PlotEngine,
    options: &PlotOptions,
    layers: &[LayerId],
) -> Result<PlotJob> {
    engine
        .configure(options)
        .context("Failed to configure plot engine")?;

    let mut files = Vec::with_capacity(layers.len());
    for &layer in layers {
        let name = layer.symbolic_name();
        engine
            .set_layer(layer)
            .with_context(|| format!("Failed to select layer {}", name))?;
        engine
            .open_plot_file(&name, PlotFormat::Gerber, &name)
            .with_context(|| format!("Failed to open plot file for {}", name))?;
        engine
            .plot_layer()
            .with_context(|| format!("Failed to plot {}", name))?;

        let path = engine
            .plot_file_name()
            .ok_or(ExportError::MissingPlotOutput { layer })?;
        debug!("Plotted {} to {}", name, path.display());
        files.push((layer, path));
    }

    engine.close_plot().context("Failed to close plot")?;

    Ok(PlotJob {
        output_directory: options.output_directory.clone(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{DrillWriter, Point};
    use crate::fsretry::RetryPolicy;
    use crate::profiles::find_profile;
    use std::cell::RefCell;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Records engine calls and writes KiCad style plot files
    struct RecordingEngine<'a> {
        calls: &'a RefCell<Vec<String>>,
        dir: PathBuf,
        layer: Option<LayerId>,
        current: Option<PathBuf>,
        fail_on: Option<LayerId>,
    }

    impl PlotEngine for RecordingEngine<'_> {
        fn configure(&mut self, options: &PlotOptions) -> Result<()> {
            self.calls.borrow_mut().push("configure".to_string());
            self.dir = options.output_directory.clone();
            Ok(())
        }

        fn set_layer(&mut self, layer: LayerId) -> Result<()> {
            self.layer = Some(layer);
            Ok(())
        }

        fn open_plot_file(&mut self, suffix: &str, _: PlotFormat, _: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("open {}", suffix));
            self.current = Some(self.dir.join(format!("demo-{}.gbr", suffix)));
            Ok(())
        }

        fn plot_layer(&mut self) -> Result<()> {
            if self.layer == self.fail_on {
                anyhow::bail!("plotter crashed");
            }
            if let Some(path) = &self.current {
                fs::write(path, "G04 test*\nM02*\n")?;
            }
            self.calls.borrow_mut().push("plot".to_string());
            Ok(())
        }

        fn plot_file_name(&self) -> Option<PathBuf> {
            self.current.clone()
        }

        fn close_plot(&mut self) -> Result<()> {
            self.calls.borrow_mut().push("close".to_string());
            Ok(())
        }
    }

    struct TestBoard {
        path: PathBuf,
        copper_layers: u32,
        calls: RefCell<Vec<String>>,
        fail_on: Option<LayerId>,
    }

    impl TestBoard {
        fn new(dir: &Path, copper_layers: u32) -> Self {
            Self {
                path: dir.join("demo.kicad_pcb"),
                copper_layers,
                calls: RefCell::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    impl Board for TestBoard {
        fn file_path(&self) -> &Path {
            &self.path
        }

        fn copper_layer_count(&self) -> u32 {
            self.copper_layers
        }

        fn aux_origin(&self) -> Point {
            Point::ORIGIN
        }

        fn plot_engine(&self) -> Result<Box<dyn PlotEngine + '_>> {
            Ok(Box::new(RecordingEngine {
                calls: &self.calls,
                dir: PathBuf::new(),
                layer: None,
                current: None,
                fail_on: self.fail_on,
            }))
        }

        fn drill_writer(&self) -> Result<Box<dyn DrillWriter + '_>> {
            anyhow::bail!("not used by the plot stage")
        }
    }

    fn fast_fs() -> RetryFs {
        RetryFs::new(RetryPolicy {
            retries: 1,
            interval: Duration::from_millis(1),
        })
    }

    #[test]
    fn test_plots_every_layer_before_closing() {
        let dir = tempdir().expect("Failed to create temp dir");
        let board = TestBoard::new(dir.path(), 4);
        let fs = fast_fs();

        let job = LayerPlotter::new(&fs)
            .run(&board, dir.path(), find_profile("Default").unwrap(), "demo")
            .expect("Plot should succeed");

        assert_eq!(job.files.len(), 9);
        let calls = board.calls.borrow();
        assert_eq!(calls.first().map(String::as_str), Some("configure"));
        assert_eq!(calls.last().map(String::as_str), Some("close"));
        assert_eq!(calls.iter().filter(|c| *c == "plot").count(), 9);
        assert_eq!(calls[1], "open F_Cu");
        assert_eq!(calls[calls.len() - 3], "open In2_Cu");
    }

    #[test]
    fn test_empty_rules_keep_engine_names() {
        let dir = tempdir().expect("Failed to create temp dir");
        let board = TestBoard::new(dir.path(), 2);
        let fs = fast_fs();

        let job = LayerPlotter::new(&fs)
            .run(&board, dir.path(), find_profile("Default").unwrap(), "demo")
            .expect("Plot should succeed");

        for (layer, path) in &job.files {
            assert_eq!(
                path,
                &dir.path().join(format!("demo-{}.gbr", layer.symbolic_name()))
            );
            assert!(path.exists());
        }
    }

    #[test]
    fn test_rules_rename_only_mapped_layers() {
        let dir = tempdir().expect("Failed to create temp dir");
        let board = TestBoard::new(dir.path(), 2);
        let fs = fast_fs();

        let job = LayerPlotter::new(&fs)
            .run(&board, dir.path(), find_profile("FusionPCB").unwrap(), "demo")
            .expect("Plot should succeed");

        assert_eq!(job.path_of(LayerId::FrontCopper), Some(dir.path().join("demo.GTL").as_path()));
        assert!(dir.path().join("demo.GTL").exists());
        assert!(!dir.path().join("demo-F_Cu.gbr").exists());

        // FusionPCB has no outline rule
        assert!(dir.path().join("demo-Edge_Cuts.gbr").exists());
        assert_eq!(
            job.path_of(LayerId::EdgeCuts),
            Some(dir.path().join("demo-Edge_Cuts.gbr").as_path())
        );
    }

    #[test]
    fn test_plot_failure_names_the_layer() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut board = TestBoard::new(dir.path(), 2);
        board.fail_on = Some(LayerId::BackMask);
        let fs = fast_fs();

        let err = LayerPlotter::new(&fs)
            .run(&board, dir.path(), find_profile("Elecrow").unwrap(), "demo")
            .unwrap_err();

        let report = format!("{:#}", err);
        assert!(report.contains("Failed to plot B_Mask"));
        assert!(report.contains("plotter crashed"));
        // Renaming never starts when plotting fails
        assert!(dir.path().join("demo-F_Cu.gbr").exists());
        assert!(!dir.path().join("demo.GTL").exists());
    }
}
