//! Fake host board writing KiCad style plot and drill files

#![allow(dead_code)]

use gerber_to_order::board::{
    Board, DrillFormat, DrillOptions, DrillWriter, PlotEngine, PlotFormat, PlotOptions, Point,
};
use gerber_to_order::error::Result;
use gerber_to_order::layers::LayerId;
use gerber_to_order::{RetryFs, RetryPolicy};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct FakeBoard {
    pub path: PathBuf,
    pub copper_layers: u32,
    pub plated_holes: bool,
    pub non_plated_holes: bool,
    /// Drill writer refuses merged output
    pub fail_merged_drill: bool,
}

impl FakeBoard {
    /// Two layer board `demo.kicad_pcb` inside `dir` with both hole kinds
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("demo.kicad_pcb"),
            copper_layers: 2,
            plated_holes: true,
            non_plated_holes: true,
            fail_merged_drill: false,
        }
    }

    pub fn project(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Board for FakeBoard {
    fn file_path(&self) -> &Path {
        &self.path
    }

    fn copper_layer_count(&self) -> u32 {
        self.copper_layers
    }

    fn aux_origin(&self) -> Point {
        Point::new(100_000_000, 50_000_000)
    }

    fn plot_engine(&self) -> Result<Box<dyn PlotEngine + '_>> {
        Ok(Box::new(FakePlotEngine {
            project: self.project(),
            options: None,
            layer: None,
            current: None,
        }))
    }

    fn drill_writer(&self) -> Result<Box<dyn DrillWriter + '_>> {
        Ok(Box::new(FakeDrillWriter {
            board: self,
            options: None,
        }))
    }
}

struct FakePlotEngine {
    project: String,
    options: Option<PlotOptions>,
    layer: Option<LayerId>,
    current: Option<PathBuf>,
}

/// Protel extension the engine picks when asked to
fn protel_extension(layer: LayerId) -> String {
    match layer {
        LayerId::FrontCopper => "gtl".to_string(),
        LayerId::BackCopper => "gbl".to_string(),
        LayerId::FrontSilkscreen => "gto".to_string(),
        LayerId::BackSilkscreen => "gbo".to_string(),
        LayerId::FrontMask => "gts".to_string(),
        LayerId::BackMask => "gbs".to_string(),
        LayerId::EdgeCuts => "gm1".to_string(),
        LayerId::InnerCopper(num) => format!("g{}", num + 1),
    }
}

impl PlotEngine for FakePlotEngine {
    fn configure(&mut self, options: &PlotOptions) -> Result<()> {
        self.options = Some(options.clone());
        Ok(())
    }

    fn set_layer(&mut self, layer: LayerId) -> Result<()> {
        self.layer = Some(layer);
        Ok(())
    }

    fn open_plot_file(&mut self, suffix: &str, _format: PlotFormat, _sheet: &str) -> Result<()> {
        let options = self
            .options
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("plot engine not configured"))?;
        let layer = self
            .layer
            .ok_or_else(|| anyhow::anyhow!("no layer selected"))?;
        let extension = if options.use_alternate_extensions {
            protel_extension(layer)
        } else {
            "gbr".to_string()
        };
        self.current = Some(
            options
                .output_directory
                .join(format!("{}-{}.{}", self.project, suffix, extension)),
        );
        Ok(())
    }

    fn plot_layer(&mut self) -> Result<()> {
        let path = self
            .current
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no plot file open"))?;
        let layer = self.layer.map(|l| l.symbolic_name()).unwrap_or_default();
        fs::write(path, format!("G04 {}*\nM02*\n", layer))?;
        Ok(())
    }

    fn plot_file_name(&self) -> Option<PathBuf> {
        self.current.clone()
    }

    fn close_plot(&mut self) -> Result<()> {
        self.current = None;
        Ok(())
    }
}

struct FakeDrillWriter<'a> {
    board: &'a FakeBoard,
    options: Option<DrillOptions>,
}

impl DrillWriter for FakeDrillWriter<'_> {
    fn set_format(&mut self, _format: &DrillFormat) -> Result<()> {
        Ok(())
    }

    fn set_options(&mut self, options: &DrillOptions) -> Result<()> {
        self.options = Some(*options);
        Ok(())
    }

    fn create_drill_and_map_files(
        &mut self,
        directory: &Path,
        _generate_drill: bool,
        _generate_map: bool,
    ) -> Result<()> {
        let merge = self.options.map(|o| o.merge_npth).unwrap_or(false);
        let project = self.board.project();

        if merge {
            if self.board.fail_merged_drill {
                anyhow::bail!("merged drill output unsupported");
            }
            if self.board.plated_holes || self.board.non_plated_holes {
                fs::write(directory.join(format!("{}.drl", project)), "M48\nT1C0.8\nM30\n")?;
            }
            return Ok(());
        }

        if self.board.plated_holes {
            fs::write(directory.join(format!("{}-PTH.drl", project)), "M48\nT1C0.8\nM30\n")?;
        }
        if self.board.non_plated_holes {
            fs::write(directory.join(format!("{}-NPTH.drl", project)), "M48\nT1C3.2\nM30\n")?;
        }
        Ok(())
    }
}

/// Retry layer with a tiny budget so failures stay fast
pub fn fast_fs() -> RetryFs {
    RetryFs::new(RetryPolicy {
        retries: 2,
        interval: Duration::from_millis(1),
    })
}

/// Names of the regular files directly inside `dir`
pub fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|entry| entry.expect("Failed to read entry").path())
        .filter(|path| path.is_file())
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Entry names of a zip archive
pub fn zip_entries(path: &Path) -> BTreeSet<String> {
    let file = fs::File::open(path).expect("Failed to open archive");
    let archive = zip::ZipArchive::new(file).expect("Failed to read archive");
    archive.file_names().map(str::to_string).collect()
}

pub fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}
