//! Host EDA collaborators
//!
//! The board model, the gerber plotter and the Excellon writer live in the
//! host EDA toolkit. The export pipeline drives them through these traits
//! and never touches board geometry itself.

use crate::error::Result;
use crate::layers::LayerId;
use crate::profiles::DrillNumberFormat;
use std::path::{Path, PathBuf};

/// Nanometers per millimeter, the board's internal unit
pub const NM_PER_MM: i64 = 1_000_000;

/// Board coordinate in nanometers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Read-only view of a loaded board
pub trait Board {
    /// Path of the board file on disk
    fn file_path(&self) -> &Path;

    /// Number of copper layers, outer layers included
    fn copper_layer_count(&self) -> u32;

    /// User-defined auxiliary origin
    fn aux_origin(&self) -> Point;

    /// A fresh plot controller for this board
    fn plot_engine(&self) -> Result<Box<dyn PlotEngine + '_>>;

    /// A fresh Excellon writer for this board
    fn drill_writer(&self) -> Result<Box<dyn DrillWriter + '_>>;
}

/// Output format of a plot file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    Gerber,
}

/// How drill holes are marked on plotted layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillMarks {
    None,
    Small,
    Full,
}

/// Plot settings applied once per plotting pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotOptions {
    pub output_directory: PathBuf,
    pub plot_value: bool,
    pub plot_reference: bool,
    pub exclude_edge_layer: bool,
    /// Default line width in nanometers
    pub line_width: i64,
    pub subtract_mask_from_silk: bool,
    pub use_aux_origin: bool,
    pub use_alternate_extensions: bool,
    pub drill_marks: DrillMarks,
    pub skip_npth_pads: bool,
}

impl PlotOptions {
    /// Settings used for fabrication output
    pub fn for_fabrication(
        output_directory: &Path,
        use_aux_origin: bool,
        use_alternate_extensions: bool,
    ) -> Self {
        Self {
            output_directory: output_directory.to_path_buf(),
            plot_value: true,
            plot_reference: true,
            exclude_edge_layer: true,
            line_width: NM_PER_MM / 10,
            subtract_mask_from_silk: false,
            use_aux_origin,
            use_alternate_extensions,
            // Drill holes go to the Excellon files
            drill_marks: DrillMarks::None,
            skip_npth_pads: false,
        }
    }
}

/// Gerber plot controller
///
/// `plot_file_name` is only meaningful right after `open_plot_file` and
/// `plot_layer` for the current layer.
pub trait PlotEngine {
    fn configure(&mut self, options: &PlotOptions) -> Result<()>;

    fn set_layer(&mut self, layer: LayerId) -> Result<()>;

    /// Open a new plot file whose name is tagged with `suffix`
    fn open_plot_file(&mut self, suffix: &str, format: PlotFormat, sheet_desc: &str)
        -> Result<()>;

    fn plot_layer(&mut self) -> Result<()>;

    /// Path of the file opened by the last `open_plot_file`
    fn plot_file_name(&self) -> Option<PathBuf>;

    fn close_plot(&mut self) -> Result<()>;
}

/// Excellon number format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrillFormat {
    pub metric: bool,
    pub zeros: DrillNumberFormat,
    pub integer_digits: u8,
    pub fraction_digits: u8,
}

impl DrillFormat {
    /// Metric 3.3 format
    pub fn metric(zeros: DrillNumberFormat) -> Self {
        Self {
            metric: true,
            zeros,
            integer_digits: 3,
            fraction_digits: 3,
        }
    }
}

/// Excellon writer options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrillOptions {
    pub mirror: bool,
    pub minimal_header: bool,
    /// Coordinate subtracted from every hole position
    pub offset: Point,
    /// Write plated and non-plated holes to one file
    pub merge_npth: bool,
}

/// Excellon drill file writer
///
/// Writes `<project>-PTH.drl` and `<project>-NPTH.drl`, or `<project>.drl`
/// when holes are merged. A hole kind the board does not have produces no
/// file.
pub trait DrillWriter {
    fn set_format(&mut self, format: &DrillFormat) -> Result<()>;

    fn set_options(&mut self, options: &DrillOptions) -> Result<()>;

    fn create_drill_and_map_files(
        &mut self,
        directory: &Path,
        generate_drill: bool,
        generate_map: bool,
    ) -> Result<()>;
}

/// Size label from board dimensions, e.g. `50.0x30.5mm`
pub fn format_size_label(width_mm: f64, height_mm: f64) -> String {
    format!("{}x{}mm", format_mm(width_mm), format_mm(height_mm))
}

fn format_mm(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
