//! Fabrication service profiles
//!
//! Each profile describes how one PCB house wants its gerber and drill data:
//! coordinate origin, extension style, Excellon number format, hole merging
//! and the file name every layer must carry.

use crate::error::{ExportError, Result};
use crate::layers::LayerId;
use lazy_static::lazy_static;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the board's project name in rename templates
pub const PROJECT_NAME_PLACEHOLDER: &str = "[boardProjectName]";

/// Excellon coordinate number format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillNumberFormat {
    Decimal,
    SuppressLeadingZeros,
}

/// Export settings for one fabrication service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProfile {
    pub name: String,

    /// Plot and drill relative to the board's auxiliary origin
    pub use_aux_origin: bool,

    /// Let the plot engine use Protel style extensions (.GTL, .GBL, ...)
    pub use_alternate_extensions: bool,

    pub drill_number_format: DrillNumberFormat,

    /// Write plated and non-plated holes into a single drill file
    pub merge_plated_and_non_plated_holes: bool,

    pub minimal_drill_header: bool,

    /// File name templates keyed by layer; layers without a rule keep the engine name
    pub layer_rename_rules: BTreeMap<LayerId, String>,

    /// Extension the drill files are renamed to, without the dot
    pub drill_extension: Option<String>,
}

impl ServiceProfile {
    /// Start a profile with the engine defaults
    pub fn builder(name: impl Into<String>) -> ServiceProfileBuilder {
        ServiceProfileBuilder {
            profile: ServiceProfile {
                name: name.into(),
                use_aux_origin: false,
                use_alternate_extensions: false,
                drill_number_format: DrillNumberFormat::Decimal,
                merge_plated_and_non_plated_holes: false,
                minimal_drill_header: false,
                layer_rename_rules: BTreeMap::new(),
                drill_extension: None,
            },
        }
    }

    /// Resolved file name for a layer, if the profile renames it
    pub fn layer_file_name(&self, layer: LayerId, project_name: &str) -> Option<String> {
        self.layer_rename_rules
            .get(&layer)
            .map(|template| template.replace(PROJECT_NAME_PLACEHOLDER, project_name))
    }

    /// Resolved target path for a layer inside `dir`, if the profile renames it
    pub fn layer_target_path(
        &self,
        layer: LayerId,
        project_name: &str,
        dir: &Path,
    ) -> Option<PathBuf> {
        self.layer_file_name(layer, project_name)
            .map(|name| dir.join(name))
    }
}

/// Builder for custom service profiles
#[derive(Debug, Clone)]
pub struct ServiceProfileBuilder {
    profile: ServiceProfile,
}

impl ServiceProfileBuilder {
    pub fn aux_origin(mut self, enabled: bool) -> Self {
        self.profile.use_aux_origin = enabled;
        self
    }

    pub fn alternate_extensions(mut self, enabled: bool) -> Self {
        self.profile.use_alternate_extensions = enabled;
        self
    }

    pub fn drill_number_format(mut self, format: DrillNumberFormat) -> Self {
        self.profile.drill_number_format = format;
        self
    }

    pub fn merge_holes(mut self, merge: bool) -> Self {
        self.profile.merge_plated_and_non_plated_holes = merge;
        self
    }

    pub fn minimal_drill_header(mut self, minimal: bool) -> Self {
        self.profile.minimal_drill_header = minimal;
        self
    }

    /// Add a rename template for a layer
    pub fn rename(mut self, layer: LayerId, template: impl Into<String>) -> Self {
        self.profile
            .layer_rename_rules
            .insert(layer, template.into());
        self
    }

    pub fn drill_extension(mut self, extension: impl Into<String>) -> Self {
        self.profile.drill_extension = Some(extension.into());
        self
    }

    pub fn build(self) -> ServiceProfile {
        self.profile
    }
}

/// Protel style names shared by most services
fn with_outer_layer_names(builder: ServiceProfileBuilder) -> ServiceProfileBuilder {
    builder
        .rename(LayerId::FrontCopper, "[boardProjectName].GTL")
        .rename(LayerId::BackCopper, "[boardProjectName].GBL")
        .rename(LayerId::FrontSilkscreen, "[boardProjectName].GTO")
        .rename(LayerId::BackSilkscreen, "[boardProjectName].GBO")
        .rename(LayerId::FrontMask, "[boardProjectName].GTS")
        .rename(LayerId::BackMask, "[boardProjectName].GBS")
}

lazy_static! {
    /// Services supported out of the box, in export order
    static ref BUILTIN_PROFILES: Vec<ServiceProfile> = vec![
        ServiceProfile::builder("Default").build(),
        // https://www.elecrow.com/pcb-manufacturing.html
        with_outer_layer_names(ServiceProfile::builder("Elecrow"))
            .aux_origin(true)
            .rename(LayerId::EdgeCuts, "[boardProjectName].GML")
            .rename(LayerId::InnerCopper(1), "[boardProjectName].G1")
            .rename(LayerId::InnerCopper(2), "[boardProjectName].G2")
            .rename(LayerId::InnerCopper(3), "[boardProjectName].G3")
            .rename(LayerId::InnerCopper(4), "[boardProjectName].G4")
            .drill_extension("TXT")
            .build(),
        // https://wiki.seeedstudio.com/Service_for_Fusion_PCB/
        with_outer_layer_names(ServiceProfile::builder("FusionPCB"))
            .aux_origin(true)
            .alternate_extensions(true)
            .merge_holes(true)
            .drill_extension("TXT")
            .build(),
        // https://www.pcbway.com/blog/help_center/Generate_Gerber_file_from_Kicad.html
        with_outer_layer_names(ServiceProfile::builder("PCBWay"))
            .aux_origin(true)
            .drill_number_format(DrillNumberFormat::SuppressLeadingZeros)
            .minimal_drill_header(true)
            .rename(LayerId::EdgeCuts, "[boardProjectName].GML")
            .drill_extension("TXT")
            .build(),
        // https://support.jlcpcb.com/article/149-how-to-generate-gerber-and-drill-files-in-kicad
        with_outer_layer_names(ServiceProfile::builder("JLCPCB"))
            .alternate_extensions(true)
            .rename(LayerId::EdgeCuts, "[boardProjectName].GKO")
            .rename(LayerId::InnerCopper(1), "[boardProjectName].GL2")
            .rename(LayerId::InnerCopper(2), "[boardProjectName].GL3")
            .drill_extension("TXT")
            .build(),
    ];
}

/// All built-in service profiles
pub fn builtin_profiles() -> &'static [ServiceProfile] {
    &BUILTIN_PROFILES
}

/// Look up a built-in profile by name, ignoring case
pub fn find_profile(name: &str) -> Result<&'static ServiceProfile> {
    BUILTIN_PROFILES
        .iter()
        .find(|profile| profile.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            ExportError::UnknownService {
                name: name.to_string(),
            }
            .into()
        })
}
