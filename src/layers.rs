//! Board layer identifiers and the ordered plot sequence
//!
//! Plot files are tagged with the symbolic layer name, so the engine writes
//! e.g. `demo-F_Cu.gbr` for the front copper of `demo.kicad_pcb`.

use std::fmt;

/// Layers plotted for every board, in plot order
pub const BASE_LAYERS: [LayerId; 7] = [
    LayerId::FrontCopper,
    LayerId::BackCopper,
    LayerId::FrontSilkscreen,
    LayerId::BackSilkscreen,
    LayerId::FrontMask,
    LayerId::BackMask,
    LayerId::EdgeCuts,
];

/// Outer copper layers not counted as inner layers
const OUTER_COPPER_LAYERS: u32 = 2;

/// Highest inner copper layer a board can carry
pub const MAX_INNER_LAYERS: u8 = 30;

/// Represents a physical or logical board layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerId {
    // Outer copper
    FrontCopper,
    BackCopper,

    // Silkscreen
    FrontSilkscreen,
    BackSilkscreen,

    // Solder mask
    FrontMask,
    BackMask,

    // Board outline
    EdgeCuts,

    /// Inner copper, numbered from 1
    InnerCopper(u8),
}

impl LayerId {
    /// Symbolic name used as the plot file suffix
    pub fn symbolic_name(&self) -> String {
        match self {
            LayerId::FrontCopper => "F_Cu".to_string(),
            LayerId::BackCopper => "B_Cu".to_string(),
            LayerId::FrontSilkscreen => "F_Silks".to_string(),
            LayerId::BackSilkscreen => "B_Silks".to_string(),
            LayerId::FrontMask => "F_Mask".to_string(),
            LayerId::BackMask => "B_Mask".to_string(),
            LayerId::EdgeCuts => "Edge_Cuts".to_string(),
            LayerId::InnerCopper(num) => format!("In{}_Cu", num),
        }
    }

    pub fn is_copper(&self) -> bool {
        matches!(
            self,
            LayerId::FrontCopper | LayerId::BackCopper | LayerId::InnerCopper(_)
        )
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbolic_name())
    }
}

/// Inner copper count for a board with `copper_layer_count` copper layers
pub fn inner_layer_count(copper_layer_count: u32) -> u8 {
    let inner = copper_layer_count.saturating_sub(OUTER_COPPER_LAYERS);
    inner.min(MAX_INNER_LAYERS as u32) as u8
}

/// Ordered layers to plot for a board: the base layers, then `In1_Cu..`
pub fn plot_sequence(copper_layer_count: u32) -> Vec<LayerId> {
    let inner = inner_layer_count(copper_layer_count);
    let mut layers = Vec::with_capacity(BASE_LAYERS.len() + inner as usize);
    layers.extend_from_slice(&BASE_LAYERS);
    layers.extend((1..=inner).map(LayerId::InnerCopper));
    layers
}
