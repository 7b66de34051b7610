// SPDX-FileCopyrightText: 2025 gerber-to-order contributors
// SPDX-License-Identifier: Apache-2.0

//! gerber-to-order - fabrication exports for PCB services
//!
//! Plots gerber layers and Excellon drill files through the host EDA
//! toolkit, renames them the way each fabrication house expects and packs
//! them into one zip archive per service.

pub mod archive;
pub mod board;
pub mod config;
pub mod drill;
pub mod error;
pub mod export;
pub mod fsretry;
pub mod layers;
pub mod plot;
pub mod profiles;
pub mod progress;

pub use board::{Board, DrillWriter, PlotEngine};
pub use config::Config;
pub use error::{ExportError, ExportStage};
pub use export::{BatchOutcome, ExportOptions, Exporter};
pub use fsretry::{RetryFs, RetryPolicy};
pub use profiles::{find_profile, ServiceProfile};
