//! Configuration management for gerber-to-order
//!
//! This module handles CLI argument parsing and logging setup.

use crate::error::Result;
use crate::export::{ExportOptions, OUTPUT_DIR_NAME};
use crate::profiles::{builtin_profiles, find_profile, ServiceProfile};
use anyhow::anyhow;
use clap::builder::styling;
use clap::{value_parser, Arg, ArgMatches, ColorChoice, Command};
use std::path::PathBuf;
use tracing::info;

/// Build the CLI command
pub fn build_cli() -> Command {
    let styles = styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::AnsiColor::Blue.on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default());

    Command::new("gerber-to-order")
        .about("Plan gerber and drill exports for PCB fabrication services")
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("board")
                .short('b')
                .long("board")
                .help("Board file the export is planned for")
                .value_parser(value_parser!(PathBuf))
                .required_unless_present("list_services"),
        )
        .arg(
            Arg::new("copper_layers")
                .short('l')
                .long("copper-layers")
                .help("Number of copper layers on the board")
                .value_parser(value_parser!(u32).range(1..=32))
                .default_value("2"),
        )
        .arg(
            Arg::new("service")
                .short('s')
                .long("service")
                .help("Fabrication service to export for (repeatable, default: all)")
                .value_parser(value_parser!(String))
                .action(clap::ArgAction::Append),
        )
        .arg(
            Arg::new("size_label")
                .long("size-label")
                .help("Board size label added to archive names, e.g. 50.0x30.0mm")
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .help("Name of the output directory created next to the board")
                .value_parser(value_parser!(String))
                .default_value(OUTPUT_DIR_NAME),
        )
        .arg(
            Arg::new("keep_intermediate")
                .short('k')
                .long("keep-intermediate")
                .help("Keep plotted files next to the zip archive")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list_services")
                .long("list-services")
                .help("List built-in fabrication services and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(clap::ArgAction::SetTrue),
        )
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Board file path
    pub board: Option<PathBuf>,

    /// Copper layers on the board
    pub copper_layers: u32,

    /// Selected service names; empty selects every built-in service
    pub services: Vec<String>,

    pub size_label: Option<String>,

    /// Top-level output directory name
    pub output_dir: String,

    pub keep_intermediate: bool,

    pub list_services: bool,

    /// Enable verbose logging
    pub verbose: bool,
}

impl Config {
    /// Parse arguments and set up logging
    pub fn from_args() -> Result<Self> {
        let config = Self::from_matches(&build_cli().get_matches())?;

        // RUST_LOG takes precedence over the verbose flag
        let default_filter = if config.verbose { "info" } else { "off" };
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

        tracing_subscriber::fmt().with_env_filter(env_filter).init();

        if config.verbose {
            info!("Configuration: {:?}", config);
        }

        Ok(config)
    }

    /// Build a configuration from parsed arguments
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let copper_layers = matches
            .get_one::<u32>("copper_layers")
            .copied()
            .ok_or_else(|| anyhow!("Copper layer count is required"))?;

        let services = matches
            .get_many::<String>("service")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        let output_dir = matches
            .get_one::<String>("output_dir")
            .cloned()
            .unwrap_or_else(|| OUTPUT_DIR_NAME.to_string());

        Ok(Config {
            board: matches.get_one::<PathBuf>("board").cloned(),
            copper_layers,
            services,
            size_label: matches.get_one::<String>("size_label").cloned(),
            output_dir,
            keep_intermediate: matches.get_flag("keep_intermediate"),
            list_services: matches.get_flag("list_services"),
            verbose: matches.get_flag("verbose"),
        })
    }

    /// Resolve the selected services against the built-in table
    pub fn selected_profiles(&self) -> Result<Vec<&'static ServiceProfile>> {
        if self.services.is_empty() {
            return Ok(builtin_profiles().iter().collect());
        }

        self.services.iter().map(|name| find_profile(name)).collect()
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            size_label: self.size_label.clone(),
            keep_intermediate: self.keep_intermediate,
        }
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        if !self.list_services && self.board.is_none() {
            return Err(anyhow!("A board file is required"));
        }

        if self.output_dir.is_empty() || self.output_dir.contains(['/', '\\']) {
            return Err(anyhow!(
                "Output directory must be a single directory name: {}",
                self.output_dir
            ));
        }

        self.selected_profiles()?;

        info!("Configuration validation completed successfully");
        Ok(())
    }
}
