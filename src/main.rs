//! gerber-to-order - plan fabrication exports for PCB services
//!
//! The plotting itself runs inside the host EDA application through the
//! library's `Board` trait. This binary lists the built-in services and
//! shows, for a board file, every file and archive an export would produce.

use gerber_to_order::{
    config::Config,
    error::{Result, ResultExt},
    export::ExportPlan,
    profiles::{builtin_profiles, DrillNumberFormat, ServiceProfile},
};
use tracing::{error, info};

fn main() -> Result<()> {
    let config = Config::from_args().unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if config.list_services {
        for profile in builtin_profiles() {
            println!("{}", describe(profile));
        }
        return Ok(());
    }

    match print_plans(&config) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Planning failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn print_plans(config: &Config) -> Result<()> {
    let Some(board) = config.board.as_deref() else {
        return Ok(());
    };
    let options = config.export_options();

    for profile in config.selected_profiles()? {
        info!("Planning export for {}", profile.name);
        let plan = ExportPlan::new(
            board,
            config.copper_layers,
            profile,
            &options,
            &config.output_dir,
        )
        .with_service_context(&profile.name)?;

        println!("{}", profile.name);
        println!("  archive: {}", plan.naming.archive.display());
        println!(
            "  working directory: {}{}",
            plan.naming.work_dir.display(),
            if options.keep_intermediate {
                ""
            } else {
                " (removed after archiving)"
            }
        );
        for (layer, target) in &plan.layers {
            match target {
                Some(name) => println!("  {:<10} -> {}", layer.symbolic_name(), name),
                None => println!("  {:<10} -> (plot engine name)", layer.symbolic_name()),
            }
        }
        for drill in &plan.drill_files {
            println!("  {:<10} -> {}", "drill", drill);
        }
    }

    Ok(())
}

fn describe(profile: &ServiceProfile) -> String {
    let format = match profile.drill_number_format {
        DrillNumberFormat::Decimal => "decimal",
        DrillNumberFormat::SuppressLeadingZeros => "suppress leading zeros",
    };

    format!(
        "{:<10} aux origin: {:<3} protel extensions: {:<3} drill: {}, {}{}, extension {}",
        profile.name,
        yes_no(profile.use_aux_origin),
        yes_no(profile.use_alternate_extensions),
        format,
        if profile.merge_plated_and_non_plated_holes {
            "merged"
        } else {
            "PTH/NPTH"
        },
        if profile.minimal_drill_header {
            ", minimal header"
        } else {
            ""
        },
        profile.drill_extension.as_deref().unwrap_or("drl"),
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
