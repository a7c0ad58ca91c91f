use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

use cli::{Cli, Commands};
use vault_tidy_core::{LayoutSettings, Settings};
use vault_tidy_resources::{ResourceOptimizer, RunMode, TidyError, YearSorter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    vault_tidy_core::load_dotenv();
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    // RUST_LOG wins, then --verbose, then the config file.
    let fallback = if cli.verbose {
        "debug".to_string()
    } else {
        settings.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with_writer(std::io::stderr)
        .init();

    let layout = LayoutSettings::from(&settings);
    info!(
        "Layout: resources folder '{}', note extension '{}'",
        layout.resources_dir, layout.note_extension
    );

    let result = match &cli.command {
        Commands::SortByYear {
            path,
            resources,
            execute,
        } => YearSorter::new(layout, RunMode::from_execute_flag(*execute))?
            .run(path, resources.as_deref())
            .map(|report| {
                if cli.json {
                    print_json(&report)
                } else {
                    output::print_year_sort(&report);
                    Ok(())
                }
            }),
        Commands::SortResources { path, execute } => {
            ResourceOptimizer::new(layout, RunMode::from_execute_flag(*execute))?
                .run(path)
                .map(|report| {
                    if cli.json {
                        print_json(&report)
                    } else {
                        output::print_optimize(&report);
                        Ok(())
                    }
                })
        }
    };

    match result {
        Ok(printed) => printed,
        Err(e @ (TidyError::RootNotFound(_) | TidyError::RootNotDirectory(_))) => {
            error!("{}", e);
            eprintln!("{}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_json<T: serde::Serialize>(report: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
