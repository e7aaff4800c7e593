use clap::{Arg, ArgAction, Command as ClapCommand, value_parser};
use std::process;
use log::{error, info, LevelFilter};

use featurekit::utils::logger::Logger;
use featurekit::commands::{CommandFactory, FeaturekitCommandFactory};

fn main() {
    let matches = ClapCommand::new("featurekit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract per-point raster features from several sources into a CSV table")
        .arg(
            Arg::new("points")
                .help("Input points (GeoJSON or CSV)")
                .required_unless_present("schema")
                .index(1),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .help("JSON catalog with the raster datasets")
                .value_name("FILE")
                .required_unless_present("schema"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Pipeline configuration (TOML); defaults to the built-in workflow")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output CSV file")
                .value_name("FILE")
                .required_unless_present("schema"),
        )
        .arg(
            Arg::new("failures")
                .long("failures")
                .help("Write failed points to this CSV file")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .help("Number of worker threads (0 = one per core)")
                .value_name("N")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("progress")
                .long("progress")
                .help("Show a progress bar")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("schema")
                .long("schema")
                .help("Validate the configuration and print the output schema")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only report warnings and errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write the log to this file")
                .value_name("FILE"),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else if matches.get_flag("quiet") {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    match matches.get_one::<String>("log-file") {
        Some(log_file) => {
            if let Err(e) = Logger::init_global_logger(log_file, level) {
                eprintln!("Error setting up global logger: {}", e);
                process::exit(1);
            }
        }
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_default_env()
                .init();
        }
    }

    let factory = FeaturekitCommandFactory::new();

    match factory.create_command(&matches) {
        Ok(command) => {
            info!("Running {} command", command.name());
            if let Err(e) = command.execute() {
                error!("{} command failed: {}", command.name(), e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
