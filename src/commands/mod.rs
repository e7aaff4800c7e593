//! CLI command implementations
//!
//! This module contains implementations of the commands
//! supported by the CLI application using the Command pattern.

pub mod command_traits;
pub mod extract_command;
pub mod schema_command;

pub use command_traits::{Command, CommandFactory};
pub use extract_command::ExtractCommand;
pub use schema_command::SchemaCommand;

use clap::ArgMatches;
use log::info;

use crate::config::{presets, PipelineConfig};
use crate::errors::ExtractResult;

/// Factory for creating command instances based on CLI arguments
pub struct FeaturekitCommandFactory;

impl FeaturekitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        FeaturekitCommandFactory
    }

    /// Configuration named by `--config`, or the built-in workflow
    fn load_config(args: &ArgMatches) -> ExtractResult<PipelineConfig> {
        match args.get_one::<String>("config") {
            Some(path) => {
                info!("Using pipeline configuration {}", path);
                PipelineConfig::from_file(path)
            }
            None => {
                info!("No --config given, using the built-in workflow");
                presets::default_workflow()
            }
        }
    }
}

impl Default for FeaturekitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFactory for FeaturekitCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> ExtractResult<Box<dyn Command>> {
        let config = Self::load_config(args)?;

        if args.get_flag("schema") {
            Ok(Box::new(SchemaCommand::new(config)))
        } else {
            Ok(Box::new(ExtractCommand::new(args, config)?))
        }
    }
}
