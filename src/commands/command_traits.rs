//! Command pattern interfaces for the featurekit CLI

use clap::ArgMatches;

use crate::errors::ExtractResult;

/// One CLI operation, fully configured and ready to run
pub trait Command {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Run the operation
    fn execute(&self) -> ExtractResult<()>;
}

/// Builds the command selected by the parsed arguments
pub trait CommandFactory {
    /// # Errors
    /// Fails when the pipeline configuration cannot be loaded or a required
    /// argument is missing.
    fn create_command(&self, args: &ArgMatches) -> ExtractResult<Box<dyn Command>>;
}
